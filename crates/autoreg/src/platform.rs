//! Services provided by the host platform.
//!
//! The handler never talks to storage or mail transports directly. Every
//! external collaborator is a trait object handed in through [`Platform`] when
//! the application starts.
//!
//! Store traits are async because hosts back them with a database. Settings
//! and the visitor session are read synchronously; hosts load them once per
//! request.

use std::sync::Arc;

use async_trait::async_trait;
use secrecy::SecretString;
use serde_json::Value;
use thiserror::Error;

use autoreg_core::{AccountId, CustomerId, Email, OrderId, Role, Username};

use crate::models::{Account, Customer, NewAccount, NewCustomer, PaymentMeta};

/// Errors reported by platform services.
#[derive(Debug, Error)]
pub enum PlatformError {
    /// The referenced record does not exist.
    #[error("{kind} {id} not found")]
    NotFound {
        /// Record type.
        kind: &'static str,
        /// Record identifier.
        id: u64,
    },

    /// The write was rejected (e.g. a uniqueness constraint).
    #[error("rejected: {0}")]
    Rejected(String),

    /// Stored data could not be decoded.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Backend failure (database, network).
    #[error("backend error: {0}")]
    Backend(String),
}

/// The host's user store.
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Find the account registered with `email` (case-insensitive).
    async fn find_by_email(&self, email: &Email) -> Result<Option<Account>, PlatformError>;

    /// Find an account by id.
    async fn find_by_id(&self, id: AccountId) -> Result<Option<Account>, PlatformError>;

    /// Whether a login name is taken (case-insensitive).
    async fn username_exists(&self, login: &Username) -> Result<bool, PlatformError>;

    /// Create an account.
    ///
    /// Returns the new id. Implementations may return [`AccountId::default`]
    /// instead of an error when nothing was written; callers treat both the
    /// same way.
    async fn insert(&self, account: &NewAccount) -> Result<AccountId, PlatformError>;

    /// Set an account meta value, replacing any previous value.
    async fn update_meta(&self, id: AccountId, key: &str, value: Value)
    -> Result<(), PlatformError>;

    /// Remove an account meta value. Removing a missing key is not an error.
    async fn delete_meta(&self, id: AccountId, key: &str) -> Result<(), PlatformError>;

    /// Issue a single-use key that lets the account holder choose a password.
    async fn issue_password_setup_key(&self, id: AccountId)
    -> Result<SecretString, PlatformError>;
}

/// The commerce system's order storage.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Load the persisted payment record for an order.
    async fn payment_meta(&self, id: OrderId) -> Result<PaymentMeta, PlatformError>;

    /// Set an order meta value, replacing any previous value.
    async fn update_meta(&self, id: OrderId, key: &str, value: Value) -> Result<(), PlatformError>;
}

/// The commerce system's customer records.
#[async_trait]
pub trait CustomerStore: Send + Sync {
    async fn find_by_email(&self, email: &Email) -> Result<Option<Customer>, PlatformError>;

    async fn create(&self, customer: &NewCustomer) -> Result<CustomerId, PlatformError>;

    /// Point a customer record at an account.
    async fn link_account(
        &self,
        id: CustomerId,
        account_id: AccountId,
    ) -> Result<(), PlatformError>;
}

/// Site options the handler reads.
pub trait PlatformSettings: Send + Sync {
    /// Role given to newly registered accounts.
    fn default_role(&self) -> Role;

    /// Whether buyers may check out without an account.
    fn guest_checkout_enabled(&self) -> bool;
}

/// The visitor making the current request.
///
/// The handler holds one instance for its whole lifetime and calls it while
/// a request is being served. Implementations must answer for that request
/// (e.g. read a task-local or request-scoped session), not for whichever
/// visitor was current when the handler was built.
pub trait VisitorSession: Send + Sync {
    fn is_authenticated(&self) -> bool;
}

/// Platform services handed to the handler at construction.
#[derive(Clone)]
pub struct Platform {
    pub accounts: Arc<dyn AccountStore>,
    pub orders: Arc<dyn OrderStore>,
    pub customers: Arc<dyn CustomerStore>,
    pub settings: Arc<dyn PlatformSettings>,
    /// Resolves the current request's visitor on every call.
    pub visitor: Arc<dyn VisitorSession>,
}

impl std::fmt::Debug for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Platform").finish_non_exhaustive()
    }
}
