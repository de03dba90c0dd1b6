//! In-memory platform services.
//!
//! Used by tests and by the CLI dry run. Seeding helpers (`seed`,
//! `insert_order`) do not count as writes; everything the handler does
//! through the platform traits does.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use secrecy::{ExposeSecret, SecretString};
use serde_json::{Map, Value};

use autoreg_core::{AccountId, CustomerId, Email, OrderId, Role, Username};

use crate::events::{AccountAutoCreated, AccountCreatedListener};
use crate::models::{Account, BuyerInfo, Customer, NewAccount, NewCustomer, Order, PaymentMeta, keys};
use crate::notify::{CredentialSetupNotifier, NotifyError};
use crate::password::generate_key;
use crate::platform::{
    AccountStore, CustomerStore, OrderStore, Platform, PlatformError, PlatformSettings,
    VisitorSession,
};

const SETUP_KEY_LENGTH: usize = 20;

// =============================================================================
// Accounts
// =============================================================================

#[derive(Default)]
struct AccountState {
    accounts: BTreeMap<AccountId, Account>,
    meta: BTreeMap<AccountId, Map<String, Value>>,
    password_lengths: BTreeMap<AccountId, usize>,
    setup_keys_issued: BTreeMap<AccountId, usize>,
    last_id: u64,
    writes: usize,
    reject_inserts: Option<String>,
    return_empty_ids: bool,
    fail_email_lookups: Option<String>,
    fail_username_lookups: Option<String>,
}

impl AccountState {
    fn next_id(&mut self) -> AccountId {
        self.last_id += 1;
        AccountId::new(self.last_id)
    }
}

/// Account store backed by a map.
#[derive(Default)]
pub struct MemoryAccounts {
    state: Mutex<AccountState>,
}

impl MemoryAccounts {
    /// Add an existing account.
    ///
    /// # Panics
    ///
    /// Panics if `email` is not a valid address.
    #[allow(clippy::expect_used)]
    pub fn seed(&self, login: &str, email: &str) -> AccountId {
        let mut state = self.state.lock();
        let id = state.next_id();
        let login = Username::sanitize(login);
        state.accounts.insert(
            id,
            Account {
                id,
                display_name: login.to_string(),
                login,
                email: Email::parse(email).expect("seeded email must be valid"),
                first_name: String::new(),
                last_name: String::new(),
                role: Role::default(),
                registered_at: Utc::now(),
            },
        );
        id
    }

    /// Set an account meta value without counting a write.
    pub fn seed_meta(&self, id: AccountId, key: &str, value: Value) {
        self.state
            .lock()
            .meta
            .entry(id)
            .or_default()
            .insert(key.to_owned(), value);
    }

    /// Make every following insert fail with `reason`.
    pub fn reject_inserts(&self, reason: &str) {
        self.state.lock().reject_inserts = Some(reason.to_owned());
    }

    /// Make every following lookup by email fail with `reason`.
    pub fn fail_email_lookups(&self, reason: &str) {
        self.state.lock().fail_email_lookups = Some(reason.to_owned());
    }

    /// Make every following login lookup fail with `reason`.
    pub fn fail_username_lookups(&self, reason: &str) {
        self.state.lock().fail_username_lookups = Some(reason.to_owned());
    }

    /// Make every following insert report the empty id without storing.
    pub fn return_empty_ids(&self) {
        self.state.lock().return_empty_ids = true;
    }

    #[must_use]
    pub fn get(&self, id: AccountId) -> Option<Account> {
        self.state.lock().accounts.get(&id).cloned()
    }

    #[must_use]
    pub fn meta(&self, id: AccountId, key: &str) -> Option<Value> {
        self.state
            .lock()
            .meta
            .get(&id)
            .and_then(|meta| meta.get(key))
            .cloned()
    }

    /// Length of the password the account was created with.
    #[must_use]
    pub fn password_length(&self, id: AccountId) -> Option<usize> {
        self.state.lock().password_lengths.get(&id).copied()
    }

    /// How many setup keys were issued for the account.
    #[must_use]
    pub fn setup_keys_issued(&self, id: AccountId) -> usize {
        self.state
            .lock()
            .setup_keys_issued
            .get(&id)
            .copied()
            .unwrap_or_default()
    }

    #[must_use]
    pub fn count(&self) -> usize {
        self.state.lock().accounts.len()
    }

    #[must_use]
    pub fn writes(&self) -> usize {
        self.state.lock().writes
    }
}

#[async_trait]
impl AccountStore for MemoryAccounts {
    async fn find_by_email(&self, email: &Email) -> Result<Option<Account>, PlatformError> {
        let state = self.state.lock();
        if let Some(reason) = &state.fail_email_lookups {
            return Err(PlatformError::Backend(reason.clone()));
        }
        Ok(state
            .accounts
            .values()
            .find(|account| account.email.matches(email))
            .cloned())
    }

    async fn find_by_id(&self, id: AccountId) -> Result<Option<Account>, PlatformError> {
        Ok(self.get(id))
    }

    async fn username_exists(&self, login: &Username) -> Result<bool, PlatformError> {
        let state = self.state.lock();
        if let Some(reason) = &state.fail_username_lookups {
            return Err(PlatformError::Backend(reason.clone()));
        }
        Ok(state
            .accounts
            .values()
            .any(|account| account.login.matches(login)))
    }

    async fn insert(&self, account: &NewAccount) -> Result<AccountId, PlatformError> {
        let mut state = self.state.lock();
        if let Some(reason) = &state.reject_inserts {
            return Err(PlatformError::Rejected(reason.clone()));
        }
        if state.return_empty_ids {
            return Ok(AccountId::default());
        }

        let profile = &account.profile;
        if profile.login.is_empty() {
            return Err(PlatformError::Rejected("empty login".to_owned()));
        }
        let taken = state.accounts.values().any(|existing| {
            existing.login.matches(&profile.login) || existing.email.matches(&profile.email)
        });
        if taken {
            return Err(PlatformError::Rejected(
                "login or email already registered".to_owned(),
            ));
        }

        let id = state.next_id();
        state.accounts.insert(
            id,
            Account {
                id,
                login: profile.login.clone(),
                email: profile.email.clone(),
                first_name: profile.first_name.clone(),
                last_name: profile.last_name.clone(),
                display_name: profile.display_name(),
                role: profile.role.clone(),
                registered_at: profile.registered_at,
            },
        );
        state
            .password_lengths
            .insert(id, account.password.expose_secret().len());
        state.writes += 1;
        Ok(id)
    }

    async fn update_meta(
        &self,
        id: AccountId,
        key: &str,
        value: Value,
    ) -> Result<(), PlatformError> {
        let mut state = self.state.lock();
        if !state.accounts.contains_key(&id) {
            return Err(PlatformError::NotFound {
                kind: "account",
                id: id.get(),
            });
        }
        state
            .meta
            .entry(id)
            .or_default()
            .insert(key.to_owned(), value);
        state.writes += 1;
        Ok(())
    }

    async fn delete_meta(&self, id: AccountId, key: &str) -> Result<(), PlatformError> {
        let mut state = self.state.lock();
        if let Some(meta) = state.meta.get_mut(&id) {
            meta.remove(key);
        }
        state.writes += 1;
        Ok(())
    }

    async fn issue_password_setup_key(
        &self,
        id: AccountId,
    ) -> Result<SecretString, PlatformError> {
        let mut state = self.state.lock();
        if !state.accounts.contains_key(&id) {
            return Err(PlatformError::NotFound {
                kind: "account",
                id: id.get(),
            });
        }
        *state.setup_keys_issued.entry(id).or_default() += 1;
        state.writes += 1;
        Ok(generate_key(SETUP_KEY_LENGTH))
    }
}

// =============================================================================
// Orders
// =============================================================================

#[derive(Default)]
struct OrderState {
    meta: BTreeMap<OrderId, Map<String, Value>>,
    writes: usize,
    reject_writes: Option<String>,
}

/// Order meta store backed by a map.
#[derive(Default)]
pub struct MemoryOrders {
    state: Mutex<OrderState>,
}

impl MemoryOrders {
    /// Store an order's payment record and return the order as the pipeline
    /// would deliver it.
    pub fn insert_order(&self, id: OrderId, buyer: BuyerInfo) -> Order {
        let payment = PaymentMeta {
            user_info: buyer.clone(),
            extra: Map::new(),
        };
        let mut meta = Map::new();
        meta.insert(
            keys::PAYMENT_META.to_owned(),
            serde_json::to_value(&payment).unwrap_or(Value::Null),
        );
        if let Some(account_id) = buyer.linked_account() {
            meta.insert(keys::PAYMENT_USER_ID.to_owned(), account_id.get().into());
        }
        self.state.lock().meta.insert(id, meta);

        Order {
            id,
            buyer,
            meta: Map::new(),
        }
    }

    /// Set an order meta value without counting a write.
    pub fn seed_meta(&self, id: OrderId, key: &str, value: Value) {
        self.state
            .lock()
            .meta
            .entry(id)
            .or_default()
            .insert(key.to_owned(), value);
    }

    /// Make every following meta write fail with `reason`.
    pub fn reject_writes(&self, reason: &str) {
        self.state.lock().reject_writes = Some(reason.to_owned());
    }

    #[must_use]
    pub fn meta(&self, id: OrderId, key: &str) -> Option<Value> {
        self.state
            .lock()
            .meta
            .get(&id)
            .and_then(|meta| meta.get(key))
            .cloned()
    }

    #[must_use]
    pub fn writes(&self) -> usize {
        self.state.lock().writes
    }
}

#[async_trait]
impl OrderStore for MemoryOrders {
    async fn payment_meta(&self, id: OrderId) -> Result<PaymentMeta, PlatformError> {
        let raw = self
            .meta(id, keys::PAYMENT_META)
            .ok_or(PlatformError::NotFound {
                kind: "order",
                id: id.get(),
            })?;
        serde_json::from_value(raw).map_err(|e| PlatformError::DataCorruption(e.to_string()))
    }

    async fn update_meta(&self, id: OrderId, key: &str, value: Value) -> Result<(), PlatformError> {
        let mut state = self.state.lock();
        if let Some(reason) = &state.reject_writes {
            return Err(PlatformError::Rejected(reason.clone()));
        }
        state
            .meta
            .entry(id)
            .or_default()
            .insert(key.to_owned(), value);
        state.writes += 1;
        Ok(())
    }
}

// =============================================================================
// Customers
// =============================================================================

#[derive(Default)]
struct CustomerState {
    customers: BTreeMap<CustomerId, Customer>,
    last_id: u64,
    writes: usize,
    reject_writes: Option<String>,
}

/// Customer store backed by a map.
#[derive(Default)]
pub struct MemoryCustomers {
    state: Mutex<CustomerState>,
}

impl MemoryCustomers {
    /// Add a customer without an account.
    ///
    /// # Panics
    ///
    /// Panics if `email` is not a valid address.
    #[allow(clippy::expect_used)]
    pub fn seed(&self, email: &str, name: &str) -> CustomerId {
        let mut state = self.state.lock();
        state.last_id += 1;
        let id = CustomerId::new(state.last_id);
        state.customers.insert(
            id,
            Customer {
                id,
                email: Email::parse(email).expect("seeded email must be valid"),
                name: name.to_owned(),
                account_id: None,
            },
        );
        id
    }

    /// Make every following create or link fail with `reason`.
    pub fn reject_writes(&self, reason: &str) {
        self.state.lock().reject_writes = Some(reason.to_owned());
    }

    #[must_use]
    pub fn get(&self, id: CustomerId) -> Option<Customer> {
        self.state.lock().customers.get(&id).cloned()
    }

    #[must_use]
    pub fn count(&self) -> usize {
        self.state.lock().customers.len()
    }

    #[must_use]
    pub fn writes(&self) -> usize {
        self.state.lock().writes
    }
}

#[async_trait]
impl CustomerStore for MemoryCustomers {
    async fn find_by_email(&self, email: &Email) -> Result<Option<Customer>, PlatformError> {
        Ok(self
            .state
            .lock()
            .customers
            .values()
            .find(|customer| customer.email.matches(email))
            .cloned())
    }

    async fn create(&self, customer: &NewCustomer) -> Result<CustomerId, PlatformError> {
        let mut state = self.state.lock();
        if let Some(reason) = &state.reject_writes {
            return Err(PlatformError::Rejected(reason.clone()));
        }
        state.last_id += 1;
        let id = CustomerId::new(state.last_id);
        state.customers.insert(
            id,
            Customer {
                id,
                email: customer.email.clone(),
                name: customer.name.clone(),
                account_id: customer.account_id,
            },
        );
        state.writes += 1;
        Ok(id)
    }

    async fn link_account(
        &self,
        id: CustomerId,
        account_id: AccountId,
    ) -> Result<(), PlatformError> {
        let mut state = self.state.lock();
        if let Some(reason) = &state.reject_writes {
            return Err(PlatformError::Rejected(reason.clone()));
        }
        let customer = state
            .customers
            .get_mut(&id)
            .ok_or(PlatformError::NotFound {
                kind: "customer",
                id: id.get(),
            })?;
        customer.account_id = Some(account_id);
        state.writes += 1;
        Ok(())
    }
}

// =============================================================================
// Settings and visitor
// =============================================================================

/// Settings held in memory; adjustable at runtime.
pub struct StaticSettings {
    default_role: RwLock<Role>,
    guest_checkout: AtomicBool,
}

impl StaticSettings {
    #[must_use]
    pub fn new(default_role: Role, guest_checkout: bool) -> Self {
        Self {
            default_role: RwLock::new(default_role),
            guest_checkout: AtomicBool::new(guest_checkout),
        }
    }

    pub fn set_default_role(&self, role: Role) {
        *self.default_role.write() = role;
    }

    pub fn set_guest_checkout(&self, enabled: bool) {
        self.guest_checkout.store(enabled, Ordering::SeqCst);
    }
}

/// Guest checkout enabled, `subscriber` role.
impl Default for StaticSettings {
    fn default() -> Self {
        Self::new(Role::default(), true)
    }
}

impl PlatformSettings for StaticSettings {
    fn default_role(&self) -> Role {
        self.default_role.read().clone()
    }

    fn guest_checkout_enabled(&self) -> bool {
        self.guest_checkout.load(Ordering::SeqCst)
    }
}

/// A visitor whose authentication state is set by the caller.
#[derive(Default)]
pub struct StaticVisitor {
    authenticated: AtomicBool,
}

impl StaticVisitor {
    pub fn set_authenticated(&self, authenticated: bool) {
        self.authenticated.store(authenticated, Ordering::SeqCst);
    }
}

impl VisitorSession for StaticVisitor {
    fn is_authenticated(&self) -> bool {
        self.authenticated.load(Ordering::SeqCst)
    }
}

// =============================================================================
// Recorders
// =============================================================================

/// Notifier that records who would have been emailed.
#[derive(Default)]
pub struct RecordingNotifier {
    notified: Mutex<Vec<AccountId>>,
    fail: bool,
}

impl RecordingNotifier {
    /// A notifier whose every delivery fails.
    #[must_use]
    pub fn failing() -> Self {
        Self {
            notified: Mutex::default(),
            fail: true,
        }
    }

    #[must_use]
    pub fn notified(&self) -> Vec<AccountId> {
        self.notified.lock().clone()
    }
}

#[async_trait]
impl CredentialSetupNotifier for RecordingNotifier {
    async fn notify_new_user(&self, account: &Account) -> Result<(), NotifyError> {
        if self.fail {
            return Err(PlatformError::Backend("delivery disabled".to_owned()).into());
        }
        self.notified.lock().push(account.id);
        Ok(())
    }
}

/// Listener that records every account-created event.
#[derive(Default)]
pub struct RecordingListener {
    events: Mutex<Vec<AccountAutoCreated>>,
}

impl RecordingListener {
    #[must_use]
    pub fn events(&self) -> Vec<AccountAutoCreated> {
        self.events.lock().clone()
    }
}

#[async_trait]
impl AccountCreatedListener for RecordingListener {
    async fn on_account_created(&self, event: &AccountAutoCreated) {
        self.events.lock().push(event.clone());
    }
}

// =============================================================================
// Bundle
// =============================================================================

/// All in-memory services, shareable with the handler via [`Self::platform`].
#[derive(Clone, Default)]
pub struct MemoryPlatform {
    pub accounts: Arc<MemoryAccounts>,
    pub orders: Arc<MemoryOrders>,
    pub customers: Arc<MemoryCustomers>,
    pub settings: Arc<StaticSettings>,
    pub visitor: Arc<StaticVisitor>,
}

impl MemoryPlatform {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Trait-object handles for the handler.
    #[must_use]
    pub fn platform(&self) -> Platform {
        Platform {
            accounts: self.accounts.clone(),
            orders: self.orders.clone(),
            customers: self.customers.clone(),
            settings: self.settings.clone(),
            visitor: self.visitor.clone(),
        }
    }

    /// Total writes across all stores.
    #[must_use]
    pub fn writes(&self) -> usize {
        self.accounts.writes() + self.orders.writes() + self.customers.writes()
    }
}
