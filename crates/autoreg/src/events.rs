//! Events raised by the handler and the extension points it offers.
//!
//! Two registries live here:
//!
//! - account argument filters, which may rewrite any creation parameter
//!   before the account is inserted
//! - account-created listeners, notified once per automatically created
//!   account (the welcome email is one of them)
//!
//! Both run in registration order.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::Serialize;

use autoreg_core::{AccountId, OrderId};

use crate::models::{AccountProfile, NewAccount, Order};

/// Raised after an account was created for a guest order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountAutoCreated {
    pub account_id: AccountId,
    /// Creation parameters as inserted, without the password.
    pub profile: AccountProfile,
    pub order_id: OrderId,
}

/// Rewrites account creation parameters.
pub trait AccountArgsFilter: Send + Sync {
    fn filter(&self, account: NewAccount, order: &Order) -> NewAccount;
}

impl<F> AccountArgsFilter for F
where
    F: Fn(NewAccount, &Order) -> NewAccount + Send + Sync,
{
    fn filter(&self, account: NewAccount, order: &Order) -> NewAccount {
        self(account, order)
    }
}

/// Reacts to automatically created accounts.
///
/// Listeners cannot fail the creation; they log and absorb their own errors.
#[async_trait]
pub trait AccountCreatedListener: Send + Sync {
    async fn on_account_created(&self, event: &AccountAutoCreated);
}

/// Registry of filters and listeners for auto-registration events.
#[derive(Default)]
pub struct AutoRegisterEvents {
    args_filters: RwLock<Vec<Arc<dyn AccountArgsFilter>>>,
    created_listeners: RwLock<Vec<Arc<dyn AccountCreatedListener>>>,
}

impl AutoRegisterEvents {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a filter for account creation parameters.
    pub fn filter_account_args(&self, filter: Arc<dyn AccountArgsFilter>) {
        self.args_filters.write().push(filter);
    }

    /// Subscribe to account-created events.
    pub fn on_account_created(&self, listener: Arc<dyn AccountCreatedListener>) {
        self.created_listeners.write().push(listener);
    }

    /// Run every registered filter over `account`.
    #[must_use]
    pub fn apply_args_filters(&self, account: NewAccount, order: &Order) -> NewAccount {
        let filters = self.args_filters.read().clone();
        filters
            .iter()
            .fold(account, |account, filter| filter.filter(account, order))
    }

    /// Deliver `event` to every listener, in registration order.
    pub async fn publish(&self, event: &AccountAutoCreated) {
        let listeners = self.created_listeners.read().clone();
        tracing::debug!(
            account_id = %event.account_id,
            order_id = %event.order_id,
            listeners = listeners.len(),
            "publishing account-created event"
        );
        for listener in listeners {
            listener.on_account_created(event).await;
        }
    }
}

impl std::fmt::Debug for AutoRegisterEvents {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AutoRegisterEvents")
            .field("args_filters", &self.args_filters.read().len())
            .field("created_listeners", &self.created_listeners.read().len())
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use parking_lot::Mutex;
    use secrecy::SecretString;

    use autoreg_core::{Email, Role, Username};

    use super::*;

    fn new_account() -> NewAccount {
        NewAccount {
            profile: AccountProfile {
                login: Username::sanitize("jane"),
                email: Email::parse("jane@example.com").unwrap(),
                first_name: "Jane".into(),
                last_name: "Doe".into(),
                registered_at: Utc::now(),
                role: Role::default(),
            },
            password: SecretString::from("x".repeat(32)),
        }
    }

    #[test]
    fn test_filters_chain_in_order() {
        let events = AutoRegisterEvents::new();
        events.filter_account_args(Arc::new(|mut account: NewAccount, _: &Order| {
            account.profile.role = Role::new("customer");
            account
        }));
        events.filter_account_args(Arc::new(|mut account: NewAccount, _: &Order| {
            account.profile.first_name = format!("{}!", account.profile.role);
            account
        }));

        let filtered = events.apply_args_filters(new_account(), &Order::default());
        assert_eq!(filtered.profile.role.as_str(), "customer");
        assert_eq!(filtered.profile.first_name, "customer!");
    }

    #[test]
    fn test_no_filters_is_identity() {
        let events = AutoRegisterEvents::new();
        let account = new_account();
        let expected = account.profile.clone();
        assert_eq!(
            events.apply_args_filters(account, &Order::default()).profile,
            expected
        );
    }

    struct Tagged(&'static str, Arc<Mutex<Vec<&'static str>>>);

    #[async_trait]
    impl AccountCreatedListener for Tagged {
        async fn on_account_created(&self, _event: &AccountAutoCreated) {
            self.1.lock().push(self.0);
        }
    }

    #[tokio::test]
    async fn test_publish_reaches_listeners_in_order() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let events = AutoRegisterEvents::new();
        events.on_account_created(Arc::new(Tagged("first", seen.clone())));
        events.on_account_created(Arc::new(Tagged("second", seen.clone())));

        let event = AccountAutoCreated {
            account_id: AccountId::new(1),
            profile: new_account().profile,
            order_id: OrderId::new(2),
        };
        events.publish(&event).await;

        assert_eq!(*seen.lock(), vec!["first", "second"]);
    }
}
