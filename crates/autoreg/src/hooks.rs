//! Typed hook registry for the host's checkout pipeline.
//!
//! The host owns one [`HostHooks`] and calls the `dispatch_*` / filter
//! methods at the matching points of its request lifecycle. Components
//! subscribe with typed callbacks instead of string event names.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use autoreg_core::{AccountId, RegistrationForm};

use crate::models::Order;

/// Option key the host passes when asking which checkout form to render.
pub const SHOW_REGISTER_FORM: &str = "show_register_form";

/// Called after the commerce system stored a new order.
#[async_trait]
pub trait OrderCreatedListener: Send + Sync {
    async fn on_order_created(&self, order: &Order);
}

/// Called after the host marked an account as awaiting email verification.
#[async_trait]
pub trait UserSetPendingListener: Send + Sync {
    async fn on_user_set_pending(&self, account_id: AccountId);
}

/// Decides whether an account still awaits email verification.
pub trait PendingVerificationFilter: Send + Sync {
    fn is_pending(&self, account_id: AccountId, current: bool) -> bool;
}

/// Decides which account form the checkout renders.
pub trait RegisterFormFilter: Send + Sync {
    fn show_register_form(
        &self,
        current: RegistrationForm,
        key: &str,
        default: RegistrationForm,
    ) -> RegistrationForm;
}

/// Subscriptions to the host pipeline.
#[derive(Default)]
pub struct HostHooks {
    order_created: RwLock<Vec<Arc<dyn OrderCreatedListener>>>,
    user_set_pending: RwLock<Vec<Arc<dyn UserSetPendingListener>>>,
    pending_filters: RwLock<Vec<Arc<dyn PendingVerificationFilter>>>,
    register_form_filters: RwLock<Vec<Arc<dyn RegisterFormFilter>>>,
}

impl HostHooks {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_order_created(&self, listener: Arc<dyn OrderCreatedListener>) {
        self.order_created.write().push(listener);
    }

    pub fn on_user_set_pending(&self, listener: Arc<dyn UserSetPendingListener>) {
        self.user_set_pending.write().push(listener);
    }

    pub fn filter_pending_verification(&self, filter: Arc<dyn PendingVerificationFilter>) {
        self.pending_filters.write().push(filter);
    }

    pub fn filter_register_form(&self, filter: Arc<dyn RegisterFormFilter>) {
        self.register_form_filters.write().push(filter);
    }

    /// Notify every order-created listener, each exactly once.
    pub async fn dispatch_order_created(&self, order: &Order) {
        let listeners = self.order_created.read().clone();
        for listener in listeners {
            listener.on_order_created(order).await;
        }
    }

    /// Notify every user-set-pending listener, each exactly once.
    pub async fn dispatch_user_set_pending(&self, account_id: AccountId) {
        let listeners = self.user_set_pending.read().clone();
        for listener in listeners {
            listener.on_user_set_pending(account_id).await;
        }
    }

    /// Resolve the pending-verification state through every filter.
    #[must_use]
    pub fn is_pending_verification(&self, account_id: AccountId, default: bool) -> bool {
        self.pending_filters
            .read()
            .iter()
            .fold(default, |current, filter| filter.is_pending(account_id, current))
    }

    /// Resolve a checkout form option through every filter.
    #[must_use]
    pub fn show_register_form(
        &self,
        current: RegistrationForm,
        key: &str,
        default: RegistrationForm,
    ) -> RegistrationForm {
        self.register_form_filters
            .read()
            .iter()
            .fold(current, |value, filter| {
                filter.show_register_form(value, key, default)
            })
    }
}

impl std::fmt::Debug for HostHooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostHooks")
            .field("order_created", &self.order_created.read().len())
            .field("user_set_pending", &self.user_set_pending.read().len())
            .field("pending_filters", &self.pending_filters.read().len())
            .field(
                "register_form_filters",
                &self.register_form_filters.read().len(),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    struct Counter(AtomicUsize);

    #[async_trait]
    impl OrderCreatedListener for Counter {
        async fn on_order_created(&self, _order: &Order) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct Fixed(RegistrationForm);

    impl RegisterFormFilter for Fixed {
        fn show_register_form(
            &self,
            _current: RegistrationForm,
            _key: &str,
            _default: RegistrationForm,
        ) -> RegistrationForm {
            self.0
        }
    }

    #[tokio::test]
    async fn test_each_listener_runs_once_per_dispatch() {
        let hooks = HostHooks::new();
        let a = Arc::new(Counter(AtomicUsize::new(0)));
        let b = Arc::new(Counter(AtomicUsize::new(0)));
        hooks.on_order_created(a.clone());
        hooks.on_order_created(b.clone());

        hooks.dispatch_order_created(&Order::default()).await;

        assert_eq!(a.0.load(Ordering::SeqCst), 1);
        assert_eq!(b.0.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_unfiltered_values_pass_through() {
        let hooks = HostHooks::new();
        assert!(hooks.is_pending_verification(AccountId::new(1), true));
        assert_eq!(
            hooks.show_register_form(
                RegistrationForm::Both,
                SHOW_REGISTER_FORM,
                RegistrationForm::None
            ),
            RegistrationForm::Both
        );
    }

    #[test]
    fn test_last_registered_filter_wins() {
        let hooks = HostHooks::new();
        hooks.filter_register_form(Arc::new(Fixed(RegistrationForm::Login)));
        hooks.filter_register_form(Arc::new(Fixed(RegistrationForm::Registration)));
        assert_eq!(
            hooks.show_register_form(
                RegistrationForm::Both,
                SHOW_REGISTER_FORM,
                RegistrationForm::None
            ),
            RegistrationForm::Registration
        );
    }
}
