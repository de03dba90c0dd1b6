//! Integration tests for automatic checkout account registration.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p autoreg-integration-tests
//! ```
//!
//! The tests drive the handler through [`HostHooks`] the way a host would,
//! with every platform service backed by [`MemoryPlatform`].

use std::sync::Arc;

use autoreg::memory::{MemoryPlatform, RecordingListener, RecordingNotifier};
use autoreg::models::{BuyerInfo, Order};
use autoreg::{AutoRegisterEvents, AutoRegistrationHandler, HostHooks, WelcomeNotifier};
use autoreg_core::OrderId;

/// A host with the handler and the welcome email wired in.
pub struct TestContext {
    pub memory: MemoryPlatform,
    pub hooks: HostHooks,
    pub events: Arc<AutoRegisterEvents>,
    pub handler: Arc<AutoRegistrationHandler>,
    /// Every account-created event, in order.
    pub created: Arc<RecordingListener>,
    /// Every credential-setup notification, in order.
    pub notifier: Arc<RecordingNotifier>,
}

impl TestContext {
    #[must_use]
    pub fn new() -> Self {
        Self::with_notifier(RecordingNotifier::default())
    }

    #[must_use]
    pub fn with_notifier(notifier: RecordingNotifier) -> Self {
        let memory = MemoryPlatform::new();
        let events = Arc::new(AutoRegisterEvents::new());
        let notifier = Arc::new(notifier);
        let created = Arc::new(RecordingListener::default());

        events.on_account_created(created.clone());
        events.on_account_created(Arc::new(WelcomeNotifier::new(
            memory.accounts.clone(),
            notifier.clone(),
        )));

        let handler = Arc::new(AutoRegistrationHandler::new(
            memory.platform(),
            events.clone(),
        ));
        let hooks = HostHooks::new();
        handler.hook(&hooks);

        Self {
            memory,
            hooks,
            events,
            handler,
            created,
            notifier,
        }
    }

    /// Store an order for `email` and deliver the order-created event.
    pub async fn checkout(&self, id: u64, email: &str) -> Order {
        let order = self.memory.orders.insert_order(OrderId::new(id), buyer(email));
        self.hooks.dispatch_order_created(&order).await;
        order
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}

/// A guest buyer named Jane Doe.
#[must_use]
pub fn buyer(email: &str) -> BuyerInfo {
    BuyerInfo {
        email: email.to_string(),
        first_name: "Jane".to_string(),
        last_name: "Doe".to_string(),
        ..BuyerInfo::default()
    }
}
