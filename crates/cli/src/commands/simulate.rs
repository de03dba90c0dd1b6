//! Dry run of the registration flow.
//!
//! # Usage
//!
//! ```bash
//! # A guest order from a new buyer
//! autoreg simulate -e jane.doe@example.com --first-name Jane --last-name Doe
//!
//! # The local part is already someone's login
//! autoreg simulate -e jane.doe@example.com --taken jane.doe
//! ```
//!
//! Runs the handler against in-memory stores and logs what it would do.
//! Nothing is written anywhere and no email is sent.

use std::sync::Arc;

use autoreg::memory::{MemoryPlatform, RecordingListener, RecordingNotifier};
use autoreg::models::BuyerInfo;
use autoreg::{AutoRegisterEvents, AutoRegistrationHandler, HostHooks, Outcome, WelcomeNotifier};
use autoreg_core::{OrderId, RegistrationForm};

/// Buyer details and store state for a dry run.
#[derive(Debug, Clone)]
pub struct Scenario {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    /// Logins that already exist in the store.
    pub taken: Vec<String>,
    pub guest_checkout: bool,
    pub password_length: usize,
}

/// Run one order through the handler.
///
/// # Errors
///
/// Returns error if the created-event cannot be encoded for display.
pub async fn run(scenario: Scenario) -> Result<Outcome, serde_json::Error> {
    let memory = MemoryPlatform::new();
    memory.settings.set_guest_checkout(scenario.guest_checkout);
    for (n, login) in scenario.taken.iter().enumerate() {
        memory
            .accounts
            .seed(login, &format!("existing-{n}@autoreg.invalid"));
    }

    let events = Arc::new(AutoRegisterEvents::new());
    let created = Arc::new(RecordingListener::default());
    let notifier = Arc::new(RecordingNotifier::default());
    events.on_account_created(created.clone());
    events.on_account_created(Arc::new(WelcomeNotifier::new(
        memory.accounts.clone(),
        notifier.clone(),
    )));

    let handler = Arc::new(
        AutoRegistrationHandler::new(memory.platform(), events)
            .with_password_length(scenario.password_length),
    );
    let hooks = HostHooks::new();
    handler.hook(&hooks);

    let form = hooks.show_register_form(
        RegistrationForm::Both,
        autoreg::hooks::SHOW_REGISTER_FORM,
        RegistrationForm::Both,
    );
    tracing::info!(%form, guest_checkout = scenario.guest_checkout, "checkout form");

    let order = memory.orders.insert_order(
        OrderId::new(1),
        BuyerInfo {
            email: scenario.email,
            first_name: scenario.first_name,
            last_name: scenario.last_name,
            ..BuyerInfo::default()
        },
    );
    let outcome = handler.handle_order_created(&order).await;
    tracing::info!(?outcome, writes = memory.writes(), "order handled");

    for event in created.events() {
        tracing::info!(event = %serde_json::to_string(&event)?, "account created");
    }
    for account_id in notifier.notified() {
        tracing::info!(%account_id, "credential setup email would be sent");
    }

    Ok(outcome)
}
