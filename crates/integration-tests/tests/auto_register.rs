//! End-to-end tests for guest checkout account registration.
//!
//! Orders are delivered through the host hooks; assertions read the
//! in-memory stores afterwards.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use serde_json::json;

use autoreg::hooks::SHOW_REGISTER_FORM;
use autoreg::memory::RecordingNotifier;
use autoreg::models::{NewAccount, Order, keys};
use autoreg::platform::CustomerStore;
use autoreg::{Outcome, SkipReason};
use autoreg_core::{AccountId, Email, OrderId, RegistrationForm, Role};
use autoreg_integration_tests::{TestContext, buyer};

// ============================================================================
// Preconditions
// ============================================================================

#[tokio::test]
async fn test_linked_order_causes_no_writes() {
    let ctx = TestContext::new();
    let mut info = buyer("jane.doe@example.com");
    info.id = Some(AccountId::new(7));
    let order = ctx.memory.orders.insert_order(OrderId::new(1), info);

    ctx.hooks.dispatch_order_created(&order).await;

    assert_eq!(ctx.memory.writes(), 0);
    assert!(ctx.created.events().is_empty());
    assert!(ctx.notifier.notified().is_empty());
}

#[tokio::test]
async fn test_unset_buyer_id_counts_as_guest() {
    let ctx = TestContext::new();
    let mut info = buyer("jane.doe@example.com");
    info.id = Some(AccountId::default());
    let order = ctx.memory.orders.insert_order(OrderId::new(1), info);

    let outcome = ctx.handler.handle_order_created(&order).await;
    assert!(matches!(outcome, Outcome::Created(_)));
}

#[tokio::test]
async fn test_existing_email_is_skipped() {
    let ctx = TestContext::new();
    ctx.memory.accounts.seed("someone", "Jane.Doe@Example.com");
    let order = ctx
        .memory
        .orders
        .insert_order(OrderId::new(1), buyer("jane.doe@example.com"));

    let outcome = ctx.handler.handle_order_created(&order).await;

    assert_eq!(outcome, Outcome::Skipped(SkipReason::AccountExists));
    assert_eq!(ctx.memory.writes(), 0);
}

#[tokio::test]
async fn test_repeated_delivery_creates_one_account() {
    let ctx = TestContext::new();
    let order = ctx.checkout(1, "jane.doe@example.com").await;

    ctx.hooks.dispatch_order_created(&order).await;
    let outcome = ctx.handler.handle_order_created(&order).await;

    assert_eq!(outcome, Outcome::Skipped(SkipReason::AccountExists));
    assert_eq!(ctx.memory.accounts.count(), 1);
    assert_eq!(ctx.created.events().len(), 1);
    assert_eq!(ctx.notifier.notified().len(), 1);
}

// ============================================================================
// Username derivation
// ============================================================================

#[tokio::test]
async fn test_login_is_local_part() {
    let ctx = TestContext::new();
    ctx.checkout(1, "jane.doe@example.com").await;

    let events = ctx.created.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].profile.login.as_str(), "jane.doe");
}

#[tokio::test]
async fn test_login_falls_back_to_full_address() {
    let ctx = TestContext::new();
    ctx.memory.accounts.seed("jane.doe", "jd@elsewhere.test");
    ctx.checkout(1, "jane.doe@example.com").await;

    let events = ctx.created.events();
    assert_eq!(events[0].profile.login.as_str(), "jane.doe@example.com");
}

#[tokio::test]
async fn test_both_logins_taken_creates_nothing() {
    let ctx = TestContext::new();
    ctx.memory.accounts.seed("jane.doe", "jd@elsewhere.test");
    ctx.memory
        .accounts
        .seed("jane.doe@example.com", "jd2@elsewhere.test");
    let order = ctx
        .memory
        .orders
        .insert_order(OrderId::new(1), buyer("jane.doe@example.com"));

    let outcome = ctx.handler.handle_order_created(&order).await;

    assert_eq!(outcome, Outcome::Skipped(SkipReason::NoUsername));
    assert_eq!(ctx.memory.accounts.count(), 2);
    assert_eq!(ctx.memory.writes(), 0);
    assert!(ctx.created.events().is_empty());
}

// ============================================================================
// Successful registration
// ============================================================================

#[tokio::test]
async fn test_created_account_is_linked_everywhere() {
    let ctx = TestContext::new();
    let order = ctx.checkout(42, "jane.doe@example.com").await;

    let events = ctx.created.events();
    assert_eq!(events.len(), 1);
    let event = &events[0];
    assert_eq!(event.order_id, order.id);
    let id = event.account_id;

    let account = ctx.memory.accounts.get(id).unwrap();
    assert_eq!(account.email.as_str(), "jane.doe@example.com");
    assert_eq!(account.first_name, "Jane");
    assert_eq!(account.last_name, "Doe");
    assert_eq!(account.display_name, "Jane Doe");
    assert_eq!(account.role, Role::default());
    assert_eq!(event.profile.login, account.login);

    assert_eq!(
        ctx.memory.orders.meta(order.id, keys::PAYMENT_USER_ID),
        Some(json!(id.get()))
    );
    let payment = ctx
        .memory
        .orders
        .meta(order.id, keys::PAYMENT_META)
        .unwrap();
    assert_eq!(payment["user_info"]["id"], json!(id.get()));
    assert_eq!(payment["user_info"]["email"], json!("jane.doe@example.com"));

    let email = Email::parse("jane.doe@example.com").unwrap();
    let customer = ctx
        .memory
        .customers
        .find_by_email(&email)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(customer.account_id, Some(id));
    assert_eq!(customer.name, "Jane Doe");

    assert_eq!(ctx.notifier.notified(), vec![id]);
}

#[tokio::test]
async fn test_generated_password_is_never_exposed() {
    let ctx = TestContext::new();
    ctx.checkout(1, "jane.doe@example.com").await;

    let id = ctx.created.events()[0].account_id;
    assert_eq!(ctx.memory.accounts.password_length(id), Some(32));

    let event = serde_json::to_value(&ctx.created.events()[0]).unwrap();
    assert!(event["profile"].get("password").is_none());
}

#[tokio::test]
async fn test_args_filter_rewrites_role() {
    let ctx = TestContext::new();
    ctx.events
        .filter_account_args(Arc::new(|mut account: NewAccount, order: &Order| {
            if order.id == OrderId::new(9) {
                account.profile.role = Role::new("wholesale");
            }
            account
        }));

    ctx.checkout(9, "jane.doe@example.com").await;

    let id = ctx.created.events()[0].account_id;
    assert_eq!(ctx.memory.accounts.get(id).unwrap().role.as_str(), "wholesale");
    assert_eq!(ctx.created.events()[0].profile.role.as_str(), "wholesale");
}

#[tokio::test]
async fn test_notification_failure_does_not_undo_account() {
    let ctx = TestContext::with_notifier(RecordingNotifier::failing());
    let order = ctx
        .memory
        .orders
        .insert_order(OrderId::new(1), buyer("jane.doe@example.com"));

    let outcome = ctx.handler.handle_order_created(&order).await;

    let Outcome::Created(id) = outcome else {
        panic!("expected account creation, got {outcome:?}");
    };
    assert!(ctx.memory.accounts.get(id).is_some());
    assert_eq!(ctx.created.events().len(), 1);
}

#[tokio::test]
async fn test_store_failure_is_absorbed() {
    let ctx = TestContext::new();
    ctx.memory.accounts.reject_inserts("database unavailable");

    ctx.checkout(1, "jane.doe@example.com").await;

    assert_eq!(ctx.memory.accounts.count(), 0);
    assert!(ctx.created.events().is_empty());
}

// ============================================================================
// Verification and checkout form
// ============================================================================

#[tokio::test]
async fn test_new_accounts_skip_email_verification() {
    let ctx = TestContext::new();
    ctx.checkout(1, "jane.doe@example.com").await;
    let id = ctx.created.events()[0].account_id;

    ctx.memory
        .accounts
        .seed_meta(id, keys::PENDING_VERIFICATION, json!("1"));
    ctx.hooks.dispatch_user_set_pending(id).await;

    assert!(!ctx.hooks.is_pending_verification(id, true));
    assert_eq!(ctx.memory.accounts.meta(id, keys::PENDING_VERIFICATION), None);
}

#[test]
fn test_register_form_table() {
    let cases = [
        // guest checkout, signed in, expected
        (false, false, RegistrationForm::Login),
        (false, true, RegistrationForm::None),
        (true, false, RegistrationForm::None),
        (true, true, RegistrationForm::None),
    ];

    let ctx = TestContext::new();
    for (guest_checkout, signed_in, expected) in cases {
        ctx.memory.settings.set_guest_checkout(guest_checkout);
        ctx.memory.visitor.set_authenticated(signed_in);

        for current in [
            RegistrationForm::None,
            RegistrationForm::Login,
            RegistrationForm::Registration,
            RegistrationForm::Both,
        ] {
            assert_eq!(
                ctx.hooks
                    .show_register_form(current, SHOW_REGISTER_FORM, RegistrationForm::Both),
                expected,
                "guest_checkout={guest_checkout} signed_in={signed_in} current={current}"
            );
        }
    }
}
