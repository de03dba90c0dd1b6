//! The auto-registration handler.
//!
//! Subscribed to the host's order pipeline, it turns guest orders into
//! accounts:
//!
//! 1. skip orders that already carry an account, or whose buyer email
//!    already belongs to one
//! 2. derive a login from the email (local part first, full address second)
//! 3. create the account with a random password the buyer never sees
//! 4. link the account to the order and the customer record
//! 5. publish [`AccountAutoCreated`] so the welcome email goes out
//!
//! Nothing here fails the order. Every step either completes or ends the
//! operation quietly.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;

use autoreg_core::{AccountId, Email, RegistrationForm, Username};

use crate::config::AutoRegisterConfig;
use crate::error::HandlerError;
use crate::events::{AccountAutoCreated, AutoRegisterEvents};
use crate::hooks::{
    HostHooks, OrderCreatedListener, PendingVerificationFilter, RegisterFormFilter,
    UserSetPendingListener,
};
use crate::models::{
    AccountProfile, BuyerInfo, NewAccount, NewCustomer, Order, PaymentMeta, keys,
};
use crate::password::{
    DEFAULT_PASSWORD_LENGTH, MAX_PASSWORD_LENGTH, MIN_PASSWORD_LENGTH, generate_password,
};
use crate::platform::{Platform, PlatformError};

/// Why an order did not get an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The order is already linked to an account.
    AlreadyLinked,
    /// The buyer email is not a usable address.
    InvalidEmail,
    /// An account with the buyer email exists.
    AccountExists,
    /// No free login could be derived from the email.
    NoUsername,
}

/// Result of handling one order-created event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// A precondition was not met; nothing was written.
    Skipped(SkipReason),
    /// A platform service failed before the account existed.
    Failed,
    /// The account was created and announced.
    Created(AccountId),
}

/// Creates accounts for guest orders.
///
/// Construct once at startup, then [`hook`](Self::hook) it into the host.
pub struct AutoRegistrationHandler {
    platform: Platform,
    events: Arc<AutoRegisterEvents>,
    password_length: usize,
}

impl AutoRegistrationHandler {
    #[must_use]
    pub const fn new(platform: Platform, events: Arc<AutoRegisterEvents>) -> Self {
        Self {
            platform,
            events,
            password_length: DEFAULT_PASSWORD_LENGTH,
        }
    }

    /// Build a handler with the configured password length.
    #[must_use]
    pub fn from_config(
        platform: Platform,
        events: Arc<AutoRegisterEvents>,
        config: &AutoRegisterConfig,
    ) -> Self {
        Self::new(platform, events).with_password_length(config.password_length)
    }

    /// Override the generated password length.
    ///
    /// Values outside 12..=128 are clamped to the nearest bound.
    #[must_use]
    pub fn with_password_length(mut self, len: usize) -> Self {
        self.password_length = len.clamp(MIN_PASSWORD_LENGTH, MAX_PASSWORD_LENGTH);
        self
    }

    /// Subscribe this handler to the host pipeline.
    ///
    /// Registers the order-created listener, the pending-verification
    /// override and cleanup, and the checkout form filter.
    pub fn hook(self: &Arc<Self>, hooks: &HostHooks) {
        hooks.filter_pending_verification(self.clone());
        hooks.on_user_set_pending(self.clone());
        hooks.on_order_created(self.clone());
        hooks.filter_register_form(self.clone());
    }

    /// Create an account for `order` if it was placed by a buyer without one.
    #[tracing::instrument(skip_all, fields(order_id = %order.id))]
    pub async fn handle_order_created(&self, order: &Order) -> Outcome {
        if order.buyer.linked_account().is_some() {
            return Outcome::Skipped(SkipReason::AlreadyLinked);
        }

        let Ok(email) = Email::parse(&order.buyer.email) else {
            return Outcome::Skipped(SkipReason::InvalidEmail);
        };

        match self.platform.accounts.find_by_email(&email).await {
            Ok(None) => {}
            Ok(Some(_)) => return Outcome::Skipped(SkipReason::AccountExists),
            Err(e) => {
                tracing::warn!(error = %e, "account lookup by email failed");
                return Outcome::Failed;
            }
        }

        let login = self.derive_username(&order.buyer, false).await;
        if login.is_empty() {
            return Outcome::Skipped(SkipReason::NoUsername);
        }

        let account = NewAccount {
            profile: AccountProfile {
                login,
                email: email.clone(),
                first_name: order.buyer.first_name.clone(),
                last_name: order.buyer.last_name.clone(),
                registered_at: Utc::now(),
                role: self.platform.settings.default_role(),
            },
            password: generate_password(self.password_length),
        };
        let account = self.events.apply_args_filters(account, order);

        let account_id = match self.platform.accounts.insert(&account).await {
            Ok(id) if !id.is_unset() => id,
            Ok(_) => {
                tracing::warn!("account store returned an empty account id");
                return Outcome::Failed;
            }
            Err(e) => {
                tracing::warn!(error = %e, "account creation failed");
                return Outcome::Failed;
            }
        };

        // The password is only needed for the insert.
        let NewAccount { profile, .. } = account;

        tracing::info!(
            account_id = %account_id,
            login = %profile.login,
            "created account for guest order"
        );

        if let Err(e) = self.link_order(order, account_id).await {
            tracing::warn!(error = %e, account_id = %account_id, "failed to link order to account");
        }

        if let Err(e) = self.link_customer(&email, &profile, account_id).await {
            tracing::warn!(error = %e, account_id = %account_id, "failed to link customer to account");
        }

        if let Some(address) = order.buyer.address() {
            let stored = match serde_json::to_value(address) {
                Ok(value) => self
                    .platform
                    .accounts
                    .update_meta(account_id, keys::USER_ADDRESS, value)
                    .await
                    .map_err(HandlerError::from),
                Err(e) => Err(HandlerError::from(e)),
            };
            if let Err(e) = stored {
                tracing::warn!(error = %e, account_id = %account_id, "failed to store checkout address");
            }
        }

        self.events
            .publish(&AccountAutoCreated {
                account_id,
                profile,
                order_id: order.id,
            })
            .await;

        Outcome::Created(account_id)
    }

    /// Derive a free login from the buyer email.
    ///
    /// Tries the sanitized local part, then (unless `use_full_email` already
    /// asked for it) the sanitized full address. Returns an empty username
    /// when the candidate sanitizes to nothing, when both candidates are
    /// taken, or when the lookup fails.
    pub async fn derive_username(&self, info: &BuyerInfo, use_full_email: bool) -> Username {
        let Ok(email) = Email::parse(&info.email) else {
            return Username::default();
        };

        let attempts: &[bool] = if use_full_email {
            &[true]
        } else {
            &[false, true]
        };

        for &full in attempts {
            let candidate = if full {
                Username::sanitize(email.as_str())
            } else {
                Username::sanitize(email.local_part())
            };
            if candidate.is_empty() {
                return candidate;
            }

            match self.platform.accounts.username_exists(&candidate).await {
                Ok(false) => return candidate,
                Ok(true) => {}
                Err(e) => {
                    tracing::warn!(error = %e, "username lookup failed");
                    return Username::default();
                }
            }
        }

        Username::default()
    }

    /// Which account form the checkout renders.
    ///
    /// With guest checkout disabled, anonymous visitors get the login form and
    /// signed-in visitors get nothing. With guest checkout enabled the form is
    /// always hidden: registration happens after purchase.
    #[must_use]
    pub fn suppress_registration_ui(
        &self,
        _current: RegistrationForm,
        _key: &str,
        _default: RegistrationForm,
    ) -> RegistrationForm {
        if self.platform.settings.guest_checkout_enabled() {
            return RegistrationForm::None;
        }

        if self.platform.visitor.is_authenticated() {
            RegistrationForm::None
        } else {
            RegistrationForm::Login
        }
    }

    /// Remove the pending-verification marker the host sets on new accounts.
    ///
    /// # Errors
    ///
    /// Returns the account store's error if the delete fails.
    pub async fn clear_pending_verification(
        &self,
        account_id: AccountId,
    ) -> Result<(), PlatformError> {
        self.platform
            .accounts
            .delete_meta(account_id, keys::PENDING_VERIFICATION)
            .await
    }

    /// Write the account id to the order's user-id meta and to the buyer
    /// info embedded in its payment record.
    ///
    /// The user-id meta is written first and on its own. When the stored
    /// payment record cannot be loaded, it is rebuilt from the copy carried
    /// by the order, or from the buyer info alone.
    async fn link_order(&self, order: &Order, account_id: AccountId) -> Result<(), HandlerError> {
        let orders = &self.platform.orders;

        let user_id = orders
            .update_meta(order.id, keys::PAYMENT_USER_ID, account_id.get().into())
            .await;

        let mut payment = match orders.payment_meta(order.id).await {
            Ok(payment) => payment,
            Err(e) => {
                tracing::warn!(error = %e, "stored payment record unavailable, rebuilding from order");
                fallback_payment_meta(order)
            }
        };
        payment.user_info.id = Some(account_id);
        orders
            .update_meta(order.id, keys::PAYMENT_META, serde_json::to_value(&payment)?)
            .await?;

        user_id?;
        Ok(())
    }

    /// Point the customer record for `email` at the account, creating the
    /// record if the commerce system has none yet.
    async fn link_customer(
        &self,
        email: &Email,
        profile: &AccountProfile,
        account_id: AccountId,
    ) -> Result<(), HandlerError> {
        let customers = &self.platform.customers;

        match customers.find_by_email(email).await? {
            Some(customer) => customers.link_account(customer.id, account_id).await?,
            None => {
                customers
                    .create(&NewCustomer {
                        email: email.clone(),
                        name: profile.display_name(),
                        account_id: Some(account_id),
                    })
                    .await?;
            }
        }
        Ok(())
    }
}

/// Payment record from the order's own metadata, falling back to the buyer
/// info when the order carries none (or an undecodable one).
fn fallback_payment_meta(order: &Order) -> PaymentMeta {
    order
        .meta
        .get(keys::PAYMENT_META)
        .and_then(|raw| serde_json::from_value::<PaymentMeta>(raw.clone()).ok())
        .unwrap_or_else(|| PaymentMeta {
            user_info: order.buyer.clone(),
            extra: serde_json::Map::new(),
        })
}

impl std::fmt::Debug for AutoRegistrationHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AutoRegistrationHandler")
            .field("events", &self.events)
            .field("password_length", &self.password_length)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl OrderCreatedListener for AutoRegistrationHandler {
    async fn on_order_created(&self, order: &Order) {
        let _ = self.handle_order_created(order).await;
    }
}

#[async_trait]
impl UserSetPendingListener for AutoRegistrationHandler {
    async fn on_user_set_pending(&self, account_id: AccountId) {
        if let Err(e) = self.clear_pending_verification(account_id).await {
            tracing::warn!(error = %e, account_id = %account_id, "failed to clear pending verification");
        }
    }
}

/// Accounts are active immediately; the credential-setup email stands in for
/// verification.
impl PendingVerificationFilter for AutoRegistrationHandler {
    fn is_pending(&self, _account_id: AccountId, _current: bool) -> bool {
        false
    }
}

impl RegisterFormFilter for AutoRegistrationHandler {
    fn show_register_form(
        &self,
        current: RegistrationForm,
        key: &str,
        default: RegistrationForm,
    ) -> RegistrationForm {
        self.suppress_registration_ui(current, key, default)
    }
}
