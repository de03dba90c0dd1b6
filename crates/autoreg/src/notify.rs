//! Welcome notification for automatically created accounts.
//!
//! The generated password is discarded, so the credential-setup message is
//! the only way a buyer gets into their new account.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use autoreg_core::{AccountId, OrderId};

use crate::events::{AccountAutoCreated, AccountCreatedListener};
use crate::mailer::MailerError;
use crate::models::{Account, AccountProfile};
use crate::platform::{AccountStore, PlatformError};

/// Errors that can occur while notifying a new account holder.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("platform error: {0}")]
    Platform(#[from] PlatformError),

    #[error("delivery error: {0}")]
    Mailer(#[from] MailerError),
}

/// The host's "new user" notification: tells the account holder how to set
/// a password.
#[async_trait]
pub trait CredentialSetupNotifier: Send + Sync {
    async fn notify_new_user(&self, account: &Account) -> Result<(), NotifyError>;
}

/// Sends the credential-setup message when an account was auto-created.
pub struct WelcomeNotifier {
    accounts: Arc<dyn AccountStore>,
    notifier: Arc<dyn CredentialSetupNotifier>,
}

impl WelcomeNotifier {
    #[must_use]
    pub fn new(
        accounts: Arc<dyn AccountStore>,
        notifier: Arc<dyn CredentialSetupNotifier>,
    ) -> Self {
        Self { accounts, notifier }
    }

    /// Notify the holder of `account_id`.
    ///
    /// Returns `Ok(false)` without sending when the id does not resolve to an
    /// account.
    ///
    /// # Errors
    ///
    /// Returns `NotifyError` if the account lookup or the delivery fails.
    #[tracing::instrument(skip(self, profile), fields(login = %profile.login))]
    pub async fn send_welcome_notification(
        &self,
        account_id: AccountId,
        profile: &AccountProfile,
        order_id: OrderId,
    ) -> Result<bool, NotifyError> {
        let Some(account) = self.accounts.find_by_id(account_id).await? else {
            return Ok(false);
        };

        self.notifier.notify_new_user(&account).await?;
        tracing::info!("credential setup notification sent");
        Ok(true)
    }
}

#[async_trait]
impl AccountCreatedListener for WelcomeNotifier {
    async fn on_account_created(&self, event: &AccountAutoCreated) {
        if let Err(e) = self
            .send_welcome_notification(event.account_id, &event.profile, event.order_id)
            .await
        {
            tracing::warn!(
                error = %e,
                account_id = %event.account_id,
                "failed to send credential setup notification"
            );
        }
    }
}

impl std::fmt::Debug for WelcomeNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WelcomeNotifier").finish_non_exhaustive()
    }
}
