//! Test delivery of the credential-setup email.
//!
//! # Usage
//!
//! ```bash
//! autoreg send-test-email --to jane@example.com --login jane
//! ```
//!
//! # Environment Variables
//!
//! Requires the full email section (`AUTOREG_SMTP_*`, `AUTOREG_FROM_ADDRESS`)
//! in addition to `AUTOREG_SETUP_URL`.

use std::sync::Arc;

use autoreg::mailer::{SmtpCredentialMailer, SmtpError};
use autoreg::memory::MemoryAccounts;
use autoreg::notify::NotifyError;
use autoreg::{AutoRegisterConfig, ConfigError, CredentialSetupNotifier};
use autoreg_core::{Email, EmailError};
use thiserror::Error;

/// Errors that can occur while sending a test email.
#[derive(Debug, Error)]
pub enum EmailCommandError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Email is not configured: set AUTOREG_SMTP_HOST")]
    NotConfigured,

    #[error("Invalid recipient: {0}")]
    InvalidRecipient(#[from] EmailError),

    #[error("SMTP setup failed: {0}")]
    Smtp(#[from] SmtpError),

    #[error(transparent)]
    Notify(#[from] NotifyError),
}

/// Send a credential-setup email for a throwaway account.
///
/// The account only exists in memory, so the link in the message does not
/// work on the real site.
///
/// # Errors
///
/// Returns `EmailCommandError` if configuration, addressing or delivery fails.
pub async fn send_test(to: &str, login: &str) -> Result<(), EmailCommandError> {
    let config = AutoRegisterConfig::from_env()?;
    let email_config = config.email.ok_or(EmailCommandError::NotConfigured)?;
    let to = Email::parse(to)?;

    let accounts = Arc::new(MemoryAccounts::default());
    let account_id = accounts.seed(login, to.as_str());

    let mailer = SmtpCredentialMailer::new(&email_config, config.site, accounts.clone())?;

    let Some(account) = accounts.get(account_id) else {
        return Ok(());
    };
    tracing::info!(to = %to, login = %account.login, "sending test credential setup email");
    mailer.notify_new_user(&account).await?;
    Ok(())
}
