//! SMTP delivery of the credential-setup email.
//!
//! Uses SMTP via lettre for delivery with Askama templates (plain text and
//! HTML alternatives).

use std::sync::Arc;

use askama::Template;
use async_trait::async_trait;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{MultiPart, SinglePart, header::ContentType},
    transport::smtp::authentication::Credentials,
};
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use url::Url;

use autoreg_core::Username;

use crate::config::{EmailConfig, SiteConfig};
use crate::models::Account;
use crate::notify::{CredentialSetupNotifier, NotifyError};
use crate::platform::AccountStore;

pub use lettre::transport::smtp::Error as SmtpError;

/// HTML template for the credential-setup email.
#[derive(Template)]
#[template(path = "email/credential_setup.html")]
struct CredentialSetupHtml<'a> {
    site_name: &'a str,
    login: &'a str,
    link: &'a str,
}

/// Plain text template for the credential-setup email.
#[derive(Template)]
#[template(path = "email/credential_setup.txt")]
struct CredentialSetupText<'a> {
    site_name: &'a str,
    login: &'a str,
    link: &'a str,
}

/// Errors that can occur when sending email.
#[derive(Debug, Error)]
pub enum MailerError {
    /// SMTP transport error.
    #[error("SMTP error: {0}")]
    Smtp(#[from] SmtpError),

    /// Failed to build email message.
    #[error("Failed to build message: {0}")]
    MessageBuild(#[from] lettre::error::Error),

    /// Invalid email address.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    /// Template rendering error.
    #[error("Template error: {0}")]
    Template(#[from] askama::Error),
}

/// Credential-setup notifier that mails a set-password link.
#[derive(Clone)]
pub struct SmtpCredentialMailer {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from_address: String,
    site: SiteConfig,
    accounts: Arc<dyn AccountStore>,
}

impl SmtpCredentialMailer {
    /// Create a mailer from configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the SMTP relay cannot be configured.
    pub fn new(
        config: &EmailConfig,
        site: SiteConfig,
        accounts: Arc<dyn AccountStore>,
    ) -> Result<Self, SmtpError> {
        let credentials = Credentials::new(
            config.smtp_username.clone(),
            config.smtp_password.expose_secret().to_string(),
        );

        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
            .port(config.smtp_port)
            .credentials(credentials)
            .build();

        Ok(Self {
            mailer,
            from_address: config.from_address.clone(),
            site,
            accounts,
        })
    }

    /// Send the credential-setup email with an already issued key.
    ///
    /// # Errors
    ///
    /// Returns error if the message cannot be built or delivered.
    pub async fn send_credential_setup(
        &self,
        account: &Account,
        key: &SecretString,
    ) -> Result<(), MailerError> {
        let link = setup_link(&self.site.setup_url, key, &account.login);
        let message = compose_credential_setup(
            &self.from_address,
            account.email.as_str(),
            &self.site.name,
            &account.login,
            &link,
        )?;

        self.mailer.send(message).await?;

        tracing::info!(account_id = %account.id, "credential setup email sent");
        Ok(())
    }
}

#[async_trait]
impl CredentialSetupNotifier for SmtpCredentialMailer {
    async fn notify_new_user(&self, account: &Account) -> Result<(), NotifyError> {
        let key = self.accounts.issue_password_setup_key(account.id).await?;
        self.send_credential_setup(account, &key).await?;
        Ok(())
    }
}

impl std::fmt::Debug for SmtpCredentialMailer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpCredentialMailer")
            .field("from_address", &self.from_address)
            .field("site", &self.site)
            .finish_non_exhaustive()
    }
}

/// Build the set-password link for `login`.
#[must_use]
pub fn setup_link(base: &Url, key: &SecretString, login: &Username) -> Url {
    let mut url = base.clone();
    url.query_pairs_mut()
        .append_pair("action", "rp")
        .append_pair("key", key.expose_secret())
        .append_pair("login", login.as_str());
    url
}

/// Render the credential-setup email as a multipart message.
///
/// # Errors
///
/// Returns error if an address does not parse or a template fails to render.
pub fn compose_credential_setup(
    from: &str,
    to: &str,
    site_name: &str,
    login: &Username,
    link: &Url,
) -> Result<Message, MailerError> {
    let html = CredentialSetupHtml {
        site_name,
        login: login.as_str(),
        link: link.as_str(),
    }
    .render()?;
    let text = CredentialSetupText {
        site_name,
        login: login.as_str(),
        link: link.as_str(),
    }
    .render()?;

    let message = Message::builder()
        .from(
            from.parse()
                .map_err(|_| MailerError::InvalidAddress(from.to_string()))?,
        )
        .to(to
            .parse()
            .map_err(|_| MailerError::InvalidAddress(to.to_string()))?)
        .subject(format!("[{site_name}] Set up your account"))
        .multipart(
            MultiPart::alternative()
                .singlepart(
                    SinglePart::builder()
                        .header(ContentType::TEXT_PLAIN)
                        .body(text),
                )
                .singlepart(
                    SinglePart::builder()
                        .header(ContentType::TEXT_HTML)
                        .body(html),
                ),
        )?;

    Ok(message)
}
