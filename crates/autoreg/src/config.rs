//! Auto-registration configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `AUTOREG_SETUP_URL` - Absolute URL of the page where new account holders
//!   choose their password
//!
//! ## Optional
//! - `AUTOREG_SITE_NAME` - Site name used in email subjects (default: Store)
//! - `AUTOREG_PASSWORD_LENGTH` - Generated password length (default: 32, 12-128)
//!
//! ## Email (enabled when `AUTOREG_SMTP_HOST` is set)
//! - `AUTOREG_SMTP_HOST` - SMTP relay hostname
//! - `AUTOREG_SMTP_PORT` - SMTP port (default: 587)
//! - `AUTOREG_SMTP_USERNAME` - SMTP username
//! - `AUTOREG_SMTP_PASSWORD` - SMTP password
//! - `AUTOREG_FROM_ADDRESS` - Sender address (From header)

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use url::Url;

use crate::password::{DEFAULT_PASSWORD_LENGTH, MAX_PASSWORD_LENGTH, MIN_PASSWORD_LENGTH};

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "xxx",
    "todo",
    "put-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Auto-registration configuration.
#[derive(Debug, Clone)]
pub struct AutoRegisterConfig {
    /// Length of generated account passwords
    pub password_length: usize,
    /// Site identity used in notifications
    pub site: SiteConfig,
    /// SMTP delivery for credential-setup email (optional)
    pub email: Option<EmailConfig>,
}

/// Site identity.
#[derive(Debug, Clone)]
pub struct SiteConfig {
    /// Human-readable site name
    pub name: String,
    /// Set-password page; setup links append their query to it
    pub setup_url: Url,
}

/// SMTP configuration.
///
/// Implements `Debug` manually to redact the password.
#[derive(Clone)]
pub struct EmailConfig {
    /// SMTP server hostname
    pub smtp_host: String,
    /// SMTP server port
    pub smtp_port: u16,
    /// SMTP authentication username
    pub smtp_username: String,
    /// SMTP authentication password
    pub smtp_password: SecretString,
    /// Email sender address (From header)
    pub from_address: String,
}

impl std::fmt::Debug for EmailConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailConfig")
            .field("smtp_host", &self.smtp_host)
            .field("smtp_port", &self.smtp_port)
            .field("smtp_username", &self.smtp_username)
            .field("smtp_password", &"[REDACTED]")
            .field("from_address", &self.from_address)
            .finish()
    }
}

impl AutoRegisterConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let env = Env(&lookup);

        let password_length = env
            .get_or_default("AUTOREG_PASSWORD_LENGTH", &DEFAULT_PASSWORD_LENGTH.to_string())
            .parse::<usize>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("AUTOREG_PASSWORD_LENGTH".to_string(), e.to_string())
            })?;
        if !(MIN_PASSWORD_LENGTH..=MAX_PASSWORD_LENGTH).contains(&password_length) {
            return Err(ConfigError::InvalidEnvVar(
                "AUTOREG_PASSWORD_LENGTH".to_string(),
                format!("must be between {MIN_PASSWORD_LENGTH} and {MAX_PASSWORD_LENGTH}"),
            ));
        }

        let site = SiteConfig::from_env(&env)?;
        let email = EmailConfig::from_env(&env)?;

        Ok(Self {
            password_length,
            site,
            email,
        })
    }
}

impl SiteConfig {
    fn from_env(env: &Env<'_>) -> Result<Self, ConfigError> {
        let raw = env.get_required("AUTOREG_SETUP_URL")?;
        let setup_url = Url::parse(&raw).map_err(|e| {
            ConfigError::InvalidEnvVar("AUTOREG_SETUP_URL".to_string(), e.to_string())
        })?;
        if !matches!(setup_url.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidEnvVar(
                "AUTOREG_SETUP_URL".to_string(),
                "must be an http(s) URL".to_string(),
            ));
        }

        Ok(Self {
            name: env.get_or_default("AUTOREG_SITE_NAME", "Store"),
            setup_url,
        })
    }
}

impl EmailConfig {
    fn from_env(env: &Env<'_>) -> Result<Option<Self>, ConfigError> {
        let Some(smtp_host) = env.get_optional("AUTOREG_SMTP_HOST") else {
            return Ok(None);
        };

        let smtp_port = env
            .get_or_default("AUTOREG_SMTP_PORT", "587")
            .parse::<u16>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("AUTOREG_SMTP_PORT".to_string(), e.to_string())
            })?;

        let smtp_password = SecretString::from(env.get_required("AUTOREG_SMTP_PASSWORD")?);
        validate_not_placeholder(&smtp_password, "AUTOREG_SMTP_PASSWORD")?;

        Ok(Some(Self {
            smtp_host,
            smtp_port,
            smtp_username: env.get_required("AUTOREG_SMTP_USERNAME")?,
            smtp_password,
            from_address: env.get_required("AUTOREG_FROM_ADDRESS")?,
        }))
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Variable lookup; empty values count as unset.
struct Env<'a>(&'a dyn Fn(&str) -> Option<String>);

impl Env<'_> {
    fn get_optional(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|value| !value.trim().is_empty())
    }

    fn get_required(&self, key: &str) -> Result<String, ConfigError> {
        self.get_optional(key)
            .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
    }

    fn get_or_default(&self, key: &str, default: &str) -> String {
        self.get_optional(key)
            .unwrap_or_else(|| default.to_string())
    }
}

/// Reject secrets that were obviously copied from a sample `.env`.
fn validate_not_placeholder(secret: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.expose_secret().to_lowercase();
    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<AutoRegisterConfig, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        AutoRegisterConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[("AUTOREG_SETUP_URL", "https://shop.test/account/password")]).unwrap();
        assert_eq!(config.password_length, 32);
        assert_eq!(config.site.name, "Store");
        assert!(config.email.is_none());
    }

    #[test]
    fn test_missing_setup_url() {
        assert!(matches!(
            load(&[]),
            Err(ConfigError::MissingEnvVar(key)) if key == "AUTOREG_SETUP_URL"
        ));
    }

    #[test]
    fn test_setup_url_must_be_http() {
        assert!(matches!(
            load(&[("AUTOREG_SETUP_URL", "ftp://shop.test/")]),
            Err(ConfigError::InvalidEnvVar(..))
        ));
    }

    #[test]
    fn test_password_length_bounds() {
        let url = ("AUTOREG_SETUP_URL", "https://shop.test/p");
        assert!(load(&[url, ("AUTOREG_PASSWORD_LENGTH", "8")]).is_err());
        assert!(load(&[url, ("AUTOREG_PASSWORD_LENGTH", "abc")]).is_err());
        assert_eq!(
            load(&[url, ("AUTOREG_PASSWORD_LENGTH", "48")])
                .unwrap()
                .password_length,
            48
        );
    }

    #[test]
    fn test_email_section() {
        let config = load(&[
            ("AUTOREG_SETUP_URL", "https://shop.test/p"),
            ("AUTOREG_SMTP_HOST", "smtp.shop.test"),
            ("AUTOREG_SMTP_USERNAME", "mailer"),
            ("AUTOREG_SMTP_PASSWORD", "k9#Qz!v2Lp"),
            ("AUTOREG_FROM_ADDRESS", "Shop <noreply@shop.test>"),
        ])
        .unwrap();

        let email = config.email.unwrap();
        assert_eq!(email.smtp_port, 587);
        assert!(!format!("{email:?}").contains("k9#Qz"));
    }

    #[test]
    fn test_email_section_requires_credentials() {
        assert!(matches!(
            load(&[
                ("AUTOREG_SETUP_URL", "https://shop.test/p"),
                ("AUTOREG_SMTP_HOST", "smtp.shop.test"),
            ]),
            Err(ConfigError::MissingEnvVar(_))
        ));
    }

    #[test]
    fn test_placeholder_password_rejected() {
        assert!(matches!(
            load(&[
                ("AUTOREG_SETUP_URL", "https://shop.test/p"),
                ("AUTOREG_SMTP_HOST", "smtp.shop.test"),
                ("AUTOREG_SMTP_USERNAME", "mailer"),
                ("AUTOREG_SMTP_PASSWORD", "changeme"),
                ("AUTOREG_FROM_ADDRESS", "noreply@shop.test"),
            ]),
            Err(ConfigError::InsecureSecret(..))
        ));
    }
}
