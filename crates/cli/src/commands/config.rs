//! Configuration check.
//!
//! # Usage
//!
//! ```bash
//! autoreg check-config
//! ```
//!
//! Loads the configuration the same way a host would (environment plus
//! `.env`) and logs it with secrets redacted.

use autoreg::{AutoRegisterConfig, ConfigError};

/// Load and log the configuration.
///
/// # Errors
///
/// Returns `ConfigError` if a variable is missing or invalid.
pub fn check() -> Result<AutoRegisterConfig, ConfigError> {
    let config = AutoRegisterConfig::from_env()?;

    tracing::info!(
        site_name = %config.site.name,
        setup_url = %config.site.setup_url,
        password_length = config.password_length,
        "configuration loaded"
    );
    match &config.email {
        Some(email) => tracing::info!(?email, "credential setup email enabled"),
        None => tracing::warn!(
            "AUTOREG_SMTP_HOST not set, new accounts will not receive a setup email"
        ),
    }

    Ok(config)
}
