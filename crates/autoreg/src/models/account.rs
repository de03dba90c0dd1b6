//! Account models.

use chrono::{DateTime, Utc};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use autoreg_core::{AccountId, Email, Role, Username};

/// An account in the host's identity store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub login: Username,
    pub email: Email,
    pub first_name: String,
    pub last_name: String,
    pub display_name: String,
    pub role: Role,
    pub registered_at: DateTime<Utc>,
}

/// Account creation parameters, minus the credential.
///
/// This is what listeners of the account-created event receive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountProfile {
    pub login: Username,
    pub email: Email,
    pub first_name: String,
    pub last_name: String,
    pub registered_at: DateTime<Utc>,
    pub role: Role,
}

impl AccountProfile {
    /// "First Last", or the login when no name was given.
    #[must_use]
    pub fn display_name(&self) -> String {
        let full = format!("{} {}", self.first_name.trim(), self.last_name.trim());
        let full = full.trim();
        if full.is_empty() {
            self.login.to_string()
        } else {
            full.to_owned()
        }
    }
}

/// Everything needed to create an account.
///
/// `Debug` output redacts the password.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub profile: AccountProfile,
    pub password: SecretString,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn profile(first: &str, last: &str) -> AccountProfile {
        AccountProfile {
            login: Username::sanitize("jdoe"),
            email: Email::parse("jdoe@example.com").unwrap(),
            first_name: first.into(),
            last_name: last.into(),
            registered_at: Utc::now(),
            role: Role::default(),
        }
    }

    #[test]
    fn test_display_name() {
        assert_eq!(profile("Jane", "Doe").display_name(), "Jane Doe");
        assert_eq!(profile("Jane", "").display_name(), "Jane");
        assert_eq!(profile(" ", "").display_name(), "jdoe");
    }

    #[test]
    fn test_debug_redacts_password() {
        let account = NewAccount {
            profile: profile("Jane", "Doe"),
            password: SecretString::from("hunter2-hunter2"),
        };
        let debug = format!("{account:?}");
        assert!(!debug.contains("hunter2"));
    }
}
