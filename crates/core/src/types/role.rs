//! Account roles and checkout form selection.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Role assigned to a newly created account.
///
/// Roles are defined by the host platform, so this is an open string rather
/// than an enum. The platform's configured default is used for automatically
/// created accounts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct Role(String);

impl Role {
    /// Role the host assigns when nothing else is configured.
    pub const DEFAULT: &'static str = "subscriber";

    /// Create a role from its name. Blank names fall back to [`Role::DEFAULT`].
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        if name.trim().is_empty() {
            Self::default()
        } else {
            Self(name.trim().to_owned())
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Role {
    fn default() -> Self {
        Self(Self::DEFAULT.to_owned())
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Which account form the checkout page renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationForm {
    /// No login or registration form.
    #[default]
    None,
    /// Login form only.
    Login,
    /// Registration form only.
    Registration,
    /// Both login and registration forms.
    Both,
}

impl fmt::Display for RegistrationForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::Login => write!(f, "login"),
            Self::Registration => write!(f, "registration"),
            Self::Both => write!(f, "both"),
        }
    }
}

impl std::str::FromStr for RegistrationForm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(Self::None),
            "login" => Ok(Self::Login),
            "registration" => Ok(Self::Registration),
            "both" => Ok(Self::Both),
            _ => Err(format!("invalid registration form: {s}")),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_role_falls_back() {
        assert_eq!(Role::new("  ").as_str(), "subscriber");
        assert_eq!(Role::new(" customer ").as_str(), "customer");
    }

    #[test]
    fn test_registration_form_parse_display() {
        for form in [
            RegistrationForm::None,
            RegistrationForm::Login,
            RegistrationForm::Registration,
            RegistrationForm::Both,
        ] {
            assert_eq!(form.to_string().parse::<RegistrationForm>().unwrap(), form);
        }
        assert!("sometimes".parse::<RegistrationForm>().is_err());
    }

    #[test]
    fn test_registration_form_serde() {
        let json = serde_json::to_string(&RegistrationForm::Login).unwrap();
        assert_eq!(json, "\"login\"");
    }
}
