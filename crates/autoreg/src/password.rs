//! Random credential generation.
//!
//! Passwords for automatically created accounts are never shown to anyone:
//! the buyer sets their own through the credential-setup email. They only
//! need to be long and unguessable.

use rand::Rng;
use secrecy::SecretString;

/// Length used for automatically created accounts.
pub const DEFAULT_PASSWORD_LENGTH: usize = 32;
/// Shortest accepted password length.
pub const MIN_PASSWORD_LENGTH: usize = 12;
/// Longest accepted password length.
pub const MAX_PASSWORD_LENGTH: usize = 128;

const ALPHANUMERIC: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const SPECIAL: &[u8] = b"!@#$%^&*()";

/// Generate a password of `len` characters from letters, digits and
/// `!@#$%^&*()`.
#[must_use]
pub fn generate_password(len: usize) -> SecretString {
    SecretString::from(sample(len, &[ALPHANUMERIC, SPECIAL]))
}

/// Generate an alphanumeric key of `len` characters, safe to put in a URL.
#[must_use]
pub fn generate_key(len: usize) -> SecretString {
    SecretString::from(sample(len, &[ALPHANUMERIC]))
}

fn sample(len: usize, sets: &[&[u8]]) -> String {
    let alphabet: Vec<u8> = sets.concat();
    let mut rng = rand::rng();
    (0..len)
        .filter_map(|_| alphabet.get(rng.random_range(0..alphabet.len())))
        .map(|&b| char::from(b))
        .collect()
}

#[cfg(test)]
mod tests {
    use secrecy::ExposeSecret;

    use super::*;

    #[test]
    fn test_password_length_and_alphabet() {
        let password = generate_password(DEFAULT_PASSWORD_LENGTH);
        let value = password.expose_secret();
        assert_eq!(value.len(), 32);
        assert!(
            value
                .bytes()
                .all(|b| ALPHANUMERIC.contains(&b) || SPECIAL.contains(&b))
        );
    }

    #[test]
    fn test_passwords_differ() {
        let a = generate_password(32);
        let b = generate_password(32);
        assert_ne!(a.expose_secret(), b.expose_secret());
    }

    #[test]
    fn test_key_is_alphanumeric() {
        let key = generate_key(20);
        assert_eq!(key.expose_secret().len(), 20);
        assert!(key.expose_secret().chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_zero_length() {
        assert!(generate_password(0).expose_secret().is_empty());
    }
}
