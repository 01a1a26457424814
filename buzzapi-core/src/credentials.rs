//! Application credentials with automatic memory zeroization.
//!
//! The service authenticates every submission with an application id and a
//! base64-encoded application password carried in the request body. The
//! password is held in a [`SecretString`], which wipes its memory on drop and
//! never prints its contents.
//!
//! ```rust
//! use buzzapi_core::credentials::Credentials;
//!
//! let creds = Credentials::new("svc-directory", "hunter2");
//! assert_eq!(creds.encoded_password().expose_secret(), "aHVudGVyMg==");
//! assert!(!format!("{creds:?}").contains("hunter2"));
//! ```

use base64::{Engine as _, engine::general_purpose};
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::REDACTED;

/// A string that is zeroed when dropped and redacted when formatted.
#[derive(Clone, Zeroize, ZeroizeOnDrop, PartialEq, Eq)]
pub struct SecretString(String);

impl SecretString {
    /// Creates a new secret string.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the secret value.
    ///
    /// Use the reference immediately; don't persist it.
    #[inline]
    pub fn expose_secret(&self) -> &str {
        &self.0
    }

    /// Returns the length of the secret string.
    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the secret string is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(REDACTED)
    }
}

impl fmt::Display for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(REDACTED)
    }
}

impl From<String> for SecretString {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for SecretString {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Application id plus password.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    app_id: String,
    password: SecretString,
}

impl Credentials {
    /// Creates credentials from a plain-text password.
    pub fn new(app_id: impl Into<String>, password: impl Into<SecretString>) -> Self {
        Self {
            app_id: app_id.into(),
            password: password.into(),
        }
    }

    /// The application id sent as `api_app_id`.
    pub fn app_id(&self) -> &str {
        &self.app_id
    }

    /// The plain-text password.
    pub fn password(&self) -> &SecretString {
        &self.password
    }

    /// Standard base64 of the password, sent as `api_app_password`.
    pub fn encoded_password(&self) -> SecretString {
        SecretString::new(general_purpose::STANDARD.encode(self.password.expose_secret()))
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("app_id", &self.app_id)
            .field("password", &self.password)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secret_string_redacted() {
        let secret = SecretString::new("my-password");
        assert_eq!(format!("{secret:?}"), REDACTED);
        assert_eq!(format!("{secret}"), REDACTED);
        assert_eq!(secret.expose_secret(), "my-password");
    }

    #[test]
    fn test_secret_string_len() {
        let secret = SecretString::new("12345");
        assert_eq!(secret.len(), 5);
        assert!(!secret.is_empty());
        assert!(SecretString::new("").is_empty());
    }

    #[test]
    fn test_encoded_password_is_standard_base64() {
        let creds = Credentials::new("svc", "p@ss/word?");
        assert_eq!(creds.encoded_password().expose_secret(), "cEBzcy93b3JkPw==");
    }

    #[test]
    fn test_empty_password_encodes_to_empty() {
        let creds = Credentials::new("", "");
        assert_eq!(creds.encoded_password().expose_secret(), "");
    }

    #[test]
    fn test_credentials_debug_hides_password() {
        let creds = Credentials::new("svc-directory", "hunter2");
        let debug = format!("{creds:?}");
        assert!(debug.contains("svc-directory"));
        assert!(!debug.contains("hunter2"));
    }
}
