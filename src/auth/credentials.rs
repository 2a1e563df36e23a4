//! Sign-in credentials.

use std::sync::LazyLock;

use regex::Regex;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::error::ApiError;

pub const MIN_PASSWORD_LENGTH: usize = 8;

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email pattern is valid")
});

#[derive(Debug, Clone, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: SecretString,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: SecretString::from(password.into()),
        }
    }

    pub fn validate(&self) -> Result<(), ApiError> {
        let email = self.email.trim();
        if email.is_empty() {
            return Err(ApiError::validation("email", "Email is required"));
        }
        if !EMAIL_RE.is_match(email) {
            return Err(ApiError::validation("email", "Enter a valid email address"));
        }
        if self.password.expose_secret().chars().count() < MIN_PASSWORD_LENGTH {
            return Err(ApiError::validation(
                "password",
                format!("Password must be at least {MIN_PASSWORD_LENGTH} characters"),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field_of(err: ApiError) -> String {
        match err {
            ApiError::Validation { field, .. } => field,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn accepts_well_formed_credentials() {
        assert!(Credentials::new("user@example.com", "correct-horse").validate().is_ok());
    }

    #[test]
    fn rejects_missing_or_malformed_email() {
        assert_eq!(field_of(Credentials::new("", "longenough").validate().unwrap_err()), "email");
        assert_eq!(
            field_of(Credentials::new("not-an-email", "longenough").validate().unwrap_err()),
            "email"
        );
    }

    #[test]
    fn rejects_short_password() {
        assert_eq!(
            field_of(Credentials::new("user@example.com", "short").validate().unwrap_err()),
            "password"
        );
    }

    #[test]
    fn deserializes_from_form_json() {
        let creds: Credentials =
            serde_json::from_str(r#"{"email":"a@b.co","password":"password123"}"#).unwrap();
        assert_eq!(creds.email, "a@b.co");
        assert_eq!(creds.password.expose_secret(), "password123");
    }
}
