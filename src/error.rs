//! Error types for the health companion BFF.

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

/// Message shown to users whenever the backend could not be reached.
pub const COMMUNICATION_ERROR_MESSAGE: &str =
    "A communication error occurred. Please check your connection and try again.";

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Error JSON returned by the backend: `{ error, message, details? }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiErrorBody {
    pub error: String,
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Failures surfaced to callers of the backend API.
///
/// Ordinary HTTP statuses are not errors at the pipeline level; they become
/// `ApiError` only once a typed client decides a response is unusable.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Transport-level failure (DNS, refused connection, timeout).
    #[error("Network error: {0}")]
    Network(String),

    /// Terminal 401: refresh failed or was never possible.
    #[error("Unauthorized: session is missing or expired")]
    Unauthorized,

    /// User input rejected before anything was sent.
    #[error("Validation failed for {field}: {message}")]
    Validation { field: String, message: String },

    /// Any other non-2xx response.
    #[error("API returned {status}: {error} {message}")]
    Api {
        status: StatusCode,
        error: String,
        message: String,
        details: Option<serde_json::Value>,
    },

    /// 2xx response whose body did not match the expected shape.
    #[error("Failed to decode response: {0}")]
    Decode(String),
}

impl ApiError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Build an `Api` error from a non-2xx status and its raw body.
    ///
    /// Bodies that are not the backend's error JSON fall back to the status
    /// reason phrase with an empty message.
    pub fn from_status(status: StatusCode, body: &[u8]) -> Self {
        match serde_json::from_slice::<ApiErrorBody>(body) {
            Ok(parsed) => Self::Api {
                status,
                error: parsed.error,
                message: parsed.message,
                details: parsed.details,
            },
            Err(_) => Self::Api {
                status,
                error: status
                    .canonical_reason()
                    .unwrap_or("unknown_error")
                    .to_lowercase()
                    .replace(' ', "_"),
                message: String::new(),
                details: None,
            },
        }
    }

    pub fn is_network(&self) -> bool {
        matches!(self, Self::Network(_))
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized)
    }

    /// Text suitable for showing to the user.
    ///
    /// The server's `message` is used verbatim when present; otherwise the
    /// caller-supplied fallback.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            Self::Network(_) => COMMUNICATION_ERROR_MESSAGE.to_string(),
            Self::Validation { message, .. } => message.clone(),
            Self::Api { message, .. } if !message.is_empty() => message.clone(),
            _ => fallback.to_string(),
        }
    }
}
