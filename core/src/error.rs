//! Error type shared by every client operation.
//!
//! # Design
//! A business error (`status: "error"` inside a 2xx response) is not an
//! `ApiError`; it is an `ApiResponse::Error` value. `ApiError` covers the
//! cases where no usable envelope came back: validation failures caught
//! before sending, the 401 reset path, non-2xx statuses, transport failures
//! and malformed bodies.

use serde_json::Value;
use thiserror::Error;

/// Errors returned by the client and its services.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Input rejected before any request was sent.
    #[error("{field}: {message}")]
    Validation { field: &'static str, message: String },

    /// The backend answered 401. The session has already been wiped and the
    /// host sent back to sign-in; callers should not alert on this.
    #[error("session expired")]
    Unauthorized,

    /// The backend answered with a non-2xx status other than 401.
    #[error("HTTP {status}: {message}")]
    Http {
        status: u16,
        message: String,
        data: Option<Value>,
    },

    /// No response was received (connect failure, timeout, broken body).
    #[error("transport failure: {0}")]
    Transport(String),

    /// The response body could not be deserialized into the expected type.
    #[error("deserialization failed: {0}")]
    Deserialization(String),

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// On-device storage could not be read or written.
    #[error("storage failure: {0}")]
    Storage(String),

    /// Device registration needs a push token and none could be obtained.
    #[error("no push token available")]
    MissingPushToken,
}

impl ApiError {
    /// Human-readable message, without the variant prefix used by `Display`.
    pub fn message(&self) -> String {
        match self {
            ApiError::Validation { message, .. } => message.clone(),
            ApiError::Http { message, .. } => message.clone(),
            ApiError::Transport(msg)
            | ApiError::Deserialization(msg)
            | ApiError::Serialization(msg)
            | ApiError::Storage(msg) => msg.clone(),
            other => other.to_string(),
        }
    }

    /// HTTP status when the error came from a response.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Unauthorized => Some(401),
            ApiError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Response body of a non-2xx answer, if it was JSON.
    pub fn data(&self) -> Option<&Value> {
        match self {
            ApiError::Http { data, .. } => data.as_ref(),
            _ => None,
        }
    }

    /// Whether repeating the same request could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            ApiError::Transport(_) => true,
            ApiError::Http { status, .. } => *status >= 500 || *status == 408 || *status == 429,
            ApiError::Deserialization(_) => true,
            _ => false,
        }
    }

    pub(crate) fn validation(field: &'static str, message: impl Into<String>) -> Self {
        ApiError::Validation {
            field,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_error_exposes_status_message_and_data() {
        let err = ApiError::Http {
            status: 409,
            message: "Email already registered".to_string(),
            data: Some(serde_json::json!({"status": "error"})),
        };
        assert_eq!(err.status(), Some(409));
        assert_eq!(err.message(), "Email already registered");
        assert_eq!(err.data().unwrap()["status"], "error");
        assert_eq!(err.to_string(), "HTTP 409: Email already registered");
    }

    #[test]
    fn unauthorized_reports_401() {
        assert_eq!(ApiError::Unauthorized.status(), Some(401));
        assert!(!ApiError::Unauthorized.is_retryable());
    }

    #[test]
    fn only_transient_failures_are_retryable() {
        assert!(ApiError::Transport("timed out".into()).is_retryable());
        assert!(ApiError::Http { status: 503, message: String::new(), data: None }.is_retryable());
        assert!(!ApiError::Http { status: 404, message: String::new(), data: None }.is_retryable());
        assert!(!ApiError::validation("email", "invalid").is_retryable());
        assert!(!ApiError::MissingPushToken.is_retryable());
    }

    #[test]
    fn validation_display_names_the_field() {
        let err = ApiError::validation("password", "must be at least 6 characters");
        assert_eq!(err.to_string(), "password: must be at least 6 characters");
        assert_eq!(err.message(), "must be at least 6 characters");
    }
}
