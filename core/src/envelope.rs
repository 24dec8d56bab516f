//! The `{status, message, data}` envelope every backend call answers with.
//!
//! # Design
//! On the wire the envelope is a flat object. In Rust it is a tagged enum so
//! the payload type only has to deserialize when the backend says `success`;
//! error envelopes keep whatever `data` they carried as raw JSON.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ApiError;

/// Fallback text for error envelopes that arrive without a message.
pub const DEFAULT_ERROR_MESSAGE: &str = "Request failed";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    Success,
    Error,
}

/// A normalized backend answer. Callers branch on it; an `Error` variant is a
/// value, not a failure of the call.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiResponse<T> {
    Success { message: String, data: T },
    Error { message: String, data: Value },
}

#[derive(Debug, Deserialize)]
struct RawEnvelope {
    status: ResponseStatus,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    data: Value,
}

#[derive(Serialize)]
struct WireEnvelope<'a, T: Serialize> {
    status: ResponseStatus,
    message: &'a str,
    data: &'a T,
}

impl<T> ApiResponse<T> {
    pub fn status(&self) -> ResponseStatus {
        match self {
            ApiResponse::Success { .. } => ResponseStatus::Success,
            ApiResponse::Error { .. } => ResponseStatus::Error,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ApiResponse::Success { .. })
    }

    pub fn message(&self) -> &str {
        match self {
            ApiResponse::Success { message, .. } | ApiResponse::Error { message, .. } => message,
        }
    }

    pub fn data(&self) -> Option<&T> {
        match self {
            ApiResponse::Success { data, .. } => Some(data),
            ApiResponse::Error { .. } => None,
        }
    }

    pub fn into_data(self) -> Option<T> {
        match self {
            ApiResponse::Success { data, .. } => Some(data),
            ApiResponse::Error { .. } => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ApiResponse<U> {
        match self {
            ApiResponse::Success { message, data } => ApiResponse::Success {
                message,
                data: f(data),
            },
            ApiResponse::Error { message, data } => ApiResponse::Error { message, data },
        }
    }
}

impl<T: DeserializeOwned> ApiResponse<T> {
    /// Parse an envelope from a response body.
    pub fn from_json(body: &str) -> Result<Self, ApiError> {
        let raw: RawEnvelope =
            serde_json::from_str(body).map_err(|e| ApiError::Deserialization(e.to_string()))?;
        let message = raw.message.unwrap_or_default();

        match raw.status {
            ResponseStatus::Success => {
                let data = serde_json::from_value(raw.data)
                    .map_err(|e| ApiError::Deserialization(e.to_string()))?;
                Ok(ApiResponse::Success { message, data })
            }
            ResponseStatus::Error => {
                let message = if message.trim().is_empty() {
                    DEFAULT_ERROR_MESSAGE.to_string()
                } else {
                    message
                };
                Ok(ApiResponse::Error {
                    message,
                    data: raw.data,
                })
            }
        }
    }
}

impl<T: Serialize> ApiResponse<T> {
    /// Render back to the flat wire shape.
    pub fn to_json(&self) -> Result<String, ApiError> {
        let result = match self {
            ApiResponse::Success { message, data } => serde_json::to_string(&WireEnvelope {
                status: ResponseStatus::Success,
                message,
                data,
            }),
            ApiResponse::Error { message, data } => serde_json::to_string(&WireEnvelope {
                status: ResponseStatus::Error,
                message,
                data,
            }),
        };
        result.map_err(|e| ApiError::Serialization(e.to_string()))
    }
}

/// Best-effort extraction of a server-supplied `message` from an error body.
pub(crate) fn server_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    value
        .get("message")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(str::to_string)
}
