//! Failures of a back-end call.

use thiserror::Error;

use crate::domain::validation::ValidationError;

/// Why a request produced no usable value.
///
/// `Clone` because one failed fetch is published to every observer of the
/// cache entry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// The request never reached the server, or no response came back
    /// (connection refused, DNS failure, timeout).
    #[error("network error: {0}")]
    Network(String),

    /// The server answered with a non-2xx status.
    #[error("server returned {status}: {message}")]
    Server { status: u16, message: String },

    /// The client refused to send the request.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A 2xx body did not have the expected shape.
    #[error("unexpected response body: {0}")]
    Decode(String),
}

impl ApiError {
    /// Builds a [`ApiError::Server`] from a status and raw body.
    ///
    /// FastAPI reports failures as `{"detail": ...}`; when the body has that
    /// shape the detail becomes the message (strings verbatim, structured
    /// details as compact JSON).  Anything else is kept as the raw body.
    pub fn from_response(status: u16, body: &str) -> Self {
        let message = serde_json::from_str::<serde_json::Value>(body)
            .ok()
            .and_then(|v| v.get("detail").cloned())
            .map(|detail| match detail {
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            })
            .unwrap_or_else(|| body.to_string());
        ApiError::Server { status, message }
    }

    /// `true` for failures worth retrying: network errors and 5xx responses.
    pub fn is_retryable(&self) -> bool {
        match self {
            ApiError::Network(_) => true,
            ApiError::Server { status, .. } => *status >= 500,
            ApiError::Validation(_) | ApiError::Decode(_) => false,
        }
    }

    /// HTTP status, when the server answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Server { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::Decode(err.to_string())
    }
}
