use serde::Deserialize;
use thiserror::Error;

/// Errors returned by the Mackerel API client.
///
/// Callers pattern-match on the variant. [`ApiError::is_client_error`] and
/// [`ApiError::is_server_error`] classify HTTP failures; the client itself
/// never retries.
#[derive(Debug, Error)]
pub enum ApiError {
    /// API returned a non-success status
    #[error("API error. status: {status}, msg: {message}")]
    Http { status: u16, message: String },

    /// HTTP request failed before a response was received
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Response body did not match the expected shape
    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    /// Expected empty result, not a failure
    #[error("{message}")]
    Info { message: String },

    /// Client could not be built from its configuration
    #[error("configuration error: {message}")]
    Config { message: String },
}

impl ApiError {
    pub(crate) fn info(message: impl Into<String>) -> Self {
        Self::Info {
            message: message.into(),
        }
    }

    pub(crate) fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Build an [`ApiError::Http`] from a failed response.
    #[must_use]
    pub fn from_response(status: u16, body: &[u8]) -> Self {
        Self::Http {
            status,
            message: error_message(body),
        }
    }

    /// HTTP status carried by the error, if any.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// True for HTTP 4xx responses.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(self.status(), Some(400..=499))
    }

    /// True for HTTP 5xx responses. These may be transient.
    #[must_use]
    pub const fn is_server_error(&self) -> bool {
        matches!(self.status(), Some(500..=599))
    }

    /// True for the non-fatal "nothing found" kind.
    #[must_use]
    pub const fn is_info(&self) -> bool {
        matches!(self, Self::Info { .. })
    }
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ErrorBody {
    Detailed { message: String },
    Plain(String),
}

/// Mackerel reports failures as `{"error":{"message":..}}` or
/// `{"error":".."}`. Anything else is returned as text.
fn error_message(body: &[u8]) -> String {
    match serde_json::from_slice::<ErrorEnvelope>(body) {
        Ok(ErrorEnvelope {
            error: ErrorBody::Detailed { message } | ErrorBody::Plain(message),
        }) => message,
        Err(_) => String::from_utf8_lossy(body).trim().to_string(),
    }
}
