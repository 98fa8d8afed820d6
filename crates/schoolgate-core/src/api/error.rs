use serde::Deserialize;
use thiserror::Error;

/// Transport-level failures and non-success responses from the API.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    #[error("Unable to reach the server. Check your connection and try again.")]
    Network(String),

    #[error("The server took too long to respond. Please try again.")]
    Timeout,

    #[error("{message}")]
    Rejected { status: u16, message: String },

    #[error("Unexpected response from server: {0}")]
    InvalidResponse(String),

    #[error("Could not encode request: {0}")]
    Encode(String),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

/// `{ "error": "..." }`, the API's error body convention.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    pub(crate) fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            let mut end = MAX_ERROR_BODY_LENGTH;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
        }
    }

    /// The `error` field of a JSON error body, if there is one.
    pub fn server_message(body: &str) -> Option<String> {
        serde_json::from_str::<ErrorBody>(body)
            .ok()
            .and_then(|b| b.error)
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty())
    }

    /// Build an error for a non-success response, preferring the server's
    /// own message over a generic one.
    pub fn from_status(status: u16, body: &str) -> Self {
        let message = Self::server_message(body).unwrap_or_else(|| Self::generic_message(status));
        ApiError::Rejected { status, message }
    }

    fn generic_message(status: u16) -> String {
        match status {
            400 => "The request was invalid.".to_string(),
            401 => "Authentication failed.".to_string(),
            403 => "You do not have permission to do that.".to_string(),
            404 => "The requested resource was not found.".to_string(),
            409 => "That record already exists.".to_string(),
            429 => "Server is busy. Please wait a moment and try again.".to_string(),
            500..=599 => "The server encountered an error. Please try again later.".to_string(),
            _ => format!("Request failed with status {}.", status),
        }
    }

    /// HTTP status for rejections, `None` for transport failures.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Rejected { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether retrying the same operation can succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            ApiError::Network(_) | ApiError::Timeout => true,
            ApiError::Rejected { status, .. } => *status == 429 || *status >= 500,
            ApiError::InvalidResponse(_) | ApiError::Encode(_) => false,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ApiError::Timeout
        } else {
            ApiError::Network(e.to_string())
        }
    }
}
