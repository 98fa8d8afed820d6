use thiserror::Error;

use crate::api::ApiError;
use crate::models::ValidationError;

/// Failure of an auth gateway operation. The `Display` text is suitable for
/// showing to the user as-is.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("You are not signed in.")]
    NotAuthenticated,

    #[error("Your session has expired. Please sign in again.")]
    SessionExpired,

    #[error(transparent)]
    Api(#[from] ApiError),
}

impl AuthError {
    /// True only for the forced sign-out caused by a 401.
    pub fn is_session_expired(&self) -> bool {
        matches!(self, AuthError::SessionExpired)
    }

    /// Whether the same operation may succeed if retried unchanged.
    pub fn is_retryable(&self) -> bool {
        match self {
            AuthError::Api(e) => e.is_retryable(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        assert_eq!(
            AuthError::SessionExpired.to_string(),
            "Your session has expired. Please sign in again."
        );
        let rejected: AuthError = ApiError::from_status(401, r#"{"error":"Invalid credentials"}"#).into();
        assert_eq!(rejected.to_string(), "Invalid credentials");
        let invalid: AuthError = ValidationError::MissingField("Username").into();
        assert_eq!(invalid.to_string(), "Username is required");
    }

    #[test]
    fn test_retryable() {
        assert!(AuthError::Api(ApiError::Timeout).is_retryable());
        assert!(!AuthError::SessionExpired.is_retryable());
        assert!(AuthError::SessionExpired.is_session_expired());
    }
}
