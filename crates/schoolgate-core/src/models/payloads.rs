//! Request and response bodies for the `/auth` endpoints.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use super::user::{Role, User};

/// Minimum length the server accepts for a new password.
pub const MIN_PASSWORD_LENGTH: usize = 6;

/// Input problems caught locally, before anything is sent.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{0} is required")]
    MissingField(&'static str),

    #[error("New password must be at least {MIN_PASSWORD_LENGTH} characters long")]
    PasswordTooShort,
}

/// Username/password pair for `POST /auth/login`.
#[derive(Debug, Clone, Serialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.username.trim().is_empty() {
            return Err(ValidationError::MissingField("Username"));
        }
        if self.password.is_empty() {
            return Err(ValidationError::MissingField("Password"));
        }
        Ok(())
    }
}

/// New-account payload for `POST /auth/register`.
///
/// Role-specific fields (department, admission number, ...) travel in
/// `extra` and are flattened into the request body.
#[derive(Debug, Clone, Serialize)]
pub struct Registration {
    pub username: String,
    pub email: String,
    pub password: String,
    pub role_type: Role,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Registration {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.username.trim().is_empty() {
            return Err(ValidationError::MissingField("Username"));
        }
        if self.email.trim().is_empty() {
            return Err(ValidationError::MissingField("Email"));
        }
        if self.password.is_empty() {
            return Err(ValidationError::MissingField("Password"));
        }
        if self.role_type == Role::Unknown {
            return Err(ValidationError::MissingField("Role"));
        }
        Ok(())
    }
}

/// Body for `POST /auth/change-password`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordChange {
    pub old_password: String,
    pub new_password: String,
}

impl PasswordChange {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.old_password.is_empty() {
            return Err(ValidationError::MissingField("Current password"));
        }
        if self.new_password.is_empty() {
            return Err(ValidationError::MissingField("New password"));
        }
        if self.new_password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(ValidationError::PasswordTooShort);
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct LoginResponse {
    pub token: String,
    pub user: User,
    #[serde(default)]
    pub expires_in: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RefreshResponse {
    pub token: String,
    #[serde(default)]
    pub expires_in: Option<i64>,
}

/// `{ "user": { ... } }` as returned by the profile endpoints. The user is
/// kept as a raw object so it can be merged field by field.
#[derive(Debug, Deserialize)]
pub(crate) struct UserEnvelope {
    pub user: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct VerifyResponse {
    #[serde(default)]
    pub valid: bool,
}
