//! Data models for the school-management portal.
//!
//! - `User`, `Role`, `Session`: the signed-in identity
//! - Request payloads: `Credentials`, `Registration`, `PasswordChange`

pub mod payloads;
pub mod user;

pub use payloads::{Credentials, PasswordChange, Registration, ValidationError, MIN_PASSWORD_LENGTH};
pub use user::{Role, Session, User};
