//! Authentication: the persisted session and the gateway that owns it.
//!
//! This module provides:
//! - `SessionStore`: the token + user record in client-local storage
//! - `AuthGateway`: login, logout, registration, profile and password
//!   operations, and the single authenticated-request entry point
//!
//! Sessions end on logout, on any 401 from the API, or when the persisted
//! record turns out to be corrupt.

pub mod error;
pub mod gateway;
pub mod session;

pub use error::AuthError;
pub use gateway::{AuthGateway, AuthSnapshot};
pub use session::{SessionStore, TOKEN_KEY, USER_KEY};
