//! schoolgate-core - session, authentication and route protection for the
//! school-management portal.
//!
//! - [`auth`]: the persisted session and the `AuthGateway` that owns it
//! - [`guard`]: per-route role checks and the client route table
//! - [`dashboard`]: role to dashboard dispatch
//! - [`api`]: HTTP transport for the remote API
//! - [`storage`]: client-local key/value backends
//! - [`config`]: API URL, timeouts and storage selection

pub mod api;
pub mod auth;
pub mod config;
pub mod dashboard;
pub mod guard;
pub mod models;
pub mod storage;

pub use auth::{AuthError, AuthGateway, AuthSnapshot, SessionStore};
pub use config::Config;
pub use dashboard::{select_dashboard, DashboardKind, DashboardSelection};
pub use guard::{evaluate, navigate, GuardDecision, Navigation, Route, RouteRule};
pub use models::{Credentials, PasswordChange, Registration, Role, Session, User};
