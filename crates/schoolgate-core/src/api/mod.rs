//! HTTP transport for the school-management REST API.
//!
//! `Transport` is the seam between the auth gateway and the network:
//! `HttpTransport` talks to the real API with `reqwest`, tests substitute
//! scripted implementations.

pub mod client;
pub mod error;

pub use client::{ApiRequest, ApiResponse, HttpTransport, Method, Transport};
pub use error::ApiError;
