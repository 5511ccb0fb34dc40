//! Middleware for the Roster service.
//!
//! # Components
//!
//! - `auth` - token and policy stages of the authentication pipeline
//! - `http_metrics` - HTTP request metrics middleware

pub mod auth;
pub mod http_metrics;

pub use auth::{enforce_policy, require_auth, AuthState, PrincipalExt};
pub use http_metrics::http_metrics_middleware;
