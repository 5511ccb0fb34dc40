//! Roster Service Library
//!
//! This library provides the core functionality for the Roster service,
//! a person-directory HTTP API whose every request passes through a
//! two-stage security pipeline:
//!
//! - Bearer token verification against the issuer's rotating JWKS keys
//! - Policy evaluation of a structured request descriptor
//!
//! # Architecture
//!
//! ```text
//! routes.rs -> middleware/*.rs -> handlers/*.rs -> repositories/*.rs
//!                    |
//!                 auth/*.rs
//! ```
//!
//! # Modules
//!
//! - `config` - Service configuration from environment
//! - `errors` - Error types with HTTP status code mapping
//! - `auth` - Key cache, token verification, claims, policy
//! - `middleware` - Auth pipeline stages and HTTP metrics
//! - `handlers` - HTTP request handlers
//! - `models` - Data models
//! - `repositories` - Person storage backends
//! - `observability` - Metrics definitions
//! - `routes` - Axum router setup

pub mod auth;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod observability;
pub mod repositories;
pub mod routes;
