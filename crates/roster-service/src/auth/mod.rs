//! Authentication and authorization core.
//!
//! This module implements the request security pipeline:
//!
//! - `discovery` - OpenID discovery document fetch and auth configuration
//! - `jwks` - rotating public-key cache fed by the issuer's JWKS endpoint
//! - `token` - bearer extraction and JWT signature/claims verification
//! - `claims` - typed claim access and principal extraction
//! - `policy` - prepared allow/deny rule evaluation
//! - `service` - the composed `AuthService` injected into the router
//! - `error` - the `AuthError` taxonomy

pub mod claims;
pub mod discovery;
pub mod error;
pub mod jwks;
pub mod policy;
pub mod service;
pub mod token;

pub use claims::{Claims, Principal};
pub use discovery::AuthConfig;
pub use error::AuthError;
pub use jwks::KeyCache;
pub use policy::{PolicyDecision, PolicyEvaluator, RequestDescriptor};
pub use service::AuthService;
pub use token::TokenVerifier;
