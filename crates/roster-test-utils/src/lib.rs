//! # Roster Test Utilities
//!
//! Shared test utilities for the Roster service.
//!
//! This crate provides:
//! - RSA test keypairs that publish themselves as JWKS documents
//! - Builder patterns for token claims (TestTokenBuilder)
//! - Wiremock mounts for the discovery document and JWKS endpoint
//!
//! ## Usage
//!
//! ```rust,ignore
//! use roster_test_utils::*;
//!
//! let keypair = TestKeypair::new(1, "test-key-01");
//! let token = keypair.sign(
//!     &TestTokenBuilder::new()
//!         .for_user("alice")
//!         .with_audience("api://roster")
//!         .with_scope("api")
//!         .build(),
//! );
//! ```

pub mod keys;
pub mod mock_idp;
pub mod token_builders;

pub use keys::TestKeypair;
pub use mock_idp::{mount_discovery, mount_jwks, JWKS_PATH};
pub use token_builders::TestTokenBuilder;
