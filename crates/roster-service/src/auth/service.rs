//! Composed authentication service.
//!
//! `AuthService` owns the pieces of the request security pipeline: the
//! immutable auth configuration, the rotating key cache, the token
//! verifier and the prepared policy evaluator. It is built once at
//! startup and injected into the router state; nothing here reads
//! ambient globals.

use crate::auth::claims::Principal;
use crate::auth::discovery::{self, AuthConfig};
use crate::auth::jwks::{KeyCache, KeyCacheOptions};
use crate::auth::policy::{PolicyDecision, PolicyError, PolicyEvaluator, RequestDescriptor};
use crate::auth::token::TokenVerifier;
use crate::auth::AuthError;
use crate::config::Config;
use anyhow::Context;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;

/// Authentication and authorization service for the request pipeline.
pub struct AuthService {
    /// Immutable auth configuration assembled at startup.
    config: AuthConfig,

    /// Rotating public-key cache.
    key_cache: Arc<KeyCache>,

    /// Token verifier over the key cache.
    verifier: TokenVerifier,

    /// Prepared policy query.
    policy: PolicyEvaluator,
}

impl AuthService {
    /// Bootstrap the auth service from process configuration.
    ///
    /// Fetches the discovery document, loads and compiles the policy file
    /// and performs the initial JWKS fetch. Every failure here is fatal
    /// to startup: the service must not come up without keys or policy.
    ///
    /// # Errors
    ///
    /// Returns an error when the discovery document, the policy file or
    /// the initial key set cannot be loaded.
    pub async fn initialize(config: &Config) -> anyhow::Result<Self> {
        let document = discovery::fetch_discovery(&config.auth_config_url)
            .await
            .context("failed to load auth discovery document")?;

        let auth_config = AuthConfig::from_discovery(document, config);

        let policy = PolicyEvaluator::from_file(Path::new(&config.policy_path))
            .context("failed to load authorization policy")?;

        let key_cache = Arc::new(
            KeyCache::bootstrap(
                auth_config.jwks_uri.clone(),
                KeyCacheOptions {
                    refresh_interval: Duration::from_secs(config.jwks_refresh_seconds),
                    fetch_timeout: Duration::from_secs(config.jwks_fetch_timeout_seconds),
                    min_refresh_interval: Duration::from_secs(config.jwks_min_refresh_seconds),
                },
            )
            .await
            .context("initial JWKS fetch failed")?,
        );

        let verifier = TokenVerifier::new(
            Arc::clone(&key_cache),
            auth_config.allowed_algorithms.clone(),
        );

        tracing::info!(
            target: "roster.auth",
            issuer = %auth_config.issuer,
            audience = %auth_config.audience,
            algorithms = ?auth_config.allowed_algorithms,
            scope_claim = %auth_config.scope_claim,
            "Auth service initialized"
        );

        Ok(Self {
            config: auth_config,
            key_cache,
            verifier,
            policy,
        })
    }

    /// Build an auth service from already-assembled parts.
    ///
    /// Lets tests substitute a fixed key set or policy without the
    /// discovery roundtrip.
    pub fn from_parts(
        config: AuthConfig,
        key_cache: Arc<KeyCache>,
        policy: PolicyEvaluator,
    ) -> Self {
        let verifier =
            TokenVerifier::new(Arc::clone(&key_cache), config.allowed_algorithms.clone());
        Self {
            config,
            key_cache,
            verifier,
            policy,
        }
    }

    /// Verify a bearer token and derive the request principal.
    ///
    /// Runs the token verifier then the claims validation in sequence.
    ///
    /// # Errors
    ///
    /// Propagates the token-stage `AuthError` of whichever check failed.
    #[instrument(skip_all, name = "roster.auth.authenticate")]
    pub async fn authenticate(&self, token: &str) -> Result<Principal, AuthError> {
        let claims = self.verifier.verify(token).await?;
        let principal = super::claims::validate_claims(&claims, &self.config)?;
        Ok(principal)
    }

    /// Evaluate the request policy.
    ///
    /// # Errors
    ///
    /// Returns `PolicyError` on engine-internal failure, which the
    /// pipeline surfaces as a 500 and never treats as allow or deny.
    pub fn evaluate_policy(
        &self,
        descriptor: &RequestDescriptor<'_>,
    ) -> Result<PolicyDecision, PolicyError> {
        self.policy.evaluate(descriptor)
    }

    /// The rotating key cache, for spawning the background refresh task.
    pub fn key_cache(&self) -> &Arc<KeyCache> {
        &self.key_cache
    }

    /// The immutable auth configuration.
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }
}
