//! OpenID discovery document fetching and auth configuration assembly.
//!
//! The discovery document is fetched exactly once at startup; failure to
//! fetch or parse it is fatal. The resulting [`AuthConfig`] is immutable
//! for the process lifetime.

use crate::config::Config;
use jsonwebtoken::Algorithm;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

/// OpenID discovery document, reduced to the fields this service uses.
#[derive(Debug, Clone, Deserialize)]
pub struct DiscoveryDocument {
    /// Token issuer identifier.
    pub issuer: String,

    /// URL of the issuer's JWKS endpoint.
    pub jwks_uri: String,

    /// Signing algorithms the issuer supports.
    #[serde(default)]
    pub id_token_signing_alg_values_supported: Vec<String>,
}

#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("cannot read OpenId configuration without URL")]
    MissingUrl,

    #[error("failed to fetch discovery document: {0}")]
    Fetch(String),

    #[error("discovery endpoint returned status {0}")]
    Status(u16),

    #[error("failed to parse discovery document: {0}")]
    Parse(String),
}

/// Fetch the discovery document from the configured URL.
///
/// # Errors
///
/// Returns `DiscoveryError` if the URL is empty, the endpoint is
/// unreachable, returns a non-success status, or the body is not a valid
/// discovery document. All of these are fatal at startup.
pub async fn fetch_discovery(config_url: &str) -> Result<DiscoveryDocument, DiscoveryError> {
    if config_url.is_empty() {
        return Err(DiscoveryError::MissingUrl);
    }

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()
        .map_err(|e| DiscoveryError::Fetch(e.to_string()))?;

    let response = client
        .get(config_url)
        .send()
        .await
        .map_err(|e| DiscoveryError::Fetch(e.to_string()))?;

    if !response.status().is_success() {
        return Err(DiscoveryError::Status(response.status().as_u16()));
    }

    let document: DiscoveryDocument = response
        .json()
        .await
        .map_err(|e| DiscoveryError::Parse(e.to_string()))?;

    tracing::info!(
        target: "roster.auth.discovery",
        issuer = %document.issuer,
        jwks_uri = %document.jwks_uri,
        algorithms = ?document.id_token_signing_alg_values_supported,
        "Discovery document loaded"
    );

    Ok(document)
}

/// Immutable authentication configuration assembled at startup from the
/// discovery document and environment-sourced settings.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Token issuer identifier from the discovery document.
    pub issuer: String,

    /// JWKS endpoint URL from the discovery document.
    pub jwks_uri: String,

    /// Allowed signing algorithms, in discovery-document order.
    pub allowed_algorithms: Vec<Algorithm>,

    /// Expected `aud` claim value; compared by exact string equality.
    pub audience: String,

    /// Name of the claim carrying granted scopes.
    pub scope_claim: String,

    /// Allowed scopes; an empty set disables the scope check.
    pub scopes: Vec<String>,

    /// Extra claim field names surfaced on the principal; all mandatory.
    pub claim_fields: Vec<String>,
}

impl AuthConfig {
    /// Merge the discovery document with environment-sourced settings.
    ///
    /// Algorithm names the `jsonwebtoken` crate does not recognize are
    /// skipped with a warning; tokens declaring them can then never pass
    /// the allowed-algorithm check.
    pub fn from_discovery(document: DiscoveryDocument, config: &Config) -> Self {
        let allowed_algorithms = document
            .id_token_signing_alg_values_supported
            .iter()
            .filter_map(|name| match name.parse::<Algorithm>() {
                Ok(alg) => Some(alg),
                Err(_) => {
                    tracing::warn!(
                        target: "roster.auth.discovery",
                        algorithm = %name,
                        "Skipping unsupported signing algorithm from discovery document"
                    );
                    None
                }
            })
            .collect();

        Self {
            issuer: document.issuer,
            jwks_uri: document.jwks_uri,
            allowed_algorithms,
            audience: config.audience.clone(),
            scope_claim: config.scope_claim.clone(),
            scopes: config.scopes.clone(),
            claim_fields: config.claim_fields.clone(),
        }
    }
}
