//! Bearer token extraction and JWT verification.
//!
//! Verification order: structural decode, `kid` lookup, allowed-algorithm
//! check, signature verification, temporal claims. The allowed-algorithm
//! check is independent of signature validity, which blocks
//! algorithm-substitution attacks even when keys are shared across
//! algorithms.
//!
//! # Security
//!
//! - Tokens are size-checked BEFORE parsing (DoS prevention)
//! - Only algorithms from the discovery document are accepted
//! - Temporal claims are validated with a small clock skew tolerance

use crate::auth::claims::Claims;
use crate::auth::jwks::KeyCache;
use crate::auth::AuthError;
use axum::http::HeaderMap;
use jsonwebtoken::{decode, decode_header, Algorithm, Validation};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;

/// Maximum allowed token size in bytes (8KB).
///
/// Tokens larger than this are rejected before any base64 decoding or
/// cryptographic work. Typical tokens are 200-800 bytes.
pub const MAX_TOKEN_SIZE_BYTES: usize = 8192;

/// Default clock skew tolerance for `exp`/`nbf` validation.
pub const DEFAULT_CLOCK_SKEW: Duration = Duration::from_secs(60);

/// Extract the bearer token from the `Authorization` header.
///
/// Exactly one space-separated `Bearer <token>` pair is accepted.
///
/// # Errors
///
/// - `TokenMissing` when the header is absent
/// - `TokenMalformed` for any other shape (wrong scheme, empty token,
///   extra segments, non-ASCII header value)
pub fn extract_bearer(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers
        .get("authorization")
        .ok_or(AuthError::TokenMissing)?
        .to_str()
        .map_err(|_| AuthError::TokenMalformed)?;

    let mut parts = value.split(' ');
    let scheme = parts.next().unwrap_or_default();
    let token = parts.next().unwrap_or_default();

    if scheme != "Bearer" || token.is_empty() || parts.next().is_some() {
        return Err(AuthError::TokenMalformed);
    }

    Ok(token)
}

/// Best-effort bearer extraction for the policy descriptor.
///
/// Policy evaluation deliberately receives the raw token string even when
/// the header is missing or malformed, so this never fails.
pub fn bearer_token_lenient(headers: &HeaderMap) -> &str {
    extract_bearer(headers).unwrap_or_default()
}

/// JWT verifier backed by the rotating key cache.
pub struct TokenVerifier {
    /// Key cache for `kid` resolution.
    key_cache: Arc<KeyCache>,

    /// Algorithms the issuer declares; anything else is rejected.
    allowed_algorithms: Vec<Algorithm>,

    /// Clock skew tolerance for temporal claims.
    clock_skew: Duration,
}

impl TokenVerifier {
    /// Create a verifier with the default clock skew tolerance.
    pub fn new(key_cache: Arc<KeyCache>, allowed_algorithms: Vec<Algorithm>) -> Self {
        Self {
            key_cache,
            allowed_algorithms,
            clock_skew: DEFAULT_CLOCK_SKEW,
        }
    }

    /// Override the clock skew tolerance.
    #[allow(dead_code)] // API for deployments with known clock drift
    pub fn with_clock_skew(mut self, clock_skew: Duration) -> Self {
        self.clock_skew = clock_skew;
        self
    }

    /// Verify a bearer token and return its decoded claims.
    ///
    /// # Errors
    ///
    /// - `TokenMalformed`: oversized token, undecodable structure
    /// - `KeyNotFound`: missing `kid`, or `kid` absent from the key cache
    /// - `AlgMismatch`: header algorithm not in the allowed set
    /// - `SignatureInvalid`: cryptographic verification failed
    /// - `TokenExpired` / `TokenNotYetValid`: temporal claim violations
    #[instrument(skip_all, name = "roster.auth.verify")]
    pub async fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        if token.len() > MAX_TOKEN_SIZE_BYTES {
            tracing::debug!(
                target: "roster.auth.token",
                token_size = token.len(),
                max_size = MAX_TOKEN_SIZE_BYTES,
                "Token rejected: size exceeds maximum allowed"
            );
            return Err(AuthError::TokenMalformed);
        }

        let header = decode_header(token).map_err(|e| {
            tracing::debug!(target: "roster.auth.token", error = %e, "Failed to decode token header");
            AuthError::TokenMalformed
        })?;

        let kid = header
            .kid
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| {
                tracing::debug!(target: "roster.auth.token", "Token header missing kid");
                AuthError::KeyNotFound
            })?;

        let key = self.key_cache.resolve(kid).await?;

        // Checked before signature verification so a disallowed algorithm
        // is rejected regardless of whether the signature would verify.
        if !self.allowed_algorithms.contains(&header.alg) {
            tracing::warn!(
                target: "roster.auth.token",
                algorithm = ?header.alg,
                allowed = ?self.allowed_algorithms,
                "Token algorithm not in allowed set"
            );
            return Err(AuthError::AlgMismatch);
        }

        // Temporal and audience claims are validated separately, so the
        // decode step checks the signature alone.
        let mut validation = Validation::new(header.alg);
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;
        validation.required_spec_claims = HashSet::new();

        let data = decode::<serde_json::Map<String, serde_json::Value>>(token, &key, &validation)
            .map_err(|e| {
                tracing::debug!(target: "roster.auth.token", error = %e, "Token verification failed");
                map_decode_error(&e)
            })?;

        let claims = Claims::new(data.claims);
        validate_temporal(
            &claims,
            chrono::Utc::now().timestamp(),
            self.clock_skew.as_secs() as i64,
        )?;

        tracing::debug!(target: "roster.auth.token", "Token verified");
        Ok(claims)
    }
}

/// Map `jsonwebtoken` decode failures onto the auth taxonomy.
fn map_decode_error(error: &jsonwebtoken::errors::Error) -> AuthError {
    use jsonwebtoken::errors::ErrorKind;

    match error.kind() {
        ErrorKind::InvalidSignature => AuthError::SignatureInvalid,
        ErrorKind::InvalidAlgorithm | ErrorKind::InvalidAlgorithmName => AuthError::AlgMismatch,
        ErrorKind::Base64(_)
        | ErrorKind::Json(_)
        | ErrorKind::Utf8(_)
        | ErrorKind::InvalidToken => AuthError::TokenMalformed,
        _ => AuthError::SignatureInvalid,
    }
}

/// Validate `exp` and `nbf` (when present) against an explicit `now`.
///
/// Split out from [`TokenVerifier::verify`] so boundary conditions can be
/// unit-tested without wall-clock dependence.
fn validate_temporal(claims: &Claims, now: i64, skew: i64) -> Result<(), AuthError> {
    if let Some(exp) = claims.numeric_claim("exp") {
        if now > exp + skew {
            tracing::debug!(target: "roster.auth.token", exp = exp, now = now, "Token expired");
            return Err(AuthError::TokenExpired);
        }
    }

    if let Some(nbf) = claims.numeric_claim("nbf") {
        if nbf > now + skew {
            tracing::debug!(target: "roster.auth.token", nbf = nbf, now = now, "Token not yet valid");
            return Err(AuthError::TokenNotYetValid);
        }
    }

    Ok(())
}
