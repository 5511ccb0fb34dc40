//! Authentication and authorization error taxonomy.
//!
//! Every token-stage failure collapses to the same client-facing message so
//! that a caller probing credentials cannot learn which check failed. The
//! specific variant is recorded server-side via [`AuthError::kind`] before
//! the response is written.

use thiserror::Error;

/// Client-facing message for all token-stage failures.
pub const TOKEN_REJECTED_MESSAGE: &str = "auth token was not provided or is invalid";

/// Errors produced by the authentication pipeline.
///
/// Token-stage variants map to 401, `PolicyDeny` to 403 and `PolicyEval`
/// to 500. Display strings are what the client sees; variants carry no
/// internal detail beyond what [`AuthError::kind`] exposes to logs.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// No `Authorization` header was present on the request.
    #[error("auth token was not provided or is invalid")]
    TokenMissing,

    /// The bearer header or token structure could not be parsed.
    #[error("auth token was not provided or is invalid")]
    TokenMalformed,

    /// The token's `kid` was absent or not present in the key cache.
    #[error("auth token was not provided or is invalid")]
    KeyNotFound,

    /// Cryptographic signature verification failed.
    #[error("auth token was not provided or is invalid")]
    SignatureInvalid,

    /// The token's algorithm is not in the configured allow-list.
    #[error("auth token was not provided or is invalid")]
    AlgMismatch,

    /// The `exp` claim is in the past.
    #[error("auth token was not provided or is invalid")]
    TokenExpired,

    /// The `nbf` claim is in the future.
    #[error("auth token was not provided or is invalid")]
    TokenNotYetValid,

    /// The `aud` claim does not match the configured audience.
    #[error("auth token was not provided or is invalid")]
    AudienceInvalid,

    /// The scope claim shares no member with the configured scopes.
    #[error("auth token was not provided or is invalid")]
    ScopeInvalid,

    /// A required or configured claim field is missing or mistyped.
    #[error("auth token was not provided or is invalid")]
    ClaimsMalformed,

    /// The policy engine denied the request.
    #[error("forbidden")]
    PolicyDeny,

    /// The policy engine itself failed; never coerced to allow or deny.
    #[error("policy evaluation failed")]
    PolicyEval(String),
}

impl AuthError {
    /// Stable label for server-side logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            AuthError::TokenMissing => "token_missing",
            AuthError::TokenMalformed => "token_malformed",
            AuthError::KeyNotFound => "key_not_found",
            AuthError::SignatureInvalid => "signature_invalid",
            AuthError::AlgMismatch => "alg_mismatch",
            AuthError::TokenExpired => "token_expired",
            AuthError::TokenNotYetValid => "token_not_yet_valid",
            AuthError::AudienceInvalid => "audience_invalid",
            AuthError::ScopeInvalid => "scope_invalid",
            AuthError::ClaimsMalformed => "claims_malformed",
            AuthError::PolicyDeny => "policy_deny",
            AuthError::PolicyEval(_) => "policy_eval",
        }
    }

    /// Returns the HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            AuthError::PolicyDeny => 403,
            AuthError::PolicyEval(_) => 500,
            _ => 401,
        }
    }

    /// True for failures of the token verification stage (all 401s).
    pub fn is_token_stage(&self) -> bool {
        !matches!(self, AuthError::PolicyDeny | AuthError::PolicyEval(_))
    }
}
