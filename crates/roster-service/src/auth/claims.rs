//! Decoded token claims and principal extraction.
//!
//! Claims are an opaque map as decoded from the token body; typed
//! accessors replace unchecked dynamic casts and surface mistyped values
//! as errors. The `Principal` derived from validated claims is owned by
//! the request and discarded when the request ends.

use crate::auth::discovery::AuthConfig;
use crate::auth::AuthError;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;

/// Claim map decoded from a verified token body.
///
/// Values are kept untyped; accessors convert on demand and report a
/// typed error when a claim is missing or has the wrong shape. Debug
/// output lists claim names only, since values carry identifiers.
#[derive(Clone)]
pub struct Claims(serde_json::Map<String, Value>);

impl fmt::Debug for Claims {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Claims")
            .field(&self.0.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Claims {
    pub fn new(map: serde_json::Map<String, Value>) -> Self {
        Self(map)
    }

    /// Raw claim value, if present.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// A claim that must be a string.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::ClaimsMalformed` if the claim is missing or not
    /// a string.
    pub fn string_claim(&self, name: &str) -> Result<&str, AuthError> {
        self.0
            .get(name)
            .and_then(Value::as_str)
            .ok_or(AuthError::ClaimsMalformed)
    }

    /// A claim holding a list of strings.
    ///
    /// Accepts either a space-separated string (the OAuth scope
    /// convention) or a JSON array of strings.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::ClaimsMalformed` if the claim is missing or has
    /// another shape.
    pub fn string_list_claim(&self, name: &str) -> Result<Vec<String>, AuthError> {
        match self.0.get(name) {
            Some(Value::String(s)) => {
                Ok(s.split_whitespace().map(ToString::to_string).collect())
            }
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| {
                    item.as_str()
                        .map(ToString::to_string)
                        .ok_or(AuthError::ClaimsMalformed)
                })
                .collect(),
            _ => Err(AuthError::ClaimsMalformed),
        }
    }

    /// A numeric claim as Unix epoch seconds, if present.
    pub fn numeric_claim(&self, name: &str) -> Option<i64> {
        match self.0.get(name) {
            Some(Value::Number(n)) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
            _ => None,
        }
    }
}

/// The authenticated identity derived from a verified token.
///
/// Identifier and email are redacted in Debug output to keep them out of
/// logs.
#[derive(Clone)]
pub struct Principal {
    /// Subject (user identifier) from the `sub` claim.
    pub subject: String,

    /// Display name from the `name` claim.
    pub name: String,

    /// Email address from the `email` claim.
    pub email: String,

    /// Configured extra claim fields, by name.
    pub claims: HashMap<String, String>,
}

impl fmt::Debug for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Principal")
            .field("subject", &"[REDACTED]")
            .field("name", &self.name)
            .field("email", &"[REDACTED]")
            .field("claims", &self.claims.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Validate claims against the auth configuration and build a principal.
///
/// Checks, in order: audience equality, scope intersection (when scopes
/// are configured), required identity fields, configured claim fields.
///
/// # Errors
///
/// - `AudienceInvalid` when `aud` is missing or does not match
/// - `ScopeInvalid` when a non-empty scope configuration has no
///   intersection with the token's scope claim
/// - `ClaimsMalformed` when `sub`/`name`/`email` or a configured claim
///   field is missing or not a string
pub fn validate_claims(claims: &Claims, config: &AuthConfig) -> Result<Principal, AuthError> {
    if !audience_matches(claims.get("aud"), &config.audience) {
        return Err(AuthError::AudienceInvalid);
    }

    if !config.scopes.is_empty() {
        let granted = claims
            .string_list_claim(&config.scope_claim)
            .map_err(|_| AuthError::ScopeInvalid)?;
        let allowed = granted.iter().any(|scope| config.scopes.contains(scope));
        if !allowed {
            return Err(AuthError::ScopeInvalid);
        }
    }

    let subject = claims.string_claim("sub")?.to_string();
    let name = claims.string_claim("name")?.to_string();
    let email = claims.string_claim("email")?.to_string();

    // The configuration declares these fields mandatory, so a missing or
    // mistyped value rejects the token.
    let mut extra = HashMap::with_capacity(config.claim_fields.len());
    for field in &config.claim_fields {
        let value = claims.string_claim(field)?.to_string();
        extra.insert(field.clone(), value);
    }

    Ok(Principal {
        subject,
        name,
        email,
        claims: extra,
    })
}

/// Audience comparison: exact string equality, applied per-element when
/// the `aud` claim is an array.
fn audience_matches(aud: Option<&Value>, expected: &str) -> bool {
    match aud {
        Some(Value::String(s)) => s == expected,
        Some(Value::Array(items)) => items
            .iter()
            .any(|item| item.as_str() == Some(expected)),
        _ => false,
    }
}
