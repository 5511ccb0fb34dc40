//! Builder patterns for test data construction
//!
//! Provides fluent APIs for creating test token claims.

use chrono::{Duration, Utc};
use serde_json::{json, Value};

/// Builder for creating test JWT claims
///
/// # Example
/// ```rust,ignore
/// let claims = TestTokenBuilder::new()
///     .for_user("alice")
///     .with_audience("api://roster")
///     .with_scope("api admin")
///     .expires_in(3600)
///     .build();
/// ```
pub struct TestTokenBuilder {
    sub: String,
    name: String,
    email: String,
    audience: Option<String>,
    scope: Option<String>,
    exp: i64,
    iat: i64,
    nbf: Option<i64>,
    extra: serde_json::Map<String, Value>,
}

impl TestTokenBuilder {
    /// Create a new token builder with defaults
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            sub: "test-subject".to_string(),
            name: "Test User".to_string(),
            email: "test@example.com".to_string(),
            audience: None,
            scope: None,
            exp: (now + Duration::seconds(3600)).timestamp(),
            iat: now.timestamp(),
            nbf: None,
            extra: serde_json::Map::new(),
        }
    }

    /// Set the subject
    pub fn for_user(mut self, subject: &str) -> Self {
        self.sub = subject.to_string();
        self
    }

    /// Set the display name
    pub fn with_name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    /// Set the email
    pub fn with_email(mut self, email: &str) -> Self {
        self.email = email.to_string();
        self
    }

    /// Set the audience
    pub fn with_audience(mut self, audience: &str) -> Self {
        self.audience = Some(audience.to_string());
        self
    }

    /// Set the scope claim value (space-separated)
    pub fn with_scope(mut self, scope: &str) -> Self {
        self.scope = Some(scope.to_string());
        self
    }

    /// Add an arbitrary claim
    pub fn with_claim(mut self, claim: &str, value: Value) -> Self {
        self.extra.insert(claim.to_string(), value);
        self
    }

    /// Set expiration in seconds from now (negative for already expired)
    pub fn expires_in(mut self, seconds: i64) -> Self {
        self.exp = (Utc::now() + Duration::seconds(seconds)).timestamp();
        self
    }

    /// Set issued-at timestamp
    pub fn issued_at(mut self, timestamp: i64) -> Self {
        self.iat = timestamp;
        self
    }

    /// Set not-before in seconds from now
    pub fn not_before_in(mut self, seconds: i64) -> Self {
        self.nbf = Some((Utc::now() + Duration::seconds(seconds)).timestamp());
        self
    }

    /// Build the claims as a JSON value
    pub fn build(self) -> Value {
        let mut claims = json!({
            "sub": self.sub,
            "name": self.name,
            "email": self.email,
            "exp": self.exp,
            "iat": self.iat,
        });

        let map = claims
            .as_object_mut()
            .expect("claims literal is an object");

        if let Some(audience) = self.audience {
            map.insert("aud".to_string(), json!(audience));
        }
        if let Some(scope) = self.scope {
            map.insert("scp".to_string(), json!(scope));
        }
        if let Some(nbf) = self.nbf {
            map.insert("nbf".to_string(), json!(nbf));
        }
        for (key, value) in self.extra {
            map.insert(key, value);
        }

        claims
    }
}

impl Default for TestTokenBuilder {
    fn default() -> Self {
        Self::new()
    }
}
