//! Data models for the Roster service.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Shortest accepted name or email value.
const FIELD_MIN_LEN: usize = 3;

/// Longest accepted name or email value.
const FIELD_MAX_LEN: usize = 100;

/// A person record as stored and returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Person {
    /// Record identifier.
    pub id: i32,

    /// Display name.
    pub name: String,

    /// Email address; unique across records.
    pub email: String,

    /// When the record was created.
    pub created_at: NaiveDateTime,

    /// When the record was last updated.
    pub updated_at: NaiveDateTime,

    /// Email of the principal that last wrote the record.
    pub update_user: String,
}

/// Incoming person payload for create and update requests.
#[derive(Debug, Clone, Deserialize)]
pub struct PersonPayload {
    /// Display name; required, 3 to 100 characters.
    pub name: String,

    /// Email address; required, 3 to 100 characters.
    pub email: String,
}

impl PersonPayload {
    /// Validate field constraints.
    ///
    /// # Errors
    ///
    /// Returns one message per violated constraint.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.name.len() < FIELD_MIN_LEN || self.name.len() > FIELD_MAX_LEN {
            errors.push(format!(
                "name must be between {} and {} characters",
                FIELD_MIN_LEN, FIELD_MAX_LEN
            ));
        }

        if self.email.len() < FIELD_MIN_LEN || self.email.len() > FIELD_MAX_LEN {
            errors.push(format!(
                "email must be between {} and {} characters",
                FIELD_MIN_LEN, FIELD_MAX_LEN
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Response body for create operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdResponse {
    /// Identifier of the created record.
    pub id: i32,
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Overall service health.
    pub healthy: bool,

    /// Per-dependency health.
    pub dependencies: Vec<HealthDependency>,
}

/// Health of a single dependency.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthDependency {
    /// Dependency name (e.g. "db").
    pub name: String,

    /// Whether the dependency responded.
    pub healthy: bool,

    /// Failure detail, when unhealthy.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
