//! Roster service configuration.
//!
//! Configuration is loaded from environment variables once at startup;
//! there is no hot reload. Sensitive fields are redacted in Debug output.

use std::collections::HashMap;
use std::env;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Default HTTP bind address.
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8000";

/// Default scope claim name.
pub const DEFAULT_SCOPE_CLAIM: &str = "scp";

/// Default policy file location.
pub const DEFAULT_POLICY_PATH: &str = "./policy.json";

/// Default interval between scheduled JWKS refreshes, in seconds.
pub const DEFAULT_JWKS_REFRESH_SECONDS: u64 = 3600;

/// Default JWKS fetch timeout, in seconds.
pub const DEFAULT_JWKS_FETCH_TIMEOUT_SECONDS: u64 = 10;

/// Default minimum interval between forced JWKS refreshes, in seconds.
pub const DEFAULT_JWKS_MIN_REFRESH_SECONDS: u64 = 3600;

/// Default Redis URL for the person cache.
pub const DEFAULT_REDIS_URL: &str = "redis://localhost:6379";

/// Default person cache TTL, in seconds.
pub const DEFAULT_PERSON_CACHE_TTL_SECONDS: u64 = 300;

/// Default instance ID prefix.
const DEFAULT_INSTANCE_ID_PREFIX: &str = "roster";

/// Where the policy stage runs relative to the token stage.
///
/// `PreToken` evaluates policy for every request, including
/// unauthenticated ones, leaving the policy itself free to reject
/// missing tokens. `PostToken` gates policy evaluation on a verified
/// principal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyOrder {
    PreToken,
    PostToken,
}

impl FromStr for PolicyOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pre-token" => Ok(PolicyOrder::PreToken),
            "post-token" => Ok(PolicyOrder::PostToken),
            other => Err(format!(
                "expected 'pre-token' or 'post-token', got '{}'",
                other
            )),
        }
    }
}

/// Roster service configuration.
///
/// Loaded from environment variables with sensible defaults. Connection
/// URLs are redacted in Debug output to prevent credential leakage.
#[derive(Clone)]
pub struct Config {
    /// PostgreSQL connection URL.
    pub database_url: String,

    /// Server bind address.
    pub bind_address: String,

    /// URL of the OpenID discovery document.
    pub auth_config_url: String,

    /// Expected token audience.
    pub audience: String,

    /// Name of the claim carrying granted scopes.
    pub scope_claim: String,

    /// Allowed scopes; empty disables the scope check.
    pub scopes: Vec<String>,

    /// Extra claim field names surfaced on the principal.
    pub claim_fields: Vec<String>,

    /// Path to the JSON policy file.
    pub policy_path: String,

    /// Whether policy runs before or after the token stage.
    pub policy_order: PolicyOrder,

    /// Interval between scheduled JWKS refreshes, in seconds.
    pub jwks_refresh_seconds: u64,

    /// Timeout for a single JWKS fetch, in seconds.
    pub jwks_fetch_timeout_seconds: u64,

    /// Minimum interval between forced JWKS refreshes, in seconds.
    pub jwks_min_refresh_seconds: u64,

    /// CORS allowed origin, if any.
    pub allowed_origin: Option<String>,

    /// Whether the read-through person cache is enabled.
    pub enable_person_cache: bool,

    /// Redis connection URL for the person cache.
    pub redis_url: String,

    /// Person cache TTL, in seconds.
    pub person_cache_ttl_seconds: u64,

    /// Unique identifier for this service instance.
    pub instance_id: String,
}

/// Custom Debug implementation that redacts sensitive fields.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("database_url", &"[REDACTED]")
            .field("bind_address", &self.bind_address)
            .field("auth_config_url", &self.auth_config_url)
            .field("audience", &self.audience)
            .field("scope_claim", &self.scope_claim)
            .field("scopes", &self.scopes)
            .field("claim_fields", &self.claim_fields)
            .field("policy_path", &self.policy_path)
            .field("policy_order", &self.policy_order)
            .field("jwks_refresh_seconds", &self.jwks_refresh_seconds)
            .field(
                "jwks_fetch_timeout_seconds",
                &self.jwks_fetch_timeout_seconds,
            )
            .field("jwks_min_refresh_seconds", &self.jwks_min_refresh_seconds)
            .field("allowed_origin", &self.allowed_origin)
            .field("enable_person_cache", &self.enable_person_cache)
            .field("redis_url", &"[REDACTED]")
            .field(
                "person_cache_ttl_seconds",
                &self.person_cache_ttl_seconds,
            )
            .field("instance_id", &self.instance_id)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid value for {variable}: {reason}")]
    InvalidValue { variable: String, reason: String },
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let database_url = vars
            .get("DATABASE_URL")
            .ok_or_else(|| ConfigError::MissingEnvVar("DATABASE_URL".to_string()))?
            .clone();

        let auth_config_url = vars
            .get("AUTH_CONFIG_URL")
            .ok_or_else(|| ConfigError::MissingEnvVar("AUTH_CONFIG_URL".to_string()))?
            .clone();

        let bind_address = vars
            .get("BIND_ADDRESS")
            .cloned()
            .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());

        let audience = vars.get("AUTH_AUDIENCE").cloned().unwrap_or_default();

        let scope_claim = vars
            .get("AUTH_SCOPE_CLAIM")
            .cloned()
            .unwrap_or_else(|| DEFAULT_SCOPE_CLAIM.to_string());

        let scopes = parse_list(vars.get("AUTH_SCOPES"));
        let claim_fields = parse_list(vars.get("AUTH_CLAIMS"));

        let policy_path = vars
            .get("AUTH_POLICY_PATH")
            .cloned()
            .unwrap_or_else(|| DEFAULT_POLICY_PATH.to_string());

        let policy_order = match vars.get("AUTH_POLICY_ORDER") {
            Some(value) => value
                .parse::<PolicyOrder>()
                .map_err(|reason| ConfigError::InvalidValue {
                    variable: "AUTH_POLICY_ORDER".to_string(),
                    reason,
                })?,
            None => PolicyOrder::PreToken,
        };

        let jwks_refresh_seconds = parse_positive_u64(
            vars,
            "JWKS_REFRESH_SECONDS",
            DEFAULT_JWKS_REFRESH_SECONDS,
        )?;
        let jwks_fetch_timeout_seconds = parse_positive_u64(
            vars,
            "JWKS_FETCH_TIMEOUT_SECONDS",
            DEFAULT_JWKS_FETCH_TIMEOUT_SECONDS,
        )?;
        let jwks_min_refresh_seconds = parse_u64(
            vars,
            "JWKS_MIN_REFRESH_SECONDS",
            DEFAULT_JWKS_MIN_REFRESH_SECONDS,
        )?;

        let allowed_origin = vars.get("ALLOWED_ORIGIN").cloned().filter(|o| !o.is_empty());

        let enable_person_cache = vars
            .get("ENABLE_PERSON_CACHE")
            .map(|v| v == "true")
            .unwrap_or(false);

        let redis_url = vars
            .get("REDIS_URL")
            .cloned()
            .unwrap_or_else(|| DEFAULT_REDIS_URL.to_string());

        let person_cache_ttl_seconds = parse_positive_u64(
            vars,
            "PERSON_CACHE_TTL_SECONDS",
            DEFAULT_PERSON_CACHE_TTL_SECONDS,
        )?;

        // Generate an instance ID when none is configured.
        let instance_id = vars.get("INSTANCE_ID").cloned().unwrap_or_else(|| {
            let hostname = std::env::var("HOSTNAME").unwrap_or_else(|_| "unknown".to_string());
            let uuid_suffix = uuid::Uuid::new_v4().to_string();
            let short_suffix = uuid_suffix.get(..8).unwrap_or("00000000");
            format!("{}-{}-{}", DEFAULT_INSTANCE_ID_PREFIX, hostname, short_suffix)
        });

        Ok(Config {
            database_url,
            bind_address,
            auth_config_url,
            audience,
            scope_claim,
            scopes,
            claim_fields,
            policy_path,
            policy_order,
            jwks_refresh_seconds,
            jwks_fetch_timeout_seconds,
            jwks_min_refresh_seconds,
            allowed_origin,
            enable_person_cache,
            redis_url,
            person_cache_ttl_seconds,
            instance_id,
        })
    }
}

/// Split a comma-separated list, dropping empty entries.
fn parse_list(value: Option<&String>) -> Vec<String> {
    value
        .map(|v| {
            v.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(ToString::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn parse_u64(
    vars: &HashMap<String, String>,
    variable: &str,
    default: u64,
) -> Result<u64, ConfigError> {
    match vars.get(variable) {
        Some(value) => value.parse().map_err(|e| ConfigError::InvalidValue {
            variable: variable.to_string(),
            reason: format!("must be a non-negative integer, got '{}': {}", value, e),
        }),
        None => Ok(default),
    }
}

fn parse_positive_u64(
    vars: &HashMap<String, String>,
    variable: &str,
    default: u64,
) -> Result<u64, ConfigError> {
    let value = parse_u64(vars, variable, default)?;
    if value == 0 {
        return Err(ConfigError::InvalidValue {
            variable: variable.to_string(),
            reason: "must be greater than 0".to_string(),
        });
    }
    Ok(value)
}
