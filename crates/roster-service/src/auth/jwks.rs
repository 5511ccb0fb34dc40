//! Rotating public-key cache fed by the issuer's JWKS endpoint.
//!
//! The cache holds a single immutable snapshot of the most recently fetched
//! key set, keyed by `kid`. Refreshes replace the snapshot atomically so
//! concurrent readers never observe a partially updated set. A failed
//! refresh keeps the previous snapshot in force (last-good-wins).
//!
//! # Security
//!
//! - The cache never serves a `kid` absent from the last successful fetch
//! - A resolve miss may force one out-of-band refresh per minimum refresh
//!   interval, bounding the cost of key-rotation events without allowing
//!   refresh storms against the issuer

use crate::auth::AuthError;
use jsonwebtoken::DecodingKey;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::instrument;

/// Default interval between scheduled JWKS refreshes (1 hour).
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(3600);

/// Default timeout for a single JWKS fetch.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Default minimum interval between forced (miss-triggered) refreshes.
pub const DEFAULT_MIN_REFRESH_INTERVAL: Duration = Duration::from_secs(3600);

/// JSON Web Key from the JWKS endpoint.
///
/// Only RSA keys (`kty: "RSA"` with `n`/`e` components) are usable for
/// verification; other key types are skipped when building a snapshot.
#[derive(Debug, Clone, Deserialize)]
pub struct Jwk {
    /// Key type ("RSA" for the keys this service consumes).
    pub kty: String,

    /// Key ID - used to select the correct key for verification.
    pub kid: String,

    /// RSA modulus (base64url encoded).
    #[serde(default)]
    pub n: Option<String>,

    /// RSA public exponent (base64url encoded).
    #[serde(default)]
    pub e: Option<String>,

    /// Algorithm hint (e.g. "RS256").
    #[serde(default)]
    pub alg: Option<String>,

    /// Key use (should be "sig" for signing).
    #[serde(default, rename = "use")]
    pub key_use: Option<String>,
}

/// JWKS response from the issuer.
#[derive(Debug, Clone, Deserialize)]
pub struct JwksResponse {
    /// List of JSON Web Keys.
    pub keys: Vec<Jwk>,
}

#[derive(Debug, Error)]
pub enum JwksError {
    #[error("failed to fetch JWKS: {0}")]
    Fetch(String),

    #[error("JWKS endpoint returned status {0}")]
    Status(u16),

    #[error("failed to parse JWKS response: {0}")]
    Parse(String),
}

/// A single immutable key-set snapshot.
struct KeySnapshot {
    /// Map of key ID to decoding key.
    keys: HashMap<String, DecodingKey>,

    /// When this snapshot was installed.
    refreshed_at: Instant,
}

/// Tuning knobs for [`KeyCache`].
#[derive(Debug, Clone)]
pub struct KeyCacheOptions {
    /// Interval between scheduled background refreshes.
    pub refresh_interval: Duration,

    /// Timeout applied to each JWKS fetch.
    pub fetch_timeout: Duration,

    /// Minimum interval between forced refreshes triggered by misses.
    pub min_refresh_interval: Duration,
}

impl Default for KeyCacheOptions {
    fn default() -> Self {
        Self {
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            min_refresh_interval: DEFAULT_MIN_REFRESH_INTERVAL,
        }
    }
}

/// Thread-safe cache of the issuer's public signing keys.
///
/// Readers clone the snapshot `Arc` and look up keys without blocking on
/// writers; writers build a complete new snapshot and install it with a
/// single pointer swap.
pub struct KeyCache {
    /// URL of the JWKS endpoint.
    jwks_url: String,

    /// HTTP client for fetching JWKS.
    http_client: reqwest::Client,

    /// Current snapshot, replaced atomically on refresh.
    snapshot: RwLock<Arc<KeySnapshot>>,

    /// When a refresh was last attempted (successful or not).
    last_attempt: RwLock<Instant>,

    /// Minimum interval between forced refreshes.
    min_refresh_interval: Duration,

    /// Interval between scheduled background refreshes.
    refresh_interval: Duration,
}

impl KeyCache {
    /// Create the cache and perform the initial fetch.
    ///
    /// The initial fetch is synchronous with startup; if it fails the
    /// service must not come up, so the error propagates.
    ///
    /// # Errors
    ///
    /// Returns `JwksError` if the endpoint is unreachable, returns a
    /// non-success status, or the body is not a valid JWKS document.
    pub async fn bootstrap(jwks_url: String, options: KeyCacheOptions) -> Result<Self, JwksError> {
        let http_client = reqwest::Client::builder()
            .timeout(options.fetch_timeout)
            .build()
            .map_err(|e| JwksError::Fetch(e.to_string()))?;

        let cache = Self {
            jwks_url,
            http_client,
            snapshot: RwLock::new(Arc::new(KeySnapshot {
                keys: HashMap::new(),
                refreshed_at: Instant::now(),
            })),
            last_attempt: RwLock::new(Instant::now()),
            min_refresh_interval: options.min_refresh_interval,
            refresh_interval: options.refresh_interval,
        };

        let snapshot = cache.fetch_snapshot().await?;
        *cache.snapshot.write().await = Arc::new(snapshot);

        Ok(cache)
    }

    /// Resolve a decoding key by key ID.
    ///
    /// A miss triggers at most one forced refresh per minimum refresh
    /// interval before reporting `KeyNotFound`; the request is never held
    /// beyond that single bounded fetch attempt.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::KeyNotFound` if the `kid` is absent from the
    /// most recent successfully fetched set.
    #[instrument(skip(self), fields(kid = %kid), name = "roster.auth.jwks.resolve")]
    pub async fn resolve(&self, kid: &str) -> Result<DecodingKey, AuthError> {
        {
            let snapshot = self.snapshot.read().await.clone();
            if let Some(key) = snapshot.keys.get(kid) {
                tracing::debug!(target: "roster.auth.jwks", kid = %kid, "Key cache hit");
                return Ok(key.clone());
            }
        }

        // Miss. The key may have rotated since the last fetch, so allow one
        // rate-limited forced refresh before giving up.
        if self.try_forced_refresh().await {
            let snapshot = self.snapshot.read().await.clone();
            if let Some(key) = snapshot.keys.get(kid) {
                tracing::info!(target: "roster.auth.jwks", kid = %kid, "Key resolved after forced refresh");
                return Ok(key.clone());
            }
        }

        tracing::warn!(target: "roster.auth.jwks", kid = %kid, "Key not found in JWKS");
        Err(AuthError::KeyNotFound)
    }

    /// Key IDs in the current snapshot.
    pub async fn key_ids(&self) -> Vec<String> {
        let snapshot = self.snapshot.read().await.clone();
        snapshot.keys.keys().cloned().collect()
    }

    /// Age of the current snapshot.
    pub async fn snapshot_age(&self) -> Duration {
        let snapshot = self.snapshot.read().await.clone();
        snapshot.refreshed_at.elapsed()
    }

    /// Attempt a forced refresh, honoring the minimum refresh interval.
    ///
    /// Returns true if a refresh attempt was made (regardless of outcome).
    /// The attempt timestamp advances even on failure so a dead endpoint
    /// cannot be hammered by a stream of cache misses.
    async fn try_forced_refresh(&self) -> bool {
        {
            let mut last_attempt = self.last_attempt.write().await;
            if last_attempt.elapsed() < self.min_refresh_interval {
                tracing::debug!(
                    target: "roster.auth.jwks",
                    since_last_ms = last_attempt.elapsed().as_millis() as u64,
                    "Forced JWKS refresh rate limited"
                );
                return false;
            }
            *last_attempt = Instant::now();
        }

        self.refresh().await;
        true
    }

    /// Refresh the snapshot from the JWKS endpoint.
    ///
    /// Failures are logged and leave the previous snapshot in force; the
    /// next scheduled tick (or forced refresh) retries implicitly.
    #[instrument(skip(self), name = "roster.auth.jwks.refresh")]
    pub async fn refresh(&self) {
        {
            let mut last_attempt = self.last_attempt.write().await;
            *last_attempt = Instant::now();
        }

        match self.fetch_snapshot().await {
            Ok(snapshot) => {
                let key_count = snapshot.keys.len();
                *self.snapshot.write().await = Arc::new(snapshot);
                crate::observability::metrics::record_jwks_refresh("ok", key_count);
                tracing::info!(
                    target: "roster.auth.jwks",
                    key_count = key_count,
                    "JWKS snapshot refreshed"
                );
            }
            Err(e) => {
                crate::observability::metrics::record_jwks_refresh("error", 0);
                tracing::error!(
                    target: "roster.auth.jwks",
                    error = %e,
                    "JWKS refresh failed, keeping previous snapshot"
                );
            }
        }
    }

    /// Spawn the background refresh task.
    ///
    /// The task refreshes on a fixed interval until the cancellation token
    /// fires at shutdown.
    pub fn spawn_refresh_task(self: &Arc<Self>, shutdown: CancellationToken) -> JoinHandle<()> {
        let cache = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(cache.refresh_interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // The first tick fires immediately; bootstrap already fetched.
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => {
                        tracing::info!(target: "roster.auth.jwks", "JWKS refresh task stopped");
                        break;
                    }
                    _ = ticker.tick() => {
                        cache.refresh().await;
                    }
                }
            }
        })
    }

    /// Fetch the JWKS document and build a fresh snapshot.
    async fn fetch_snapshot(&self) -> Result<KeySnapshot, JwksError> {
        tracing::debug!(target: "roster.auth.jwks", url = %self.jwks_url, "Fetching JWKS");

        let response = self
            .http_client
            .get(&self.jwks_url)
            .send()
            .await
            .map_err(|e| JwksError::Fetch(e.to_string()))?;

        if !response.status().is_success() {
            return Err(JwksError::Status(response.status().as_u16()));
        }

        let jwks: JwksResponse = response
            .json()
            .await
            .map_err(|e| JwksError::Parse(e.to_string()))?;

        let mut keys = HashMap::new();
        for jwk in &jwks.keys {
            match build_decoding_key(jwk) {
                Some(key) => {
                    keys.insert(jwk.kid.clone(), key);
                }
                None => {
                    tracing::warn!(
                        target: "roster.auth.jwks",
                        kid = %jwk.kid,
                        kty = %jwk.kty,
                        "Skipping JWKS key that is not a usable RSA key"
                    );
                }
            }
        }

        Ok(KeySnapshot {
            keys,
            refreshed_at: Instant::now(),
        })
    }
}

/// Build a decoding key from an RSA JWK, if possible.
fn build_decoding_key(jwk: &Jwk) -> Option<DecodingKey> {
    if jwk.kty != "RSA" {
        return None;
    }
    let n = jwk.n.as_deref()?;
    let e = jwk.e.as_deref()?;
    DecodingKey::from_rsa_components(n, e).ok()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use roster_test_utils::TestKeypair;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn jwks_body(keypairs: &[&TestKeypair]) -> serde_json::Value {
        serde_json::json!({
            "keys": keypairs.iter().map(|k| k.jwk_json()).collect::<Vec<_>>()
        })
    }

    async fn mount_jwks(server: &MockServer, body: &serde_json::Value) {
        Mock::given(method("GET"))
            .and(path("/keys"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(server)
            .await;
    }

    fn options(min_refresh: Duration) -> KeyCacheOptions {
        KeyCacheOptions {
            refresh_interval: Duration::from_secs(3600),
            fetch_timeout: Duration::from_secs(2),
            min_refresh_interval: min_refresh,
        }
    }

    #[test]
    fn test_jwk_deserialization() {
        let json = r#"{
            "kty": "RSA",
            "kid": "key-01",
            "n": "abc",
            "e": "AQAB",
            "alg": "RS256",
            "use": "sig"
        }"#;

        let jwk: Jwk = serde_json::from_str(json).unwrap();

        assert_eq!(jwk.kty, "RSA");
        assert_eq!(jwk.kid, "key-01");
        assert_eq!(jwk.n, Some("abc".to_string()));
        assert_eq!(jwk.e, Some("AQAB".to_string()));
        assert_eq!(jwk.alg, Some("RS256".to_string()));
        assert_eq!(jwk.key_use, Some("sig".to_string()));
    }

    #[test]
    fn test_jwk_deserialization_minimal() {
        let json = r#"{"kty": "RSA", "kid": "key-02"}"#;

        let jwk: Jwk = serde_json::from_str(json).unwrap();

        assert_eq!(jwk.kid, "key-02");
        assert!(jwk.n.is_none());
        assert!(jwk.e.is_none());
    }

    #[test]
    fn test_build_decoding_key_rejects_non_rsa() {
        let jwk = Jwk {
            kty: "OKP".to_string(),
            kid: "ed-key".to_string(),
            n: None,
            e: None,
            alg: Some("EdDSA".to_string()),
            key_use: Some("sig".to_string()),
        };

        assert!(build_decoding_key(&jwk).is_none());
    }

    #[test]
    fn test_build_decoding_key_requires_components() {
        let jwk = Jwk {
            kty: "RSA".to_string(),
            kid: "no-modulus".to_string(),
            n: None,
            e: Some("AQAB".to_string()),
            alg: None,
            key_use: None,
        };

        assert!(build_decoding_key(&jwk).is_none());
    }

    #[tokio::test]
    async fn test_bootstrap_and_resolve() {
        let server = MockServer::start().await;
        let keypair = TestKeypair::new(1, "boot-key-01");
        mount_jwks(&server, &jwks_body(&[&keypair])).await;

        let cache = KeyCache::bootstrap(
            format!("{}/keys", server.uri()),
            options(Duration::from_secs(3600)),
        )
        .await
        .expect("bootstrap should succeed");

        assert!(cache.resolve("boot-key-01").await.is_ok());
        assert_eq!(cache.key_ids().await, vec!["boot-key-01".to_string()]);
        assert!(cache.snapshot_age().await < Duration::from_secs(60));
    }

    #[tokio::test]
    async fn test_bootstrap_fails_on_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let result = KeyCache::bootstrap(
            format!("{}/keys", server.uri()),
            options(Duration::from_secs(3600)),
        )
        .await;

        assert!(matches!(result, Err(JwksError::Status(500))));
    }

    #[tokio::test]
    async fn test_miss_is_rate_limited_to_one_fetch() {
        let server = MockServer::start().await;
        let keypair = TestKeypair::new(1, "only-key");

        // Exactly one fetch (the bootstrap) is allowed; a miss within the
        // minimum refresh interval must not hit the endpoint again.
        Mock::given(method("GET"))
            .and(path("/keys"))
            .respond_with(ResponseTemplate::new(200).set_body_json(jwks_body(&[&keypair])))
            .expect(1)
            .mount(&server)
            .await;

        let cache = KeyCache::bootstrap(
            format!("{}/keys", server.uri()),
            options(Duration::from_secs(3600)),
        )
        .await
        .expect("bootstrap should succeed");

        let result = cache.resolve("rotated-away").await;
        assert!(matches!(result, Err(AuthError::KeyNotFound)));

        let again = cache.resolve("rotated-away").await;
        assert!(matches!(again, Err(AuthError::KeyNotFound)));

        server.verify().await;
    }

    #[tokio::test]
    async fn test_miss_triggers_forced_refresh_after_interval() {
        let server = MockServer::start().await;
        let old_key = TestKeypair::new(1, "old-key");
        let new_key = TestKeypair::new(2, "new-key");

        mount_jwks(&server, &jwks_body(&[&old_key])).await;

        // Zero minimum interval lets the rotation test force a refresh
        // immediately after bootstrap.
        let cache = KeyCache::bootstrap(
            format!("{}/keys", server.uri()),
            options(Duration::ZERO),
        )
        .await
        .expect("bootstrap should succeed");

        // Rotate keys on the endpoint.
        server.reset().await;
        mount_jwks(&server, &jwks_body(&[&old_key, &new_key])).await;

        assert!(cache.resolve("new-key").await.is_ok());
    }

    #[tokio::test]
    async fn test_refresh_failure_keeps_previous_snapshot() {
        let server = MockServer::start().await;
        let keypair = TestKeypair::new(1, "stable-key");
        mount_jwks(&server, &jwks_body(&[&keypair])).await;

        let cache = KeyCache::bootstrap(
            format!("{}/keys", server.uri()),
            options(Duration::ZERO),
        )
        .await
        .expect("bootstrap should succeed");

        // Endpoint goes down; refresh fails and the old snapshot stays.
        server.reset().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        cache.refresh().await;

        assert!(cache.resolve("stable-key").await.is_ok());
    }

    #[tokio::test]
    async fn test_refresh_task_stops_on_cancellation() {
        let server = MockServer::start().await;
        let keypair = TestKeypair::new(1, "task-key");
        mount_jwks(&server, &jwks_body(&[&keypair])).await;

        let cache = Arc::new(
            KeyCache::bootstrap(
                format!("{}/keys", server.uri()),
                options(Duration::from_secs(3600)),
            )
            .await
            .expect("bootstrap should succeed"),
        );

        let shutdown = CancellationToken::new();
        let handle = cache.spawn_refresh_task(shutdown.clone());

        shutdown.cancel();
        handle.await.expect("refresh task should exit cleanly");
    }
}
