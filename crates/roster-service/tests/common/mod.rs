//! Common test utilities for integration tests.
//!
//! Provides a full test server: a wiremock identity provider (discovery
//! document + JWKS endpoint), a temporary policy file, an in-memory
//! person store and a real axum server bound to an ephemeral port.

#![allow(dead_code)]
#![allow(clippy::unwrap_used, clippy::expect_used)]

use anyhow::Result;
use roster_service::auth::AuthService;
use roster_service::config::Config;
use roster_service::observability::metrics::init_metrics_recorder;
use roster_service::repositories::{MemoryPersonStore, PersonStore};
use roster_service::routes::{self, AppState};
use roster_test_utils::{mount_discovery, mount_jwks, TestKeypair, TestTokenBuilder};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};
use tokio::task::JoinHandle;
use wiremock::MockServer;

/// Audience every test token must carry.
pub const TEST_AUDIENCE: &str = "api://roster";

/// Global metrics handle for test servers.
static TEST_METRICS_HANDLE: OnceLock<metrics_exporter_prometheus::PrometheusHandle> =
    OnceLock::new();

fn get_test_metrics_handle() -> metrics_exporter_prometheus::PrometheusHandle {
    TEST_METRICS_HANDLE
        .get_or_init(|| {
            init_metrics_recorder().unwrap_or_else(|_| {
                metrics_exporter_prometheus::PrometheusBuilder::new()
                    .build_recorder()
                    .handle()
            })
        })
        .clone()
}

/// Counter for unique temporary policy file names.
static POLICY_FILE_COUNTER: AtomicUsize = AtomicUsize::new(0);

/// Temporary policy file, removed on drop.
struct PolicyFileGuard {
    path: PathBuf,
}

impl PolicyFileGuard {
    fn write(policy: &serde_json::Value) -> Result<Self> {
        let path = std::env::temp_dir().join(format!(
            "roster-policy-{}-{}.json",
            std::process::id(),
            POLICY_FILE_COUNTER.fetch_add(1, Ordering::SeqCst)
        ));
        std::fs::write(&path, serde_json::to_vec_pretty(policy)?)?;
        Ok(Self { path })
    }
}

impl Drop for PolicyFileGuard {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

/// Options for spawning a test server.
pub struct TestServerOptions {
    /// Policy document served to the evaluator.
    pub policy: serde_json::Value,

    /// Extra environment variables merged over the defaults.
    pub vars: Vec<(&'static str, String)>,
}

impl Default for TestServerOptions {
    fn default() -> Self {
        Self {
            policy: serde_json::json!({ "default": "allow" }),
            vars: Vec::new(),
        }
    }
}

/// Test server with a mocked identity provider.
pub struct TestServer {
    pub addr: SocketAddr,
    pub mock_server: MockServer,
    pub keypair: TestKeypair,
    pub store: Arc<MemoryPersonStore>,
    _server_handle: JoinHandle<()>,
    _policy_file: PolicyFileGuard,
}

impl TestServer {
    /// Spawn with an allow-everything policy and default configuration.
    pub async fn spawn() -> Result<Self> {
        Self::spawn_with(TestServerOptions::default()).await
    }

    /// Spawn with explicit policy and configuration overrides.
    pub async fn spawn_with(options: TestServerOptions) -> Result<Self> {
        let mock_server = MockServer::start().await;
        let keypair = TestKeypair::new(1, "test-key-01");

        mount_jwks(&mock_server, &[&keypair]).await;
        let discovery_url = mount_discovery(&mock_server, &["RS256"]).await;

        let policy_file = PolicyFileGuard::write(&options.policy)?;

        let mut vars = HashMap::from([
            (
                "DATABASE_URL".to_string(),
                "postgresql://test/test".to_string(),
            ),
            ("AUTH_CONFIG_URL".to_string(), discovery_url),
            ("AUTH_AUDIENCE".to_string(), TEST_AUDIENCE.to_string()),
            (
                "AUTH_POLICY_PATH".to_string(),
                policy_file.path.display().to_string(),
            ),
        ]);
        for (key, value) in options.vars {
            vars.insert(key.to_string(), value);
        }

        let config = Config::from_vars(&vars)
            .map_err(|e| anyhow::anyhow!("Failed to create config: {}", e))?;

        let auth = Arc::new(AuthService::initialize(&config).await?);
        let store = Arc::new(MemoryPersonStore::new());

        let state = Arc::new(AppState {
            store: Arc::clone(&store) as Arc<dyn PersonStore>,
            config,
            auth,
        });

        let app = routes::build_routes(state, get_test_metrics_handle());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let server_handle = tokio::spawn(async move {
            let make_service = app.into_make_service_with_connect_info::<SocketAddr>();
            if let Err(e) = axum::serve(listener, make_service).await {
                eprintln!("Test server error: {}", e);
            }
        });

        Ok(Self {
            addr,
            mock_server,
            keypair,
            store,
            _server_handle: server_handle,
            _policy_file: policy_file,
        })
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// A token that passes every default check.
    pub fn valid_token(&self) -> String {
        self.keypair
            .sign(&TestTokenBuilder::new().with_audience(TEST_AUDIENCE).build())
    }

    /// Sign arbitrary claims with the server's published key.
    pub fn sign(&self, claims: &serde_json::Value) -> String {
        self.keypair.sign(claims)
    }

    /// Replace the JWKS document with a different key set.
    pub async fn rotate_jwks_to(&self, keypairs: &[&TestKeypair]) {
        self.mock_server.reset().await;
        mount_jwks(&self.mock_server, keypairs).await;
        mount_discovery(&self.mock_server, &["RS256"]).await;
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self._server_handle.abort();
    }
}
