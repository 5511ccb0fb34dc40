//! Roster service entry point.
//!
//! Startup order matters: configuration, then the auth bootstrap
//! (discovery document, policy file, initial JWKS fetch - all fatal on
//! failure), then the database pool, then the HTTP server. The
//! background JWKS refresh task runs until shutdown and is cancelled
//! before the process exits.

use roster_service::auth::AuthService;
use roster_service::config::Config;
use roster_service::observability::metrics::init_metrics_recorder;
use roster_service::repositories::{CachedPersonStore, PersonStore, PgPersonStore};
use roster_service::routes::{self, AppState};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Statement timeout appended to the database URL.
const STATEMENT_TIMEOUT_SECS: u32 = 5;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "roster_service=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Roster service");

    let config = Config::from_env().map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    info!(
        instance_id = %config.instance_id,
        bind_address = %config.bind_address,
        policy_order = ?config.policy_order,
        "Configuration loaded"
    );

    // The recorder must exist before the first metric is touched.
    let metrics_handle = init_metrics_recorder().map_err(|e| {
        error!("Failed to initialize metrics recorder: {}", e);
        e
    })?;

    // Auth bootstrap: discovery document, policy file, initial JWKS
    // fetch. The service must not come up without keys or policy.
    let auth = Arc::new(AuthService::initialize(&config).await.map_err(|e| {
        error!("Failed to initialize auth service: {:#}", e);
        e
    })?);

    let shutdown_token = CancellationToken::new();
    let refresh_task = auth.key_cache().spawn_refresh_task(shutdown_token.clone());

    let db_pool = connect_database(&config.database_url).await?;
    let store = build_person_store(&config, db_pool).await?;

    let bind_address = config.bind_address.clone();
    let state = Arc::new(AppState {
        store,
        config,
        auth,
    });

    let app = routes::build_routes(state, metrics_handle);

    let addr: SocketAddr = bind_address.parse().map_err(|e| {
        error!("Invalid bind address '{}': {}", bind_address, e);
        e
    })?;

    info!("Roster service listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    // Stop the background refresh task before exiting.
    shutdown_token.cancel();
    if let Err(e) = refresh_task.await {
        warn!("JWKS refresh task did not exit cleanly: {}", e);
    }

    info!("Roster service shutdown complete");

    Ok(())
}

/// Open the PostgreSQL pool with a per-statement timeout baked into the
/// connection URL so no query can hang a request indefinitely.
async fn connect_database(database_url: &str) -> Result<PgPool, sqlx::Error> {
    info!("Connecting to database...");

    let separator = if database_url.contains('?') { '&' } else { '?' };
    let url = format!(
        "{}{}options=-c%20statement_timeout%3D{}s",
        database_url, separator, STATEMENT_TIMEOUT_SECS
    );

    let pool = PgPoolOptions::new()
        .max_connections(20)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(5))
        .idle_timeout(Duration::from_secs(600))
        .max_lifetime(Duration::from_secs(1800))
        .connect(&url)
        .await
        .map_err(|e| {
            error!("Failed to connect to database: {}", e);
            e
        })?;

    sqlx::migrate!("../../migrations")
        .run(&pool)
        .await
        .map_err(|e| {
            error!("Failed to run database migrations: {}", e);
            sqlx::Error::from(e)
        })?;

    info!("Database connection established");
    Ok(pool)
}

/// Wire the person store, wrapping the PostgreSQL backend with the Redis
/// read-through cache when enabled.
async fn build_person_store(
    config: &Config,
    pool: PgPool,
) -> Result<Arc<dyn PersonStore>, redis::RedisError> {
    if !config.enable_person_cache {
        return Ok(Arc::new(PgPersonStore::new(pool)));
    }

    let client = redis::Client::open(config.redis_url.as_str()).map_err(|e| {
        error!("Invalid Redis URL: {}", e);
        e
    })?;
    let manager = client.get_connection_manager().await.map_err(|e| {
        error!("Failed to connect to Redis: {}", e);
        e
    })?;

    info!(
        ttl_seconds = config.person_cache_ttl_seconds,
        "Person cache enabled"
    );
    Ok(Arc::new(CachedPersonStore::new(
        Arc::new(PgPersonStore::new(pool)),
        manager,
        config.person_cache_ttl_seconds,
    )))
}

/// Resolves when SIGINT or SIGTERM arrives, then holds the server open
/// for a drain period so load balancers can stop routing to us.
async fn shutdown_signal() {
    let sigint = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for SIGINT: {}", e);
            std::future::pending::<()>().await;
        }
        info!("Received SIGINT, starting graceful shutdown...");
    };

    #[cfg(unix)]
    let sigterm = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received SIGTERM, starting graceful shutdown...");
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let sigterm = std::future::pending::<()>();

    tokio::select! {
        _ = sigint => {}
        _ = sigterm => {}
    }

    let drain_secs: u64 = std::env::var("ROSTER_DRAIN_SECONDS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(30);

    if drain_secs > 0 {
        warn!("Draining connections for {} seconds...", drain_secs);
        tokio::time::sleep(Duration::from_secs(drain_secs)).await;
        info!("Drain period complete");
    } else {
        info!("Skipping drain period (ROSTER_DRAIN_SECONDS=0)");
    }
}
