//! Health check handler.

use crate::models::{HealthDependency, HealthResponse};
use crate::routes::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use std::sync::Arc;
use tracing::instrument;

/// Handler for GET /health.
///
/// Pings the person store and reports per-dependency health. Returns 200
/// when every dependency responds, 500 otherwise; the body carries the
/// same structure either way so probes can inspect which dependency
/// failed.
#[instrument(skip_all, name = "roster.handlers.health")]
pub async fn health_check(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<HealthResponse>) {
    let db_result = state.store.ping().await;

    let db_dependency = match &db_result {
        Ok(()) => HealthDependency {
            name: "db".to_string(),
            healthy: true,
            error: None,
        },
        Err(e) => HealthDependency {
            name: "db".to_string(),
            healthy: false,
            error: Some(e.to_string()),
        },
    };

    let healthy = db_result.is_ok();
    let status = if healthy {
        StatusCode::OK
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };

    (
        status,
        Json(HealthResponse {
            healthy,
            dependencies: vec![db_dependency],
        }),
    )
}
