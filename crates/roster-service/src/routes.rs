//! HTTP routes for the Roster service.
//!
//! Defines the Axum router and application state, including the
//! configurable ordering of the two authentication stages.

use crate::auth::AuthService;
use crate::config::{Config, PolicyOrder};
use crate::handlers;
use crate::middleware::{enforce_policy, http_metrics_middleware, require_auth, AuthState};
use crate::repositories::PersonStore;
use axum::http::HeaderValue;
use axum::{middleware, routing::get, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Person storage backend.
    pub store: Arc<dyn PersonStore>,

    /// Service configuration.
    pub config: Config,

    /// Authentication service.
    pub auth: Arc<AuthService>,
}

/// Build the application routes.
///
/// Creates an Axum router with:
/// - `/health` - dependency health (public)
/// - `/metrics` - Prometheus metrics (public)
/// - `/person`, `/person/{id}` - person CRUD, behind both auth stages
/// - TraceLayer for request logging
/// - 30 second request timeout
/// - HTTP metrics middleware recording every response
pub fn build_routes(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let auth_state = Arc::new(AuthState {
        auth: Arc::clone(&state.auth),
    });

    // Public routes (no authentication required)
    let public_routes = Router::new()
        .route("/health", get(handlers::health_check))
        .with_state(Arc::clone(&state));

    // Metrics route with its own state
    let metrics_routes = Router::new()
        .route("/metrics", get(handlers::metrics_handler))
        .with_state(metrics_handle);

    let protected_routes = Router::new()
        .route(
            "/person",
            get(handlers::list_people).post(handlers::create_person),
        )
        .route(
            "/person/:id",
            get(handlers::get_person)
                .put(handlers::update_person)
                .delete(handlers::delete_person),
        );

    // Stage ordering: the last route_layer added is outermost and runs
    // first. Pre-token evaluates policy for every request, including
    // unauthenticated ones; post-token only consults policy once a
    // principal has been verified.
    let protected_routes = match state.config.policy_order {
        PolicyOrder::PreToken => protected_routes
            .route_layer(middleware::from_fn_with_state(
                Arc::clone(&auth_state),
                require_auth,
            ))
            .route_layer(middleware::from_fn_with_state(
                Arc::clone(&auth_state),
                enforce_policy,
            )),
        PolicyOrder::PostToken => protected_routes
            .route_layer(middleware::from_fn_with_state(
                Arc::clone(&auth_state),
                enforce_policy,
            ))
            .route_layer(middleware::from_fn_with_state(
                Arc::clone(&auth_state),
                require_auth,
            )),
    };

    let cors = cors_layer(state.config.allowed_origin.as_deref());
    let protected_routes = protected_routes.with_state(Arc::clone(&state));

    // Merge routes and apply global middleware layers
    // Layer order (bottom-to-top execution):
    // 1. TimeoutLayer - Timeout the request (innermost)
    // 2. TraceLayer - Log request details
    // 3. CORS
    // 4. http_metrics_middleware - Record ALL responses (outermost)
    public_routes
        .merge(metrics_routes)
        .merge(protected_routes)
        .layer(TimeoutLayer::new(Duration::from_secs(30)))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(middleware::from_fn(http_metrics_middleware))
}

/// CORS layer for the configured origin, or a no-op layer when none is
/// configured.
fn cors_layer(allowed_origin: Option<&str>) -> CorsLayer {
    match allowed_origin.and_then(|origin| origin.parse::<HeaderValue>().ok()) {
        Some(origin) => CorsLayer::new()
            .allow_origin(origin)
            .allow_methods(tower_http::cors::Any)
            .allow_headers(tower_http::cors::Any),
        None => CorsLayer::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_state_is_clone() {
        // This test verifies that AppState implements Clone,
        // which is required for Axum's State extractor.
        fn assert_clone<T: Clone>() {}
        assert_clone::<AppState>();
    }

    #[test]
    fn test_config_is_clone() {
        fn assert_clone<T: Clone>() {}
        assert_clone::<Config>();
    }
}
