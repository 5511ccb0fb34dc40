//! Metrics definitions for the Roster service.
//!
//! All metrics follow Prometheus naming conventions:
//! - `roster_` prefix
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Cardinality
//!
//! Labels are bounded to prevent cardinality explosion:
//! - `method`: 7 values max (GET, POST, PUT, PATCH, DELETE, HEAD, OPTIONS)
//! - `endpoint`: parameterized paths (`/person/{id}`)
//! - `status`: success, client_error, server_error
//! - `result`: bounded by the auth error taxonomy

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

/// Initialize the Prometheus metrics recorder and return the handle for
/// serving metrics via HTTP.
///
/// Must be called before any metrics are recorded.
///
/// # Errors
///
/// Returns error if the Prometheus recorder fails to install (e.g.,
/// already installed).
pub fn init_metrics_recorder() -> Result<PrometheusHandle, String> {
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Prefix("roster_http_request".to_string()),
            &[
                0.005, 0.010, 0.025, 0.050, 0.100, 0.150, 0.200, 0.300, 0.500, 1.000, 2.000,
            ],
        )
        .map_err(|e| format!("Failed to set HTTP request buckets: {e}"))?
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus recorder: {e}"))
}

/// Record HTTP request completion.
///
/// Metrics: `roster_http_requests_total`,
/// `roster_http_request_duration_seconds`
/// Labels: `method`, `endpoint`, `status`
pub fn record_http_request(method: &str, endpoint: &str, status_code: u16, duration: Duration) {
    let normalized_endpoint = normalize_endpoint(endpoint);
    let status = categorize_status_code(status_code);

    counter!(
        "roster_http_requests_total",
        "method" => method.to_string(),
        "endpoint" => normalized_endpoint.clone(),
        "status" => status,
    )
    .increment(1);

    histogram!(
        "roster_http_request_duration_seconds",
        "method" => method.to_string(),
        "endpoint" => normalized_endpoint,
    )
    .record(duration.as_secs_f64());
}

/// Record the outcome of a token-stage check.
///
/// Metric: `roster_auth_checks_total`
/// Labels: `result` (ok, or an auth error kind)
pub fn record_auth_check(result: &str) {
    counter!(
        "roster_auth_checks_total",
        "result" => result.to_string(),
    )
    .increment(1);
}

/// Record a policy-stage decision.
///
/// Metric: `roster_policy_decisions_total`
/// Labels: `decision` (allow, deny, error)
pub fn record_policy_decision(decision: &str) {
    counter!(
        "roster_policy_decisions_total",
        "decision" => decision.to_string(),
    )
    .increment(1);
}

/// Record a JWKS refresh attempt.
///
/// Metric: `roster_jwks_refresh_total`
/// Labels: `result` (ok, error)
pub fn record_jwks_refresh(result: &str, key_count: usize) {
    counter!(
        "roster_jwks_refresh_total",
        "result" => result.to_string(),
    )
    .increment(1);

    if result == "ok" {
        metrics::gauge!("roster_jwks_keys").set(key_count as f64);
    }
}

/// Normalize a request path to a bounded endpoint label.
fn normalize_endpoint(path: &str) -> String {
    let mut segments = path.trim_start_matches('/').split('/');
    match segments.next() {
        Some("person") => {
            if segments.next().is_some() {
                "/person/{id}".to_string()
            } else {
                "/person".to_string()
            }
        }
        Some("health") => "/health".to_string(),
        Some("metrics") => "/metrics".to_string(),
        _ => "/other".to_string(),
    }
}

/// Collapse a status code into a bounded label.
fn categorize_status_code(status_code: u16) -> &'static str {
    match status_code {
        200..=399 => "success",
        400..=499 => "client_error",
        _ => "server_error",
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_endpoint_person_id() {
        assert_eq!(normalize_endpoint("/person/42"), "/person/{id}");
        assert_eq!(normalize_endpoint("/person/abc"), "/person/{id}");
        assert_eq!(normalize_endpoint("/person"), "/person");
    }

    #[test]
    fn test_normalize_endpoint_known_paths() {
        assert_eq!(normalize_endpoint("/health"), "/health");
        assert_eq!(normalize_endpoint("/metrics"), "/metrics");
    }

    #[test]
    fn test_normalize_endpoint_unknown_collapses() {
        assert_eq!(normalize_endpoint("/admin/secrets"), "/other");
        assert_eq!(normalize_endpoint("/"), "/other");
    }

    #[test]
    fn test_categorize_status_code() {
        assert_eq!(categorize_status_code(200), "success");
        assert_eq!(categorize_status_code(202), "success");
        assert_eq!(categorize_status_code(301), "success");
        assert_eq!(categorize_status_code(401), "client_error");
        assert_eq!(categorize_status_code(404), "client_error");
        assert_eq!(categorize_status_code(500), "server_error");
        assert_eq!(categorize_status_code(503), "server_error");
    }
}
