//! Request metrics middleware.
//!
//! Sits outermost in the layer stack so that every response is counted,
//! including those produced by the framework before a handler runs (404
//! route misses, 405 method mismatches, body-deserialization 400s) and
//! the auth pipeline's own rejections.

use axum::{extract::Request, middleware::Next, response::Response};
use std::time::Instant;

use crate::observability::metrics::record_http_request;

/// Records method, normalized endpoint, status class and latency for
/// every response that leaves the service.
pub async fn http_metrics_middleware(request: Request, next: Next) -> Response {
    let method = request.method().as_str().to_owned();
    let path = request.uri().path().to_owned();
    let started = Instant::now();

    let response = next.run(request).await;

    record_http_request(
        &method,
        &path,
        response.status().as_u16(),
        started.elapsed(),
    );

    response
}
