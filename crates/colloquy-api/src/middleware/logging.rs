use axum::{extract::Request, middleware::Next, response::Response};
use std::time::Instant;

/// Request logging middleware
///
/// Health probes are logged at debug so they do not drown the access log.
pub async fn log_request(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let start = Instant::now();

    let response = next.run(req).await;

    let duration_ms = start.elapsed().as_millis() as u64;
    let status = response.status();

    if path == "/health" {
        tracing::debug!(method = %method, uri = %path, status = %status, duration_ms, "Request processed");
    } else if status.is_server_error() {
        tracing::warn!(method = %method, uri = %path, status = %status, duration_ms, "Request failed");
    } else {
        tracing::info!(method = %method, uri = %path, status = %status, duration_ms, "Request processed");
    }

    response
}
