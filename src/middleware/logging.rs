//! Request logging middleware

use std::time::Instant;

use axum::{
    extract::Request,
    http::StatusCode,
    middleware::Next,
    response::Response,
};

/// Log method, path, status and latency of every request.
///
/// Server errors log at error level, client errors other than 404 at warn.
pub async fn logging_middleware(request: Request, next: Next) -> Response {
    let started = Instant::now();
    let method = request.method().clone();
    let path = request.uri().path().to_owned();

    let response = next.run(request).await;

    let status = response.status();
    let duration_ms = started.elapsed().as_secs_f64() * 1000.0;

    if status.is_server_error() {
        tracing::error!(%method, %path, status = status.as_u16(), duration_ms, "Request failed");
    } else if status.is_client_error() && status != StatusCode::NOT_FOUND {
        tracing::warn!(%method, %path, status = status.as_u16(), duration_ms, "Request rejected");
    } else {
        tracing::info!(%method, %path, status = status.as_u16(), duration_ms, "Request completed");
    }

    response
}
