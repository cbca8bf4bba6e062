use std::time::Instant;

use axum::{
    http::{HeaderName, HeaderValue, Request},
    middleware::Next,
    response::Response,
};
use tracing::Instrument;
use uuid::Uuid;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Assign each request a UUIDv7 id, echoed back in `x-request-id`.
///
/// Handlers run inside a `request` span carrying the id.
pub async fn request_tracing(req: Request<axum::body::Body>, next: Next) -> Response {
    let request_id = Uuid::now_v7();
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let span = tracing::info_span!("request", %request_id, %method, %path);
    let started = Instant::now();

    let mut response = next.run(req).instrument(span.clone()).await;

    let status = response.status();
    let latency_ms = started.elapsed().as_millis() as u64;
    span.in_scope(|| {
        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), latency_ms, "request failed");
        } else {
            tracing::info!(status = status.as_u16(), latency_ms, "request completed");
        }
    });

    if let Ok(value) = HeaderValue::from_str(&request_id.to_string()) {
        response
            .headers_mut()
            .insert(HeaderName::from_static(REQUEST_ID_HEADER), value);
    }
    response
}
