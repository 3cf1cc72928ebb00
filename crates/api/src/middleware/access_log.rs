//! Structured access log and HTTP metrics.

use std::time::Instant;

use axum::extract::{MatchedPath, Request};
use axum::middleware::Next;
use axum::response::Response;
use common::Context;

use crate::error::ErrorReport;

/// Logs one line per request and records `http_requests_total` and
/// `http_request_duration_seconds`.
pub async fn log_response(req: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().clone();
    let uri = req.uri().path().to_string();
    let route = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());
    let request_id = req
        .extensions()
        .get::<Context>()
        .and_then(|ctx| ctx.request_id().map(str::to_string))
        .unwrap_or_default();

    let response = next.run(req).await;

    let status = response.status();
    let latency = start.elapsed();
    let latency_ms = latency.as_millis() as u64;

    metrics::counter!(
        "http_requests_total",
        "method" => method.to_string(),
        "route" => route.clone(),
        "status" => status.as_u16().to_string()
    )
    .increment(1);
    metrics::histogram!("http_request_duration_seconds", "route" => route)
        .record(latency.as_secs_f64());

    match response.extensions().get::<ErrorReport>() {
        Some(report) if status.is_server_error() => tracing::error!(
            %request_id, %method, %uri, status = status.as_u16(), latency_ms,
            error = %report.chain, "request failed"
        ),
        Some(report) => tracing::warn!(
            %request_id, %method, %uri, status = status.as_u16(), latency_ms,
            error = %report.chain, "request rejected"
        ),
        None => tracing::info!(
            %request_id, %method, %uri, status = status.as_u16(), latency_ms,
            "request completed"
        ),
    }

    response
}
