//! Prometheus scrape endpoint, served outside `/api/v1`.

use axum::extract::State;
use axum::http::header::CONTENT_TYPE;
use axum::response::IntoResponse;
use metrics_exporter_prometheus::PrometheusHandle;

const PROMETHEUS_TEXT: &str = "text/plain; version=0.0.4; charset=utf-8";

/// GET /metrics
///
/// Renders `http_requests_total`, `http_request_duration_seconds`,
/// `storage_call_duration_seconds` and the payment counters recorded since
/// start-up.
pub async fn get(State(handle): State<PrometheusHandle>) -> impl IntoResponse {
    ([(CONTENT_TYPE, PROMETHEUS_TEXT)], handle.render())
}
