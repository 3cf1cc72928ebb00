//! Health check endpoint.

use axum::Json;
use serde::Serialize;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// GET /api/v1/healthcheck
pub async fn check() -> Json<HealthResponse> {
    Json(HealthResponse { status: "OK" })
}
