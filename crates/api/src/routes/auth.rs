//! Registration, login and password reset.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use domain::Credentials;
use domain::auth::{LoginRequest, PasswordResetRequest, RegisterRequest};

use crate::error::ApiError;
use crate::middleware::RequestContext;
use crate::state::AppState;

/// POST /register
pub async fn register(
    State(state): State<Arc<AppState>>,
    RequestContext(ctx): RequestContext,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Credentials>), ApiError> {
    let Json(req) = payload?;
    let credentials = state.authenticator.register(&ctx, req).await?;
    Ok((StatusCode::CREATED, Json(credentials)))
}

/// POST /login
pub async fn login(
    State(state): State<Arc<AppState>>,
    RequestContext(ctx): RequestContext,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<Credentials>, ApiError> {
    let Json(req) = payload?;
    Ok(Json(state.authenticator.login(&ctx, req).await?))
}

/// POST /password-reset
pub async fn reset_password(
    State(state): State<Arc<AppState>>,
    RequestContext(ctx): RequestContext,
    payload: Result<Json<PasswordResetRequest>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    let Json(req) = payload?;
    state.authenticator.reset_password(&ctx, req).await?;
    Ok(StatusCode::NO_CONTENT)
}
