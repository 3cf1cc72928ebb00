//! Bearer-token authentication for protected routes.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::{HeaderMap, header};
use axum::middleware::Next;
use axum::response::Response;
use common::Context;
use domain::DomainError;

use crate::error::ApiError;
use crate::state::AppState;

/// Returns the token of an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

/// Rejects requests without a valid bearer token and attaches the caller's
/// identity to the request [`Context`].
pub async fn authenticate(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(req.headers()).ok_or(DomainError::Unauthenticated)?;
    let claims = state.authenticator.authenticate(token)?;

    let ctx = req
        .extensions_mut()
        .remove::<Context>()
        .unwrap_or_default()
        .with_user(claims.id, claims.is_admin);
    req.extensions_mut().insert(ctx);

    Ok(next.run(req).await)
}
