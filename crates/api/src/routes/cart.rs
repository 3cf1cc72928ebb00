//! Cart endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use common::BookId;
use domain::shop::CartResponse;

use crate::error::ApiError;
use crate::middleware::RequestContext;
use crate::state::AppState;

/// GET /active-cart
pub async fn get(
    State(state): State<Arc<AppState>>,
    RequestContext(ctx): RequestContext,
) -> Result<Json<CartResponse>, ApiError> {
    Ok(Json(state.shop.get_cart(&ctx).await?))
}

/// POST /cart/items/{id}
pub async fn add_item(
    State(state): State<Arc<AppState>>,
    RequestContext(ctx): RequestContext,
    Path(id): Path<String>,
) -> Result<Json<CartResponse>, ApiError> {
    Ok(Json(state.shop.add_item_to_cart(&ctx, &BookId::new(id)).await?))
}

/// DELETE /cart/items/{id}
pub async fn remove_item(
    State(state): State<Arc<AppState>>,
    RequestContext(ctx): RequestContext,
    Path(id): Path<String>,
) -> Result<Json<CartResponse>, ApiError> {
    Ok(Json(
        state.shop.remove_item_from_cart(&ctx, &BookId::new(id)).await?,
    ))
}
