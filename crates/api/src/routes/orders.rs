//! Order endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use common::{BookId, OrderId};
use domain::catalog::UrlResponse;
use domain::shop::{DownloadItem, OrderResponse, PaginatedOrdersResponse, SearchOrders};

use crate::error::ApiError;
use crate::middleware::RequestContext;
use crate::state::AppState;

/// GET /orders: the caller's orders, or every order for administrators.
#[tracing::instrument(skip_all)]
pub async fn list(
    State(state): State<Arc<AppState>>,
    RequestContext(ctx): RequestContext,
    search: Result<Query<SearchOrders>, QueryRejection>,
) -> Result<Json<PaginatedOrdersResponse>, ApiError> {
    let Query(search) = search?;
    Ok(Json(state.shop.find_orders(&ctx, search).await?))
}

/// GET /orders/{id}
pub async fn get(
    State(state): State<Arc<AppState>>,
    RequestContext(ctx): RequestContext,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    Ok(Json(state.shop.find_order_by_id(&ctx, &OrderId::new(id)).await?))
}

/// POST /orders: turns the caller's cart into a pending order.
#[tracing::instrument(skip_all)]
pub async fn create(
    State(state): State<Arc<AppState>>,
    RequestContext(ctx): RequestContext,
) -> Result<(StatusCode, Json<OrderResponse>), ApiError> {
    let order = state.shop.create_order(&ctx).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

/// GET /orders/{id}/items/{item_id}/download
pub async fn download(
    State(state): State<Arc<AppState>>,
    RequestContext(ctx): RequestContext,
    Path((order_id, item_id)): Path<(String, String)>,
) -> Result<Json<UrlResponse>, ApiError> {
    let req = DownloadItem {
        order_id: OrderId::new(order_id),
        item_id: BookId::new(item_id),
    };
    Ok(Json(state.shop.download_order_item_content(&ctx, req).await?))
}
