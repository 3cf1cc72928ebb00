//! Catalog endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use common::BookId;
use domain::catalog::{
    BookResponse, CreateBook, PaginatedBooksResponse, PresignedUrlResponse, SearchBooks,
    UpdateBook,
};

use crate::error::ApiError;
use crate::middleware::RequestContext;
use crate::state::AppState;

/// GET /books
pub async fn list(
    State(state): State<Arc<AppState>>,
    RequestContext(ctx): RequestContext,
    search: Result<Query<SearchBooks>, QueryRejection>,
) -> Result<Json<PaginatedBooksResponse>, ApiError> {
    let Query(search) = search?;
    Ok(Json(state.catalog.find_books(&ctx, search).await?))
}

/// GET /books/{id}
pub async fn get(
    State(state): State<Arc<AppState>>,
    RequestContext(ctx): RequestContext,
    Path(id): Path<String>,
) -> Result<Json<BookResponse>, ApiError> {
    Ok(Json(state.catalog.find_book_by_id(&ctx, &BookId::new(id)).await?))
}

/// POST /books
pub async fn create(
    State(state): State<Arc<AppState>>,
    RequestContext(ctx): RequestContext,
    payload: Result<Json<CreateBook>, JsonRejection>,
) -> Result<(StatusCode, Json<BookResponse>), ApiError> {
    let Json(req) = payload?;
    let book = state.catalog.create_book(&ctx, req).await?;
    Ok((StatusCode::CREATED, Json(book)))
}

/// PATCH /books/{id}
pub async fn update(
    State(state): State<Arc<AppState>>,
    RequestContext(ctx): RequestContext,
    Path(id): Path<String>,
    payload: Result<Json<UpdateBook>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    let Json(mut req) = payload?;
    req.id = BookId::new(id);
    state.catalog.update_book(&ctx, req).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /books/{id}
pub async fn delete(
    State(state): State<Arc<AppState>>,
    RequestContext(ctx): RequestContext,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.catalog.delete_book(&ctx, &BookId::new(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /presign-url
pub async fn presign_url(
    State(state): State<Arc<AppState>>,
    RequestContext(ctx): RequestContext,
) -> Result<Json<PresignedUrlResponse>, ApiError> {
    Ok(Json(state.catalog.generate_put_presigned_url(&ctx).await?))
}
