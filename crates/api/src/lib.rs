//! HTTP API server for the e-book store.
//!
//! Exposes the Authenticator, Catalog and Shop services under `/api/v1`,
//! with structured logging (tracing) and Prometheus metrics.

pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod state;

use std::any::Any;
use std::sync::Arc;

use axum::Router;
use axum::middleware::{from_fn, from_fn_with_state};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use metrics_exporter_prometheus::PrometheusHandle;
use tower::ServiceBuilder;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any as AnyOrigin, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::error::ApiError;
use crate::middleware::RateLimiter;

pub use config::Config;
pub use state::{AppState, HttpSettings};

/// Base path of every API route.
pub const API_PREFIX: &str = "/api/v1";

fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = panic
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_default();
    tracing::error!(panic = %detail, "handler panicked");
    ApiError::Panic.into_response()
}

/// Routes reachable without a bearer token.
fn public_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/register", post(routes::auth::register))
        .route("/login", post(routes::auth::login))
        .route("/password-reset", post(routes::auth::reset_password))
        .route("/healthcheck", get(routes::health::check))
        .route("/stripe/webhook", post(routes::webhook::stripe))
}

/// Routes that require a valid bearer token.
fn protected_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/books", get(routes::books::list).post(routes::books::create))
        .route(
            "/books/{id}",
            get(routes::books::get)
                .patch(routes::books::update)
                .delete(routes::books::delete),
        )
        .route("/presign-url", post(routes::books::presign_url))
        .route("/orders", get(routes::orders::list).post(routes::orders::create))
        .route("/orders/{id}", get(routes::orders::get))
        .route(
            "/orders/{id}/items/{item_id}/download",
            get(routes::orders::download),
        )
        .route("/active-cart", get(routes::cart::get))
        .route(
            "/cart/items/{id}",
            post(routes::cart::add_item).delete(routes::cart::remove_item),
        )
        .route_layer(from_fn_with_state(state, middleware::authenticate))
}

/// Creates the Axum application router with all routes and shared state.
///
/// Middleware runs in this order: correlation ID, panic recovery, body
/// limit, CORS, rate limit, request timeout, access log, then
/// authentication on protected routes. Errors are translated by
/// [`ApiError`]'s `IntoResponse` implementation.
pub fn create_app(
    state: Arc<AppState>,
    metrics_handle: PrometheusHandle,
    settings: HttpSettings,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    let api = public_routes()
        .merge(protected_routes(state.clone()))
        .with_state(state);

    let limiter = Arc::new(RateLimiter::per_hour(settings.rate_limit_per_hour));

    Router::new()
        .nest(API_PREFIX, api)
        .merge(metrics_router)
        .layer(
            ServiceBuilder::new()
                .layer(from_fn_with_state(
                    settings.request_timeout,
                    middleware::request_context,
                ))
                .layer(TraceLayer::new_for_http())
                .layer(CatchPanicLayer::custom(panic_response))
                .layer(RequestBodyLimitLayer::new(settings.body_limit_bytes))
                .map_request(|req: axum::http::Request<_>| req.map(axum::body::Body::new))
                .layer(
                    CorsLayer::new()
                        .allow_origin(AnyOrigin)
                        .allow_methods(AnyOrigin)
                        .allow_headers(AnyOrigin),
                )
                .layer(from_fn_with_state(limiter, middleware::rate_limit))
                .layer(TimeoutLayer::new(settings.request_timeout))
                .layer(from_fn(middleware::log_response)),
        )
}
