//! Payment provider webhook.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use integrations::WebhookEvent;
use integrations::webhook::{DEFAULT_TOLERANCE, SIGNATURE_HEADER, verify_signature};

use crate::error::ApiError;
use crate::middleware::RequestContext;
use crate::state::AppState;

/// POST /stripe/webhook
///
/// Only `payment_intent.succeeded` has an effect: the order named in the
/// intent metadata is completed. Every other event is acknowledged.
#[tracing::instrument(skip_all)]
pub async fn stripe(
    State(state): State<Arc<AppState>>,
    RequestContext(ctx): RequestContext,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, ApiError> {
    if let Some(secret) = &state.webhook_secret {
        let signature = headers
            .get(SIGNATURE_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ApiError::bad_request("missing Stripe-Signature header"))?;
        verify_signature(
            signature,
            &body,
            secret,
            chrono::Utc::now().timestamp(),
            DEFAULT_TOLERANCE,
        )
        .map_err(|e| ApiError::bad_request(e.to_string()))?;
    }

    let event = WebhookEvent::parse(&body).map_err(|e| ApiError::bad_request(e.to_string()))?;
    if !event.is_payment_succeeded() {
        tracing::debug!(kind = %event.kind, "ignoring webhook event");
        return Ok(StatusCode::OK);
    }

    let order_id = event
        .order_id()
        .ok_or_else(|| ApiError::bad_request("payment intent has no orderID metadata"))?;
    state.shop.complete_order(&ctx, &order_id).await?;
    Ok(StatusCode::OK)
}
