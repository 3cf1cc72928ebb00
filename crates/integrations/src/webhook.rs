//! Stripe webhook events and signature verification.
//!
//! The `Stripe-Signature` header looks like `t=1700000000,v1=<hex>,v1=<hex>`.
//! Each `v1` entry is an HMAC-SHA256 of `"{t}.{body}"` keyed by the endpoint
//! secret; one matching entry within the tolerance window is enough.

use std::collections::HashMap;
use std::time::Duration;

use common::OrderId;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;

use crate::error::{IntegrationError, Result};
use crate::stripe::ORDER_ID_METADATA_KEY;

/// Header that carries the signature.
pub const SIGNATURE_HEADER: &str = "Stripe-Signature";

/// Maximum age of a signed timestamp.
pub const DEFAULT_TOLERANCE: Duration = Duration::from_secs(300);

/// The only event type with side effects.
pub const PAYMENT_INTENT_SUCCEEDED: &str = "payment_intent.succeeded";

type HmacSha256 = Hmac<Sha256>;

/// A webhook delivery, reduced to what the shop reads.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEvent {
    #[serde(rename = "type")]
    pub kind: String,
    pub data: WebhookData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookData {
    pub object: WebhookObject,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookObject {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl WebhookEvent {
    /// Parses a raw webhook body.
    pub fn parse(body: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(body)?)
    }

    pub fn is_payment_succeeded(&self) -> bool {
        self.kind == PAYMENT_INTENT_SUCCEEDED
    }

    /// The order ID stored in the intent metadata, if present.
    pub fn order_id(&self) -> Option<OrderId> {
        self.data
            .object
            .metadata
            .get(ORDER_ID_METADATA_KEY)
            .filter(|id| !id.is_empty())
            .map(OrderId::new)
    }
}

/// Checks `header` against `payload` as signed with `secret` at a time no
/// older than `tolerance` relative to `now` (unix seconds).
pub fn verify_signature(
    header: &str,
    payload: &[u8],
    secret: &str,
    now: i64,
    tolerance: Duration,
) -> Result<()> {
    let mut timestamp = None;
    let mut signatures = Vec::new();
    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => timestamp = value.parse::<i64>().ok(),
            Some(("v1", value)) => signatures.push(value),
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or(IntegrationError::InvalidSignature("missing timestamp"))?;
    if signatures.is_empty() {
        return Err(IntegrationError::InvalidSignature("missing v1 signature"));
    }
    if now.saturating_sub(timestamp).unsigned_abs() > tolerance.as_secs() {
        return Err(IntegrationError::InvalidSignature("timestamp outside tolerance"));
    }

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| IntegrationError::InvalidSignature("unusable secret"))?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);

    let matched = signatures.iter().any(|candidate| {
        hex::decode(candidate)
            .map(|bytes| mac.clone().verify_slice(&bytes).is_ok())
            .unwrap_or(false)
    });
    if matched {
        Ok(())
    } else {
        Err(IntegrationError::InvalidSignature("no matching signature"))
    }
}

/// Computes a `Stripe-Signature` header value for `payload`.
pub fn sign(payload: &[u8], secret: &str, timestamp: i64) -> Result<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| IntegrationError::InvalidSignature("unusable secret"))?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    Ok(format!(
        "t={timestamp},v1={}",
        hex::encode(mac.finalize().into_bytes())
    ))
}
