//! Stripe payment intents over the REST API.

use async_trait::async_trait;
use common::Context;
use domain::deadline::{OUTBOUND_CALL_LIMIT, bounded};
use domain::{Order, PaymentClient, PaymentIntentStatus};
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::error::{IntegrationError, Result};

/// Production API base URL.
pub const STRIPE_API_BASE: &str = "https://api.stripe.com";

/// Every order is charged in a single currency.
pub const CURRENCY: &str = "usd";

/// Metadata key carrying the order ID back through the webhook.
pub const ORDER_ID_METADATA_KEY: &str = "orderID";

/// The subset of a payment intent the shop needs.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentIntent {
    pub id: String,
    #[serde(default)]
    pub client_secret: Option<String>,
    pub status: PaymentIntentStatus,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorEnvelope {
    #[serde(default)]
    error: ErrorBody,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
}

/// Payment client backed by Stripe.
#[derive(Clone)]
pub struct StripePaymentClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl StripePaymentClient {
    /// Creates a client for the production API.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::with_base_url(api_key, STRIPE_API_BASE)
    }

    /// Creates a client against another base URL (a mock or a proxy).
    pub fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(OUTBOUND_CALL_LIMIT)
            .build()?;
        Ok(Self {
            http,
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    async fn create_intent(&self, order: &Order) -> Result<PaymentIntent> {
        let form = [
            ("amount", order.total_price().to_string()),
            ("currency", CURRENCY.to_string()),
            ("metadata[orderID]", order.id.as_str().to_string()),
        ];
        let response = self
            .http
            .post(format!("{}/v1/payment_intents", self.base_url))
            .bearer_auth(&self.api_key)
            .header("Idempotency-Key", order.id.as_str())
            .form(&form)
            .send()
            .await?;
        Self::decode(response).await
    }

    async fn cancel_intent(&self, payment_intent_id: &str) -> Result<PaymentIntent> {
        let response = self
            .http
            .post(format!(
                "{}/v1/payment_intents/{payment_intent_id}/cancel",
                self.base_url
            ))
            .bearer_auth(&self.api_key)
            .send()
            .await?;
        Self::decode(response).await
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        let status = response.status();
        if status.is_success() {
            return Ok(response.json().await?);
        }
        let envelope: ErrorEnvelope = response.json().await.unwrap_or_default();
        Err(IntegrationError::PaymentProvider {
            status: status.as_u16(),
            message: envelope.error.message,
        })
    }
}

#[async_trait]
impl PaymentClient for StripePaymentClient {
    #[tracing::instrument(skip(self, ctx, order), fields(order_id = %order.id))]
    async fn create_payment_intent_for_order(
        &self,
        ctx: &Context,
        order: &mut Order,
    ) -> domain::Result<()> {
        let intent = bounded(ctx, "stripe.create_payment_intent", async {
            Ok(self.create_intent(order).await?)
        })
        .await?;

        metrics::counter!("payment_intents_created_total").increment(1);
        tracing::debug!(payment_intent_id = %intent.id, status = ?intent.status, "payment intent created");
        order.attach_payment_intent(
            intent.id,
            intent.client_secret.unwrap_or_default(),
            intent.status,
        );
        Ok(())
    }

    #[tracing::instrument(skip(self, ctx))]
    async fn cancel_payment_intent(&self, ctx: &Context, payment_intent_id: &str) -> domain::Result<()> {
        bounded(ctx, "stripe.cancel_payment_intent", async {
            self.cancel_intent(payment_intent_id).await?;
            Ok(())
        })
        .await
    }
}
