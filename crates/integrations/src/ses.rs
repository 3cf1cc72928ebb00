//! Email delivery through Amazon SES (v2 API).

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_sesv2::Client;
use aws_sdk_sesv2::config::Region;
use aws_sdk_sesv2::types::{Body, Content, Destination, EmailContent, Message};
use common::Context;
use domain::deadline::bounded;
use domain::{Email, EmailClient};

use crate::error::{IntegrationError, Result};

/// Email client sending plain-text messages from a fixed source address.
#[derive(Clone)]
pub struct SesEmailClient {
    client: Client,
    source: String,
}

impl SesEmailClient {
    /// Loads AWS credentials from the environment and builds the client.
    pub async fn from_env(region: &str, source: impl Into<String>, endpoint: Option<&str>) -> Self {
        let shared = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(region.to_string()))
            .load()
            .await;

        let mut builder = aws_sdk_sesv2::config::Builder::from(&shared);
        if let Some(endpoint) = endpoint {
            builder = builder.endpoint_url(endpoint);
        }

        Self::new(Client::from_conf(builder.build()), source)
    }

    pub fn new(client: Client, source: impl Into<String>) -> Self {
        Self {
            client,
            source: source.into(),
        }
    }

    async fn deliver(&self, email: &Email) -> Result<String> {
        let content = EmailContent::builder()
            .simple(
                Message::builder()
                    .subject(text(&email.subject)?)
                    .body(Body::builder().text(text(&email.body)?).build())
                    .build(),
            )
            .build();

        let output = self
            .client
            .send_email()
            .from_email_address(&self.source)
            .destination(Destination::builder().to_addresses(&email.to).build())
            .content(content)
            .send()
            .await
            .map_err(|e| IntegrationError::Email(e.to_string()))?;

        Ok(output.message_id().unwrap_or_default().to_string())
    }
}

fn text(data: &str) -> Result<Content> {
    Content::builder()
        .data(data)
        .charset("UTF-8")
        .build()
        .map_err(|e| IntegrationError::Email(e.to_string()))
}

#[async_trait]
impl EmailClient for SesEmailClient {
    #[tracing::instrument(skip(self, ctx, email), fields(to = %email.to))]
    async fn send(&self, ctx: &Context, email: Email) -> domain::Result<()> {
        let message_id = bounded(ctx, "ses.send_email", async { Ok(self.deliver(&email).await?) }).await?;
        tracing::debug!(%message_id, "email sent");
        Ok(())
    }
}
