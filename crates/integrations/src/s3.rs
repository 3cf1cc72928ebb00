//! Presigned URLs for the S3 bucket holding images and book content.

use std::time::Duration;

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::Client;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::presigning::PresigningConfig;
use common::Context;
use domain::StorageClient;
use domain::deadline::bounded;

use crate::error::{IntegrationError, Result};

/// Lifetime of every presigned URL.
pub const PRESIGNED_URL_EXPIRY: Duration = Duration::from_secs(15 * 60);

/// Storage client that presigns `GetObject` and `PutObject` requests.
#[derive(Clone)]
pub struct S3StorageClient {
    client: Client,
    bucket: String,
    expiry: Duration,
}

impl S3StorageClient {
    /// Loads AWS credentials from the environment and builds the client.
    ///
    /// A custom `endpoint` (LocalStack, MinIO) switches to path-style
    /// addressing.
    pub async fn from_env(region: &str, bucket: impl Into<String>, endpoint: Option<&str>) -> Self {
        let shared = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(region.to_string()))
            .load()
            .await;

        let mut builder = aws_sdk_s3::config::Builder::from(&shared);
        if let Some(endpoint) = endpoint {
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }

        Self::new(Client::from_conf(builder.build()), bucket, PRESIGNED_URL_EXPIRY)
    }

    pub fn new(client: Client, bucket: impl Into<String>, expiry: Duration) -> Self {
        Self {
            client,
            bucket: bucket.into(),
            expiry,
        }
    }

    fn presigning(&self) -> Result<PresigningConfig> {
        PresigningConfig::expires_in(self.expiry).map_err(|e| IntegrationError::Storage(e.to_string()))
    }

    async fn presign_get(&self, key: &str) -> Result<String> {
        let request = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(self.presigning()?)
            .await
            .map_err(|e| IntegrationError::Storage(e.to_string()))?;
        Ok(request.uri().to_string())
    }

    async fn presign_put(&self, key: &str) -> Result<String> {
        let request = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(self.presigning()?)
            .await
            .map_err(|e| IntegrationError::Storage(e.to_string()))?;
        Ok(request.uri().to_string())
    }
}

#[async_trait]
impl StorageClient for S3StorageClient {
    async fn generate_get_presigned_url(&self, ctx: &Context, key: &str) -> domain::Result<String> {
        bounded(ctx, "s3.presign_get", async { Ok(self.presign_get(key).await?) }).await
    }

    async fn generate_put_presigned_url(&self, ctx: &Context, key: &str) -> domain::Result<String> {
        bounded(ctx, "s3.presign_put", async { Ok(self.presign_put(key).await?) }).await
    }
}

#[cfg(test)]
mod tests {
    use aws_sdk_s3::config::Credentials;

    use super::*;

    fn client() -> S3StorageClient {
        let config = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new("us-east-1"))
            .credentials_provider(Credentials::new("AKIDTEST", "secret", None, None, "test"))
            .endpoint_url("http://localhost:4566")
            .force_path_style(true)
            .build();
        S3StorageClient::new(Client::from_conf(config), "books", Duration::from_secs(600))
    }

    #[tokio::test]
    async fn test_get_url_is_signed_for_key() {
        let url = client()
            .generate_get_presigned_url(&Context::new(), "content/book-1.pdf")
            .await
            .unwrap();

        assert!(url.starts_with("http://localhost:4566/books/content/book-1.pdf?"), "{url}");
        assert!(url.contains("X-Amz-Signature="));
        assert!(url.contains("X-Amz-Expires=600"));
    }

    #[tokio::test]
    async fn test_put_url_differs_from_get_url() {
        let client = client();
        let ctx = Context::new();
        let get = client.generate_get_presigned_url(&ctx, "img-1").await.unwrap();
        let put = client.generate_put_presigned_url(&ctx, "img-1").await.unwrap();

        assert!(put.contains("/books/img-1?"));
        assert_ne!(get, put);
    }
}
