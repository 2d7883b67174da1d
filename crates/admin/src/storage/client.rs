//! HTTP object-storage client.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use secrecy::{ExposeSecret, SecretString};
use tracing::instrument;

use mytechgear_core::media::Bucket;

use super::{ObjectStorage, StorageError};
use crate::config::StorageConfig;

/// Client for the object-storage REST API.
///
/// Every request authenticates with the service key as a bearer token.
/// Objects are written to `{url}/object/{bucket}/{path}` and served from
/// `{url}/object/public/{bucket}/{path}`.
#[derive(Clone)]
pub struct StorageClient {
    inner: Arc<StorageClientInner>,
}

struct StorageClientInner {
    client: reqwest::Client,
    base_url: String,
    service_key: SecretString,
}

impl StorageClient {
    /// Create a client for the configured storage service.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be created. This should never happen
    /// under normal circumstances as we use standard TLS configuration.
    #[must_use]
    pub fn new(config: &StorageConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            inner: Arc::new(StorageClientInner {
                client,
                base_url: config.url.trim_end_matches('/').to_string(),
                service_key: config.service_key.clone(),
            }),
        }
    }

    fn object_url(&self, bucket: Bucket, path: &str) -> String {
        format!("{}/object/{bucket}/{path}", self.inner.base_url)
    }

    async fn check(response: reqwest::Response, path: &str) -> Result<(), StorageError> {
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        match status {
            reqwest::StatusCode::NOT_FOUND => Err(StorageError::NotFound(path.to_string())),
            reqwest::StatusCode::UNAUTHORIZED | reqwest::StatusCode::FORBIDDEN => {
                Err(StorageError::Unauthorized)
            }
            _ => {
                let message = response.text().await.unwrap_or_default();
                Err(StorageError::Rejected {
                    status: status.as_u16(),
                    message,
                })
            }
        }
    }
}

impl ObjectStorage for StorageClient {
    #[instrument(skip(self, body), fields(bucket = %bucket, size = body.len()))]
    async fn upload(
        &self,
        bucket: Bucket,
        path: &str,
        content_type: &str,
        body: Bytes,
    ) -> Result<(), StorageError> {
        let response = self
            .inner
            .client
            .post(self.object_url(bucket, path))
            .bearer_auth(self.inner.service_key.expose_secret())
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .header(reqwest::header::CACHE_CONTROL, "max-age=3600")
            .header("x-upsert", "false")
            .body(body)
            .send()
            .await?;

        Self::check(response, path).await
    }

    fn public_url(&self, bucket: Bucket, path: &str) -> String {
        format!("{}/object/public/{bucket}/{path}", self.inner.base_url)
    }

    #[instrument(skip(self), fields(bucket = %bucket))]
    async fn remove(&self, bucket: Bucket, path: &str) -> Result<(), StorageError> {
        let response = self
            .inner
            .client
            .delete(self.object_url(bucket, path))
            .bearer_auth(self.inner.service_key.expose_secret())
            .send()
            .await?;

        Self::check(response, path).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> StorageClient {
        StorageClient::new(&StorageConfig {
            url: "https://storage.mytechgear.test/storage/v1/".to_string(),
            service_key: SecretString::from("k".repeat(40)),
        })
    }

    #[test]
    fn test_public_url() {
        assert_eq!(
            client().public_url(Bucket::ProductGallery, "p1/gallery-1-abc.webp"),
            "https://storage.mytechgear.test/storage/v1/object/public/product-gallery/p1/gallery-1-abc.webp"
        );
    }

    #[test]
    fn test_object_url() {
        assert_eq!(
            client().object_url(Bucket::UiAssets, "banner/main-1-x.png"),
            "https://storage.mytechgear.test/storage/v1/object/ui-assets/banner/main-1-x.png"
        );
    }
}
