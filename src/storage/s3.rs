//! AWS S3 cover storage implementation.
//!
//! Covers live under `{bucket}/{prefix}/{key}` and are addressed by their
//! virtual-hosted URL `https://{bucket}.s3.{region}.amazonaws.com/{prefix}/{key}`.

use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use tokio::time::{Instant, sleep};

use crate::error::{AppError, Result};
use crate::models::CoverConfig;
use crate::storage::CoverStore;

/// Delay between visibility checks after an upload.
const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// S3-based cover image storage.
pub struct S3CoverStore {
    client: Client,
    bucket: String,
    prefix: String,
    region: String,
    visibility_timeout: Duration,
}

impl S3CoverStore {
    /// Create a new S3 cover store.
    pub fn new(client: Client, config: &CoverConfig, region: impl Into<String>) -> Self {
        Self {
            client,
            bucket: config.bucket.clone(),
            prefix: config.prefix.trim_matches('/').to_string(),
            region: region.into(),
            visibility_timeout: Duration::from_secs(config.visibility_timeout_secs),
        }
    }

    fn object_key(&self, key: &str) -> String {
        object_key(&self.prefix, key)
    }

    /// Check if an object exists in S3.
    async fn exists(&self, object_key: &str) -> bool {
        self.client
            .head_object()
            .bucket(&self.bucket)
            .key(object_key)
            .send()
            .await
            .is_ok()
    }

    /// Block until the object is readable or the visibility timeout passes.
    async fn wait_until_visible(&self, object_key: &str) -> Result<()> {
        let deadline = Instant::now() + self.visibility_timeout;
        loop {
            if self.exists(object_key).await {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(AppError::object_store(format!(
                    "s3://{}/{} not readable after {}s",
                    self.bucket,
                    object_key,
                    self.visibility_timeout.as_secs()
                )));
            }
            sleep(POLL_INTERVAL).await;
        }
    }
}

#[async_trait]
impl CoverStore for S3CoverStore {
    async fn put_cover(&self, key: &str, content_type: &str, bytes: Vec<u8>) -> Result<String> {
        let object_key = self.object_key(key);
        let size = bytes.len();

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&object_key)
            .body(ByteStream::from(bytes))
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| AppError::object_store(DisplayErrorContext(e)))?;

        self.wait_until_visible(&object_key).await?;

        log::info!("Uploaded {} bytes to s3://{}/{}", size, self.bucket, object_key);
        Ok(object_url(&self.bucket, &self.region, &object_key))
    }

    async fn delete_cover(&self, key: &str) -> Result<()> {
        let object_key = self.object_key(key);

        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(&object_key)
            .send()
            .await
            .map_err(|e| AppError::object_store(DisplayErrorContext(e)))?;

        log::info!("Deleted s3://{}/{}", self.bucket, object_key);
        Ok(())
    }
}

/// Full object key for a cover key under `prefix`.
fn object_key(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{}/{}", prefix, key)
    }
}

/// Public virtual-hosted URL of an object.
fn object_url(bucket: &str, region: &str, object_key: &str) -> String {
    format!("https://{}.s3.{}.amazonaws.com/{}", bucket, region, object_key)
}
