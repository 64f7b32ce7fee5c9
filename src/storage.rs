use std::time::Duration;

use anyhow::{ensure, Context};
use async_trait::async_trait;
use aws_config::{defaults, BehaviorVersion};
use aws_credential_types::Credentials;
use aws_sdk_s3::{
    config::{Builder as S3ConfigBuilder, Region},
    presigning::PresigningConfig,
    Client,
};
use aws_smithy_types::byte_stream::ByteStream;
use bytes::Bytes;

use crate::config::AppConfig;

/// SigV4 caps presigned URLs at one week.
const MAX_URL_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Where recipe images live. Keys are opaque to the store.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put(&self, key: &str, body: Bytes, content_type: &str) -> anyhow::Result<()>;
    async fn remove(&self, key: &str) -> anyhow::Result<()>;
    async fn signed_url(&self, key: &str, ttl: Duration) -> anyhow::Result<String>;
}

/// MinIO bucket addressed path-style.
#[derive(Clone)]
pub struct ImageBucket {
    client: Client,
    bucket: String,
}

impl ImageBucket {
    /// Builds the client and fails fast when the bucket is unreachable.
    pub async fn connect(config: &AppConfig) -> anyhow::Result<Self> {
        let credentials = Credentials::new(
            &config.minio_access_key,
            &config.minio_secret_key,
            None,
            None,
            "foodgram-env",
        );
        let sdk = defaults(BehaviorVersion::latest())
            .region(Region::new(config.minio_region.clone()))
            .credentials_provider(credentials)
            .load()
            .await;
        let s3 = S3ConfigBuilder::from(&sdk)
            .endpoint_url(&config.minio_endpoint)
            .force_path_style(true)
            .build();

        let bucket = Self {
            client: Client::from_conf(s3),
            bucket: config.minio_bucket.clone(),
        };
        bucket
            .client
            .head_bucket()
            .bucket(&bucket.bucket)
            .send()
            .await
            .with_context(|| format!("bucket {} at {}", bucket.bucket, config.minio_endpoint))?;
        Ok(bucket)
    }
}

#[async_trait]
impl ObjectStore for ImageBucket {
    async fn put(&self, key: &str, body: Bytes, content_type: &str) -> anyhow::Result<()> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(body))
            .send()
            .await
            .with_context(|| format!("upload {}/{}", self.bucket, key))?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> anyhow::Result<()> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .with_context(|| format!("delete {}/{}", self.bucket, key))?;
        Ok(())
    }

    async fn signed_url(&self, key: &str, ttl: Duration) -> anyhow::Result<String> {
        let signed = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(presigning(ttl)?)
            .await
            .with_context(|| format!("sign {}/{}", self.bucket, key))?;
        Ok(signed.uri().to_string())
    }
}

fn presigning(ttl: Duration) -> anyhow::Result<PresigningConfig> {
    ensure!(!ttl.is_zero(), "image url ttl must be positive");
    ensure!(
        ttl <= MAX_URL_TTL,
        "image url ttl of {}s exceeds {}s",
        ttl.as_secs(),
        MAX_URL_TTL.as_secs()
    );
    Ok(PresigningConfig::expires_in(ttl)?)
}
