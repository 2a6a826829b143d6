//! S3-compatible bucket client.

use aws_config::BehaviorVersion;
use aws_credential_types::Credentials;
use aws_sdk_s3::config::{Builder, Region};
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use async_trait::async_trait;
use metrics::counter;
use tracing::{debug, info};

use crate::error::{StorageError, StorageResult};
use crate::keys;
use crate::store::ObjectStore;

/// Configuration for the bucket client.
#[derive(Debug, Clone)]
pub struct BucketConfig {
    /// S3 API endpoint URL (GCS interoperability endpoint, R2, MinIO, ...)
    pub endpoint_url: String,
    /// HMAC access key ID
    pub access_key_id: String,
    /// HMAC secret
    pub secret_access_key: String,
    /// Bucket name
    pub bucket_name: String,
    /// Region ("auto" for most S3-compatible services)
    pub region: String,
    /// Base URL objects are publicly served from
    pub public_base_url: String,
}

impl BucketConfig {
    /// Create config from environment variables.
    pub fn from_env() -> StorageResult<Self> {
        let endpoint_url = std::env::var("STORAGE_ENDPOINT_URL")
            .map_err(|_| StorageError::config_error("STORAGE_ENDPOINT_URL not set"))?;
        let bucket_name = std::env::var("STORAGE_BUCKET")
            .map_err(|_| StorageError::config_error("STORAGE_BUCKET not set"))?;
        let public_base_url = std::env::var("STORAGE_PUBLIC_BASE_URL").unwrap_or_else(|_| {
            format!("{}/{}", endpoint_url.trim_end_matches('/'), bucket_name)
        });

        Ok(Self {
            access_key_id: std::env::var("STORAGE_ACCESS_KEY_ID")
                .map_err(|_| StorageError::config_error("STORAGE_ACCESS_KEY_ID not set"))?,
            secret_access_key: std::env::var("STORAGE_SECRET_ACCESS_KEY")
                .map_err(|_| StorageError::config_error("STORAGE_SECRET_ACCESS_KEY not set"))?,
            region: std::env::var("STORAGE_REGION").unwrap_or_else(|_| "auto".to_string()),
            endpoint_url,
            bucket_name,
            public_base_url,
        })
    }
}

/// Bucket client over the S3 API.
#[derive(Clone)]
pub struct BucketClient {
    client: Client,
    bucket: String,
    public_base_url: String,
}

impl BucketClient {
    /// Create a new client from configuration.
    pub async fn new(config: BucketConfig) -> StorageResult<Self> {
        let credentials = Credentials::new(
            &config.access_key_id,
            &config.secret_access_key,
            None,
            None,
            "fflow-storage",
        );

        let sdk_config = Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .endpoint_url(&config.endpoint_url)
            .region(Region::new(config.region))
            .credentials_provider(credentials)
            .force_path_style(true)
            .build();

        Ok(Self {
            client: Client::from_conf(sdk_config),
            bucket: config.bucket_name,
            public_base_url: config.public_base_url,
        })
    }

    /// Create from environment variables.
    pub async fn from_env() -> StorageResult<Self> {
        let config = BucketConfig::from_env()?;
        Self::new(config).await
    }

    /// Upload bytes.
    pub async fn upload_bytes(
        &self,
        data: Vec<u8>,
        key: &str,
        content_type: &str,
    ) -> StorageResult<()> {
        debug!("Uploading {} bytes to {}", data.len(), key);

        let result = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(data))
            .content_type(content_type)
            .send()
            .await;

        let outcome = if result.is_ok() { "ok" } else { "error" };
        counter!("storage_uploads_total", "outcome" => outcome).increment(1);

        result.map_err(|e| StorageError::upload_failed(DisplayErrorContext(&e).to_string()))?;
        info!("Uploaded {}", key);
        Ok(())
    }

    /// Check if an object exists.
    pub async fn exists(&self, key: &str) -> StorageResult<bool> {
        match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(e) => match e.as_service_error() {
                Some(err) if err.is_not_found() => Ok(false),
                _ => Err(StorageError::AwsSdk(DisplayErrorContext(&e).to_string())),
            },
        }
    }

    /// Delete an existing object.
    pub async fn delete_object(&self, key: &str) -> StorageResult<()> {
        debug!("Deleting {}", key);

        // S3 deletes succeed for missing keys; report them instead.
        if !self.exists(key).await? {
            return Err(StorageError::not_found(key));
        }

        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| StorageError::delete_failed(DisplayErrorContext(&e).to_string()))?;

        info!("Deleted {}", key);
        Ok(())
    }

    /// Check connectivity by performing a head bucket operation.
    pub async fn check_connectivity(&self) -> StorageResult<()> {
        self.client
            .head_bucket()
            .bucket(&self.bucket)
            .send()
            .await
            .map_err(|e| {
                StorageError::AwsSdk(format!(
                    "Storage connectivity check failed: {}",
                    DisplayErrorContext(&e)
                ))
            })?;
        Ok(())
    }
}

#[async_trait]
impl ObjectStore for BucketClient {
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> StorageResult<()> {
        self.upload_bytes(bytes, key, content_type).await
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        self.delete_object(key).await
    }

    fn public_url(&self, key: &str) -> String {
        keys::public_url(&self.public_base_url, key)
    }

    fn key_from_url(&self, url: &str) -> StorageResult<String> {
        keys::key_from_url(&self.public_base_url, url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn set_required_env() {
        std::env::set_var("STORAGE_ENDPOINT_URL", "https://storage.googleapis.com");
        std::env::set_var("STORAGE_ACCESS_KEY_ID", "GOOG1EXAMPLE");
        std::env::set_var("STORAGE_SECRET_ACCESS_KEY", "secret");
        std::env::set_var("STORAGE_BUCKET", "fashion-flow");
    }

    fn clear_env() {
        for var in [
            "STORAGE_ENDPOINT_URL",
            "STORAGE_ACCESS_KEY_ID",
            "STORAGE_SECRET_ACCESS_KEY",
            "STORAGE_BUCKET",
            "STORAGE_REGION",
            "STORAGE_PUBLIC_BASE_URL",
        ] {
            std::env::remove_var(var);
        }
    }

    #[test]
    #[serial]
    fn test_config_requires_endpoint() {
        clear_env();
        assert!(matches!(BucketConfig::from_env(), Err(StorageError::ConfigError(_))));
    }

    #[test]
    #[serial]
    fn test_config_defaults() {
        clear_env();
        set_required_env();
        let config = BucketConfig::from_env().unwrap();
        assert_eq!(config.region, "auto");
        assert_eq!(config.public_base_url, "https://storage.googleapis.com/fashion-flow");
        clear_env();
    }

    #[tokio::test]
    #[serial]
    async fn test_client_maps_urls_through_public_base() {
        clear_env();
        set_required_env();
        std::env::set_var("STORAGE_PUBLIC_BASE_URL", "https://cdn.example.com");
        let client = BucketClient::from_env().await.unwrap();
        let url = client.public_url("banners/1_summer.png");
        assert_eq!(url, "https://cdn.example.com/banners/1_summer.png");
        assert_eq!(client.key_from_url(&url).unwrap(), "banners/1_summer.png");
        clear_env();
    }
}
