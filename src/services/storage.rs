//! S3 storage service for test report artifacts.
//!
//! Issues presigned upload and download URLs; report bytes never pass through
//! this server on upload. Supports both AWS S3 and MinIO for development.

use std::time::Duration;

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::Client;
use aws_sdk_s3::config::{Credentials, Region};
use aws_sdk_s3::presigning::PresigningConfig;
use tracing::{debug, info};

use crate::config::StorageSettings;
use crate::error::{AppError, AppResult};

/// Issues time-bounded URLs for object keys.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Presigned GET URL for `key`.
    async fn download_url(&self, key: &str) -> AppResult<String>;

    /// Presigned PUT URL for `key`, bound to the declared content length.
    async fn upload_url(&self, key: &str, content_length: i64) -> AppResult<String>;
}

/// S3 storage client wrapper.
#[derive(Clone)]
pub struct Storage {
    client: Client,
    bucket: String,
    presign_expiry: Duration,
}

impl Storage {
    /// Create a new S3 storage client from configuration.
    pub async fn new(config: &StorageSettings) -> AppResult<Self> {
        let credentials =
            Credentials::new(&config.access_key, &config.secret_key, None, None, "testlab-addon");

        let region = Region::new(config.region.clone());

        let mut s3_config_builder = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(region)
            .credentials_provider(credentials)
            .force_path_style(true); // Required for MinIO

        // Use custom endpoint for MinIO in development
        if let Some(ref endpoint) = config.endpoint {
            s3_config_builder = s3_config_builder.endpoint_url(endpoint);
        }

        let client = Client::from_conf(s3_config_builder.build());

        let storage = Self {
            client,
            bucket: config.bucket.clone(),
            presign_expiry: config.presign_expiry,
        };

        storage.ensure_bucket_exists().await?;

        info!(
            "S3 storage initialized: bucket={}, presign_expiry={}s",
            config.bucket,
            config.presign_expiry.as_secs()
        );

        Ok(storage)
    }

    /// Ensure the bucket exists, creating it if necessary.
    async fn ensure_bucket_exists(&self) -> AppResult<()> {
        match self.client.head_bucket().bucket(&self.bucket).send().await {
            Ok(_) => Ok(()),
            Err(e) => {
                let service_error = e.into_service_error();
                if service_error.is_not_found() {
                    info!("Creating S3 bucket '{}'", self.bucket);
                    self.client
                        .create_bucket()
                        .bucket(&self.bucket)
                        .send()
                        .await
                        .map_err(|e| {
                            AppError::Storage(format!("Failed to create bucket: {}", e))
                        })?;
                    Ok(())
                } else {
                    Err(AppError::Storage(format!(
                        "Failed to access bucket '{}': {}",
                        self.bucket, service_error
                    )))
                }
            }
        }
    }

    fn presigning_config(&self) -> AppResult<PresigningConfig> {
        PresigningConfig::expires_in(self.presign_expiry)
            .map_err(|e| AppError::Storage(format!("Invalid presign expiry: {}", e)))
    }
}

#[async_trait]
impl ArtifactStore for Storage {
    async fn download_url(&self, key: &str) -> AppResult<String> {
        let request = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(self.presigning_config()?)
            .await
            .map_err(|e| AppError::Storage(format!("Failed to presign download: {}", e)))?;

        debug!(key = %key, "Issued presigned download URL");
        Ok(request.uri().to_string())
    }

    async fn upload_url(&self, key: &str, content_length: i64) -> AppResult<String> {
        let request = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_length(content_length)
            .content_type("application/xml")
            .presigned(self.presigning_config()?)
            .await
            .map_err(|e| AppError::Storage(format!("Failed to presign upload: {}", e)))?;

        debug!(key = %key, content_length, "Issued presigned upload URL");
        Ok(request.uri().to_string())
    }
}
