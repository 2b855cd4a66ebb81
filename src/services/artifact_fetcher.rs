//! Artifact retrieval over presigned URLs.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use tracing::{debug, instrument, warn};

use crate::error::{AppError, AppResult};
use crate::models::ReportRecord;
use crate::services::storage::ArtifactStore;

/// Retrieves the raw artifact of a report.
#[async_trait]
pub trait ArtifactFetcher: Send + Sync {
    async fn fetch(&self, record: &ReportRecord) -> AppResult<Vec<u8>>;
}

/// Downloads artifacts with one plain GET against a presigned URL.
///
/// A single attempt is made; callers that need retries wrap this type.
pub struct HttpArtifactFetcher {
    store: Arc<dyn ArtifactStore>,
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpArtifactFetcher {
    pub fn new(store: Arc<dyn ArtifactStore>, client: reqwest::Client, timeout: Duration) -> Self {
        Self {
            store,
            client,
            timeout,
        }
    }
}

#[async_trait]
impl ArtifactFetcher for HttpArtifactFetcher {
    #[instrument(name = "artifact.fetch", skip(self, record), fields(report_id = %record.id))]
    async fn fetch(&self, record: &ReportRecord) -> AppResult<Vec<u8>> {
        let fetch_error = |status: Option<u16>, message: String| AppError::Fetch {
            report_id: record.id,
            status,
            message,
        };

        let url = self
            .store
            .download_url(&record.path_in_bucket())
            .await
            .map_err(|e| fetch_error(None, format!("could not obtain download URL: {}", e)))?;

        let response = self
            .client
            .get(&url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| fetch_error(None, format!("request failed: {}", e)))?;

        let status = response.status();
        if status != StatusCode::OK {
            warn!(status = status.as_u16(), "Artifact download rejected");
            return Err(fetch_error(
                Some(status.as_u16()),
                format!("unexpected status {}", status),
            ));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| fetch_error(Some(status.as_u16()), format!("failed to read body: {}", e)))?;

        debug!(bytes = body.len(), "Artifact downloaded");
        Ok(body.to_vec())
    }
}
