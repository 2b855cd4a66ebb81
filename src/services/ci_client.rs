//! Client for the host CI system's add-on API.

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use tracing::{info, instrument};

use crate::config::{CI_AUTH_HEADER, CiSettings};
use crate::error::{AppError, AppResult};
use crate::models::{CiBuild, StepVerdict};

/// Operations the add-on performs against the CI host.
#[async_trait]
pub trait CiSystem: Send + Sync {
    /// Report the verdict of one build step. Called once per request.
    async fn submit_step_result(
        &self,
        token: &SecretString,
        app_slug: &str,
        build_slug: &str,
        verdict: &StepVerdict,
    ) -> AppResult<()>;

    async fn get_build(
        &self,
        token: &SecretString,
        app_slug: &str,
        build_slug: &str,
    ) -> AppResult<CiBuild>;
}

/// reqwest-backed [`CiSystem`].
pub struct HttpCiClient {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl HttpCiClient {
    pub fn new(client: reqwest::Client, settings: &CiSettings) -> Self {
        Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            timeout: settings.timeout,
        }
    }

    fn build_url(&self, app_slug: &str, build_slug: &str) -> String {
        format!(
            "{}/v0.1/apps/{}/builds/{}",
            self.base_url,
            urlencoding::encode(app_slug),
            urlencoding::encode(build_slug)
        )
    }
}

#[async_trait]
impl CiSystem for HttpCiClient {
    #[instrument(
        name = "ci.submit_step_result",
        skip(self, token, verdict),
        fields(app_slug = %app_slug, build_slug = %build_slug, status = verdict.status.as_str())
    )]
    async fn submit_step_result(
        &self,
        token: &SecretString,
        app_slug: &str,
        build_slug: &str,
        verdict: &StepVerdict,
    ) -> AppResult<()> {
        let url = format!("{}/test_step_results", self.build_url(app_slug, build_slug));

        let response = self
            .client
            .post(&url)
            .header(CI_AUTH_HEADER, token.expose_secret())
            .timeout(self.timeout)
            .json(verdict)
            .send()
            .await
            .map_err(|e| AppError::ReportSubmission(format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::ReportSubmission(format!(
                "CI host responded with {}",
                status
            )));
        }

        info!(total = verdict.total, failed = verdict.failed_tests.len(), "Step result submitted");
        Ok(())
    }

    #[instrument(name = "ci.get_build", skip(self, token))]
    async fn get_build(
        &self,
        token: &SecretString,
        app_slug: &str,
        build_slug: &str,
    ) -> AppResult<CiBuild> {
        #[derive(serde::Deserialize)]
        struct Envelope {
            data: CiBuild,
        }

        let response = self
            .client
            .get(self.build_url(app_slug, build_slug))
            .header(CI_AUTH_HEADER, token.expose_secret())
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("CI request failed: {}", e)))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(AppError::NotFound(format!("Build {}", build_slug)));
        }
        if !status.is_success() {
            return Err(AppError::Upstream(format!("CI host responded with {}", status)));
        }

        let envelope = response
            .json::<Envelope>()
            .await
            .map_err(|e| AppError::Upstream(format!("invalid build response: {}", e)))?;
        Ok(envelope.data)
    }
}
