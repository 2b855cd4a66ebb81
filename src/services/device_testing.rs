//! Client for the remote device-testing service.
//!
//! Lists the steps of one execution and turns each step into a
//! [`DeviceOutcome`] from its outcome summary and device dimensions.

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::config::DeviceTestingSettings;
use crate::error::{AppError, AppResult};
use crate::models::{DeviceOutcome, DeviceRunIds, OutcomeCategory};

/// Guard against a service that keeps handing out page tokens.
const MAX_PAGES: usize = 100;

/// Source of the device × step outcome matrix for a build.
#[async_trait]
pub trait DeviceTestingService: Send + Sync {
    async fn execution_outcomes(
        &self,
        run: &DeviceRunIds,
        app_slug: &str,
        build_slug: &str,
    ) -> AppResult<Vec<DeviceOutcome>>;
}

// ============================================================================
// Wire Format
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListStepsResponse {
    #[serde(default)]
    steps: Vec<Step>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Step {
    #[serde(default)]
    outcome: Option<StepOutcome>,
    #[serde(default)]
    dimension_value: Vec<DimensionValue>,
}

#[derive(Debug, Deserialize)]
struct StepOutcome {
    #[serde(default)]
    summary: String,
}

#[derive(Debug, Deserialize)]
struct DimensionValue {
    key: String,
    #[serde(default)]
    value: String,
}

impl Step {
    fn dimension(&self, key: &str) -> String {
        self.dimension_value
            .iter()
            .find(|d| d.key.eq_ignore_ascii_case(key))
            .map(|d| d.value.clone())
            .unwrap_or_default()
    }

    fn into_outcome(self) -> DeviceOutcome {
        let summary = self
            .outcome
            .as_ref()
            .map(|o| o.summary.as_str())
            .unwrap_or("unset");
        DeviceOutcome {
            device_id: self.dimension("Model"),
            os_version: self.dimension("Version"),
            locale: self.dimension("Locale"),
            orientation: self.dimension("Orientation"),
            outcome: OutcomeCategory::parse(summary),
        }
    }
}

// ============================================================================
// HTTP Client
// ============================================================================

/// HTTP client for the tool-results style steps API.
pub struct ToolResultsClient {
    client: reqwest::Client,
    base_url: String,
    project_id: String,
    access_token: Option<SecretString>,
    timeout: Duration,
}

impl ToolResultsClient {
    pub fn new(client: reqwest::Client, settings: &DeviceTestingSettings) -> Self {
        Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            project_id: settings.project_id.clone(),
            access_token: settings.access_token.clone(),
            timeout: settings.timeout,
        }
    }

    fn steps_url(&self, run: &DeviceRunIds, page_token: Option<&str>) -> String {
        let mut url = format!(
            "{}/projects/{}/histories/{}/executions/{}/steps",
            self.base_url,
            urlencoding::encode(&self.project_id),
            urlencoding::encode(&run.history_id),
            urlencoding::encode(&run.execution_id),
        );
        if let Some(token) = page_token {
            url.push_str("?pageToken=");
            url.push_str(&urlencoding::encode(token));
        }
        url
    }

    async fn list_steps_page(
        &self,
        run: &DeviceRunIds,
        page_token: Option<&str>,
    ) -> AppResult<ListStepsResponse> {
        let mut request = self
            .client
            .get(self.steps_url(run, page_token))
            .timeout(self.timeout);
        if let Some(token) = &self.access_token {
            request = request.bearer_auth(token.expose_secret());
        }

        let response = request
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::Upstream(format!(
                "listing steps of execution {} returned {}",
                run.execution_id, status
            )));
        }

        response
            .json::<ListStepsResponse>()
            .await
            .map_err(|e| AppError::Upstream(format!("invalid steps response: {}", e)))
    }
}

#[async_trait]
impl DeviceTestingService for ToolResultsClient {
    #[instrument(
        name = "device_testing.execution_outcomes",
        skip(self, run),
        fields(history_id = %run.history_id, execution_id = %run.execution_id)
    )]
    async fn execution_outcomes(
        &self,
        run: &DeviceRunIds,
        app_slug: &str,
        build_slug: &str,
    ) -> AppResult<Vec<DeviceOutcome>> {
        let mut outcomes = Vec::new();
        let mut page_token: Option<String> = None;

        for _ in 0..MAX_PAGES {
            let page = self.list_steps_page(run, page_token.as_deref()).await?;
            outcomes.extend(page.steps.into_iter().map(Step::into_outcome));

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => {
                    debug!(steps = outcomes.len(), "Fetched device outcomes");
                    return Ok(outcomes);
                }
            }
        }

        Err(AppError::Upstream(format!(
            "execution {} returned more than {} pages of steps",
            run.execution_id, MAX_PAGES
        )))
    }
}
