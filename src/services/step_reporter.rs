//! Step verdict derivation and submission.

use std::sync::Arc;

use tracing::{info, instrument};
use uuid::Uuid;

use crate::db::{AppRegistry, ReportRegistry};
use crate::error::{AppError, AppResult};
use crate::models::{StepVerdict, VERDICT_STATUSES};
use crate::services::aggregator::Aggregator;
use crate::services::ci_client::CiSystem;

/// Derives the verdict of one report's build step and reports it to the CI host.
#[derive(Clone)]
pub struct StepVerdictReporter {
    reports: Arc<dyn ReportRegistry>,
    apps: Arc<dyn AppRegistry>,
    aggregator: Aggregator,
    ci: Arc<dyn CiSystem>,
}

impl StepVerdictReporter {
    pub fn new(
        reports: Arc<dyn ReportRegistry>,
        apps: Arc<dyn AppRegistry>,
        aggregator: Aggregator,
        ci: Arc<dyn CiSystem>,
    ) -> Self {
        Self {
            reports,
            apps,
            aggregator,
            ci,
        }
    }

    /// Compute the verdict for `report_id` and submit it once.
    #[instrument(name = "step_verdict.report", skip(self))]
    pub async fn report(&self, report_id: Uuid) -> AppResult<StepVerdict> {
        let record = self
            .reports
            .get(report_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Test report {}", report_id)))?;

        let app = self
            .apps
            .get_app(&record.app_slug)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("App {}", record.app_slug)))?;

        let suites = self
            .aggregator
            .fill_one(&record, Some(VERDICT_STATUSES))
            .await?;
        let verdict = StepVerdict::from_suites(&record, &suites);

        self.ci
            .submit_step_result(&app.api_token, &record.app_slug, &record.build_slug, &verdict)
            .await?;

        info!(
            build_slug = %record.build_slug,
            step = %verdict.name,
            status = verdict.status.as_str(),
            "Step verdict reported"
        );
        Ok(verdict)
    }
}
