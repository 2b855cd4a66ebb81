//! Build-level views over the aggregation pipeline.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{instrument, warn};
use uuid::Uuid;

use crate::db::{BuildRegistry, ReportRegistry};
use crate::error::{AppError, AppResult};
use crate::models::{ReportFailure, ReportRecord, TestReportWithSuites, TestSummaryResponse};
use crate::services::aggregator::{Aggregator, BatchPolicy};
use crate::services::device_merger::DeviceOutcomeMerger;

/// Lists enriched reports and computes summary totals for a build.
#[derive(Clone)]
pub struct TestSummaryService {
    reports: Arc<dyn ReportRegistry>,
    builds: Arc<dyn BuildRegistry>,
    aggregator: Aggregator,
    merger: DeviceOutcomeMerger,
    policy: BatchPolicy,
}

impl TestSummaryService {
    pub fn new(
        reports: Arc<dyn ReportRegistry>,
        builds: Arc<dyn BuildRegistry>,
        aggregator: Aggregator,
        merger: DeviceOutcomeMerger,
        policy: BatchPolicy,
    ) -> Self {
        Self {
            reports,
            builds,
            aggregator,
            merger,
            policy,
        }
    }

    /// Reports of a build with their parsed suites, in registry order.
    ///
    /// Under best-effort a report that could not be fetched or parsed is
    /// listed with no suites and its `failure` set.
    #[instrument(name = "summary.list_with_suites", skip(self))]
    pub async fn list_with_suites(
        &self,
        app_slug: &str,
        build_slug: &str,
    ) -> AppResult<Vec<TestReportWithSuites>> {
        let records = self.reports.list_for_build(app_slug, build_slug).await?;
        let mut result = self.aggregator.fill_with_policy(&records, self.policy).await?;

        Ok(records
            .into_iter()
            .map(|record| TestReportWithSuites {
                test_suites: result.suites.remove(&record.id).unwrap_or_default(),
                failure: result
                    .failures
                    .get(&record.id)
                    .map(|e| ReportFailure::new(record.id, e)),
                record,
            })
            .collect())
    }

    /// Canonical totals of a build: JUnit sums merged with the device run.
    ///
    /// Reports a best-effort batch had to skip are named in `failed_reports`,
    /// in registry order.
    #[instrument(name = "summary.summarize", skip(self))]
    pub async fn summarize(
        &self,
        app_slug: &str,
        build_slug: &str,
    ) -> AppResult<TestSummaryResponse> {
        let records = self.reports.list_for_build(app_slug, build_slug).await?;
        let result = self.aggregator.fill_with_policy(&records, self.policy).await?;
        let failed_reports = failures_in_order(&records, &result.failures);
        if !failed_reports.is_empty() {
            warn!(
                failed_reports = failed_reports.len(),
                "Summary excludes reports that could not be processed"
            );
        }

        let build = self.builds.get_build(app_slug, build_slug).await?;
        let totals = self.merger.merge(build.as_ref(), &result.totals).await?;
        Ok(TestSummaryResponse {
            totals,
            failed_reports,
        })
    }
}

fn failures_in_order(
    records: &[ReportRecord],
    failures: &HashMap<Uuid, AppError>,
) -> Vec<ReportFailure> {
    records
        .iter()
        .filter_map(|r| failures.get(&r.id).map(|e| ReportFailure::new(r.id, e)))
        .collect()
}
