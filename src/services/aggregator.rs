//! Batch fetch+parse of test reports.
//!
//! Each report is fetched and parsed independently; the per-report suites are
//! keyed by report id and their totals summed. At most `max_concurrency`
//! reports are in flight at once.

use std::collections::HashMap;
use std::sync::Arc;

use futures_util::{StreamExt, stream};
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{ReportRecord, Suite, TestStatus, Totals};
use crate::services::artifact_fetcher::ArtifactFetcher;
use crate::services::junit_parser::ResultParser;

/// What a batch does when one of its reports fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BatchPolicy {
    /// The first failure aborts the batch; no partial results.
    #[default]
    FailFast,
    /// Failures are collected per report; totals cover successful reports only.
    BestEffort,
}

impl BatchPolicy {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "fail_fast" | "fail-fast" => Some(Self::FailFast),
            "best_effort" | "best-effort" => Some(Self::BestEffort),
            _ => None,
        }
    }
}

/// Result of a batch.
#[derive(Debug, Default)]
pub struct AggregateResult {
    pub suites: HashMap<Uuid, Vec<Suite>>,
    /// Elementwise sum over every entry of `suites`.
    pub totals: Totals,
    /// Reports that failed. Always empty under [`BatchPolicy::FailFast`].
    pub failures: HashMap<Uuid, AppError>,
}

impl AggregateResult {
    fn absorb(&mut self, id: Uuid, suites: Vec<Suite>) {
        let report: Totals = suites.iter().map(|s| s.totals).sum();
        self.totals.add(&report);
        self.suites.insert(id, suites);
    }
}

/// Fetch+parse orchestration over a batch of reports.
#[derive(Clone)]
pub struct Aggregator {
    fetcher: Arc<dyn ArtifactFetcher>,
    parser: Arc<dyn ResultParser>,
    max_concurrency: usize,
}

impl Aggregator {
    pub fn new(
        fetcher: Arc<dyn ArtifactFetcher>,
        parser: Arc<dyn ResultParser>,
        max_concurrency: usize,
    ) -> Self {
        Self {
            fetcher,
            parser,
            max_concurrency: max_concurrency.max(1),
        }
    }

    async fn fetch_and_parse(&self, record: &ReportRecord) -> AppResult<Vec<Suite>> {
        let bytes = self.fetcher.fetch(record).await?;
        self.parser
            .parse(&bytes)
            .map_err(|e| e.with_report(record.id))
    }

    /// Suites of a single report.
    ///
    /// With `status_filter` set only tests in those statuses are kept; suite
    /// totals still describe the unfiltered report.
    #[instrument(skip(self, record, status_filter), fields(report_id = %record.id))]
    pub async fn fill_one(
        &self,
        record: &ReportRecord,
        status_filter: Option<&[TestStatus]>,
    ) -> AppResult<Vec<Suite>> {
        let mut suites = self.fetch_and_parse(record).await?;
        if let Some(statuses) = status_filter {
            for suite in &mut suites {
                suite.retain_statuses(statuses);
            }
        }
        Ok(suites)
    }

    /// Fail-fast batch: the first error by completion order is returned and
    /// the remaining in-flight reports are dropped.
    #[instrument(skip(self, records), fields(reports = records.len()))]
    pub async fn fill(&self, records: &[ReportRecord]) -> AppResult<AggregateResult> {
        let mut result = AggregateResult::default();
        let mut pending = stream::iter(records)
            .map(|record| async move { (record.id, self.fetch_and_parse(record).await) })
            .buffer_unordered(self.max_concurrency);

        while let Some((id, outcome)) = pending.next().await {
            result.absorb(id, outcome?);
        }

        debug!(tests = result.totals.tests, "Batch aggregated");
        Ok(result)
    }

    /// Best-effort batch: every report is attempted and failures are kept per
    /// report instead of aborting.
    #[instrument(skip(self, records), fields(reports = records.len()))]
    pub async fn fill_best_effort(&self, records: &[ReportRecord]) -> AggregateResult {
        let mut result = AggregateResult::default();
        let mut pending = stream::iter(records)
            .map(|record| async move { (record.id, self.fetch_and_parse(record).await) })
            .buffer_unordered(self.max_concurrency);

        while let Some((id, outcome)) = pending.next().await {
            match outcome {
                Ok(suites) => result.absorb(id, suites),
                Err(e) => {
                    warn!(report_id = %id, error = %e, "Skipping report in best-effort batch");
                    result.failures.insert(id, e);
                }
            }
        }

        result
    }

    /// Run a batch under `policy`.
    pub async fn fill_with_policy(
        &self,
        records: &[ReportRecord],
        policy: BatchPolicy,
    ) -> AppResult<AggregateResult> {
        match policy {
            BatchPolicy::FailFast => self.fill(records).await,
            BatchPolicy::BestEffort => Ok(self.fill_best_effort(records).await),
        }
    }
}
