//! Folds device-testing outcomes into JUnit totals.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::AppResult;
use crate::models::{AggregateTotals, BuildRecord, OutcomeCategory, ReconciliationRule, SourcedTotals, Totals};
use crate::services::device_testing::DeviceTestingService;

/// Merges a build's device run, if it has one, into its JUnit totals.
#[derive(Clone)]
pub struct DeviceOutcomeMerger {
    service: Arc<dyn DeviceTestingService>,
    rule: ReconciliationRule,
}

impl DeviceOutcomeMerger {
    pub fn new(service: Arc<dyn DeviceTestingService>, rule: ReconciliationRule) -> Self {
        Self { service, rule }
    }

    pub fn rule(&self) -> ReconciliationRule {
        self.rule
    }

    /// Provenance-tagged counts for a build.
    ///
    /// The remote service is only consulted when `build` carries both run
    /// identifiers; a missing build means no device run.
    pub async fn sourced_totals(
        &self,
        build: Option<&BuildRecord>,
        junit: &Totals,
    ) -> AppResult<SourcedTotals> {
        let mut sourced = SourcedTotals::from_junit(junit);

        let Some(build) = build else {
            debug!("No build record, using JUnit totals only");
            return Ok(sourced);
        };
        let Some(run) = build.device_run() else {
            debug!(build_slug = %build.build_slug, "Build has no device run");
            return Ok(sourced);
        };

        let outcomes = self
            .service
            .execution_outcomes(&run, &build.app_slug, &build.build_slug)
            .await?;

        for outcome in &outcomes {
            if let OutcomeCategory::Unrecognized(raw) = &outcome.outcome {
                warn!(
                    build_slug = %build.build_slug,
                    device = %outcome.device_id,
                    outcome = %raw,
                    "Ignoring unrecognized device outcome"
                );
            }
        }
        sourced.record_device_outcomes(&outcomes);

        Ok(sourced)
    }

    /// Canonical totals under the configured rule.
    pub async fn merge(&self, build: Option<&BuildRecord>, junit: &Totals) -> AppResult<AggregateTotals> {
        let sourced = self.sourced_totals(build, junit).await?;
        let totals = sourced.reconcile(self.rule);
        debug_assert!(totals.is_consistent(), "inconsistent totals: {:?}", totals);
        Ok(totals)
    }
}
