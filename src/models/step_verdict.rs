//! Step verdict reported back to the CI host.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::{ReportRecord, Suite, Test, TestStatus};

/// Overall result of one build step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Success,
    Failed,
}

impl StepStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepStatus::Success => "success",
            StepStatus::Failed => "failed",
        }
    }
}

/// Payload of the CI host's test step result endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct StepVerdict {
    pub name: String,
    pub status: StepStatus,
    pub total: u64,
    pub failed_tests: Vec<Test>,
}

impl StepVerdict {
    /// Derive the verdict for one report from its parsed suites.
    ///
    /// The step fails when any test is not passed; `failed_tests` lists the
    /// failed and errored tests.
    pub fn from_suites(record: &ReportRecord, suites: &[Suite]) -> Self {
        let total = suites.iter().map(|s| s.totals.tests).sum();
        let failed = suites.iter().any(Suite::has_non_passed);
        let failed_tests = suites
            .iter()
            .flat_map(|s| s.tests.iter())
            .filter(|t| t.status.is_failure())
            .cloned()
            .collect();

        Self {
            name: step_name(record),
            status: if failed {
                StepStatus::Failed
            } else {
                StepStatus::Success
            },
            total,
            failed_tests,
        }
    }
}

/// Statuses kept when re-deriving a report for its verdict.
pub const VERDICT_STATUSES: &[TestStatus] = &[
    TestStatus::Failed,
    TestStatus::Error,
    TestStatus::Skipped,
];

/// Step title, qualified with the filename when it adds information.
fn step_name(record: &ReportRecord) -> String {
    let title = record.step_info().title;
    if !record.filename.is_empty() && record.filename != title {
        if title.is_empty() {
            return record.filename.clone();
        }
        return format!("{} ({})", title, record.filename);
    }
    title
}
