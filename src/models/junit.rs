//! Parsed JUnit suite/test model.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Classification of a single test case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum TestStatus {
    Passed,
    Skipped,
    Failed,
    Error,
}

impl TestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TestStatus::Passed => "passed",
            TestStatus::Skipped => "skipped",
            TestStatus::Failed => "failed",
            TestStatus::Error => "error",
        }
    }

    /// Failed or errored.
    pub fn is_failure(&self) -> bool {
        matches!(self, TestStatus::Failed | TestStatus::Error)
    }
}

impl std::fmt::Display for TestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One `<testcase>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Test {
    pub name: String,
    pub classname: String,
    pub status: TestStatus,
    pub duration_ms: u64,
    /// `message` attribute of the failure/error/skipped element.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Body of the failure/error element, usually a stack trace.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_out: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_err: Option<String>,
}

/// Per-suite counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Totals {
    pub tests: u64,
    pub passed: u64,
    pub failed: u64,
    pub error: u64,
    pub skipped: u64,
    pub duration_ms: u64,
}

impl Totals {
    /// Count a single test.
    pub fn record(&mut self, test: &Test) {
        self.tests += 1;
        self.duration_ms += test.duration_ms;
        match test.status {
            TestStatus::Passed => self.passed += 1,
            TestStatus::Failed => self.failed += 1,
            TestStatus::Error => self.error += 1,
            TestStatus::Skipped => self.skipped += 1,
        }
    }

    /// Elementwise sum.
    pub fn add(&mut self, other: &Totals) {
        self.tests += other.tests;
        self.passed += other.passed;
        self.failed += other.failed;
        self.error += other.error;
        self.skipped += other.skipped;
        self.duration_ms += other.duration_ms;
    }

    pub fn from_tests<'a>(tests: impl IntoIterator<Item = &'a Test>) -> Self {
        let mut totals = Totals::default();
        for test in tests {
            totals.record(test);
        }
        totals
    }
}

impl std::iter::Sum for Totals {
    fn sum<I: Iterator<Item = Totals>>(iter: I) -> Self {
        iter.fold(Totals::default(), |mut acc, t| {
            acc.add(&t);
            acc
        })
    }
}

/// One `<testsuite>`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Suite {
    pub name: String,
    #[serde(default)]
    pub package: String,
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
    pub tests: Vec<Test>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_out: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_err: Option<String>,
    pub totals: Totals,
}

impl Suite {
    /// Keep only tests whose status is in `statuses`. Totals are left untouched.
    pub fn retain_statuses(&mut self, statuses: &[TestStatus]) {
        self.tests.retain(|t| statuses.contains(&t.status));
    }

    pub fn has_non_passed(&self) -> bool {
        self.tests.iter().any(|t| t.status != TestStatus::Passed)
    }
}
