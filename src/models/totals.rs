//! Build-level totals and their provenance.
//!
//! JUnit artifacts and the device-testing service count tests independently.
//! Counts are kept per source until [`SourcedTotals::reconcile`] applies the
//! configured [`ReconciliationRule`], so neither source can be counted twice by
//! accident.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::{DeviceOutcome, OutcomeCategory, ReportFailure, Totals};

/// Canonical build totals returned by the summary endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct AggregateTotals {
    pub tests: u64,
    pub passed: u64,
    pub skipped: u64,
    pub failed: u64,
    pub inconclusive: u64,
}

impl AggregateTotals {
    /// Fold JUnit totals in; `error` counts as failed.
    pub fn from_junit(totals: &Totals) -> Self {
        let passed = totals.passed;
        let failed = totals.failed + totals.error;
        let skipped = totals.skipped;
        Self {
            tests: passed + failed + skipped,
            passed,
            skipped,
            failed,
            inconclusive: 0,
        }
    }

    pub fn add(&mut self, other: &AggregateTotals) {
        self.tests += other.tests;
        self.passed += other.passed;
        self.skipped += other.skipped;
        self.failed += other.failed;
        self.inconclusive += other.inconclusive;
    }

    /// `tests == passed + failed + skipped + inconclusive`
    pub fn is_consistent(&self) -> bool {
        self.tests == self.passed + self.failed + self.skipped + self.inconclusive
    }
}

/// Where a unit of count came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum CountSource {
    Junit,
    Device,
}

/// How device counts combine with JUnit counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ReconciliationRule {
    /// Device outcomes are added on top of the JUnit sum.
    #[default]
    Additive,
    /// When a device run exists its outcomes replace the JUnit sum.
    DeviceAuthoritative,
}

impl ReconciliationRule {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "additive" => Some(Self::Additive),
            "device_authoritative" | "device-authoritative" => Some(Self::DeviceAuthoritative),
            _ => None,
        }
    }
}

/// Counts tagged by [`CountSource`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct SourcedTotals {
    pub junit: AggregateTotals,
    /// `None` when the build had no device run.
    pub device: Option<AggregateTotals>,
    /// Device outcomes whose category was not recognized.
    pub ignored_device_outcomes: u64,
}

impl SourcedTotals {
    pub fn from_junit(totals: &Totals) -> Self {
        Self {
            junit: AggregateTotals::from_junit(totals),
            device: None,
            ignored_device_outcomes: 0,
        }
    }

    /// Tally device outcomes. Each recognized outcome increments exactly one bucket.
    pub fn record_device_outcomes<'a>(&mut self, outcomes: impl IntoIterator<Item = &'a DeviceOutcome>) {
        let device = self.device.get_or_insert_with(AggregateTotals::default);
        for outcome in outcomes {
            match outcome.outcome {
                OutcomeCategory::Success => device.passed += 1,
                OutcomeCategory::Failure => device.failed += 1,
                OutcomeCategory::Skipped => device.skipped += 1,
                OutcomeCategory::Inconclusive => device.inconclusive += 1,
                OutcomeCategory::Unrecognized(_) => {
                    self.ignored_device_outcomes += 1;
                    continue;
                }
            }
            device.tests += 1;
        }
    }

    /// Count contributed by one source.
    pub fn by_source(&self, source: CountSource) -> AggregateTotals {
        match source {
            CountSource::Junit => self.junit,
            CountSource::Device => self.device.unwrap_or_default(),
        }
    }

    /// Apply `rule` to produce the canonical totals.
    pub fn reconcile(&self, rule: ReconciliationRule) -> AggregateTotals {
        match (rule, self.device) {
            (_, None) => self.junit,
            (ReconciliationRule::Additive, Some(device)) => {
                let mut totals = self.junit;
                totals.add(&device);
                totals
            }
            (ReconciliationRule::DeviceAuthoritative, Some(device)) => device,
        }
    }
}

/// Summary endpoint response body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct TestSummaryResponse {
    pub totals: AggregateTotals,
    /// Reports excluded from `totals`; only ever filled under a best-effort policy.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failed_reports: Vec<ReportFailure>,
}
