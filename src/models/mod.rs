//! Domain models for the test-report enrichment service.

pub mod build;
pub mod device_outcome;
pub mod junit;
pub mod step_verdict;
pub mod test_report;
pub mod totals;

// Re-export commonly used types
pub use build::{AppRecord, BuildRecord, CiBuild, DeviceRunRequest};
pub use device_outcome::{DeviceOutcome, DeviceRunIds, OutcomeCategory};
pub use junit::{Suite, Test, TestStatus, Totals};
pub use step_verdict::{StepStatus, StepVerdict, VERDICT_STATUSES};
pub use test_report::{
    CreateTestReportRequest, ReportFailure, ReportRecord, StepInfo, TestReportWithSuites,
    TestReportWithUploadUrl, UpdateTestReportRequest,
};
pub use totals::{
    AggregateTotals, CountSource, ReconciliationRule, SourcedTotals, TestSummaryResponse,
};
