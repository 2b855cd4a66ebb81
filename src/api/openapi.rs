//! OpenAPI documentation configuration.

use utoipa::OpenApi;

use crate::{api, error, models};

/// OpenAPI documentation.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Testlab Add-on Server",
        version = "0.1.0",
        description = "Enriches uploaded JUnit test reports, merges device-testing outcomes and reports step verdicts to the CI host"
    ),
    servers(
        (url = "/", description = "Local server")
    ),
    paths(
        // Health endpoints
        api::health::health,
        api::health::ready,
        // Test report endpoints
        api::test_reports::create_test_report,
        api::test_reports::list_test_reports,
        api::test_reports::update_test_report,
        api::test_reports::submit_step_result,
        // Summary endpoints
        api::test_summary::get_test_summary,
        // Build endpoints
        api::builds::put_device_run,
    ),
    components(
        schemas(
            // Common
            error::ErrorResponse,
            // Health
            api::health::HealthResponse,
            api::health::ReadyResponse,
            // Test reports
            models::ReportRecord,
            models::StepInfo,
            models::CreateTestReportRequest,
            models::UpdateTestReportRequest,
            models::TestReportWithUploadUrl,
            models::TestReportWithSuites,
            models::ReportFailure,
            models::Suite,
            models::Test,
            models::TestStatus,
            models::Totals,
            models::StepVerdict,
            models::StepStatus,
            // Summary
            models::AggregateTotals,
            models::TestSummaryResponse,
            // Builds
            models::BuildRecord,
            models::DeviceRunRequest,
        )
    ),
    tags(
        (name = "Health", description = "Health check endpoints"),
        (name = "Test Reports", description = "Report registration, enrichment and step verdicts"),
        (name = "Test Summary", description = "Build-level totals"),
        (name = "Builds", description = "Device-testing run registration")
    )
)]
pub struct ApiDoc;
