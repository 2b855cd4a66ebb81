//! Test report API handlers.

use actix_web::{HttpResponse, web};
use tracing::{error, info};
use uuid::Uuid;

use crate::db::ReportRegistry;
use crate::error::{AppError, AppResult};
use crate::models::{
    CreateTestReportRequest, ReportRecord, StepVerdict, TestReportWithSuites,
    TestReportWithUploadUrl, UpdateTestReportRequest,
};
use crate::services::{ArtifactStore, StepVerdictReporter, TestSummaryService};

/// Register a report and hand out the URL its artifact is uploaded to.
#[utoipa::path(
    post,
    path = "/api/v1/apps/{app_slug}/builds/{build_slug}/test_reports",
    tag = "Test Reports",
    params(
        ("app_slug" = String, Path, description = "App slug"),
        ("build_slug" = String, Path, description = "Build slug")
    ),
    request_body = CreateTestReportRequest,
    responses(
        (status = 201, description = "Report registered", body = TestReportWithUploadUrl),
        (status = 422, description = "Record failed validation"),
    )
)]
pub async fn create_test_report(
    reports: web::Data<dyn ReportRegistry>,
    store: web::Data<dyn ArtifactStore>,
    path: web::Path<(String, String)>,
    body: web::Json<CreateTestReportRequest>,
) -> AppResult<HttpResponse> {
    let (app_slug, build_slug) = path.into_inner();
    let body = body.into_inner();

    let record = ReportRecord::new(
        app_slug,
        build_slug,
        body.filename,
        body.filesize,
        serde_json::to_value(&body.step)?,
    );
    let record = reports.create(record).await?;
    let upload_url = store
        .upload_url(&record.path_in_bucket(), record.filesize)
        .await?;

    info!(
        report_id = %record.id,
        build_slug = %record.build_slug,
        filename = %record.filename,
        "Test report registered"
    );

    Ok(HttpResponse::Created().json(TestReportWithUploadUrl { record, upload_url }))
}

/// List a build's reports together with their parsed suites.
#[utoipa::path(
    get,
    path = "/api/v1/apps/{app_slug}/builds/{build_slug}/test_reports",
    tag = "Test Reports",
    params(
        ("app_slug" = String, Path, description = "App slug"),
        ("build_slug" = String, Path, description = "Build slug")
    ),
    responses(
        (status = 200, description = "Reports with parsed suites", body = Vec<TestReportWithSuites>),
        (status = 502, description = "An artifact could not be fetched or parsed", body = crate::error::ErrorResponse),
    )
)]
pub async fn list_test_reports(
    summary: web::Data<TestSummaryService>,
    path: web::Path<(String, String)>,
) -> AppResult<HttpResponse> {
    let (app_slug, build_slug) = path.into_inner();
    let reports = summary.list_with_suites(&app_slug, &build_slug).await?;
    Ok(HttpResponse::Ok().json(reports))
}

/// Set the uploaded flag of a report.
///
/// Flipping it to `true` schedules the step verdict for submission.
#[utoipa::path(
    patch,
    path = "/api/v1/test_reports/{report_id}",
    tag = "Test Reports",
    params(
        ("report_id" = Uuid, Path, description = "Report UUID")
    ),
    request_body = UpdateTestReportRequest,
    responses(
        (status = 200, description = "Report updated", body = ReportRecord),
        (status = 404, description = "Report not found", body = crate::error::ErrorResponse),
    )
)]
pub async fn update_test_report(
    reports: web::Data<dyn ReportRegistry>,
    reporter: web::Data<StepVerdictReporter>,
    path: web::Path<Uuid>,
    body: web::Json<UpdateTestReportRequest>,
) -> AppResult<HttpResponse> {
    let report_id = path.into_inner();
    let mut record = reports
        .get(report_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Test report {}", report_id)))?;

    let newly_uploaded = !record.uploaded && body.uploaded;
    record.uploaded = body.uploaded;
    let record = reports.update(record).await?;

    if newly_uploaded {
        let reporter = reporter.into_inner();
        actix_web::rt::spawn(async move {
            if let Err(e) = reporter.report(report_id).await {
                error!(report_id = %report_id, error = %e, "Failed to report step verdict");
            }
        });
    }

    Ok(HttpResponse::Ok().json(record))
}

/// Compute and submit the step verdict of a report synchronously.
#[utoipa::path(
    post,
    path = "/api/v1/test_reports/{report_id}/step_result",
    tag = "Test Reports",
    params(
        ("report_id" = Uuid, Path, description = "Report UUID")
    ),
    responses(
        (status = 200, description = "Verdict submitted", body = StepVerdict),
        (status = 404, description = "Report or app not found", body = crate::error::ErrorResponse),
        (status = 502, description = "Fetch, parse or submission failed", body = crate::error::ErrorResponse),
    )
)]
pub async fn submit_step_result(
    reporter: web::Data<StepVerdictReporter>,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let verdict = reporter.report(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(verdict))
}

/// Configure test report routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/apps/{app_slug}/builds/{build_slug}/test_reports")
            .route(web::get().to(list_test_reports))
            .route(web::post().to(create_test_report)),
    )
    .service(web::resource("/test_reports/{report_id}").route(web::patch().to(update_test_report)))
    .service(
        web::resource("/test_reports/{report_id}/step_result")
            .route(web::post().to(submit_step_result)),
    );
}
