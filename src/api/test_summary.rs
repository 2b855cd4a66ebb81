//! Build test summary endpoint.

use actix_web::{HttpResponse, web};

use crate::error::AppResult;
use crate::models::TestSummaryResponse;
use crate::services::TestSummaryService;

/// Canonical pass/fail/skip totals of a build.
#[utoipa::path(
    get,
    path = "/api/v1/apps/{app_slug}/builds/{build_slug}/test_summary",
    tag = "Test Summary",
    params(
        ("app_slug" = String, Path, description = "App slug"),
        ("build_slug" = String, Path, description = "Build slug")
    ),
    responses(
        (status = 200, description = "Build totals, naming any reports a best-effort batch skipped", body = TestSummaryResponse),
        (status = 502, description = "Artifact or device-testing service failure", body = crate::error::ErrorResponse),
    )
)]
pub async fn get_test_summary(
    summary: web::Data<TestSummaryService>,
    path: web::Path<(String, String)>,
) -> AppResult<HttpResponse> {
    let (app_slug, build_slug) = path.into_inner();
    let body = summary.summarize(&app_slug, &build_slug).await?;
    Ok(HttpResponse::Ok().json(body))
}

/// Configure test summary routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/apps/{app_slug}/builds/{build_slug}/test_summary")
            .route(web::get().to(get_test_summary)),
    );
}
