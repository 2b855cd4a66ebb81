//! Build device-run endpoint.

use actix_web::{HttpResponse, web};
use tracing::info;

use crate::db::BuildRegistry;
use crate::error::{AppError, AppResult};
use crate::models::{BuildRecord, DeviceRunIds, DeviceRunRequest};

/// Record the device-testing history and execution a build ran under.
#[utoipa::path(
    put,
    path = "/api/v1/apps/{app_slug}/builds/{build_slug}/device_run",
    tag = "Builds",
    params(
        ("app_slug" = String, Path, description = "App slug"),
        ("build_slug" = String, Path, description = "Build slug")
    ),
    request_body = DeviceRunRequest,
    responses(
        (status = 200, description = "Device run recorded", body = BuildRecord),
        (status = 400, description = "Missing identifiers", body = crate::error::ErrorResponse),
    )
)]
pub async fn put_device_run(
    builds: web::Data<dyn BuildRegistry>,
    path: web::Path<(String, String)>,
    body: web::Json<DeviceRunRequest>,
) -> AppResult<HttpResponse> {
    let (app_slug, build_slug) = path.into_inner();
    let run = DeviceRunIds::from_parts(
        Some(body.test_history_id.as_str()),
        Some(body.test_execution_id.as_str()),
    )
    .ok_or_else(|| {
        AppError::InvalidInput(
            "test_history_id and test_execution_id must both be non-empty".to_string(),
        )
    })?;

    let build = builds.upsert_device_run(&app_slug, &build_slug, &run).await?;
    info!(
        build_slug = %build_slug,
        history_id = %run.history_id,
        execution_id = %run.execution_id,
        "Device run recorded"
    );

    Ok(HttpResponse::Ok().json(build))
}

/// Configure build routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/apps/{app_slug}/builds/{build_slug}/device_run")
            .route(web::put().to(put_device_run)),
    );
}
