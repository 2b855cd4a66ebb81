//! Report registration and listing.

use actix_web::test;
use serde_json::json;
use uuid::Uuid;

use testlab_addon_lib::models::ReconciliationRule;
use testlab_addon_lib::services::BatchPolicy;

use super::test_helpers::*;

#[actix_rt::test]
async fn test_register_returns_upload_url() {
    let ctx = TestContext::new().await;
    let build = unique_build();
    let app = ctx.app().await;

    let (status, body) = send_json(
        &app,
        test::TestRequest::post().uri(&format!("/api/v1/apps/{}/builds/{}/test_reports", APP, build)),
        json!({
            "filename": "junit.xml",
            "filesize": 2048,
            "step": {"id": "xcode-test", "version": "2.0.0", "title": "Xcode Test", "number": 3}
        }),
    )
    .await;

    assert_eq!(status, 201, "{:?}", body);
    let id = body["id"].as_str().unwrap();
    assert!(Uuid::parse_str(id).is_ok());
    assert_eq!(body["uploaded"], false);
    assert_eq!(body["step"]["title"], "Xcode Test");
    let expected_key = format!("builds/{}/test_reports/{}/junit.xml", build, id);
    assert!(body["upload_url"].as_str().unwrap().contains(&expected_key));
    assert!(body["upload_url"].as_str().unwrap().contains("content-length=2048"));
}

#[actix_rt::test]
async fn test_register_validation_errors() {
    let ctx = TestContext::new().await;
    let app = ctx.app().await;

    let (status, body) = send_json(
        &app,
        test::TestRequest::post().uri(&format!("/api/v1/apps/{}/builds/b1/test_reports", APP)),
        json!({"filename": "", "filesize": 0}),
    )
    .await;

    assert_eq!(status, 422);
    assert!(body["errors"]["filename"].is_array());
    assert!(body["errors"]["filesize"].is_array());
}

#[actix_rt::test]
async fn test_list_reports_with_suites() {
    let ctx = TestContext::new().await;
    let build = unique_build();
    let first = ctx.add_report(&build, "Unit", "r1.xml", Some(TWO_PASSED)).await;
    let second = ctx.add_report(&build, "UI", "r2.xml", Some(TWO_FAILED)).await;
    ctx.add_report(&unique_build(), "Other", "r3.xml", Some(TWO_PASSED)).await;
    ctx.add_report(&build, "Pending", "r4.xml", None).await;
    let app = ctx.app().await;

    let (status, body) =
        get_json(&app, &format!("/api/v1/apps/{}/builds/{}/test_reports", APP, build)).await;

    assert_eq!(status, 200, "{:?}", body);
    let reports = body.as_array().unwrap();
    assert_eq!(reports.len(), 2);
    assert_eq!(reports[0]["id"], first.id.to_string());
    assert_eq!(reports[1]["id"], second.id.to_string());
    assert_eq!(reports[0]["test_suites"][0]["name"], "LoginTests");
    assert_eq!(reports[1]["test_suites"][0]["totals"]["failed"], 2);
    assert_eq!(
        reports[1]["test_suites"][0]["tests"][0]["message"],
        "expected 1 item"
    );
    assert!(reports[0].get("failure").is_none());
}

#[actix_rt::test]
async fn test_best_effort_list_marks_failed_reports() {
    let ctx =
        TestContext::with_options(ReconciliationRule::Additive, BatchPolicy::BestEffort, &[]).await;
    let build = unique_build();
    ctx.add_report(&build, "Unit", "r1.xml", Some(TWO_PASSED)).await;
    let lost = ctx.add_lost_report(&build, "UI", "r2.xml").await;
    ctx.add_report(&build, "Empty", "r3.xml", Some("<testsuites/>")).await;
    let app = ctx.app().await;

    let (status, body) =
        get_json(&app, &format!("/api/v1/apps/{}/builds/{}/test_reports", APP, build)).await;

    assert_eq!(status, 200, "{:?}", body);
    let reports = body.as_array().unwrap();
    assert_eq!(reports.len(), 3);
    assert!(reports[0].get("failure").is_none());

    assert_eq!(reports[1]["id"], lost.id.to_string());
    assert_eq!(reports[1]["test_suites"], json!([]));
    assert_eq!(reports[1]["failure"]["report_id"], lost.id.to_string());
    assert_eq!(reports[1]["failure"]["error"], "FETCH_ERROR");

    // Empty but readable: no failure
    assert_eq!(reports[2]["test_suites"], json!([]));
    assert!(reports[2].get("failure").is_none());
}

#[actix_rt::test]
async fn test_update_unknown_report_is_not_found() {
    let ctx = TestContext::new().await;
    let app = ctx.app().await;

    let (status, body) = send_json(
        &app,
        test::TestRequest::patch().uri(&format!("/api/v1/test_reports/{}", Uuid::new_v4())),
        json!({"uploaded": true}),
    )
    .await;

    assert_eq!(status, 404);
    assert_eq!(body["error"], "NOT_FOUND");
}
