//! Step verdict submission.

use std::sync::atomic::Ordering;

use actix_web::test;
use serde_json::json;
use uuid::Uuid;

use super::test_helpers::*;

const MIXED: &str = r#"<testsuites>
  <testsuite name="Checkout">
    <testcase name="testPay" classname="Checkout"/>
    <testcase name="testRefund" classname="Checkout"><failure message="refund rejected">trace</failure></testcase>
    <testcase name="testVoid" classname="Checkout"><error message="NullPointerException"/></testcase>
    <testcase name="testGift" classname="Checkout"><skipped/></testcase>
  </testsuite>
</testsuites>"#;

async fn post_step_result<S>(app: &S, report_id: Uuid) -> (u16, serde_json::Value)
where
    S: actix_web::dev::Service<
            actix_http::Request,
            Response = actix_web::dev::ServiceResponse,
            Error = actix_web::Error,
        >,
{
    let req = test::TestRequest::post()
        .uri(&format!("/api/v1/test_reports/{}/step_result", report_id))
        .to_request();
    let resp = test::call_service(app, req).await;
    let status = resp.status().as_u16();
    let body = test::read_body_json(resp).await;
    (status, body)
}

#[actix_rt::test]
async fn test_failed_step_is_submitted_once() {
    let ctx = TestContext::new().await;
    let build = unique_build();
    let record = ctx.add_report(&build, "Checkout", "checkout.xml", Some(MIXED)).await;
    let app = ctx.app().await;

    let (status, body) = post_step_result(&app, record.id).await;

    assert_eq!(status, 200, "{:?}", body);
    assert_eq!(body["name"], "Checkout (checkout.xml)");
    assert_eq!(body["status"], "failed");
    assert_eq!(body["total"], 4);

    let submissions = ctx.ci.submissions.lock().unwrap().clone();
    assert_eq!(submissions.len(), 1);
    let submission = &submissions[0];
    assert_eq!(submission.token, APP_TOKEN);
    assert_eq!(submission.app_slug, APP);
    assert_eq!(submission.build_slug, build);
    let failed: Vec<_> = submission
        .verdict
        .failed_tests
        .iter()
        .map(|t| t.name.as_str())
        .collect();
    assert_eq!(failed, vec!["testRefund", "testVoid"]);
    assert_eq!(
        submission.verdict.failed_tests[0].message.as_deref(),
        Some("refund rejected")
    );
}

#[actix_rt::test]
async fn test_passing_step_is_success() {
    let ctx = TestContext::new().await;
    let build = unique_build();
    let record = ctx.add_report(&build, "Unit", "unit.xml", Some(TWO_PASSED)).await;
    let app = ctx.app().await;

    let (status, body) = post_step_result(&app, record.id).await;

    assert_eq!(status, 200);
    assert_eq!(body["status"], "success");
    assert_eq!(body["total"], 2);
    assert_eq!(body["failed_tests"], json!([]));
}

#[actix_rt::test]
async fn test_unknown_report_is_not_found() {
    let ctx = TestContext::new().await;
    let app = ctx.app().await;

    let (status, body) = post_step_result(&app, Uuid::new_v4()).await;

    assert_eq!(status, 404);
    assert_eq!(body["error"], "NOT_FOUND");
    assert_eq!(ctx.ci.count(), 0);
}

#[actix_rt::test]
async fn test_unregistered_app_is_not_found() {
    let ctx = TestContext::new().await;
    let mut record = testlab_addon_lib::models::ReportRecord::new(
        "other-app",
        unique_build(),
        "unit.xml",
        100,
        json!({ "title": "Unit" }),
    );
    record.uploaded = true;
    ctx.artifacts.put(&record.path_in_bucket(), TWO_PASSED);
    let record = testlab_addon_lib::db::ReportRegistry::create(ctx.registry.as_ref(), record)
        .await
        .unwrap();
    let app = ctx.app().await;

    let (status, body) = post_step_result(&app, record.id).await;

    assert_eq!(status, 404);
    assert!(body["message"].as_str().unwrap().contains("other-app"));
    assert_eq!(ctx.ci.count(), 0);
}

#[actix_rt::test]
async fn test_rejected_submission_is_bad_gateway() {
    let ctx = TestContext::new().await;
    ctx.ci.reject.store(true, Ordering::SeqCst);
    let record = ctx
        .add_report(&unique_build(), "Unit", "unit.xml", Some(TWO_PASSED))
        .await;
    let app = ctx.app().await;

    let (status, body) = post_step_result(&app, record.id).await;

    assert_eq!(status, 502);
    assert_eq!(body["error"], "REPORT_SUBMISSION_ERROR");
}

#[actix_rt::test]
async fn test_missing_artifact_is_not_submitted() {
    let ctx = TestContext::new().await;
    let record = ctx.add_lost_report(&unique_build(), "Unit", "unit.xml").await;
    let app = ctx.app().await;

    let (status, body) = post_step_result(&app, record.id).await;

    assert_eq!(status, 502);
    assert_eq!(body["error"], "FETCH_ERROR");
    assert_eq!(ctx.ci.count(), 0);
}

/// Marking a report uploaded submits its verdict in the background, once.
#[actix_rt::test]
async fn test_upload_flag_triggers_submission() {
    let ctx = TestContext::new().await;
    let build = unique_build();
    let record = ctx.add_report(&build, "Unit", "unit.xml", None).await;
    ctx.artifacts.put(&record.path_in_bucket(), TWO_FAILED);
    let app = ctx.app().await;
    let uri = format!("/api/v1/test_reports/{}", record.id);

    let (status, body) = send_json(
        &app,
        test::TestRequest::patch().uri(&uri),
        json!({"uploaded": true}),
    )
    .await;
    assert_eq!(status, 200, "{:?}", body);
    assert_eq!(body["uploaded"], true);

    let submissions = ctx.ci.wait_for(1).await;
    assert_eq!(submissions.len(), 1);
    assert_eq!(submissions[0].verdict.status.as_str(), "failed");

    // Already uploaded: no second submission
    let (status, _) = send_json(
        &app,
        test::TestRequest::patch().uri(&uri),
        json!({"uploaded": true}),
    )
    .await;
    assert_eq!(status, 200);
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    assert_eq!(ctx.ci.count(), 1);
}
