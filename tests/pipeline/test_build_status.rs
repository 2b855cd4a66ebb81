//! CI build status refresh.

use std::sync::atomic::Ordering;

use testlab_addon_lib::db::BuildRegistry;
use testlab_addon_lib::error::AppError;
use testlab_addon_lib::models::DeviceRunIds;
use testlab_addon_lib::services::BuildStatusSync;

use super::test_helpers::*;

fn sync(ctx: &TestContext) -> BuildStatusSync {
    BuildStatusSync::new(ctx.registry.clone(), ctx.registry.clone(), ctx.ci.clone())
}

#[actix_rt::test]
async fn test_refresh_stores_ci_status() {
    let ctx = TestContext::new().await;
    ctx.ci.build_status.store(2, Ordering::SeqCst);
    let build = unique_build();

    let record = sync(&ctx).refresh(APP, &build).await.unwrap();

    assert_eq!(record.status, Some(2));
    let stored = ctx.registry.get_build(APP, &build).await.unwrap().unwrap();
    assert_eq!(stored.status, Some(2));
    assert!(stored.device_run().is_none());
}

#[actix_rt::test]
async fn test_refresh_keeps_device_run() {
    let ctx = TestContext::new().await;
    ctx.ci.build_status.store(1, Ordering::SeqCst);
    let build = unique_build();
    ctx.registry.put_build(&build, "bh.1", "6000");

    let record = sync(&ctx).refresh(APP, &build).await.unwrap();

    assert_eq!(record.status, Some(1));
    let run = record.device_run().unwrap();
    assert_eq!(run.history_id, "bh.1");
    assert_eq!(run.execution_id, "6000");
}

#[actix_rt::test]
async fn test_device_run_keeps_status() {
    let ctx = TestContext::new().await;
    ctx.ci.build_status.store(3, Ordering::SeqCst);
    let build = unique_build();
    sync(&ctx).refresh(APP, &build).await.unwrap();

    let ids = DeviceRunIds::from_parts(Some("bh.2"), Some("7000")).unwrap();
    let record = ctx.registry.upsert_device_run(APP, &build, &ids).await.unwrap();

    assert_eq!(record.status, Some(3));
}

#[actix_rt::test]
async fn test_refresh_unknown_app_is_not_found() {
    let ctx = TestContext::new().await;
    let build = unique_build();

    let err = sync(&ctx).refresh("missing-app", &build).await.unwrap_err();

    assert!(matches!(err, AppError::NotFound(_)));
    assert!(ctx.registry.get_build("missing-app", &build).await.unwrap().is_none());
}
