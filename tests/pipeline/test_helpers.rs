//! Shared test helpers for the pipeline suite.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use actix_web::{App, dev::ServiceResponse, test, web};
use async_trait::async_trait;
use chrono::Utc;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{Value, json};
use uuid::Uuid;

use testlab_addon_lib::db::{AppRegistry, BuildRegistry, ReportRegistry};
use testlab_addon_lib::error::{AppError, AppResult};
use testlab_addon_lib::models::{
    AppRecord, BuildRecord, CiBuild, DeviceOutcome, DeviceRunIds, OutcomeCategory,
    ReconciliationRule, ReportRecord, StepVerdict,
};
use testlab_addon_lib::services::{
    Aggregator, ArtifactStore, BatchPolicy, CiSystem, DeviceOutcomeMerger, DeviceTestingService,
    HttpArtifactFetcher, JunitParser, StepVerdictReporter, TestSummaryService,
};

use super::mock_artifact_server::MockArtifactServer;

pub const APP: &str = "app-slug";
pub const APP_TOKEN: &str = "app-api-token";

pub const TWO_PASSED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<testsuites>
  <testsuite name="LoginTests" tests="2">
    <testcase name="testLogin" classname="LoginTests" time="0.5"/>
    <testcase name="testLogout" classname="LoginTests" time="0.25"/>
  </testsuite>
</testsuites>"#;

pub const TWO_FAILED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<testsuite name="CartTests" tests="2" failures="2">
  <testcase name="testAdd" classname="CartTests">
    <failure message="expected 1 item">at CartTests.testAdd</failure>
  </testcase>
  <testcase name="testRemove" classname="CartTests">
    <failure message="expected 0 items"/>
  </testcase>
</testsuite>"#;

pub const FIVE_PASSED: &str = r#"<testsuite name="Smoke">
  <testcase name="a"/><testcase name="b"/><testcase name="c"/><testcase name="d"/><testcase name="e"/>
</testsuite>"#;

/// Unique build slug per test.
pub fn unique_build() -> String {
    format!("build-{}", Uuid::new_v4().simple())
}

// ============================================================================
// In-memory registries
// ============================================================================

#[derive(Default)]
pub struct MemoryRegistry {
    reports: Mutex<Vec<ReportRecord>>,
    builds: Mutex<HashMap<(String, String), BuildRecord>>,
    apps: Mutex<HashMap<String, AppRecord>>,
}

#[async_trait]
impl ReportRegistry for MemoryRegistry {
    async fn list_for_build(&self, app_slug: &str, build_slug: &str) -> AppResult<Vec<ReportRecord>> {
        Ok(self
            .reports
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.app_slug == app_slug && r.build_slug == build_slug && r.uploaded)
            .cloned()
            .collect())
    }

    async fn get(&self, id: Uuid) -> AppResult<Option<ReportRecord>> {
        Ok(self.reports.lock().unwrap().iter().find(|r| r.id == id).cloned())
    }

    async fn create(&self, record: ReportRecord) -> AppResult<ReportRecord> {
        record.validate().into_result()?;
        self.reports.lock().unwrap().push(record.clone());
        Ok(record)
    }

    async fn update(&self, record: ReportRecord) -> AppResult<ReportRecord> {
        record.validate().into_result()?;
        let mut reports = self.reports.lock().unwrap();
        let existing = reports
            .iter_mut()
            .find(|r| r.id == record.id)
            .ok_or_else(|| AppError::NotFound(format!("Test report {}", record.id)))?;
        *existing = record.clone();
        Ok(record)
    }
}

#[async_trait]
impl BuildRegistry for MemoryRegistry {
    async fn get_build(&self, app_slug: &str, build_slug: &str) -> AppResult<Option<BuildRecord>> {
        Ok(self
            .builds
            .lock()
            .unwrap()
            .get(&(app_slug.to_string(), build_slug.to_string()))
            .cloned())
    }

    async fn upsert_device_run(
        &self,
        app_slug: &str,
        build_slug: &str,
        run: &DeviceRunIds,
    ) -> AppResult<BuildRecord> {
        let mut builds = self.builds.lock().unwrap();
        let build = builds
            .entry((app_slug.to_string(), build_slug.to_string()))
            .or_insert_with(|| empty_build(app_slug, build_slug));
        build.test_history_id = Some(run.history_id.clone());
        build.test_execution_id = Some(run.execution_id.clone());
        build.updated_at = Utc::now();
        Ok(build.clone())
    }

    async fn record_status(&self, app_slug: &str, build_slug: &str, status: i32) -> AppResult<BuildRecord> {
        let mut builds = self.builds.lock().unwrap();
        let build = builds
            .entry((app_slug.to_string(), build_slug.to_string()))
            .or_insert_with(|| empty_build(app_slug, build_slug));
        build.status = Some(status);
        build.updated_at = Utc::now();
        Ok(build.clone())
    }
}

fn empty_build(app_slug: &str, build_slug: &str) -> BuildRecord {
    BuildRecord {
        app_slug: app_slug.to_string(),
        build_slug: build_slug.to_string(),
        test_history_id: None,
        test_execution_id: None,
        status: None,
        updated_at: Utc::now(),
    }
}

#[async_trait]
impl AppRegistry for MemoryRegistry {
    async fn get_app(&self, app_slug: &str) -> AppResult<Option<AppRecord>> {
        Ok(self.apps.lock().unwrap().get(app_slug).cloned())
    }

    async fn upsert_app(&self, app_slug: &str, api_token: &SecretString) -> AppResult<AppRecord> {
        let app = AppRecord {
            app_slug: app_slug.to_string(),
            api_token: api_token.clone(),
            created_at: Utc::now(),
        };
        self.apps
            .lock()
            .unwrap()
            .insert(app_slug.to_string(), app.clone());
        Ok(app)
    }
}

impl MemoryRegistry {
    /// Insert a build row directly, including blank identifiers.
    pub fn put_build(&self, build_slug: &str, history: &str, execution: &str) {
        self.builds.lock().unwrap().insert(
            (APP.to_string(), build_slug.to_string()),
            BuildRecord {
                app_slug: APP.to_string(),
                build_slug: build_slug.to_string(),
                test_history_id: Some(history.to_string()),
                test_execution_id: Some(execution.to_string()),
                status: None,
                updated_at: Utc::now(),
            },
        );
    }
}

// ============================================================================
// Remote service doubles
// ============================================================================

/// Device-testing service returning a fixed outcome list.
#[derive(Default)]
pub struct FixedDeviceService {
    outcomes: Vec<String>,
    pub calls: AtomicUsize,
}

impl FixedDeviceService {
    pub fn new(outcomes: &[&str]) -> Self {
        Self {
            outcomes: outcomes.iter().map(|s| s.to_string()).collect(),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl DeviceTestingService for FixedDeviceService {
    async fn execution_outcomes(
        &self,
        _run: &DeviceRunIds,
        _app_slug: &str,
        _build_slug: &str,
    ) -> AppResult<Vec<DeviceOutcome>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .outcomes
            .iter()
            .map(|o| DeviceOutcome {
                device_id: "Pixel2".to_string(),
                os_version: "28".to_string(),
                locale: "en".to_string(),
                orientation: "portrait".to_string(),
                outcome: OutcomeCategory::parse(o),
            })
            .collect())
    }
}

/// A step result received by [`RecordingCi`].
#[derive(Debug, Clone)]
pub struct Submission {
    pub token: String,
    pub app_slug: String,
    pub build_slug: String,
    pub verdict: StepVerdict,
}

/// CI host double that records submissions.
#[derive(Default)]
pub struct RecordingCi {
    pub submissions: Mutex<Vec<Submission>>,
    pub reject: AtomicBool,
    /// Status answered by `get_build`.
    pub build_status: AtomicI32,
}

#[async_trait]
impl CiSystem for RecordingCi {
    async fn submit_step_result(
        &self,
        token: &SecretString,
        app_slug: &str,
        build_slug: &str,
        verdict: &StepVerdict,
    ) -> AppResult<()> {
        if self.reject.load(Ordering::SeqCst) {
            return Err(AppError::ReportSubmission("CI host responded with 500".to_string()));
        }
        self.submissions.lock().unwrap().push(Submission {
            token: token.expose_secret().to_string(),
            app_slug: app_slug.to_string(),
            build_slug: build_slug.to_string(),
            verdict: verdict.clone(),
        });
        Ok(())
    }

    async fn get_build(
        &self,
        _token: &SecretString,
        _app_slug: &str,
        _build_slug: &str,
    ) -> AppResult<CiBuild> {
        Ok(CiBuild {
            status: self.build_status.load(Ordering::SeqCst),
        })
    }
}

impl RecordingCi {
    pub fn count(&self) -> usize {
        self.submissions.lock().unwrap().len()
    }

    /// Wait for background submissions to land.
    pub async fn wait_for(&self, expected: usize) -> Vec<Submission> {
        for _ in 0..100 {
            if self.count() >= expected {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        self.submissions.lock().unwrap().clone()
    }
}

// ============================================================================
// Test context
// ============================================================================

pub struct TestContext {
    pub registry: Arc<MemoryRegistry>,
    pub artifacts: MockArtifactServer,
    pub device: Arc<FixedDeviceService>,
    pub ci: Arc<RecordingCi>,
    store: Arc<dyn ArtifactStore>,
    summary: TestSummaryService,
    reporter: StepVerdictReporter,
}

impl TestContext {
    pub async fn new() -> Self {
        Self::with_options(ReconciliationRule::Additive, BatchPolicy::FailFast, &[]).await
    }

    pub async fn with_options(
        rule: ReconciliationRule,
        policy: BatchPolicy,
        device_outcomes: &[&str],
    ) -> Self {
        let registry = Arc::new(MemoryRegistry::default());
        registry
            .upsert_app(APP, &SecretString::from(APP_TOKEN.to_string()))
            .await
            .unwrap();

        let artifacts = MockArtifactServer::start();
        let store: Arc<dyn ArtifactStore> = Arc::new(artifacts.store());
        let fetcher = Arc::new(HttpArtifactFetcher::new(
            store.clone(),
            reqwest::Client::new(),
            Duration::from_secs(5),
        ));
        let aggregator = Aggregator::new(fetcher, Arc::new(JunitParser), 4);

        let device = Arc::new(FixedDeviceService::new(device_outcomes));
        let merger = DeviceOutcomeMerger::new(device.clone(), rule);
        let ci = Arc::new(RecordingCi::default());

        let summary = TestSummaryService::new(
            registry.clone(),
            registry.clone(),
            aggregator.clone(),
            merger,
            policy,
        );
        let reporter =
            StepVerdictReporter::new(registry.clone(), registry.clone(), aggregator, ci.clone());

        Self {
            registry,
            artifacts,
            device,
            ci,
            store,
            summary,
            reporter,
        }
    }

    /// Register a report for `build_slug` and, when `xml` is given, upload it.
    /// Without `xml` the report stays pending (`uploaded == false`).
    pub async fn add_report(
        &self,
        build_slug: &str,
        title: &str,
        filename: &str,
        xml: Option<&str>,
    ) -> ReportRecord {
        let mut record = ReportRecord::new(APP, build_slug, filename, 100, json!({ "title": title }));
        record.uploaded = xml.is_some();
        if let Some(xml) = xml {
            self.artifacts.put(&record.path_in_bucket(), xml);
        }
        self.registry.create(record).await.unwrap()
    }

    /// Register a report marked uploaded whose artifact is missing from storage.
    pub async fn add_lost_report(&self, build_slug: &str, title: &str, filename: &str) -> ReportRecord {
        let mut record = ReportRecord::new(APP, build_slug, filename, 100, json!({ "title": title }));
        record.uploaded = true;
        self.registry.create(record).await.unwrap()
    }

    pub async fn app(
        &self,
    ) -> impl actix_web::dev::Service<actix_http::Request, Response = ServiceResponse, Error = actix_web::Error>
    {
        let reports: Arc<dyn ReportRegistry> = self.registry.clone();
        let builds: Arc<dyn BuildRegistry> = self.registry.clone();

        test::init_service(
            App::new()
                .app_data(web::Data::from(reports))
                .app_data(web::Data::from(builds))
                .app_data(web::Data::from(self.store.clone()))
                .app_data(web::Data::new(self.summary.clone()))
                .app_data(web::Data::new(self.reporter.clone()))
                .service(
                    web::scope("/api/v1")
                        .configure(testlab_addon_lib::api::configure_report_routes)
                        .configure(testlab_addon_lib::api::configure_summary_routes)
                        .configure(testlab_addon_lib::api::configure_build_routes),
                ),
        )
        .await
    }
}

/// GET a path and return status and JSON body.
pub async fn get_json<S>(app: &S, uri: &str) -> (u16, Value)
where
    S: actix_web::dev::Service<actix_http::Request, Response = ServiceResponse, Error = actix_web::Error>,
{
    let req = test::TestRequest::get().uri(uri).to_request();
    let resp = test::call_service(app, req).await;
    let status = resp.status().as_u16();
    let body: Value = test::read_body_json(resp).await;
    (status, body)
}

/// Send a JSON body and return status and JSON body.
pub async fn send_json<S>(app: &S, req: test::TestRequest, body: Value) -> (u16, Value)
where
    S: actix_web::dev::Service<actix_http::Request, Response = ServiceResponse, Error = actix_web::Error>,
{
    let resp = test::call_service(app, req.set_json(body).to_request()).await;
    let status = resp.status().as_u16();
    let body: Value = test::read_body_json(resp).await;
    (status, body)
}

/// Fetch the summary totals of a build.
pub async fn summary<S>(app: &S, build_slug: &str) -> (u16, Value)
where
    S: actix_web::dev::Service<actix_http::Request, Response = ServiceResponse, Error = actix_web::Error>,
{
    get_json(app, &format!("/api/v1/apps/{}/builds/{}/test_summary", APP, build_slug)).await
}
