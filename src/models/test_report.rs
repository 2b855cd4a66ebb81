//! Test report records and their request/response DTOs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::{AppError, ValidationErrors};
use crate::models::Suite;

/// Largest artifact a client may register (100MB).
pub const MAX_REPORT_FILESIZE: i64 = 104_857_600;

/// A registered JUnit artifact belonging to one build step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ReportRecord {
    pub id: Uuid,
    pub filename: String,
    pub filesize: i64,
    pub uploaded: bool,
    pub app_slug: String,
    pub build_slug: String,
    /// Opaque description of the step that produced the report.
    #[schema(value_type = Object)]
    pub step: JsonValue,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ReportRecord {
    /// Build a fresh, not-yet-uploaded record.
    pub fn new(
        app_slug: impl Into<String>,
        build_slug: impl Into<String>,
        filename: impl Into<String>,
        filesize: i64,
        step: JsonValue,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            filename: filename.into(),
            filesize,
            uploaded: false,
            app_slug: app_slug.into(),
            build_slug: build_slug.into(),
            step,
            created_at: now,
            updated_at: now,
        }
    }

    /// Object-store key the artifact is uploaded to.
    pub fn path_in_bucket(&self) -> String {
        format!(
            "builds/{}/test_reports/{}/{}",
            self.build_slug, self.id, self.filename
        )
    }

    /// Store-level constraints checked before create and update.
    pub fn validate(&self) -> ValidationErrors {
        let mut errors = ValidationErrors::new();

        if self.filename.trim().is_empty() {
            errors.add("filename", "Filename can not be blank.");
        } else if self.filename.contains('/') || self.filename.contains('\\') {
            errors.add("filename", "Filename must not contain path separators.");
        }
        if self.filesize <= 0 {
            errors.add("filesize", "Filesize must be greater than 0.");
        } else if self.filesize > MAX_REPORT_FILESIZE {
            errors.add(
                "filesize",
                format!("Filesize must not exceed {} bytes.", MAX_REPORT_FILESIZE),
            );
        }
        if self.app_slug.trim().is_empty() {
            errors.add("app_slug", "AppSlug can not be blank.");
        }
        if self.build_slug.trim().is_empty() {
            errors.add("build_slug", "BuildSlug can not be blank.");
        }

        errors
    }

    /// Decode the step blob, tolerating missing fields.
    pub fn step_info(&self) -> StepInfo {
        serde_json::from_value(self.step.clone()).unwrap_or_default()
    }
}

/// Step description attached by the CI step that uploaded the report.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct StepInfo {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub number: i32,
}

/// Request body for registering a report upload.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateTestReportRequest {
    pub filename: String,
    pub filesize: i64,
    #[serde(default)]
    pub step: StepInfo,
}

/// Request body for flipping the uploaded flag.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct UpdateTestReportRequest {
    pub uploaded: bool,
}

/// Newly registered record with the URL the client uploads to.
#[derive(Debug, Serialize, ToSchema)]
pub struct TestReportWithUploadUrl {
    #[serde(flatten)]
    pub record: ReportRecord,
    pub upload_url: String,
}

/// A record enriched with its parsed suites.
#[derive(Debug, Serialize, ToSchema)]
pub struct TestReportWithSuites {
    #[serde(flatten)]
    pub record: ReportRecord,
    pub test_suites: Vec<Suite>,
    /// Set when a best-effort batch could not fetch or parse the artifact.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<ReportFailure>,
}

/// A report left out of a best-effort batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ReportFailure {
    pub report_id: Uuid,
    /// Same code an error response for this failure would carry.
    pub error: String,
    pub message: String,
}

impl ReportFailure {
    pub fn new(report_id: Uuid, err: &AppError) -> Self {
        Self {
            report_id,
            error: err.error_code().to_string(),
            message: err.to_string(),
        }
    }
}
