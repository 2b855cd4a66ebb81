//! Domain error types for the test-report enrichment service.
//!
//! Uses thiserror for ergonomic error handling with automatic Display implementations.

use std::collections::BTreeMap;
use std::fmt;

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

/// Field-level validation failures reported by a registry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct ValidationErrors {
    pub errors: BTreeMap<String, Vec<String>>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.errors
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn has_any(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Convert into `Err` if any field failed.
    pub fn into_result(self) -> Result<(), AppError> {
        if self.has_any() {
            Err(AppError::Validation(self))
        } else {
            Ok(())
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .errors
            .iter()
            .map(|(field, messages)| format!("{}: {}", field, messages.join(", ")))
            .collect();
        write!(f, "{}", parts.join("; "))
    }
}

/// Application-level errors.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Artifact retrieval failed (transport error or non-200 response)
    #[error("Failed to get test report XML for report {report_id}: {message}")]
    Fetch {
        report_id: Uuid,
        status: Option<u16>,
        message: String,
    },

    /// Artifact bytes are not a recognizable JUnit document
    #[error("Failed to parse test report XML: {0}")]
    Parse(String),

    /// Resource not found
    #[error("{0} not found")]
    NotFound(String),

    /// Remote device-testing service failed
    #[error("Device testing service error: {0}")]
    Upstream(String),

    /// The CI host rejected or never received a step result
    #[error("Failed to submit step result: {0}")]
    ReportSubmission(String),

    /// Record failed store-level constraints
    #[error("Validation failed: {0}")]
    Validation(ValidationErrors),

    /// Invalid input data
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Database operation failed
    #[error("Database error: {0}")]
    Database(String),

    /// Storage (S3) operation failed
    #[error("Storage error: {0}")]
    Storage(String),
}

impl AppError {
    /// Attach the report identity to a parse failure.
    pub fn with_report(self, report_id: Uuid) -> Self {
        match self {
            AppError::Parse(msg) => AppError::Parse(format!("report {}: {}", report_id, msg)),
            other => other,
        }
    }

    /// Machine-readable code carried in the `error` field of response bodies.
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::Fetch { .. } => "FETCH_ERROR",
            AppError::Parse(_) => "PARSE_ERROR",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Upstream(_) => "UPSTREAM_ERROR",
            AppError::ReportSubmission(_) => "REPORT_SUBMISSION_ERROR",
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::InvalidInput(_) => "INVALID_INPUT",
            AppError::Database(_) => "DATABASE_ERROR",
            AppError::Storage(_) => "STORAGE_ERROR",
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Fetch { .. }
            | AppError::Parse(_)
            | AppError::Upstream(_)
            | AppError::ReportSubmission(_) => StatusCode::BAD_GATEWAY,
            AppError::Database(_) | AppError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = match self {
            AppError::Validation(errors) => {
                return HttpResponse::UnprocessableEntity().json(errors);
            }
            AppError::Database(err_str) => {
                tracing::error!("Database error: {}", err_str);
                "An internal database error occurred".to_string()
            }
            _ => self.to_string(),
        };

        HttpResponse::build(self.status_code()).json(ErrorResponse {
            error: self.error_code().to_string(),
            message,
        })
    }
}

/// Error response body matching OpenAPI schema.
#[derive(Debug, serde::Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl fmt::Display for ErrorResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.error, self.message)
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;

// Conversion implementations for common error types

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::InvalidInput(format!("JSON parsing error: {}", err))
    }
}

impl From<sea_orm::DbErr> for AppError {
    fn from(err: sea_orm::DbErr) -> Self {
        AppError::Database(err.to_string())
    }
}

impl From<uuid::Error> for AppError {
    fn from(err: uuid::Error) -> Self {
        AppError::InvalidInput(format!("Invalid UUID: {}", err))
    }
}

impl From<quick_xml::Error> for AppError {
    fn from(err: quick_xml::Error) -> Self {
        AppError::Parse(err.to_string())
    }
}
