//! Build and app records.

use chrono::{DateTime, Utc};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::DeviceRunIds;

/// Local view of a CI build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct BuildRecord {
    pub app_slug: String,
    pub build_slug: String,
    pub test_history_id: Option<String>,
    pub test_execution_id: Option<String>,
    /// Last status reported by the CI host, if known.
    pub status: Option<i32>,
    pub updated_at: DateTime<Utc>,
}

impl BuildRecord {
    /// Device-run identifiers, if the build ran on the device-testing service.
    pub fn device_run(&self) -> Option<DeviceRunIds> {
        DeviceRunIds::from_parts(
            self.test_history_id.as_deref(),
            self.test_execution_id.as_deref(),
        )
    }
}

/// Request body for recording a build's device run.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct DeviceRunRequest {
    pub test_history_id: String,
    pub test_execution_id: String,
}

/// An app registered with the add-on.
#[derive(Debug, Clone)]
pub struct AppRecord {
    pub app_slug: String,
    /// App-scoped token for the CI host API.
    pub api_token: SecretString,
    pub created_at: DateTime<Utc>,
}

/// Build status as reported by the CI host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct CiBuild {
    pub status: i32,
}
