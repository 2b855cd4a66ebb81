//! Device-testing service outcome matrix.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Outcome summary of one device/step combination.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeCategory {
    Success,
    Failure,
    Skipped,
    Inconclusive,
    /// Any summary value this service does not know about yet.
    #[serde(untagged)]
    Unrecognized(String),
}

impl OutcomeCategory {
    pub fn parse(s: &str) -> Self {
        match s {
            "success" => OutcomeCategory::Success,
            "failure" => OutcomeCategory::Failure,
            "skipped" => OutcomeCategory::Skipped,
            "inconclusive" => OutcomeCategory::Inconclusive,
            other => OutcomeCategory::Unrecognized(other.to_string()),
        }
    }
}

/// One entry of the device × step matrix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceOutcome {
    pub device_id: String,
    pub os_version: String,
    pub locale: String,
    pub orientation: String,
    pub outcome: OutcomeCategory,
}

/// Identifiers correlating a build with a remote device-testing run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DeviceRunIds {
    pub history_id: String,
    pub execution_id: String,
}

impl DeviceRunIds {
    /// Both ids present and non-empty, or nothing.
    pub fn from_parts(history_id: Option<&str>, execution_id: Option<&str>) -> Option<Self> {
        match (history_id, execution_id) {
            (Some(h), Some(e)) if !h.trim().is_empty() && !e.trim().is_empty() => Some(Self {
                history_id: h.to_string(),
                execution_id: e.to_string(),
            }),
            _ => None,
        }
    }
}
