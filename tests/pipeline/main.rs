//! Pipeline integration test suite.
//!
//! Drives the HTTP API end to end with in-memory registries, an in-process
//! artifact server and recording doubles for the device-testing service and
//! the CI host. No database or network access is required.
//!
//! Run with: cargo test --test pipeline

mod mock_artifact_server;
mod test_helpers;

mod test_build_status;
mod test_report_registration;
mod test_step_result;
