//! API endpoint modules.

pub mod builds;
pub mod health;
pub mod openapi;
pub mod test_reports;
pub mod test_summary;

pub use builds::configure_routes as configure_build_routes;
pub use health::configure_health_routes;
pub use openapi::ApiDoc;
pub use test_reports::configure_routes as configure_report_routes;
pub use test_summary::configure_routes as configure_summary_routes;
