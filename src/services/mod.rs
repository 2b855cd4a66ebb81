//! Business logic services.

pub mod aggregator;
pub mod artifact_fetcher;
pub mod build_status;
pub mod ci_client;
pub mod device_merger;
pub mod device_testing;
pub mod junit_parser;
pub mod step_reporter;
pub mod storage;
pub mod summary;

pub use aggregator::{AggregateResult, Aggregator, BatchPolicy};
pub use artifact_fetcher::{ArtifactFetcher, HttpArtifactFetcher};
pub use build_status::BuildStatusSync;
pub use ci_client::{CiSystem, HttpCiClient};
pub use device_merger::DeviceOutcomeMerger;
pub use device_testing::{DeviceTestingService, ToolResultsClient};
pub use junit_parser::{JunitParser, ResultParser};
pub use step_reporter::StepVerdictReporter;
pub use storage::{ArtifactStore, Storage};
pub use summary::TestSummaryService;
