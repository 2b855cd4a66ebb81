//! Mirrors the CI host's view of a build into the build registry.

use std::sync::Arc;

use tracing::{info, instrument};

use crate::db::{AppRegistry, BuildRegistry};
use crate::error::{AppError, AppResult};
use crate::models::BuildRecord;
use crate::services::ci_client::CiSystem;

/// Refreshes the stored CI status of builds.
#[derive(Clone)]
pub struct BuildStatusSync {
    apps: Arc<dyn AppRegistry>,
    builds: Arc<dyn BuildRegistry>,
    ci: Arc<dyn CiSystem>,
}

impl BuildStatusSync {
    pub fn new(
        apps: Arc<dyn AppRegistry>,
        builds: Arc<dyn BuildRegistry>,
        ci: Arc<dyn CiSystem>,
    ) -> Self {
        Self { apps, builds, ci }
    }

    /// Ask the CI host for the build's status and store it.
    #[instrument(name = "build_status.refresh", skip(self))]
    pub async fn refresh(&self, app_slug: &str, build_slug: &str) -> AppResult<BuildRecord> {
        let app = self
            .apps
            .get_app(app_slug)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("App {}", app_slug)))?;

        let ci_build = self.ci.get_build(&app.api_token, app_slug, build_slug).await?;
        let record = self
            .builds
            .record_status(app_slug, build_slug, ci_build.status)
            .await?;

        info!(status = ci_build.status, "Build status recorded");
        Ok(record)
    }
}
