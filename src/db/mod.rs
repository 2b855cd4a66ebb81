//! Database module providing connection management, migrations, and the
//! registries the pipeline reads records from.

pub mod apps;
pub mod builds;
pub mod test_reports;

use std::time::Duration;

use async_trait::async_trait;
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use sea_orm_migration::MigratorTrait;
use secrecy::SecretString;
use tracing::info;
use uuid::Uuid;

use crate::config::DatabaseSettings;
use crate::error::{AppError, AppResult};
use crate::migration::Migrator;
use crate::models::{AppRecord, BuildRecord, DeviceRunIds, ReportRecord};

// ============================================================================
// Registries
// ============================================================================

/// Persistent store of report records.
#[async_trait]
pub trait ReportRegistry: Send + Sync {
    /// Uploaded reports of one build, oldest first. Registrations whose
    /// artifact never reached storage are left out.
    async fn list_for_build(&self, app_slug: &str, build_slug: &str) -> AppResult<Vec<ReportRecord>>;

    async fn get(&self, id: Uuid) -> AppResult<Option<ReportRecord>>;

    /// Insert a new record. Fails with [`AppError::Validation`] when the record
    /// violates store constraints.
    async fn create(&self, record: ReportRecord) -> AppResult<ReportRecord>;

    /// Persist changes to an existing record. Validated like [`Self::create`].
    async fn update(&self, record: ReportRecord) -> AppResult<ReportRecord>;
}

/// Builds and their device-testing run identifiers.
#[async_trait]
pub trait BuildRegistry: Send + Sync {
    async fn get_build(&self, app_slug: &str, build_slug: &str) -> AppResult<Option<BuildRecord>>;

    async fn upsert_device_run(
        &self,
        app_slug: &str,
        build_slug: &str,
        run: &DeviceRunIds,
    ) -> AppResult<BuildRecord>;

    /// Store the last build status reported by the CI host. Device-run
    /// identifiers already on the record are kept.
    async fn record_status(&self, app_slug: &str, build_slug: &str, status: i32) -> AppResult<BuildRecord>;
}

/// Apps registered with the add-on.
#[async_trait]
pub trait AppRegistry: Send + Sync {
    async fn get_app(&self, app_slug: &str) -> AppResult<Option<AppRecord>>;

    async fn upsert_app(&self, app_slug: &str, api_token: &SecretString) -> AppResult<AppRecord>;
}

// ============================================================================
// Connection Pool
// ============================================================================

/// Database connection pool wrapper.
#[derive(Clone)]
pub struct DbPool {
    conn: DatabaseConnection,
}

impl DbPool {
    /// Connect using the configured pool sizes.
    pub async fn new(settings: &DatabaseSettings) -> AppResult<Self> {
        let mut options = ConnectOptions::new(settings.url.clone());
        options
            .max_connections(settings.max_connections)
            .min_connections(settings.min_connections)
            .connect_timeout(Duration::from_secs(10))
            .sqlx_logging(false);

        let conn = Database::connect(options)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to database: {}", e)))?;

        Ok(DbPool { conn })
    }

    /// Get access to the connection for executing queries.
    pub fn connection(&self) -> &DatabaseConnection {
        &self.conn
    }

    /// Apply pending migrations.
    pub async fn run_migrations(&self) -> AppResult<()> {
        Migrator::up(&self.conn, None)
            .await
            .map_err(|e| AppError::Database(format!("Failed to run migrations: {}", e)))?;
        info!("Database migrations complete");
        Ok(())
    }

    /// Round-trip to the database; used by the readiness probe.
    pub async fn ping(&self) -> AppResult<()> {
        self.conn
            .ping()
            .await
            .map_err(|e| AppError::Database(format!("Database unreachable: {}", e)))
    }
}
