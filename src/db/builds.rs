//! Database queries for builds.

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::sea_query::OnConflict;
use sea_orm::{EntityTrait, Set};

use crate::entity::build::{self, ActiveModel, Entity as Build};
use crate::error::{AppError, AppResult};
use crate::models::{BuildRecord, DeviceRunIds};

use super::{BuildRegistry, DbPool};

impl From<build::Model> for BuildRecord {
    fn from(m: build::Model) -> Self {
        BuildRecord {
            app_slug: m.app_slug,
            build_slug: m.build_slug,
            test_history_id: m.test_history_id,
            test_execution_id: m.test_execution_id,
            status: m.status,
            updated_at: m.updated_at,
        }
    }
}

#[async_trait]
impl BuildRegistry for DbPool {
    async fn get_build(&self, app_slug: &str, build_slug: &str) -> AppResult<Option<BuildRecord>> {
        let result = Build::find_by_id((app_slug.to_string(), build_slug.to_string()))
            .one(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to get build: {}", e)))?;

        Ok(result.map(BuildRecord::from))
    }

    async fn upsert_device_run(
        &self,
        app_slug: &str,
        build_slug: &str,
        run: &DeviceRunIds,
    ) -> AppResult<BuildRecord> {
        let now = Utc::now();
        let model = ActiveModel {
            app_slug: Set(app_slug.to_string()),
            build_slug: Set(build_slug.to_string()),
            test_history_id: Set(Some(run.history_id.clone())),
            test_execution_id: Set(Some(run.execution_id.clone())),
            status: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        };

        Build::insert(model)
            .on_conflict(
                OnConflict::columns([build::Column::AppSlug, build::Column::BuildSlug])
                    .update_columns([
                        build::Column::TestHistoryId,
                        build::Column::TestExecutionId,
                        build::Column::UpdatedAt,
                    ])
                    .to_owned(),
            )
            .exec(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to upsert build: {}", e)))?;

        self.get_build(app_slug, build_slug)
            .await?
            .ok_or_else(|| AppError::Database(format!("Build {} vanished after upsert", build_slug)))
    }

    async fn record_status(&self, app_slug: &str, build_slug: &str, status: i32) -> AppResult<BuildRecord> {
        let now = Utc::now();
        let model = ActiveModel {
            app_slug: Set(app_slug.to_string()),
            build_slug: Set(build_slug.to_string()),
            test_history_id: Set(None),
            test_execution_id: Set(None),
            status: Set(Some(status)),
            created_at: Set(now),
            updated_at: Set(now),
        };

        Build::insert(model)
            .on_conflict(
                OnConflict::columns([build::Column::AppSlug, build::Column::BuildSlug])
                    .update_columns([build::Column::Status, build::Column::UpdatedAt])
                    .to_owned(),
            )
            .exec(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to record build status: {}", e)))?;

        self.get_build(app_slug, build_slug)
            .await?
            .ok_or_else(|| AppError::Database(format!("Build {} vanished after upsert", build_slug)))
    }
}
