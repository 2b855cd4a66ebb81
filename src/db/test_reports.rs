//! Database queries for test reports.

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use uuid::Uuid;

use crate::entity::test_report::{self as report, ActiveModel, Entity as TestReport};
use crate::error::{AppError, AppResult};
use crate::models::ReportRecord;

use super::{DbPool, ReportRegistry};

impl From<report::Model> for ReportRecord {
    fn from(m: report::Model) -> Self {
        ReportRecord {
            id: m.id,
            filename: m.filename,
            filesize: m.filesize,
            uploaded: m.uploaded,
            app_slug: m.app_slug,
            build_slug: m.build_slug,
            step: m.step,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

#[async_trait]
impl ReportRegistry for DbPool {
    async fn list_for_build(&self, app_slug: &str, build_slug: &str) -> AppResult<Vec<ReportRecord>> {
        let reports = TestReport::find()
            .filter(report::Column::AppSlug.eq(app_slug))
            .filter(report::Column::BuildSlug.eq(build_slug))
            .filter(report::Column::Uploaded.eq(true))
            .order_by_asc(report::Column::CreatedAt)
            .all(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to list test reports: {}", e)))?;

        Ok(reports.into_iter().map(ReportRecord::from).collect())
    }

    async fn get(&self, id: Uuid) -> AppResult<Option<ReportRecord>> {
        let result = TestReport::find_by_id(id)
            .one(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to get test report: {}", e)))?;

        Ok(result.map(ReportRecord::from))
    }

    async fn create(&self, record: ReportRecord) -> AppResult<ReportRecord> {
        record.validate().into_result()?;

        let model = ActiveModel {
            id: Set(record.id),
            filename: Set(record.filename),
            filesize: Set(record.filesize),
            uploaded: Set(record.uploaded),
            app_slug: Set(record.app_slug),
            build_slug: Set(record.build_slug),
            step: Set(record.step),
            created_at: Set(record.created_at),
            updated_at: Set(record.updated_at),
        };

        let result = model
            .insert(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to insert test report: {}", e)))?;

        Ok(result.into())
    }

    async fn update(&self, record: ReportRecord) -> AppResult<ReportRecord> {
        record.validate().into_result()?;

        let existing = TestReport::find_by_id(record.id)
            .one(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to get test report: {}", e)))?
            .ok_or_else(|| AppError::NotFound(format!("Test report {}", record.id)))?;

        let mut active: ActiveModel = existing.into();
        active.filename = Set(record.filename);
        active.filesize = Set(record.filesize);
        active.uploaded = Set(record.uploaded);
        active.step = Set(record.step);
        active.updated_at = Set(Utc::now());

        let result = active
            .update(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to update test report: {}", e)))?;

        Ok(result.into())
    }
}
