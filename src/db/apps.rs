//! Database operations for registered apps.

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::sea_query::OnConflict;
use sea_orm::{EntityTrait, QueryOrder, Set};
use secrecy::{ExposeSecret, SecretString};

use crate::entity::app::{self, ActiveModel, Entity as App};
use crate::error::{AppError, AppResult};
use crate::models::AppRecord;

use super::{AppRegistry, DbPool};

fn model_to_app(m: app::Model) -> AppRecord {
    AppRecord {
        app_slug: m.app_slug,
        api_token: SecretString::from(m.api_token),
        created_at: m.created_at,
    }
}

impl DbPool {
    /// List all registered apps, newest first.
    pub async fn list_apps(&self) -> AppResult<Vec<AppRecord>> {
        let results = App::find()
            .order_by_desc(app::Column::CreatedAt)
            .all(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to list apps: {}", e)))?;

        Ok(results.into_iter().map(model_to_app).collect())
    }

    /// Remove an app. Returns false when it was not registered.
    pub async fn delete_app(&self, app_slug: &str) -> AppResult<bool> {
        let result = App::delete_by_id(app_slug.to_string())
            .exec(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to delete app: {}", e)))?;

        Ok(result.rows_affected > 0)
    }
}

#[async_trait]
impl AppRegistry for DbPool {
    async fn get_app(&self, app_slug: &str) -> AppResult<Option<AppRecord>> {
        let result = App::find_by_id(app_slug.to_string())
            .one(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to get app: {}", e)))?;

        Ok(result.map(model_to_app))
    }

    async fn upsert_app(&self, app_slug: &str, api_token: &SecretString) -> AppResult<AppRecord> {
        if app_slug.trim().is_empty() {
            return Err(AppError::InvalidInput("App slug can not be blank".to_string()));
        }
        if api_token.expose_secret().trim().is_empty() {
            return Err(AppError::InvalidInput("API token can not be blank".to_string()));
        }

        let now = Utc::now();
        let model = ActiveModel {
            app_slug: Set(app_slug.to_string()),
            api_token: Set(api_token.expose_secret().to_string()),
            created_at: Set(now),
            updated_at: Set(now),
        };

        App::insert(model)
            .on_conflict(
                OnConflict::column(app::Column::AppSlug)
                    .update_columns([app::Column::ApiToken, app::Column::UpdatedAt])
                    .to_owned(),
            )
            .exec(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to upsert app: {}", e)))?;

        self.get_app(app_slug)
            .await?
            .ok_or_else(|| AppError::Database(format!("App {} vanished after upsert", app_slug)))
    }
}
