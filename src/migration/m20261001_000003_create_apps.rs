//! Migration: Create apps table.
//!
//! Apps registered with the add-on and their CI API tokens.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared(
                r#"
                CREATE TABLE apps (
                    app_slug TEXT PRIMARY KEY,
                    api_token TEXT NOT NULL CHECK (api_token <> ''),
                    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
                );

                CREATE TRIGGER update_apps_updated_at
                    BEFORE UPDATE ON apps
                    FOR EACH ROW
                    EXECUTE FUNCTION update_updated_at_column();
                "#,
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared(
                r#"
                DROP TRIGGER IF EXISTS update_apps_updated_at ON apps;
                DROP TABLE IF EXISTS apps CASCADE;
                "#,
            )
            .await?;

        Ok(())
    }
}
