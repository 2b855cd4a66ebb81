//! Migration: Create builds table.
//!
//! Correlates a CI build with its device-testing history and execution.

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
                CREATE TABLE builds (
                    app_slug TEXT NOT NULL,
                    build_slug TEXT NOT NULL,
                    test_history_id TEXT,
                    test_execution_id TEXT,
                    status INTEGER,
                    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                    PRIMARY KEY (app_slug, build_slug)
                );

                CREATE TRIGGER update_builds_updated_at
                    BEFORE UPDATE ON builds
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
                DROP TRIGGER IF EXISTS update_builds_updated_at ON builds;
                DROP TABLE IF EXISTS builds CASCADE;
                "#,
            )
            .await?;

        Ok(())
    }
}
