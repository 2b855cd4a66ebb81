//! Migration: Create test_reports table and shared trigger function.
//!
//! One row per JUnit artifact registered by a build step. Also creates the
//! shared updated_at trigger function.

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
                -- Shared trigger function for updated_at
                CREATE OR REPLACE FUNCTION update_updated_at_column()
                RETURNS TRIGGER AS $$
                BEGIN
                    NEW.updated_at = NOW();
                    RETURN NEW;
                END;
                $$ LANGUAGE plpgsql;

                CREATE TABLE test_reports (
                    id UUID PRIMARY KEY,
                    filename TEXT NOT NULL CHECK (filename <> ''),
                    filesize BIGINT NOT NULL CHECK (filesize > 0),
                    uploaded BOOLEAN NOT NULL DEFAULT FALSE,
                    app_slug TEXT NOT NULL,
                    build_slug TEXT NOT NULL,

                    -- Step description as JSONB {id, version, title, number}
                    step JSONB NOT NULL DEFAULT '{}'::jsonb,

                    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
                );

                -- Reports are always listed per build
                CREATE INDEX idx_test_reports_app_build
                    ON test_reports(app_slug, build_slug, created_at);

                CREATE TRIGGER update_test_reports_updated_at
                    BEFORE UPDATE ON test_reports
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
                DROP TRIGGER IF EXISTS update_test_reports_updated_at ON test_reports;
                DROP TABLE IF EXISTS test_reports CASCADE;
                DROP FUNCTION IF EXISTS update_updated_at_column();
                "#,
            )
            .await?;

        Ok(())
    }
}
