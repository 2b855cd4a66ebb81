//! SeaORM database migrations.

pub use sea_orm_migration::prelude::*;

mod m20261001_000001_create_test_reports;
mod m20261001_000002_create_builds;
mod m20261001_000003_create_apps;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20261001_000001_create_test_reports::Migration),
            Box::new(m20261001_000002_create_builds::Migration),
            Box::new(m20261001_000003_create_apps::Migration),
        ]
    }
}
