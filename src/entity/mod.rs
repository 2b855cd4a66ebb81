//! SeaORM entity definitions for PostgreSQL database.

pub mod app;
pub mod build;
pub mod test_report;
