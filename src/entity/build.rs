//! Build entity for SeaORM.
//!
//! One row per CI build that recorded a device-testing run.

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "builds")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub app_slug: String,
    #[sea_orm(primary_key, auto_increment = false)]
    pub build_slug: String,
    pub test_history_id: Option<String>,
    pub test_execution_id: Option<String>,
    pub status: Option<i32>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
