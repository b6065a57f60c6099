use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Primary key of the single settings row.
pub const SINGLETON_ID: i32 = 1;
pub const MAX_FEE_PERCENT: i32 = 50;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "system_settings")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: i32,
    pub platform_fee_percent: i32,
    pub maintenance_mode: bool,
    pub support_email: String,
    pub updated_by: Option<Uuid>,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation {}

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef { panic!("no relations defined here") }
}

impl ActiveModelBehavior for ActiveModel {}
