use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::support_chat;

pub const MAX_BODY_CHARS: usize = 4000;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "support_message")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub chat_id: Uuid,
    pub sender_id: Uuid,
    pub from_admin: bool,
    pub body: String,
    pub read_at: Option<DateTimeWithTimeZone>,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation { Chat }

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Relation::Chat => Entity::belongs_to(support_chat::Entity)
                .from(Column::ChatId)
                .to(support_chat::Column::Id)
                .into(),
        }
    }
}

impl ActiveModelBehavior for ActiveModel {}
