use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::enums::PaymentStatus;
use crate::service_request;

pub const GATEWAY_MERCADOPAGO: &str = "mercadopago";

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "payment")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub service_request_id: Uuid,
    pub payer_id: Uuid,
    pub amount_cents: i64,
    pub platform_fee_cents: i64,
    pub status: String,
    pub gateway: String,
    pub preference_id: Option<String>,
    pub external_id: Option<String>,
    pub checkout_url: Option<String>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation { ServiceRequest }

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Relation::ServiceRequest => Entity::belongs_to(service_request::Entity)
                .from(Column::ServiceRequestId)
                .to(service_request::Column::Id)
                .into(),
        }
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn status(&self) -> PaymentStatus {
        self.status.parse().unwrap_or(PaymentStatus::Pending)
    }
}
