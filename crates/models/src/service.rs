use sea_orm::{entity::prelude::*, Set, DatabaseConnection};
use uuid::Uuid;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::{errors, service_provider};

pub const MAX_PRICE_CENTS: i64 = 100_000_000;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "service")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub provider_id: Uuid,
    pub title: String,
    pub description: String,
    pub category: String,
    pub price_cents: i64,
    pub is_active: bool,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation { Provider }

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Relation::Provider => Entity::belongs_to(service_provider::Entity)
                .from(Column::ProviderId)
                .to(service_provider::Column::Id)
                .into(),
        }
    }
}

impl Related<service_provider::Entity> for Entity {
    fn to() -> RelationDef { Relation::Provider.def() }
}

impl ActiveModelBehavior for ActiveModel {}

pub fn validate_title(title: &str) -> Result<(), errors::ModelError> {
    let len = title.trim().chars().count();
    if len < 3 || len > 160 {
        return Err(errors::ModelError::Validation("title must have 3..=160 characters".into()));
    }
    Ok(())
}

/// Categories are stored lower-cased.
pub fn normalize_category(category: &str) -> Result<String, errors::ModelError> {
    let c = category.trim().to_lowercase();
    if c.is_empty() || c.len() > 64 {
        return Err(errors::ModelError::Validation("category required (<=64 chars)".into()));
    }
    Ok(c)
}

pub fn validate_price(price_cents: i64) -> Result<(), errors::ModelError> {
    if price_cents <= 0 || price_cents > MAX_PRICE_CENTS {
        return Err(errors::ModelError::Validation("price must be positive".into()));
    }
    Ok(())
}

pub async fn create(
    db: &DatabaseConnection,
    provider_id: Uuid,
    title: &str,
    description: &str,
    category: &str,
    price_cents: i64,
) -> Result<Model, errors::ModelError> {
    validate_title(title)?;
    let category = normalize_category(category)?;
    validate_price(price_cents)?;
    let now = Utc::now().into();
    let am = ActiveModel {
        id: Set(Uuid::new_v4()),
        provider_id: Set(provider_id),
        title: Set(title.trim().to_string()),
        description: Set(description.trim().to_string()),
        category: Set(category),
        price_cents: Set(price_cents),
        is_active: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
    };
    Ok(am.insert(db).await?)
}

pub async fn set_active(db: &DatabaseConnection, id: Uuid, active: bool) -> Result<Model, errors::ModelError> {
    let mut found: ActiveModel = Entity::find_by_id(id).one(db).await?
        .ok_or_else(|| errors::ModelError::Validation("service not found".into()))?
        .into();
    found.is_active = Set(active);
    found.updated_at = Set(Utc::now().into());
    Ok(found.update(db).await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn price_bounds() {
        assert!(validate_price(0).is_err());
        assert!(validate_price(-10).is_err());
        assert!(validate_price(15_000).is_ok());
        assert!(validate_price(MAX_PRICE_CENTS + 1).is_err());
    }

    #[test]
    fn category_lower_cased() {
        assert_eq!(normalize_category("  Limpeza ").unwrap(), "limpeza");
        assert!(normalize_category("   ").is_err());
    }
}
