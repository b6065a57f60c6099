use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::enums::DiscountType;
use crate::errors;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "coupon")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub code: String,
    pub discount_type: String,
    pub discount_value: i64,
    pub min_order_cents: Option<i64>,
    pub max_uses: Option<i32>,
    pub used_count: i32,
    pub expires_at: Option<DateTimeWithTimeZone>,
    pub is_active: bool,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation {}

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef { panic!("no relations defined here") }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn discount_type(&self) -> DiscountType {
        self.discount_type.parse().unwrap_or(DiscountType::Fixed)
    }
}

/// Codes are 3..=32 ASCII letters or digits, stored upper-cased.
pub fn normalize_code(code: &str) -> Result<String, errors::ModelError> {
    let up = code.trim().to_ascii_uppercase();
    if !(3..=32).contains(&up.len()) || !up.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(errors::ModelError::Validation("coupon code must be 3..=32 letters or digits".into()));
    }
    Ok(up)
}

pub fn validate_discount(kind: DiscountType, value: i64) -> Result<(), errors::ModelError> {
    match kind {
        DiscountType::Percent if !(1..=100).contains(&value) => {
            Err(errors::ModelError::Validation("percent discount must be within 1..=100".into()))
        }
        DiscountType::Fixed if value <= 0 => {
            Err(errors::ModelError::Validation("fixed discount must be positive".into()))
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_normalization() {
        assert_eq!(normalize_code(" bemvindo10 ").unwrap(), "BEMVINDO10");
        assert!(normalize_code("ab").is_err());
        assert!(normalize_code("has space").is_err());
        assert!(normalize_code("BLACK-FRIDAY").is_err());
        assert!(normalize_code("promo_10").is_err());
    }

    #[test]
    fn discount_bounds() {
        assert!(validate_discount(DiscountType::Percent, 0).is_err());
        assert!(validate_discount(DiscountType::Percent, 101).is_err());
        assert!(validate_discount(DiscountType::Percent, 15).is_ok());
        assert!(validate_discount(DiscountType::Fixed, 0).is_err());
        assert!(validate_discount(DiscountType::Fixed, 500).is_ok());
    }
}
