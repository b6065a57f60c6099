//! Admin coupon management and client-side coupon validation.

use chrono::{DateTime, FixedOffset, Utc};
use common::pagination::Pagination;
use common::types::Page;
use models::coupon;
use models::enums::DiscountType;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set};
use serde::{Deserialize, Deserializer};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::errors::ServiceError;
use crate::pricing::{self, Quote};

#[derive(Debug, Clone, Deserialize)]
pub struct CouponInput {
    pub code: String,
    pub discount_type: DiscountType,
    pub discount_value: i64,
    pub min_order_cents: Option<i64>,
    pub max_uses: Option<i32>,
    pub expires_at: Option<DateTime<FixedOffset>>,
}

/// Partial update. For the nullable limits an explicit `null` clears the value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CouponUpdate {
    pub discount_type: Option<DiscountType>,
    pub discount_value: Option<i64>,
    #[serde(default, deserialize_with = "present")]
    pub min_order_cents: Option<Option<i64>>,
    #[serde(default, deserialize_with = "present")]
    pub max_uses: Option<Option<i32>>,
    #[serde(default, deserialize_with = "present")]
    pub expires_at: Option<Option<DateTime<FixedOffset>>>,
    pub is_active: Option<bool>,
}

fn present<'de, D, T>(de: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(de).map(Some)
}

fn check_limits(min_order_cents: Option<i64>, max_uses: Option<i32>) -> Result<(), ServiceError> {
    if min_order_cents.is_some_and(|m| m < 0) {
        return Err(ServiceError::validation("min_order_cents cannot be negative"));
    }
    if max_uses.is_some_and(|m| m <= 0) {
        return Err(ServiceError::validation("max_uses must be positive"));
    }
    Ok(())
}

pub async fn find_by_code(db: &DatabaseConnection, code: &str) -> Result<coupon::Model, ServiceError> {
    let code = coupon::normalize_code(code)?;
    coupon::Entity::find()
        .filter(coupon::Column::Code.eq(code))
        .one(db)
        .await?
        .ok_or_else(|| ServiceError::not_found("coupon"))
}

#[instrument(skip(db, input), fields(code = %input.code))]
pub async fn create(db: &DatabaseConnection, input: CouponInput) -> Result<coupon::Model, ServiceError> {
    let code = coupon::normalize_code(&input.code)?;
    coupon::validate_discount(input.discount_type, input.discount_value)?;
    check_limits(input.min_order_cents, input.max_uses)?;
    let exists = coupon::Entity::find().filter(coupon::Column::Code.eq(code.as_str())).one(db).await?;
    if exists.is_some() {
        return Err(ServiceError::Conflict(format!("coupon {code} already exists")));
    }
    let now = Utc::now().into();
    let am = coupon::ActiveModel {
        id: Set(Uuid::new_v4()),
        code: Set(code),
        discount_type: Set(input.discount_type.as_str().to_string()),
        discount_value: Set(input.discount_value),
        min_order_cents: Set(input.min_order_cents),
        max_uses: Set(input.max_uses),
        used_count: Set(0),
        expires_at: Set(input.expires_at),
        is_active: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
    };
    let created = am.insert(db).await?;
    info!(coupon_id = %created.id, "coupon_created");
    Ok(created)
}

#[instrument(skip(db, input))]
pub async fn update(db: &DatabaseConnection, id: Uuid, input: CouponUpdate) -> Result<coupon::Model, ServiceError> {
    let found = coupon::Entity::find_by_id(id).one(db).await?.ok_or_else(|| ServiceError::not_found("coupon"))?;
    let kind = input.discount_type.unwrap_or_else(|| found.discount_type());
    let value = input.discount_value.unwrap_or(found.discount_value);
    coupon::validate_discount(kind, value)?;
    let min_order = input.min_order_cents.unwrap_or(found.min_order_cents);
    let max_uses = input.max_uses.unwrap_or(found.max_uses);
    check_limits(min_order, max_uses)?;

    let mut am: coupon::ActiveModel = found.into();
    am.discount_type = Set(kind.as_str().to_string());
    am.discount_value = Set(value);
    am.min_order_cents = Set(min_order);
    am.max_uses = Set(max_uses);
    if let Some(expires_at) = input.expires_at {
        am.expires_at = Set(expires_at);
    }
    if let Some(active) = input.is_active {
        am.is_active = Set(active);
    }
    am.updated_at = Set(Utc::now().into());
    Ok(am.update(db).await?)
}

/// Coupons are never deleted: bookings keep a reference to them.
#[instrument(skip(db))]
pub async fn deactivate(db: &DatabaseConnection, id: Uuid) -> Result<coupon::Model, ServiceError> {
    update(db, id, CouponUpdate { is_active: Some(false), ..Default::default() }).await
}

pub async fn list(db: &DatabaseConnection, opts: Pagination) -> Result<Page<coupon::Model>, ServiceError> {
    let (page_idx, per_page) = opts.normalize();
    let paginator = coupon::Entity::find().order_by_desc(coupon::Column::CreatedAt).paginate(db, per_page);
    let total = paginator.num_items().await?;
    let items = paginator.fetch_page(page_idx).await?;
    Ok(Page { items, page: page_idx as u32 + 1, per_page: per_page as u32, total })
}

/// Quote a subtotal against a coupon without consuming it.
pub async fn validate(db: &DatabaseConnection, code: &str, subtotal_cents: i64) -> Result<Quote, ServiceError> {
    if subtotal_cents <= 0 || subtotal_cents > models::service::MAX_PRICE_CENTS {
        return Err(ServiceError::validation("subtotal must be positive and within the price limit"));
    }
    let c = find_by_code(db, code).await?;
    pricing::apply_coupon(&c, subtotal_cents, Utc::now().into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::get_db;

    #[test]
    fn explicit_null_clears_a_limit() {
        let u: CouponUpdate = serde_json::from_str(r#"{"max_uses": null}"#).unwrap();
        assert_eq!(u.max_uses, Some(None));
        assert_eq!(u.min_order_cents, None);
    }

    #[test]
    fn limits_are_checked() {
        assert!(check_limits(Some(-1), None).is_err());
        assert!(check_limits(None, Some(0)).is_err());
        assert!(check_limits(Some(0), Some(1)).is_ok());
    }

    #[tokio::test]
    async fn out_of_range_subtotal_is_rejected_before_lookup() {
        let db = DatabaseConnection::Disconnected;
        let huge = validate(&db, "PROMO10", i64::MAX / 10).await;
        assert!(matches!(huge, Err(ServiceError::Validation(_))));
        let zero = validate(&db, "PROMO10", 0).await;
        assert!(matches!(zero, Err(ServiceError::Validation(_))));
    }

    #[tokio::test]
    async fn create_validate_and_deactivate() -> Result<(), anyhow::Error> {
        let Some(db) = get_db().await else { return Ok(()) };

        let code = format!("t{}", &Uuid::new_v4().simple().to_string()[..12]);
        let c = create(&db, CouponInput {
            code: code.clone(),
            discount_type: DiscountType::Percent,
            discount_value: 20,
            min_order_cents: Some(1_000),
            max_uses: Some(5),
            expires_at: None,
        }).await?;
        assert_eq!(c.code, code.to_uppercase());

        let dup = create(&db, CouponInput {
            code: code.clone(),
            discount_type: DiscountType::Fixed,
            discount_value: 100,
            min_order_cents: None,
            max_uses: None,
            expires_at: None,
        }).await;
        assert!(matches!(dup, Err(ServiceError::Conflict(_))));

        let q = validate(&db, &code, 10_000).await?;
        assert_eq!(q.discount_cents, 2_000);
        assert!(validate(&db, &code, 500).await.is_err());

        let bad = update(&db, c.id, CouponUpdate { discount_value: Some(150), ..Default::default() }).await;
        assert!(bad.is_err());

        deactivate(&db, c.id).await?;
        assert!(validate(&db, &code, 10_000).await.is_err());
        coupon::Entity::delete_by_id(c.id).exec(&db).await?;
        Ok(())
    }
}
