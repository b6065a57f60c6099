//! Booking price math. Pure functions over coupon rows and integer cents.

use chrono::{DateTime, FixedOffset};
use models::coupon;
use models::enums::DiscountType;
use serde::Serialize;

use crate::errors::ServiceError;

/// Result of applying a coupon to a subtotal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Quote {
    pub subtotal_cents: i64,
    pub discount_cents: i64,
    pub total_cents: i64,
}

impl Quote {
    pub fn without_discount(subtotal_cents: i64) -> Self {
        Self { subtotal_cents, discount_cents: 0, total_cents: subtotal_cents }
    }
}

/// Check that `coupon` may be used for `subtotal_cents` at `now`.
pub fn check_coupon(coupon: &coupon::Model, subtotal_cents: i64, now: DateTime<FixedOffset>) -> Result<(), ServiceError> {
    if !coupon.is_active {
        return Err(ServiceError::validation("coupon is not active"));
    }
    if let Some(expires_at) = coupon.expires_at {
        if expires_at <= now {
            return Err(ServiceError::validation("coupon has expired"));
        }
    }
    if let Some(max) = coupon.max_uses {
        if coupon.used_count >= max {
            return Err(ServiceError::validation("coupon usage limit reached"));
        }
    }
    if let Some(min) = coupon.min_order_cents {
        if subtotal_cents < min {
            return Err(ServiceError::Validation(format!("coupon requires a minimum order of {min} cents")));
        }
    }
    Ok(())
}

/// `amount * percent / 100` rounded down, computed in `i128` so large amounts cannot wrap.
fn percent_of(amount: i64, percent: i64) -> i64 {
    let v = i128::from(amount) * i128::from(percent) / 100;
    i64::try_from(v).unwrap_or(if v < 0 { i64::MIN } else { i64::MAX })
}

/// Discount in cents. Percent rounds down; fixed never exceeds the subtotal.
pub fn discount_for(kind: DiscountType, value: i64, subtotal_cents: i64) -> i64 {
    let subtotal_cents = subtotal_cents.max(0);
    match kind {
        DiscountType::Percent => percent_of(subtotal_cents, value.clamp(0, 100)),
        DiscountType::Fixed => value.clamp(0, subtotal_cents),
    }
}

/// Validate the coupon and return its discount for `subtotal_cents`.
pub fn coupon_discount(coupon: &coupon::Model, subtotal_cents: i64, now: DateTime<FixedOffset>) -> Result<i64, ServiceError> {
    check_coupon(coupon, subtotal_cents, now)?;
    Ok(discount_for(coupon.discount_type(), coupon.discount_value, subtotal_cents))
}

pub fn apply_coupon(coupon: &coupon::Model, subtotal_cents: i64, now: DateTime<FixedOffset>) -> Result<Quote, ServiceError> {
    let discount_cents = coupon_discount(coupon, subtotal_cents, now)?;
    Ok(Quote { subtotal_cents, discount_cents, total_cents: subtotal_cents - discount_cents })
}

/// Platform share of a payment, rounded down.
pub fn platform_fee(total_cents: i64, fee_percent: i32) -> i64 {
    percent_of(total_cents.max(0), i64::from(fee_percent.clamp(0, 100)))
}
