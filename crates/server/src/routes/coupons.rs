use axum::extract::{Path, Query, State};
use axum::Json;
use common::pagination::Pagination;
use common::types::Page;
use models::coupon;
use serde::Deserialize;
use service::coupons::{self, CouponInput, CouponUpdate};
use service::pricing::Quote;
use uuid::Uuid;

use crate::errors::{ok, ApiResult};
use crate::state::ServerState;

#[derive(Debug, Deserialize)]
pub struct ValidateInput {
    pub code: String,
    pub subtotal_cents: i64,
}

pub async fn validate(State(state): State<ServerState>, Json(input): Json<ValidateInput>) -> ApiResult<Quote> {
    ok(coupons::validate(&state.db, &input.code, input.subtotal_cents).await?)
}

pub async fn admin_list(State(state): State<ServerState>, Query(page): Query<Pagination>) -> ApiResult<Page<coupon::Model>> {
    ok(coupons::list(&state.db, page).await?)
}

pub async fn create(State(state): State<ServerState>, Json(input): Json<CouponInput>) -> ApiResult<coupon::Model> {
    ok(coupons::create(&state.db, input).await?)
}

pub async fn update(State(state): State<ServerState>, Path(id): Path<Uuid>, Json(input): Json<CouponUpdate>) -> ApiResult<coupon::Model> {
    ok(coupons::update(&state.db, id, input).await?)
}

pub async fn deactivate(State(state): State<ServerState>, Path(id): Path<Uuid>) -> ApiResult<coupon::Model> {
    ok(coupons::deactivate(&state.db, id).await?)
}
