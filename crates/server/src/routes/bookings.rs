use axum::extract::{Path, Query, State};
use axum::{Extension, Json};
use common::pagination::Pagination;
use common::types::Page;
use models::enums::RequestStatus;
use models::service_request;
use serde::Deserialize;
use service::auth::domain::AuthUser;
use service::bookings::{self, BookingAction, BookingInput};
use uuid::Uuid;

use crate::errors::{ok, ApiResult};
use crate::state::ServerState;

#[derive(Debug, Deserialize)]
pub struct StatusFilter {
    pub status: Option<RequestStatus>,
}

#[derive(Debug, Deserialize)]
pub struct TransitionInput {
    pub action: BookingAction,
}

#[utoipa::path(post, path = "/api/requests", tag = "bookings", request_body = crate::openapi::BookingRequest, responses((status = 200, description = "Booked"), (status = 400, description = "Validation Error"), (status = 403, description = "Own service")))]
pub async fn create(
    State(state): State<ServerState>,
    Extension(user): Extension<AuthUser>,
    Json(input): Json<BookingInput>,
) -> ApiResult<service_request::Model> {
    ok(bookings::create(&state.db, &user, input).await?)
}

pub async fn list_mine(
    State(state): State<ServerState>,
    Extension(user): Extension<AuthUser>,
    Query(page): Query<Pagination>,
    Query(filter): Query<StatusFilter>,
) -> ApiResult<Page<service_request::Model>> {
    ok(bookings::list_for_client(&state.db, &user, filter.status, page).await?)
}

pub async fn list_for_provider(
    State(state): State<ServerState>,
    Extension(user): Extension<AuthUser>,
    Query(page): Query<Pagination>,
    Query(filter): Query<StatusFilter>,
) -> ApiResult<Page<service_request::Model>> {
    ok(bookings::list_for_provider(&state.db, &user, filter.status, page).await?)
}

pub async fn get(State(state): State<ServerState>, Extension(user): Extension<AuthUser>, Path(id): Path<Uuid>) -> ApiResult<service_request::Model> {
    ok(bookings::get(&state.db, &user, id).await?)
}

#[utoipa::path(post, path = "/api/requests/{id}/status", tag = "bookings", params(("id" = Uuid, Path, description = "Service request id")), request_body = crate::openapi::TransitionRequest, responses((status = 200, description = "Updated"), (status = 400, description = "Transition not allowed"), (status = 403, description = "Not a party")))]
pub async fn transition(
    State(state): State<ServerState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(input): Json<TransitionInput>,
) -> ApiResult<service_request::Model> {
    ok(bookings::transition(&state.db, &user, id, input.action).await?)
}
