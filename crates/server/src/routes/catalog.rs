use axum::extract::{Path, Query, State};
use axum::{Extension, Json};
use common::pagination::Pagination;
use common::types::Page;
use models::service::Model as ServiceModel;
use serde::Deserialize;
use service::auth::domain::AuthUser;
use service::catalog::{self, Listing, SearchFilter, ServiceInput, ServiceUpdate};
use uuid::Uuid;

use crate::errors::{ok, ApiResult};
use crate::state::ServerState;

#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct SearchQuery {
    pub category: Option<String>,
    pub city: Option<String>,
    pub q: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ActiveInput {
    pub active: bool,
    pub reason: Option<String>,
}

#[utoipa::path(get, path = "/api/services", tag = "catalog", params(SearchQuery), responses((status = 200, description = "Active services of approved providers")))]
pub async fn search(
    State(state): State<ServerState>,
    Query(page): Query<Pagination>,
    Query(q): Query<SearchQuery>,
) -> ApiResult<Page<Listing>> {
    let filter = SearchFilter { category: q.category, city: q.city, q: q.q };
    ok(catalog::search(&state.db, filter, page).await?)
}

#[utoipa::path(get, path = "/api/services/{id}", tag = "catalog", params(("id" = Uuid, Path, description = "Service id")), responses((status = 200, description = "Service"), (status = 404, description = "Not Found")))]
pub async fn get_public(State(state): State<ServerState>, Path(id): Path<Uuid>) -> ApiResult<Listing> {
    ok(catalog::get_public(&state.db, id).await?)
}

pub async fn list_own(State(state): State<ServerState>, Extension(user): Extension<AuthUser>) -> ApiResult<Vec<ServiceModel>> {
    ok(catalog::list_own(&state.db, &user).await?)
}

pub async fn create(
    State(state): State<ServerState>,
    Extension(user): Extension<AuthUser>,
    Json(input): Json<ServiceInput>,
) -> ApiResult<ServiceModel> {
    ok(catalog::create(&state.db, &user, input).await?)
}

pub async fn update(
    State(state): State<ServerState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(input): Json<ServiceUpdate>,
) -> ApiResult<ServiceModel> {
    ok(catalog::update(&state.db, &user, id, input).await?)
}

pub async fn deactivate(
    State(state): State<ServerState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<ServiceModel> {
    ok(catalog::deactivate(&state.db, &user, id).await?)
}

pub async fn admin_set_active(
    State(state): State<ServerState>,
    Extension(admin): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(input): Json<ActiveInput>,
) -> ApiResult<ServiceModel> {
    ok(catalog::admin_set_active(&state.db, &admin, id, input.active, input.reason).await?)
}
