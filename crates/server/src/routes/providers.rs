use axum::extract::{Path, Query, State};
use axum::{Extension, Json};
use common::pagination::Pagination;
use common::types::Page;
use models::enums::ProviderStatus;
use models::service_provider;
use serde::Deserialize;
use service::auth::domain::AuthUser;
use service::providers::{self, ModerationAction, ProviderInput, ProviderUpdate, PublicProvider};
use uuid::Uuid;

use crate::errors::{ok, ApiResult};
use crate::state::ServerState;

#[derive(Debug, Deserialize)]
pub struct StatusFilter {
    pub status: Option<ProviderStatus>,
}

#[derive(Debug, Deserialize)]
pub struct ModerateInput {
    pub action: ModerationAction,
    pub reason: Option<String>,
}

pub async fn apply(
    State(state): State<ServerState>,
    Extension(user): Extension<AuthUser>,
    Json(input): Json<ProviderInput>,
) -> ApiResult<service_provider::Model> {
    ok(providers::apply(&state.db, &user, input).await?)
}

pub async fn get_own(State(state): State<ServerState>, Extension(user): Extension<AuthUser>) -> ApiResult<service_provider::Model> {
    ok(providers::get_own(&state.db, &user).await?)
}

pub async fn update_own(
    State(state): State<ServerState>,
    Extension(user): Extension<AuthUser>,
    Json(input): Json<ProviderUpdate>,
) -> ApiResult<service_provider::Model> {
    ok(providers::update_own(&state.db, &user, input).await?)
}

#[utoipa::path(get, path = "/api/providers/{id}", tag = "catalog", params(("id" = Uuid, Path, description = "Provider id")), responses((status = 200, description = "Approved provider with its services"), (status = 404, description = "Not Found")))]
pub async fn get_public(State(state): State<ServerState>, Path(id): Path<Uuid>) -> ApiResult<PublicProvider> {
    ok(providers::get_public(&state.db, id).await?)
}

pub async fn admin_list(
    State(state): State<ServerState>,
    Query(page): Query<Pagination>,
    Query(filter): Query<StatusFilter>,
) -> ApiResult<Page<service_provider::Model>> {
    ok(providers::list(&state.db, filter.status, page).await?)
}

pub async fn moderate(
    State(state): State<ServerState>,
    Extension(admin): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(input): Json<ModerateInput>,
) -> ApiResult<service_provider::Model> {
    ok(providers::moderate(&state.db, &admin, id, input.action, input.reason).await?)
}
