use axum::extract::{Path, Query, State};
use axum::{Extension, Json};
use common::pagination::Pagination;
use common::types::Page;
use models::enums::Role;
use models::user;
use serde::Deserialize;
use service::auth::domain::AuthUser;
use service::users::{self, ProfileUpdate};
use uuid::Uuid;

use crate::errors::{ok, ApiResult};
use crate::state::ServerState;

#[derive(Debug, Deserialize)]
pub struct RoleFilter {
    pub role: Option<Role>,
}

#[derive(Debug, Deserialize)]
pub struct ActiveInput {
    pub active: bool,
}

pub async fn update_me(
    State(state): State<ServerState>,
    Extension(user): Extension<AuthUser>,
    Json(input): Json<ProfileUpdate>,
) -> ApiResult<user::Model> {
    ok(users::update_profile(&state.db, user.id, input).await?)
}

pub async fn admin_list(
    State(state): State<ServerState>,
    Query(page): Query<Pagination>,
    Query(filter): Query<RoleFilter>,
) -> ApiResult<Page<user::Model>> {
    ok(users::list_users(&state.db, filter.role, page).await?)
}

pub async fn admin_set_active(
    State(state): State<ServerState>,
    Extension(admin): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(input): Json<ActiveInput>,
) -> ApiResult<user::Model> {
    ok(users::set_active(&state.db, admin.id, id, input.active).await?)
}
