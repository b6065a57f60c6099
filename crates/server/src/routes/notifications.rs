use axum::extract::{Path, Query, State};
use axum::Extension;
use common::pagination::Pagination;
use common::types::Page;
use models::notification;
use serde::{Deserialize, Serialize};
use service::auth::domain::AuthUser;
use service::notifications::{self, AdminCounters};
use uuid::Uuid;

use crate::errors::{ok, ApiResult};
use crate::state::ServerState;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub unread_only: bool,
}

#[derive(Debug, Serialize)]
pub struct UnreadCount {
    pub unread: u64,
}

#[derive(Debug, Serialize)]
pub struct MarkedRead {
    pub updated: u64,
}

pub async fn list(
    State(state): State<ServerState>,
    Extension(user): Extension<AuthUser>,
    Query(page): Query<Pagination>,
    Query(q): Query<ListQuery>,
) -> ApiResult<Page<notification::Model>> {
    ok(notifications::list(&state.db, user.id, q.unread_only, page).await?)
}

/// Polled by the UI badge.
pub async fn unread_count(State(state): State<ServerState>, Extension(user): Extension<AuthUser>) -> ApiResult<UnreadCount> {
    ok(UnreadCount { unread: notifications::unread_count(&state.db, user.id).await? })
}

pub async fn mark_read(
    State(state): State<ServerState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<notification::Model> {
    ok(notifications::mark_read(&state.db, user.id, id).await?)
}

pub async fn mark_all_read(State(state): State<ServerState>, Extension(user): Extension<AuthUser>) -> ApiResult<MarkedRead> {
    ok(MarkedRead { updated: notifications::mark_all_read(&state.db, user.id).await? })
}

pub async fn admin_counters(State(state): State<ServerState>) -> ApiResult<AdminCounters> {
    ok(notifications::admin_counters(&state.db).await?)
}
