//! Support chat REST endpoints. Writes are mirrored onto the live relay when it is running.

use axum::extract::{Path, Query, State};
use axum::{Extension, Json};
use common::pagination::Pagination;
use common::types::Page;
use models::enums::ChatStatus;
use models::{support_chat, support_message};
use serde::{Deserialize, Serialize};
use service::auth::domain::AuthUser;
use service::support::chat::{self, ChatSummary};
use service::support::ChatEvent;
use uuid::Uuid;

use crate::errors::{ok, ApiResult};
use crate::state::ServerState;

#[derive(Debug, Deserialize)]
pub struct OpenChatInput {
    pub subject: String,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct PostInput {
    pub body: String,
}

#[derive(Debug, Deserialize)]
pub struct StatusFilter {
    pub status: Option<ChatStatus>,
}

#[derive(Debug, Serialize)]
pub struct OpenedChat {
    pub chat: support_chat::Model,
    pub message: support_message::Model,
}

#[derive(Debug, Serialize)]
pub struct MarkedRead {
    pub updated: u64,
}

pub async fn open(
    State(state): State<ServerState>,
    Extension(user): Extension<AuthUser>,
    Json(input): Json<OpenChatInput>,
) -> ApiResult<OpenedChat> {
    let (chat, message) = chat::open(&state.db, &user, &input.subject, &input.message).await?;
    state.publish(ChatEvent::Message { chat_id: chat.id, message: message.clone() });
    ok(OpenedChat { chat, message })
}

pub async fn list_own(State(state): State<ServerState>, Extension(user): Extension<AuthUser>) -> ApiResult<Vec<ChatSummary>> {
    ok(chat::list_own(&state.db, &user).await?)
}

pub async fn messages(
    State(state): State<ServerState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<Vec<support_message::Model>> {
    ok(chat::messages(&state.db, &user, id).await?)
}

/// Shared by the user and admin routes; the sender's role decides `from_admin`.
pub async fn post(
    State(state): State<ServerState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(input): Json<PostInput>,
) -> ApiResult<support_message::Model> {
    let message = chat::post(&state.db, &user, id, &input.body).await?;
    state.publish(ChatEvent::Message { chat_id: id, message: message.clone() });
    ok(message)
}

pub async fn mark_read(
    State(state): State<ServerState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<MarkedRead> {
    let updated = chat::mark_read(&state.db, &user, id).await?;
    if updated > 0 {
        state.publish(ChatEvent::ReadReceipt { chat_id: id, reader_id: user.id, count: updated });
    }
    ok(MarkedRead { updated })
}

pub async fn admin_list(
    State(state): State<ServerState>,
    Query(page): Query<Pagination>,
    Query(filter): Query<StatusFilter>,
) -> ApiResult<Page<ChatSummary>> {
    ok(chat::admin_list(&state.db, filter.status, page).await?)
}

pub async fn assign(
    State(state): State<ServerState>,
    Extension(admin): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<support_chat::Model> {
    let chat = chat::assign(&state.db, &admin, id).await?;
    state.publish(ChatEvent::Assigned { chat_id: id, admin_id: admin.id });
    ok(chat)
}

pub async fn close(
    State(state): State<ServerState>,
    Extension(admin): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<support_chat::Model> {
    let chat = chat::close(&state.db, &admin, id).await?;
    state.publish(ChatEvent::Closed { chat_id: id });
    ok(chat)
}
