//! Support chats between users and the admin team.

use std::collections::HashMap;

use chrono::Utc;
use common::metrics::CHAT_MESSAGES_TOTAL;
use common::pagination::Pagination;
use common::types::Page;
use models::enums::ChatStatus;
use models::support_message::MAX_BODY_CHARS;
use models::{support_chat, support_message};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde::Serialize;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::auth::domain::AuthUser;
use crate::errors::ServiceError;
use crate::notifications::{self, kinds, NewNotification};

const SUBJECT_CHARS: std::ops::RangeInclusive<usize> = 3..=160;

#[derive(Debug, Clone, Serialize)]
pub struct ChatSummary {
    #[serde(flatten)]
    pub chat: support_chat::Model,
    /// Messages from the other side the viewer has not read yet.
    pub unread: u64,
}

pub fn validate_body(body: &str) -> Result<String, ServiceError> {
    let body = body.trim();
    if body.is_empty() {
        return Err(ServiceError::validation("message cannot be empty"));
    }
    if body.chars().count() > MAX_BODY_CHARS {
        return Err(ServiceError::Validation(format!("message exceeds {MAX_BODY_CHARS} characters")));
    }
    Ok(body.to_string())
}

fn validate_subject(subject: &str) -> Result<String, ServiceError> {
    let subject = subject.trim();
    if !SUBJECT_CHARS.contains(&subject.chars().count()) {
        return Err(ServiceError::validation("subject must be 3..=160 characters"));
    }
    Ok(subject.to_string())
}

/// Chat the actor may see: admins see every chat, users only their own.
pub async fn get_visible(db: &DatabaseConnection, actor: &AuthUser, chat_id: Uuid) -> Result<support_chat::Model, ServiceError> {
    support_chat::Entity::find_by_id(chat_id)
        .one(db)
        .await?
        .filter(|c| actor.is_admin() || c.user_id == actor.id)
        .ok_or_else(|| ServiceError::not_found("chat"))
}

async fn insert_message<C: ConnectionTrait>(db: &C, chat_id: Uuid, sender: &AuthUser, body: String) -> Result<support_message::Model, ServiceError> {
    let msg = support_message::ActiveModel {
        id: Set(Uuid::new_v4()),
        chat_id: Set(chat_id),
        sender_id: Set(sender.id),
        from_admin: Set(sender.is_admin()),
        body: Set(body),
        read_at: Set(None),
        created_at: Set(Utc::now().into()),
    }
    .insert(db)
    .await?;
    CHAT_MESSAGES_TOTAL.inc();
    Ok(msg)
}

/// Open a chat with its first message.
#[instrument(skip(db, subject, first_message), fields(user_id = %actor.id))]
pub async fn open(
    db: &DatabaseConnection,
    actor: &AuthUser,
    subject: &str,
    first_message: &str,
) -> Result<(support_chat::Model, support_message::Model), ServiceError> {
    let subject = validate_subject(subject)?;
    let body = validate_body(first_message)?;
    let now = Utc::now();
    let txn = db.begin().await?;
    let chat = support_chat::ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(actor.id),
        assigned_admin_id: Set(None),
        subject: Set(subject),
        status: Set(ChatStatus::Open.as_str().to_string()),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
        closed_at: Set(None),
    }
    .insert(&txn)
    .await?;
    let msg = insert_message(&txn, chat.id, actor, body).await?;
    txn.commit().await?;
    info!(chat_id = %chat.id, "support_chat_opened");
    Ok((chat, msg))
}

/// Unread counts keyed by chat for messages sent by users (`from_admin = false`) or by admins.
async fn unread_by_chat(db: &DatabaseConnection, chat_ids: Vec<Uuid>, from_admin: bool) -> Result<HashMap<Uuid, u64>, ServiceError> {
    if chat_ids.is_empty() {
        return Ok(HashMap::new());
    }
    let rows: Vec<(Uuid, i64)> = support_message::Entity::find()
        .select_only()
        .column(support_message::Column::ChatId)
        .column_as(Expr::col(support_message::Column::Id).count(), "unread")
        .filter(support_message::Column::ChatId.is_in(chat_ids))
        .filter(support_message::Column::FromAdmin.eq(from_admin))
        .filter(support_message::Column::ReadAt.is_null())
        .group_by(support_message::Column::ChatId)
        .into_tuple()
        .all(db)
        .await?;
    Ok(rows.into_iter().map(|(id, n)| (id, n.max(0) as u64)).collect())
}

async fn summarize(db: &DatabaseConnection, chats: Vec<support_chat::Model>, from_admin: bool) -> Result<Vec<ChatSummary>, ServiceError> {
    let counts = unread_by_chat(db, chats.iter().map(|c| c.id).collect(), from_admin).await?;
    Ok(chats
        .into_iter()
        .map(|chat| {
            let unread = counts.get(&chat.id).copied().unwrap_or(0);
            ChatSummary { chat, unread }
        })
        .collect())
}

pub async fn list_own(db: &DatabaseConnection, actor: &AuthUser) -> Result<Vec<ChatSummary>, ServiceError> {
    let chats = support_chat::Entity::find()
        .filter(support_chat::Column::UserId.eq(actor.id))
        .order_by_desc(support_chat::Column::UpdatedAt)
        .all(db)
        .await?;
    summarize(db, chats, true).await
}

/// Admin inbox, most recently active first.
pub async fn admin_list(db: &DatabaseConnection, status: Option<ChatStatus>, opts: Pagination) -> Result<Page<ChatSummary>, ServiceError> {
    let (page_idx, per_page) = opts.normalize();
    let mut q = support_chat::Entity::find();
    if let Some(status) = status {
        q = q.filter(support_chat::Column::Status.eq(status.as_str()));
    }
    let paginator = q.order_by_desc(support_chat::Column::UpdatedAt).paginate(db, per_page);
    let total = paginator.num_items().await?;
    let chats = paginator.fetch_page(page_idx).await?;
    let items = summarize(db, chats, false).await?;
    Ok(Page { items, page: page_idx as u32 + 1, per_page: per_page as u32, total })
}

pub async fn messages(db: &DatabaseConnection, actor: &AuthUser, chat_id: Uuid) -> Result<Vec<support_message::Model>, ServiceError> {
    get_visible(db, actor, chat_id).await?;
    Ok(support_message::Entity::find()
        .filter(support_message::Column::ChatId.eq(chat_id))
        .order_by_asc(support_message::Column::CreatedAt)
        .all(db)
        .await?)
}

/// Append a message. Admin replies notify the chat owner.
#[instrument(skip(db, body), fields(user_id = %actor.id))]
pub async fn post(db: &DatabaseConnection, actor: &AuthUser, chat_id: Uuid, body: &str) -> Result<support_message::Model, ServiceError> {
    let body = validate_body(body)?;
    let chat = get_visible(db, actor, chat_id).await?;
    if !chat.is_open() {
        return Err(ServiceError::validation("chat is closed"));
    }
    let msg = insert_message(db, chat.id, actor, body).await?;
    support_chat::Entity::update_many()
        .col_expr(support_chat::Column::UpdatedAt, Expr::value(msg.created_at))
        .filter(support_chat::Column::Id.eq(chat.id))
        .exec(db)
        .await?;
    if msg.from_admin && chat.user_id != actor.id {
        notifications::notify_best_effort(db, NewNotification {
            user_id: chat.user_id,
            kind: kinds::SUPPORT_REPLY,
            title: "Nova resposta do suporte".into(),
            body: format!("Sua conversa \"{}\" recebeu uma resposta.", chat.subject),
            link: Some(format!("/support/chats/{}", chat.id)),
        }).await;
    }
    Ok(msg)
}

/// Mark the other side's messages read. Returns how many changed.
#[instrument(skip(db), fields(user_id = %actor.id))]
pub async fn mark_read(db: &DatabaseConnection, actor: &AuthUser, chat_id: Uuid) -> Result<u64, ServiceError> {
    let chat = get_visible(db, actor, chat_id).await?;
    let read_admin_messages = chat.user_id == actor.id;
    let now: sea_orm::prelude::DateTimeWithTimeZone = Utc::now().into();
    let res = support_message::Entity::update_many()
        .col_expr(support_message::Column::ReadAt, Expr::value(now))
        .filter(support_message::Column::ChatId.eq(chat.id))
        .filter(support_message::Column::FromAdmin.eq(read_admin_messages))
        .filter(support_message::Column::ReadAt.is_null())
        .exec(db)
        .await?;
    Ok(res.rows_affected)
}

fn require_admin(actor: &AuthUser) -> Result<(), ServiceError> {
    if actor.is_admin() { Ok(()) } else { Err(ServiceError::forbidden("admin only")) }
}

/// Assign the chat to the calling admin.
#[instrument(skip(db), fields(admin_id = %admin.id))]
pub async fn assign(db: &DatabaseConnection, admin: &AuthUser, chat_id: Uuid) -> Result<support_chat::Model, ServiceError> {
    require_admin(admin)?;
    let chat = get_visible(db, admin, chat_id).await?;
    if !chat.is_open() {
        return Err(ServiceError::validation("chat is closed"));
    }
    let mut am: support_chat::ActiveModel = chat.into();
    am.assigned_admin_id = Set(Some(admin.id));
    am.updated_at = Set(Utc::now().into());
    let saved = am.update(db).await?;
    info!(chat_id = %saved.id, "support_chat_assigned");
    Ok(saved)
}

#[instrument(skip(db), fields(admin_id = %admin.id))]
pub async fn close(db: &DatabaseConnection, admin: &AuthUser, chat_id: Uuid) -> Result<support_chat::Model, ServiceError> {
    require_admin(admin)?;
    let chat = get_visible(db, admin, chat_id).await?;
    if !chat.is_open() {
        return Ok(chat);
    }
    let now = Utc::now();
    let mut am: support_chat::ActiveModel = chat.into();
    am.status = Set(ChatStatus::Closed.as_str().to_string());
    am.closed_at = Set(Some(now.into()));
    am.updated_at = Set(now.into());
    let saved = am.update(db).await?;
    info!(chat_id = %saved.id, "support_chat_closed");
    Ok(saved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::get_db;
    use models::enums::Role;
    use models::user;

    fn auth_user(u: &user::Model) -> AuthUser {
        AuthUser { id: u.id, email: u.email.clone(), name: u.name.clone(), role: u.role() }
    }

    #[test]
    fn body_limits() {
        assert!(validate_body("   ").is_err());
        assert_eq!(validate_body("  oi  ").unwrap(), "oi");
        assert!(validate_body(&"x".repeat(MAX_BODY_CHARS + 1)).is_err());
        assert!(validate_subject("ok").is_err());
    }

    #[tokio::test]
    async fn conversation_lifecycle() -> Result<(), anyhow::Error> {
        let Some(db) = get_db().await else { return Ok(()) };

        let tag = Uuid::new_v4().simple().to_string();
        let uu = user::create(&db, &format!("chat_u_{tag}@example.com"), "Chat User", Role::Client).await?;
        let other = user::create(&db, &format!("chat_o_{tag}@example.com"), "Other User", Role::Client).await?;
        let au = user::create(&db, &format!("chat_a_{tag}@example.com"), "Chat Admin", Role::Admin).await?;
        let (u, o, a) = (auth_user(&uu), auth_user(&other), auth_user(&au));

        let (chat, _) = open(&db, &u, "Problema no pagamento", "Meu pagamento não foi confirmado").await?;
        assert!(matches!(messages(&db, &o, chat.id).await, Err(ServiceError::NotFound(_))));
        assert!(matches!(assign(&db, &u, chat.id).await, Err(ServiceError::Forbidden(_))));

        let inbox = admin_list(&db, Some(ChatStatus::Open), Pagination { page: 1, per_page: 100 }).await?;
        if let Some(s) = inbox.items.iter().find(|s| s.chat.id == chat.id) {
            assert_eq!(s.unread, 1);
        }

        assert_eq!(assign(&db, &a, chat.id).await?.assigned_admin_id, Some(a.id));
        post(&db, &a, chat.id, "Vamos verificar.").await?;
        assert_eq!(list_own(&db, &u).await?[0].unread, 1);
        assert_eq!(mark_read(&db, &u, chat.id).await?, 1);
        assert_eq!(mark_read(&db, &a, chat.id).await?, 1);

        close(&db, &a, chat.id).await?;
        assert!(matches!(post(&db, &u, chat.id, "ainda aí?").await, Err(ServiceError::Validation(_))));
        assert_eq!(messages(&db, &u, chat.id).await?.len(), 2);

        for id in [uu.id, other.id, au.id] {
            user::hard_delete(&db, id).await?;
        }
        Ok(())
    }
}
