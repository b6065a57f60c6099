//! In-app notifications and the poll-based read/unread counters.

use chrono::Utc;
use common::pagination::Pagination;
use common::types::Page;
use models::enums::{ChatStatus, ProviderStatus};
use models::{notification, service_provider, support_chat, support_message};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set,
};
use serde::Serialize;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::errors::ServiceError;

/// Notification kinds written by the services.
pub mod kinds {
    pub const PROVIDER_MODERATED: &str = "provider_moderated";
    pub const SERVICE_MODERATED: &str = "service_moderated";
    pub const REQUEST_CREATED: &str = "request_created";
    pub const REQUEST_UPDATED: &str = "request_updated";
    pub const PAYMENT_APPROVED: &str = "payment_approved";
    pub const SUPPORT_REPLY: &str = "support_reply";
}

pub struct NewNotification<'a> {
    pub user_id: Uuid,
    pub kind: &'a str,
    pub title: String,
    pub body: String,
    pub link: Option<String>,
}

/// Store a notification for a user.
pub async fn notify<C: ConnectionTrait>(db: &C, n: NewNotification<'_>) -> Result<notification::Model, ServiceError> {
    let am = notification::ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(n.user_id),
        kind: Set(n.kind.to_string()),
        title: Set(n.title),
        body: Set(n.body),
        link: Set(n.link),
        read_at: Set(None),
        created_at: Set(Utc::now().into()),
    };
    let saved = am.insert(db).await?;
    debug!(user_id = %saved.user_id, kind = %saved.kind, "notification_created");
    Ok(saved)
}

/// Like [`notify`], but a failure is only logged; the caller's operation already succeeded.
pub async fn notify_best_effort<C: ConnectionTrait>(db: &C, n: NewNotification<'_>) {
    let user_id = n.user_id;
    if let Err(e) = notify(db, n).await {
        warn!(%user_id, error = %e, "notification_failed");
    }
}

pub async fn list(
    db: &DatabaseConnection,
    user_id: Uuid,
    unread_only: bool,
    opts: Pagination,
) -> Result<Page<notification::Model>, ServiceError> {
    let (page_idx, per_page) = opts.normalize();
    let mut q = notification::Entity::find().filter(notification::Column::UserId.eq(user_id));
    if unread_only {
        q = q.filter(notification::Column::ReadAt.is_null());
    }
    let paginator = q.order_by_desc(notification::Column::CreatedAt).paginate(db, per_page);
    let total = paginator.num_items().await?;
    let items = paginator.fetch_page(page_idx).await?;
    Ok(Page { items, page: page_idx as u32 + 1, per_page: per_page as u32, total })
}

pub async fn unread_count(db: &DatabaseConnection, user_id: Uuid) -> Result<u64, ServiceError> {
    Ok(notification::Entity::find()
        .filter(notification::Column::UserId.eq(user_id))
        .filter(notification::Column::ReadAt.is_null())
        .count(db)
        .await?)
}

/// Mark one notification read. Notifications of other users are reported as missing.
pub async fn mark_read(db: &DatabaseConnection, user_id: Uuid, id: Uuid) -> Result<notification::Model, ServiceError> {
    let found = notification::Entity::find_by_id(id)
        .filter(notification::Column::UserId.eq(user_id))
        .one(db)
        .await?
        .ok_or_else(|| ServiceError::not_found("notification"))?;
    if found.read_at.is_some() {
        return Ok(found);
    }
    let mut am: notification::ActiveModel = found.into();
    am.read_at = Set(Some(Utc::now().into()));
    Ok(am.update(db).await?)
}

/// Returns how many notifications were flipped to read.
pub async fn mark_all_read(db: &DatabaseConnection, user_id: Uuid) -> Result<u64, ServiceError> {
    let now: sea_orm::prelude::DateTimeWithTimeZone = Utc::now().into();
    let res = notification::Entity::update_many()
        .col_expr(notification::Column::ReadAt, sea_orm::sea_query::Expr::value(now))
        .filter(notification::Column::UserId.eq(user_id))
        .filter(notification::Column::ReadAt.is_null())
        .exec(db)
        .await?;
    Ok(res.rows_affected)
}

/// Dashboard counters polled by the admin UI.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct AdminCounters {
    pub pending_providers: u64,
    pub unassigned_chats: u64,
    pub unread_support_messages: u64,
}

pub async fn admin_counters(db: &DatabaseConnection) -> Result<AdminCounters, ServiceError> {
    let pending_providers = service_provider::Entity::find()
        .filter(service_provider::Column::Status.eq(ProviderStatus::Pending.as_str()))
        .count(db)
        .await?;
    let unassigned_chats = support_chat::Entity::find()
        .filter(support_chat::Column::Status.eq(ChatStatus::Open.as_str()))
        .filter(support_chat::Column::AssignedAdminId.is_null())
        .count(db)
        .await?;
    let unread_support_messages = support_message::Entity::find()
        .filter(support_message::Column::FromAdmin.eq(false))
        .filter(support_message::Column::ReadAt.is_null())
        .count(db)
        .await?;
    Ok(AdminCounters { pending_providers, unassigned_chats, unread_support_messages })
}
