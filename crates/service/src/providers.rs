//! Provider profiles and admin moderation.

use chrono::Utc;
use common::pagination::Pagination;
use common::types::Page;
use models::enums::{ProviderStatus, Role};
use models::{service, service_provider, user};
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::auth::domain::AuthUser;
use crate::errors::ServiceError;
use crate::notifications::{self, kinds, NewNotification};

#[derive(Debug, Clone, Deserialize)]
pub struct ProviderInput {
    pub display_name: String,
    #[serde(default)]
    pub bio: String,
    pub document: String,
    pub city: String,
    pub state: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProviderUpdate {
    pub display_name: Option<String>,
    pub bio: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ModerationAction {
    Approve,
    Reject,
    Suspend,
    Reinstate,
}

/// Public view: the document and audit fields are not exposed.
#[derive(Debug, Clone, Serialize)]
pub struct PublicProvider {
    pub id: Uuid,
    pub display_name: String,
    pub bio: String,
    pub city: String,
    pub state: String,
    pub services: Vec<service::Model>,
}

/// Next status for a moderation action, or a validation error when the move is not allowed.
pub fn moderation_target(current: ProviderStatus, action: ModerationAction) -> Result<ProviderStatus, ServiceError> {
    use ModerationAction::*;
    use ProviderStatus::*;
    match (current, action) {
        (Pending | Rejected, Approve) => Ok(Approved),
        (Pending, Reject) => Ok(Rejected),
        (Approved, Suspend) => Ok(Suspended),
        (Suspended, Reinstate) => Ok(Approved),
        (from, action) => Err(ServiceError::Validation(format!("cannot {action:?} a provider that is {from}").to_lowercase())),
    }
}

pub async fn get_by_id(db: &DatabaseConnection, id: Uuid) -> Result<service_provider::Model, ServiceError> {
    service_provider::Entity::find_by_id(id).one(db).await?.ok_or_else(|| ServiceError::not_found("provider"))
}

/// The caller's own provider profile.
pub async fn get_own(db: &DatabaseConnection, actor: &AuthUser) -> Result<service_provider::Model, ServiceError> {
    service_provider::find_by_user(db, actor.id).await?.ok_or_else(|| ServiceError::not_found("provider profile"))
}

/// Own profile that is allowed to run the business (approved).
pub async fn get_own_approved(db: &DatabaseConnection, actor: &AuthUser) -> Result<service_provider::Model, ServiceError> {
    let p = get_own(db, actor).await?;
    if !p.is_approved() {
        return Err(ServiceError::forbidden("provider profile is not approved"));
    }
    Ok(p)
}

/// Create the caller's provider profile; it waits for moderation.
#[instrument(skip(db, input), fields(user_id = %actor.id))]
pub async fn apply(db: &DatabaseConnection, actor: &AuthUser, input: ProviderInput) -> Result<service_provider::Model, ServiceError> {
    if actor.role != Role::Provider {
        return Err(ServiceError::forbidden("only provider accounts can create a provider profile"));
    }
    if service_provider::find_by_user(db, actor.id).await?.is_some() {
        return Err(ServiceError::Conflict("provider profile already exists".into()));
    }
    let created = service_provider::create(db, service_provider::NewProvider {
        user_id: actor.id,
        display_name: &input.display_name,
        bio: &input.bio,
        document: &input.document,
        city: &input.city,
        state: &input.state,
    }).await?;
    info!(provider_id = %created.id, "provider_applied");
    Ok(created)
}

#[instrument(skip(db, input), fields(user_id = %actor.id))]
pub async fn update_own(db: &DatabaseConnection, actor: &AuthUser, input: ProviderUpdate) -> Result<service_provider::Model, ServiceError> {
    let mut am: service_provider::ActiveModel = get_own(db, actor).await?.into();
    if let Some(name) = input.display_name {
        user::validate_name(&name)?;
        am.display_name = Set(name.trim().to_string());
    }
    if let Some(bio) = input.bio {
        am.bio = Set(bio.trim().to_string());
    }
    if let Some(city) = input.city {
        if city.trim().is_empty() {
            return Err(ServiceError::validation("city required"));
        }
        am.city = Set(city.trim().to_string());
    }
    if let Some(state) = input.state {
        am.state = Set(user::validate_state(&state)?);
    }
    am.updated_at = Set(Utc::now().into());
    Ok(am.update(db).await?)
}

/// Approved provider with its active services; anything else is reported missing.
pub async fn get_public(db: &DatabaseConnection, id: Uuid) -> Result<PublicProvider, ServiceError> {
    let p = get_by_id(db, id).await?;
    if !p.is_approved() {
        return Err(ServiceError::not_found("provider"));
    }
    let services = service::Entity::find()
        .filter(service::Column::ProviderId.eq(p.id))
        .filter(service::Column::IsActive.eq(true))
        .order_by_asc(service::Column::Title)
        .all(db)
        .await?;
    Ok(PublicProvider { id: p.id, display_name: p.display_name, bio: p.bio, city: p.city, state: p.state, services })
}

/// Admin listing, oldest first so the moderation queue is worked in order.
pub async fn list(db: &DatabaseConnection, status: Option<ProviderStatus>, opts: Pagination) -> Result<Page<service_provider::Model>, ServiceError> {
    let (page_idx, per_page) = opts.normalize();
    let mut q = service_provider::Entity::find();
    if let Some(status) = status {
        q = q.filter(service_provider::Column::Status.eq(status.as_str()));
    }
    let paginator = q.order_by_asc(service_provider::Column::CreatedAt).paginate(db, per_page);
    let total = paginator.num_items().await?;
    let items = paginator.fetch_page(page_idx).await?;
    Ok(Page { items, page: page_idx as u32 + 1, per_page: per_page as u32, total })
}

/// Apply a moderation action, stamp the audit trail and tell the provider.
#[instrument(skip(db, reason), fields(admin_id = %admin.id))]
pub async fn moderate(
    db: &DatabaseConnection,
    admin: &AuthUser,
    provider_id: Uuid,
    action: ModerationAction,
    reason: Option<String>,
) -> Result<service_provider::Model, ServiceError> {
    if !admin.is_admin() {
        return Err(ServiceError::forbidden("admin only"));
    }
    let reason = reason.map(|r| r.trim().to_string()).filter(|r| !r.is_empty());
    if matches!(action, ModerationAction::Reject | ModerationAction::Suspend) && reason.is_none() {
        return Err(ServiceError::validation("a reason is required to reject or suspend"));
    }
    let current = get_by_id(db, provider_id).await?;
    let next = moderation_target(current.status(), action)?;
    let user_id = current.user_id;

    let now = Utc::now();
    let mut am: service_provider::ActiveModel = current.into();
    am.status = Set(next.as_str().to_string());
    am.moderated_by = Set(Some(admin.id));
    am.moderated_at = Set(Some(now.into()));
    am.moderation_reason = Set(reason.clone());
    am.updated_at = Set(now.into());
    let updated = am.update(db).await?;
    info!(provider_id = %updated.id, status = %next, "provider_moderated");

    let body = match (&next, &reason) {
        (ProviderStatus::Approved, _) => "Seu perfil foi aprovado. Seus serviços já aparecem para os clientes.".to_string(),
        (_, Some(r)) => format!("Status do perfil: {next}. Motivo: {r}"),
        (_, None) => format!("Status do perfil: {next}."),
    };
    notifications::notify_best_effort(db, NewNotification {
        user_id,
        kind: kinds::PROVIDER_MODERATED,
        title: "Atualização do seu perfil de prestador".into(),
        body,
        link: Some("/provider/profile".into()),
    }).await;
    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn moderation_transitions() {
        use ModerationAction::*;
        use ProviderStatus::*;
        assert_eq!(moderation_target(Pending, Approve).unwrap(), Approved);
        assert_eq!(moderation_target(Pending, Reject).unwrap(), Rejected);
        assert_eq!(moderation_target(Rejected, Approve).unwrap(), Approved);
        assert_eq!(moderation_target(Approved, Suspend).unwrap(), Suspended);
        assert_eq!(moderation_target(Suspended, Reinstate).unwrap(), Approved);
    }

    #[test]
    fn invalid_moderation_moves_fail() {
        use ModerationAction::*;
        use ProviderStatus::*;
        assert!(moderation_target(Approved, Approve).is_err());
        assert!(moderation_target(Pending, Suspend).is_err());
        assert!(moderation_target(Suspended, Reject).is_err());
        assert!(moderation_target(Approved, Reinstate).is_err());
    }
}
