//! Service catalog: provider-owned listings, public search and admin moderation.

use chrono::Utc;
use common::pagination::Pagination;
use common::types::Page;
use models::enums::ProviderStatus;
use models::{service, service_provider};
use sea_orm::sea_query::{Expr, Func};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::auth::domain::AuthUser;
use crate::errors::ServiceError;
use crate::notifications::{self, kinds, NewNotification};
use crate::providers;

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceInput {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub category: String,
    pub price_cents: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServiceUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub price_cents: Option<i64>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchFilter {
    pub category: Option<String>,
    pub city: Option<String>,
    pub q: Option<String>,
}

/// A service as shown in the public catalog, with its provider's name and location.
#[derive(Debug, Clone, Serialize)]
pub struct Listing {
    #[serde(flatten)]
    pub service: service::Model,
    pub provider_name: String,
    pub city: String,
    pub state: String,
}

impl Listing {
    fn from_pair(service: service::Model, provider: service_provider::Model) -> Self {
        Self { service, provider_name: provider.display_name, city: provider.city, state: provider.state }
    }
}

async fn owned_service(db: &DatabaseConnection, provider_id: Uuid, id: Uuid) -> Result<service::Model, ServiceError> {
    let found = service::Entity::find_by_id(id).one(db).await?.ok_or_else(|| ServiceError::not_found("service"))?;
    if found.provider_id != provider_id {
        return Err(ServiceError::forbidden("service belongs to another provider"));
    }
    Ok(found)
}

#[instrument(skip(db, input), fields(user_id = %actor.id))]
pub async fn create(db: &DatabaseConnection, actor: &AuthUser, input: ServiceInput) -> Result<service::Model, ServiceError> {
    let provider = providers::get_own_approved(db, actor).await?;
    let created = service::create(db, provider.id, &input.title, &input.description, &input.category, input.price_cents).await?;
    info!(service_id = %created.id, provider_id = %provider.id, "service_created");
    Ok(created)
}

#[instrument(skip(db, input), fields(user_id = %actor.id))]
pub async fn update(db: &DatabaseConnection, actor: &AuthUser, id: Uuid, input: ServiceUpdate) -> Result<service::Model, ServiceError> {
    let provider = providers::get_own(db, actor).await?;
    let mut am: service::ActiveModel = owned_service(db, provider.id, id).await?.into();
    if let Some(title) = input.title {
        service::validate_title(&title)?;
        am.title = Set(title.trim().to_string());
    }
    if let Some(description) = input.description {
        am.description = Set(description.trim().to_string());
    }
    if let Some(category) = input.category {
        am.category = Set(service::normalize_category(&category)?);
    }
    if let Some(price) = input.price_cents {
        service::validate_price(price)?;
        am.price_cents = Set(price);
    }
    if let Some(active) = input.is_active {
        am.is_active = Set(active);
    }
    am.updated_at = Set(Utc::now().into());
    Ok(am.update(db).await?)
}

/// Soft delete: the row stays because bookings reference it.
#[instrument(skip(db), fields(user_id = %actor.id))]
pub async fn deactivate(db: &DatabaseConnection, actor: &AuthUser, id: Uuid) -> Result<service::Model, ServiceError> {
    let provider = providers::get_own(db, actor).await?;
    owned_service(db, provider.id, id).await?;
    let updated = service::set_active(db, id, false).await?;
    info!(service_id = %id, "service_deactivated");
    Ok(updated)
}

pub async fn list_own(db: &DatabaseConnection, actor: &AuthUser) -> Result<Vec<service::Model>, ServiceError> {
    let provider = providers::get_own(db, actor).await?;
    Ok(service::Entity::find()
        .filter(service::Column::ProviderId.eq(provider.id))
        .order_by_desc(service::Column::CreatedAt)
        .all(db)
        .await?)
}

/// Active services of approved providers.
pub async fn search(db: &DatabaseConnection, filter: SearchFilter, opts: Pagination) -> Result<Page<Listing>, ServiceError> {
    let (page_idx, per_page) = opts.normalize();
    let mut q = service::Entity::find()
        .find_also_related(service_provider::Entity)
        .filter(service::Column::IsActive.eq(true))
        .filter(service_provider::Column::Status.eq(ProviderStatus::Approved.as_str()));
    if let Some(category) = filter.category.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
        q = q.filter(service::Column::Category.eq(category.to_lowercase()));
    }
    if let Some(city) = filter.city.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
        q = q.filter(
            Expr::expr(Func::lower(Expr::col((service_provider::Entity, service_provider::Column::City))))
                .eq(city.to_lowercase()),
        );
    }
    if let Some(term) = filter.q.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
        q = q.filter(
            Expr::expr(Func::lower(Expr::col((service::Entity, service::Column::Title))))
                .like(format!("%{}%", term.to_lowercase())),
        );
    }
    let paginator = q.order_by_desc(service::Column::CreatedAt).paginate(db, per_page);
    let total = paginator.num_items().await?;
    let items = paginator
        .fetch_page(page_idx)
        .await?
        .into_iter()
        .filter_map(|(s, p)| p.map(|p| Listing::from_pair(s, p)))
        .collect();
    Ok(Page { items, page: page_idx as u32 + 1, per_page: per_page as u32, total })
}

/// Public detail; hidden services and services of unapproved providers are reported missing.
pub async fn get_public(db: &DatabaseConnection, id: Uuid) -> Result<Listing, ServiceError> {
    let (s, p) = service::Entity::find_by_id(id)
        .find_also_related(service_provider::Entity)
        .one(db)
        .await?
        .ok_or_else(|| ServiceError::not_found("service"))?;
    match p {
        Some(p) if s.is_active && p.is_approved() => Ok(Listing::from_pair(s, p)),
        _ => Err(ServiceError::not_found("service")),
    }
}

/// Admin moderation of a single listing.
#[instrument(skip(db, reason), fields(admin_id = %admin.id))]
pub async fn admin_set_active(
    db: &DatabaseConnection,
    admin: &AuthUser,
    id: Uuid,
    active: bool,
    reason: Option<String>,
) -> Result<service::Model, ServiceError> {
    if !admin.is_admin() {
        return Err(ServiceError::forbidden("admin only"));
    }
    let (found, provider) = service::Entity::find_by_id(id)
        .find_also_related(service_provider::Entity)
        .one(db)
        .await?
        .ok_or_else(|| ServiceError::not_found("service"))?;
    let mut am: service::ActiveModel = found.into();
    am.is_active = Set(active);
    am.updated_at = Set(Utc::now().into());
    let updated = am.update(db).await?;
    info!(service_id = %id, active, "service_moderated");

    if let Some(provider) = provider {
        let state = if active { "reativado" } else { "desativado" };
        let body = match reason.as_deref().map(str::trim).filter(|r| !r.is_empty()) {
            Some(r) => format!("O serviço \"{}\" foi {state}. Motivo: {r}", updated.title),
            None => format!("O serviço \"{}\" foi {state}.", updated.title),
        };
        notifications::notify_best_effort(db, NewNotification {
            user_id: provider.user_id,
            kind: kinds::SERVICE_MODERATED,
            title: "Atualização de serviço".into(),
            body,
            link: Some(format!("/provider/services/{}", updated.id)),
        }).await;
    }
    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::{moderate, ModerationAction, ProviderInput};
    use crate::test_support::get_db;
    use models::enums::Role;
    use models::user;

    fn auth_user(u: &user::Model) -> AuthUser {
        AuthUser { id: u.id, email: u.email.clone(), name: u.name.clone(), role: u.role() }
    }

    #[tokio::test]
    async fn listings_require_an_approved_provider() -> Result<(), anyhow::Error> {
        let Some(db) = get_db().await else { return Ok(()) };

        let tag = Uuid::new_v4().simple().to_string();
        let pu = user::create(&db, &format!("cat_{tag}@example.com"), "Cat Provider", Role::Provider).await?;
        let au = user::create(&db, &format!("cat_admin_{tag}@example.com"), "Cat Admin", Role::Admin).await?;
        let actor = auth_user(&pu);
        let admin = auth_user(&au);

        let provider = providers::apply(&db, &actor, ProviderInput {
            display_name: "Eletricista Teste".into(),
            bio: String::new(),
            document: "529.982.247-25".into(),
            city: format!("Cidade{tag}"),
            state: "SP".into(),
        }).await?;

        let input = ServiceInput { title: "Troca de tomada".into(), description: String::new(), category: "Eletrica".into(), price_cents: 8_000 };
        assert!(matches!(create(&db, &actor, input.clone()).await, Err(ServiceError::Forbidden(_))));

        moderate(&db, &admin, provider.id, ModerationAction::Approve, None).await?;
        let svc = create(&db, &actor, input).await?;
        assert_eq!(svc.category, "eletrica");

        let found = search(&db, SearchFilter { city: Some(format!("cidade{tag}")), q: Some("TOMADA".into()), ..Default::default() }, Pagination::default()).await?;
        assert_eq!(found.total, 1);
        assert_eq!(found.items[0].provider_name, "Eletricista Teste");

        admin_set_active(&db, &admin, svc.id, false, Some("conteúdo impróprio".into())).await?;
        assert!(matches!(get_public(&db, svc.id).await, Err(ServiceError::NotFound(_))));

        user::hard_delete(&db, pu.id).await?;
        user::hard_delete(&db, au.id).await?;
        Ok(())
    }
}
