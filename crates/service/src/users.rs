use chrono::Utc;
use common::pagination::Pagination;
use common::types::Page;
use models::enums::Role;
use models::user;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set};
use serde::Deserialize;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::errors::ServiceError;

/// Profile fields a user may change; `None` keeps the current value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
}

/// Get a user by id.
pub async fn get_user(db: &DatabaseConnection, id: Uuid) -> Result<user::Model, ServiceError> {
    user::Entity::find_by_id(id).one(db).await?.ok_or_else(|| ServiceError::not_found("user"))
}

/// Update the caller's own profile.
#[instrument(skip(db, input))]
pub async fn update_profile(db: &DatabaseConnection, id: Uuid, input: ProfileUpdate) -> Result<user::Model, ServiceError> {
    let mut am: user::ActiveModel = get_user(db, id).await?.into();
    if let Some(name) = input.name {
        user::validate_name(&name)?;
        am.name = Set(name.trim().to_string());
    }
    if let Some(phone) = input.phone {
        am.phone = Set(Some(user::normalize_phone(&phone)?));
    }
    if let Some(city) = input.city {
        let city = city.trim().to_string();
        am.city = Set(if city.is_empty() { None } else { Some(city) });
    }
    if let Some(state) = input.state {
        am.state = Set(Some(user::validate_state(&state)?));
    }
    am.updated_at = Set(Utc::now().into());
    Ok(am.update(db).await?)
}

/// List users with pagination, optionally filtered by role.
pub async fn list_users(db: &DatabaseConnection, role: Option<Role>, opts: Pagination) -> Result<Page<user::Model>, ServiceError> {
    let (page_idx, per_page) = opts.normalize();
    let mut q = user::Entity::find();
    if let Some(role) = role {
        q = q.filter(user::Column::Role.eq(role.as_str()));
    }
    // SeaORM's paginate uses 0-based page index internally via fetch_page
    let paginator = q.order_by_desc(user::Column::CreatedAt).paginate(db, per_page);
    let total = paginator.num_items().await?;
    let items = paginator.fetch_page(page_idx).await?;
    Ok(Page { items, page: page_idx as u32 + 1, per_page: per_page as u32, total })
}

/// Admin toggle of the active flag. Admins cannot disable themselves.
#[instrument(skip(db))]
pub async fn set_active(db: &DatabaseConnection, admin_id: Uuid, id: Uuid, active: bool) -> Result<user::Model, ServiceError> {
    if admin_id == id && !active {
        return Err(ServiceError::validation("admins cannot deactivate themselves"));
    }
    get_user(db, id).await?;
    let updated = user::set_active(db, id, active).await?;
    info!(admin_id = %admin_id, user_id = %id, active, "user_active_changed");
    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::get_db;

    #[tokio::test]
    async fn profile_update_and_listing() -> Result<(), anyhow::Error> {
        let Some(db) = get_db().await else { return Ok(()) };

        let u = user::create(&db, &format!("svc_{}@example.com", Uuid::new_v4()), "Svc User", Role::Client).await?;
        let updated = update_profile(&db, u.id, ProfileUpdate {
            name: Some("New Name".into()),
            phone: Some("(21) 99876-5432".into()),
            city: Some("Niterói".into()),
            state: Some("rj".into()),
        }).await?;
        assert_eq!(updated.name, "New Name");
        assert_eq!(updated.phone.as_deref(), Some("21998765432"));
        assert_eq!(updated.state.as_deref(), Some("RJ"));

        let bad = update_profile(&db, u.id, ProfileUpdate { state: Some("ZZ".into()), ..Default::default() }).await;
        assert!(bad.is_err());

        let page = list_users(&db, Some(Role::Client), Pagination { page: 1, per_page: 5 }).await?;
        assert!(page.items.len() <= 5);
        assert!(page.total >= 1);

        assert!(set_active(&db, u.id, u.id, false).await.is_err());
        let admin = Uuid::new_v4();
        let off = set_active(&db, admin, u.id, false).await?;
        assert!(!off.is_active);

        user::hard_delete(&db, u.id).await?;
        Ok(())
    }
}
