use sea_orm::EntityTrait;
use uuid::Uuid;

use super::test_db;
use crate::enums::{ProviderStatus, Role};
use crate::{service, service_provider, system_settings, user, user_credentials};

#[tokio::test]
async fn user_provider_service_crud() -> anyhow::Result<()> {
    let Some(db) = test_db().await else { return Ok(()) };

    let email = format!("crud_{}@example.com", Uuid::new_v4());
    let u = user::create(&db, &email, "Maria Prestadora", Role::Provider).await?;
    assert_eq!(u.role(), Role::Provider);
    assert!(u.is_active);

    let found = user::find_by_email(&db, &email.to_uppercase()).await?;
    assert_eq!(found.map(|f| f.id), Some(u.id));

    let creds = user_credentials::upsert_password(&db, u.id, "hash-1".into(), "argon2").await?;
    let again = user_credentials::upsert_password(&db, u.id, "hash-2".into(), "argon2").await?;
    assert_eq!(creds.id, again.id);
    assert_eq!(again.password_hash, "hash-2");

    let p = service_provider::create(&db, service_provider::NewProvider {
        user_id: u.id,
        display_name: "Maria Reparos",
        bio: "Eletricista",
        document: "123.456.789-09",
        city: "Campinas",
        state: "sp",
    }).await?;
    assert_eq!(p.status(), ProviderStatus::Pending);
    assert_eq!(p.state, "SP");

    let s = service::create(&db, p.id, "Troca de tomada", "Instalação", "Elétrica", 8_000).await?;
    assert_eq!(s.category, "elétrica");
    let off = service::set_active(&db, s.id, false).await?;
    assert!(!off.is_active);

    user::hard_delete(&db, u.id).await?;
    assert!(service::Entity::find_by_id(s.id).one(&db).await?.is_none());
    Ok(())
}

#[tokio::test]
async fn settings_row_is_seeded() -> anyhow::Result<()> {
    let Some(db) = test_db().await else { return Ok(()) };
    let row = system_settings::Entity::find_by_id(system_settings::SINGLETON_ID).one(&db).await?;
    assert!(row.is_some());
    Ok(())
}
