use models::enums::Role;
use sea_orm::{DatabaseConnection, EntityTrait};
use uuid::Uuid;

use crate::auth::domain::{Account, AuthUser, Credentials};
use crate::auth::errors::AuthError;
use crate::auth::repository::AuthRepository;

pub struct SeaOrmAuthRepository {
    pub db: DatabaseConnection,
}

fn to_account(u: models::user::Model) -> Account {
    let role = u.role();
    Account {
        is_active: u.is_active,
        user: AuthUser { id: u.id, email: u.email, name: u.name, role },
    }
}

#[async_trait::async_trait]
impl AuthRepository for SeaOrmAuthRepository {
    async fn find_account_by_email(&self, email: &str) -> Result<Option<Account>, AuthError> {
        let res = models::user::find_by_email(&self.db, email)
            .await
            .map_err(|e| AuthError::Repository(e.to_string()))?;
        Ok(res.map(to_account))
    }

    async fn find_account_by_id(&self, id: Uuid) -> Result<Option<Account>, AuthError> {
        let res = models::user::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(|e| AuthError::Repository(e.to_string()))?;
        Ok(res.map(to_account))
    }

    async fn create_user(&self, email: &str, name: &str, role: Role) -> Result<Account, AuthError> {
        let created = models::user::create(&self.db, email, name, role)
            .await
            .map_err(|e| match e {
                models::errors::ModelError::Validation(m) => AuthError::Validation(m),
                models::errors::ModelError::Db(m) if m.contains("duplicate key") => AuthError::Conflict,
                models::errors::ModelError::Db(m) => AuthError::Repository(m),
            })?;
        Ok(to_account(created))
    }

    async fn get_credentials(&self, user_id: Uuid) -> Result<Option<Credentials>, AuthError> {
        let res = models::user_credentials::find_by_user(&self.db, user_id)
            .await
            .map_err(|e| AuthError::Repository(e.to_string()))?;
        Ok(res.map(|c| Credentials { user_id: c.user_id, password_hash: c.password_hash, password_algorithm: c.password_algorithm }))
    }

    async fn upsert_password(&self, user_id: Uuid, password_hash: String, password_algorithm: String) -> Result<Credentials, AuthError> {
        let c = models::user_credentials::upsert_password(&self.db, user_id, password_hash, &password_algorithm)
            .await
            .map_err(|e| AuthError::Repository(e.to_string()))?;
        Ok(Credentials { user_id: c.user_id, password_hash: c.password_hash, password_algorithm: c.password_algorithm })
    }
}
