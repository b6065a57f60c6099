use async_trait::async_trait;
use models::enums::Role;
use uuid::Uuid;

use super::domain::{Account, Credentials};
use super::errors::AuthError;

/// Repository abstraction for auth-related persistence.
#[async_trait]
pub trait AuthRepository: Send + Sync {
    async fn find_account_by_email(&self, email: &str) -> Result<Option<Account>, AuthError>;
    async fn find_account_by_id(&self, id: Uuid) -> Result<Option<Account>, AuthError>;
    async fn create_user(&self, email: &str, name: &str, role: Role) -> Result<Account, AuthError>;

    async fn get_credentials(&self, user_id: Uuid) -> Result<Option<Credentials>, AuthError>;
    async fn upsert_password(&self, user_id: Uuid, password_hash: String, password_algorithm: String) -> Result<Credentials, AuthError>;
}

/// Simple in-memory mock repository for tests and doc examples
pub mod mock {
    use super::*;
    use crate::auth::domain::AuthUser;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct MockAuthRepository {
        users: Mutex<HashMap<String, Account>>, // key: lower-cased email
        creds: Mutex<HashMap<Uuid, Credentials>>, // key: user_id
    }

    impl MockAuthRepository {
        /// Flip the active flag, as an admin would.
        pub fn set_active(&self, email: &str, active: bool) {
            if let Some(acc) = self.users.lock().unwrap().get_mut(&email.to_lowercase()) {
                acc.is_active = active;
            }
        }

        /// Insert an active account with any role; admins cannot self-register so tests seed them here.
        pub fn insert_account(&self, email: &str, role: Role) -> AuthUser {
            let user = AuthUser { id: Uuid::new_v4(), email: email.to_lowercase(), name: role.to_string(), role };
            self.users.lock().unwrap().insert(email.to_lowercase(), Account { user: user.clone(), is_active: true });
            user
        }
    }

    #[async_trait]
    impl AuthRepository for MockAuthRepository {
        async fn find_account_by_email(&self, email: &str) -> Result<Option<Account>, AuthError> {
            let users = self.users.lock().unwrap();
            Ok(users.get(&email.to_lowercase()).cloned())
        }

        async fn find_account_by_id(&self, id: Uuid) -> Result<Option<Account>, AuthError> {
            let users = self.users.lock().unwrap();
            Ok(users.values().find(|a| a.user.id == id).cloned())
        }

        async fn create_user(&self, email: &str, name: &str, role: Role) -> Result<Account, AuthError> {
            let mut users = self.users.lock().unwrap();
            let key = email.to_lowercase();
            if users.contains_key(&key) {
                return Err(AuthError::Conflict);
            }
            let user = AuthUser { id: Uuid::new_v4(), email: key.clone(), name: name.to_string(), role };
            let account = Account { user, is_active: true };
            users.insert(key, account.clone());
            Ok(account)
        }

        async fn get_credentials(&self, user_id: Uuid) -> Result<Option<Credentials>, AuthError> {
            let creds = self.creds.lock().unwrap();
            Ok(creds.get(&user_id).cloned())
        }

        async fn upsert_password(&self, user_id: Uuid, password_hash: String, password_algorithm: String) -> Result<Credentials, AuthError> {
            let mut creds = self.creds.lock().unwrap();
            let c = Credentials { user_id, password_hash, password_algorithm };
            creds.insert(user_id, c.clone());
            Ok(c)
        }
    }
}
