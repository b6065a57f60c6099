use std::sync::Arc;

use argon2::{Argon2, password_hash::{PasswordHasher, PasswordVerifier, SaltString}, PasswordHash};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header as JwtHeader, Validation};
use models::enums::Role;
use rand::rngs::OsRng;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::domain::{AuthSession, AuthUser, Claims, LoginInput, RegisterInput};
use super::errors::AuthError;
use super::repository::AuthRepository;

pub const MIN_PASSWORD_LEN: usize = 8;

/// Auth service configuration
#[derive(Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
    pub password_algorithm: String,
}

impl AuthConfig {
    pub fn new(jwt_secret: impl Into<String>, token_ttl_hours: i64) -> Self {
        Self { jwt_secret: jwt_secret.into(), token_ttl_hours, password_algorithm: "argon2".into() }
    }
}

/// Auth business service independent of web framework
pub struct AuthService<R: AuthRepository + ?Sized> {
    repo: Arc<R>,
    cfg: AuthConfig,
}

fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Ok(Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AuthError::HashError(e.to_string()))?
        .to_string())
}

fn check_password_policy(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AuthError::Validation(format!("password too short (>={MIN_PASSWORD_LEN})")));
    }
    Ok(())
}

impl<R: AuthRepository + ?Sized> AuthService<R> {
    pub fn new(repo: Arc<R>, cfg: AuthConfig) -> Self { Self { repo, cfg } }

    /// Register a new client or provider with a hashed password.
    ///
    /// # Examples
    /// ```
    /// use service::auth::{service::{AuthService, AuthConfig}, repository::mock::MockAuthRepository};
    /// use service::auth::domain::RegisterInput;
    /// use std::sync::Arc;
    /// let repo = Arc::new(MockAuthRepository::default());
    /// let svc = AuthService::new(repo, AuthConfig::new("doc-secret-0123456789", 12));
    /// let input = RegisterInput { email: "user@example.com".into(), name: "Test".into(), password: "Secret123".into(), role: None };
    /// let user = tokio_test::block_on(svc.register(input)).unwrap();
    /// assert_eq!(user.email, "user@example.com");
    /// ```
    #[instrument(skip(self, input), fields(email = %input.email))]
    pub async fn register(&self, input: RegisterInput) -> Result<AuthUser, AuthError> {
        models::user::validate_email(&input.email).map_err(|e| AuthError::Validation(e.to_string()))?;
        models::user::validate_name(&input.name).map_err(|e| AuthError::Validation(e.to_string()))?;
        check_password_policy(&input.password)?;
        let role = input.role.unwrap_or(Role::Client);
        if role == Role::Admin {
            return Err(AuthError::Validation("role must be client or provider".into()));
        }
        if let Some(existing) = self.repo.find_account_by_email(&input.email).await? {
            debug!("user exists: {}", existing.user.email);
            return Err(AuthError::Conflict);
        }

        let account = self.repo.create_user(&input.email, &input.name, role).await?;
        let hash = hash_password(&input.password)?;
        self.repo.upsert_password(account.user.id, hash, self.cfg.password_algorithm.clone()).await?;
        info!(user_id = %account.user.id, role = %role, "user_registered");
        Ok(account.user)
    }

    /// Authenticate a user and issue a session token.
    ///
    /// # Examples
    /// ```
    /// use service::auth::{service::{AuthService, AuthConfig}, repository::mock::MockAuthRepository};
    /// use service::auth::domain::{RegisterInput, LoginInput};
    /// use std::sync::Arc;
    /// let repo = Arc::new(MockAuthRepository::default());
    /// let svc = AuthService::new(repo.clone(), AuthConfig::new("doc-secret-0123456789", 12));
    /// let _ = tokio_test::block_on(svc.register(RegisterInput { email: "u@e.com".into(), name: "N".into(), password: "Passw0rd".into(), role: None }));
    /// let session = tokio_test::block_on(svc.login(LoginInput { email: "u@e.com".into(), password: "Passw0rd".into() })).unwrap();
    /// assert_eq!(session.user.email, "u@e.com");
    /// assert!(!session.token.is_empty());
    /// ```
    #[instrument(skip(self, input), fields(email = %input.email))]
    pub async fn login(&self, input: LoginInput) -> Result<AuthSession, AuthError> {
        let account = self.repo
            .find_account_by_email(&input.email)
            .await?
            .ok_or(AuthError::Unauthorized)?;

        let cred = self.repo
            .get_credentials(account.user.id)
            .await?
            .ok_or(AuthError::Unauthorized)?;

        let parsed = PasswordHash::new(&cred.password_hash).map_err(|e| AuthError::HashError(e.to_string()))?;
        if Argon2::default().verify_password(input.password.as_bytes(), &parsed).is_err() {
            return Err(AuthError::Unauthorized);
        }
        if !account.is_active {
            warn!(user_id = %account.user.id, "login_rejected_inactive");
            return Err(AuthError::Inactive);
        }

        let (token, expires_at) = self.issue_token(&account.user)?;
        info!(user_id = %account.user.id, "user_logged_in");
        Ok(AuthSession { user: account.user, token, expires_at })
    }

    /// Sign a JWT for `user`; returns the token and its expiry (unix seconds).
    pub fn issue_token(&self, user: &AuthUser) -> Result<(String, i64), AuthError> {
        let now = chrono::Utc::now();
        let exp = (now + chrono::Duration::hours(self.cfg.token_ttl_hours)).timestamp();
        let claims = Claims {
            sub: user.id.to_string(),
            email: user.email.clone(),
            name: user.name.clone(),
            role: user.role,
            iat: now.timestamp(),
            exp,
        };
        let token = encode(&JwtHeader::default(), &claims, &EncodingKey::from_secret(self.cfg.jwt_secret.as_bytes()))
            .map_err(|e| AuthError::TokenError(e.to_string()))?;
        Ok((token, exp))
    }

    /// Decode and validate a session token.
    pub fn verify_token(&self, token: &str) -> Result<AuthUser, AuthError> {
        verify_token(&self.cfg.jwt_secret, token)
    }

    /// Current account for a verified identity; fails once the account is disabled.
    pub async fn current_user(&self, id: Uuid) -> Result<AuthUser, AuthError> {
        let account = self.repo.find_account_by_id(id).await?.ok_or(AuthError::NotFound)?;
        if !account.is_active {
            return Err(AuthError::Inactive);
        }
        Ok(account.user)
    }

    /// Verify a session token and re-check that its account still exists and is active.
    pub async fn authenticate(&self, token: &str) -> Result<AuthUser, AuthError> {
        let claimed = self.verify_token(token)?;
        match self.current_user(claimed.id).await {
            Err(AuthError::NotFound) => Err(AuthError::Unauthorized),
            other => other,
        }
    }

    #[instrument(skip(self, current, new_password))]
    pub async fn change_password(&self, user_id: Uuid, current: &str, new_password: &str) -> Result<(), AuthError> {
        check_password_policy(new_password)?;
        let cred = self.repo.get_credentials(user_id).await?.ok_or(AuthError::NotFound)?;
        let parsed = PasswordHash::new(&cred.password_hash).map_err(|e| AuthError::HashError(e.to_string()))?;
        if Argon2::default().verify_password(current.as_bytes(), &parsed).is_err() {
            return Err(AuthError::Unauthorized);
        }
        let hash = hash_password(new_password)?;
        self.repo.upsert_password(user_id, hash, self.cfg.password_algorithm.clone()).await?;
        info!(user_id = %user_id, "password_changed");
        Ok(())
    }
}

/// Stateless token check usable without a repository (e.g. WebSocket upgrade).
pub fn verify_token(secret: &str, token: &str) -> Result<AuthUser, AuthError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;
    let data = decode::<Claims>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation)
        .map_err(|e| AuthError::TokenError(e.to_string()))?;
    let claims = data.claims;
    let id = Uuid::parse_str(&claims.sub).map_err(|e| AuthError::TokenError(e.to_string()))?;
    Ok(AuthUser { id, email: claims.email, name: claims.name, role: claims.role })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::repository::mock::MockAuthRepository;

    fn svc() -> (Arc<MockAuthRepository>, AuthService<MockAuthRepository>) {
        let repo = Arc::new(MockAuthRepository::default());
        let svc = AuthService::new(repo.clone(), AuthConfig::new("unit-test-secret-0123", 1));
        (repo, svc)
    }

    fn register_input(email: &str, role: Option<Role>) -> RegisterInput {
        RegisterInput { email: email.into(), name: "Ana".into(), password: "Str0ngPass".into(), role }
    }

    #[tokio::test]
    async fn register_then_login_round_trip() {
        let (_, svc) = svc();
        let user = svc.register(register_input("ana@example.com", Some(Role::Provider))).await.unwrap();
        assert_eq!(user.role, Role::Provider);

        let session = svc.login(LoginInput { email: "ANA@example.com".into(), password: "Str0ngPass".into() }).await.unwrap();
        let verified = svc.verify_token(&session.token).unwrap();
        assert_eq!(verified, user);
    }

    #[tokio::test]
    async fn admin_role_cannot_self_register() {
        let (_, svc) = svc();
        let err = svc.register(register_input("root@example.com", Some(Role::Admin))).await.unwrap_err();
        assert!(matches!(err, AuthError::Validation(_)));
    }

    #[tokio::test]
    async fn duplicate_email_conflicts() {
        let (_, svc) = svc();
        svc.register(register_input("dup@example.com", None)).await.unwrap();
        let err = svc.register(register_input("dup@example.com", None)).await.unwrap_err();
        assert!(matches!(err, AuthError::Conflict));
    }

    #[tokio::test]
    async fn wrong_password_and_inactive_are_rejected() {
        let (repo, svc) = svc();
        svc.register(register_input("bia@example.com", None)).await.unwrap();
        let err = svc.login(LoginInput { email: "bia@example.com".into(), password: "nope-nope".into() }).await.unwrap_err();
        assert!(matches!(err, AuthError::Unauthorized));

        repo.set_active("bia@example.com", false);
        let err = svc.login(LoginInput { email: "bia@example.com".into(), password: "Str0ngPass".into() }).await.unwrap_err();
        assert!(matches!(err, AuthError::Inactive));
    }

    #[tokio::test]
    async fn deactivated_account_loses_its_session() {
        let (repo, svc) = svc();
        svc.register(register_input("caio@example.com", None)).await.unwrap();
        let session = svc.login(LoginInput { email: "caio@example.com".into(), password: "Str0ngPass".into() }).await.unwrap();
        assert!(svc.authenticate(&session.token).await.is_ok());

        repo.set_active("caio@example.com", false);
        let err = svc.authenticate(&session.token).await.unwrap_err();
        assert!(matches!(err, AuthError::Inactive));
    }

    #[tokio::test]
    async fn token_for_unknown_account_is_unauthorized() {
        let (_, svc) = svc();
        let ghost = AuthUser { id: Uuid::new_v4(), email: "ghost@example.com".into(), name: "G".into(), role: Role::Client };
        let (token, _) = svc.issue_token(&ghost).unwrap();
        assert!(matches!(svc.authenticate(&token).await.unwrap_err(), AuthError::Unauthorized));
    }

    #[tokio::test]
    async fn short_password_rejected() {
        let (_, svc) = svc();
        let mut input = register_input("c@example.com", None);
        input.password = "short".into();
        assert!(matches!(svc.register(input).await.unwrap_err(), AuthError::Validation(_)));
    }

    #[test]
    fn token_signed_with_other_secret_fails() {
        let (_, svc) = svc();
        let user = AuthUser { id: Uuid::new_v4(), email: "x@y.com".into(), name: "X".into(), role: Role::Client };
        let (token, _) = svc.issue_token(&user).unwrap();
        assert!(verify_token("another-secret-000000", &token).is_err());
        assert!(verify_token("unit-test-secret-0123", "garbage").is_err());
    }

    #[tokio::test]
    async fn change_password_requires_current() {
        let (_, svc) = svc();
        let user = svc.register(register_input("d@example.com", None)).await.unwrap();
        assert!(svc.change_password(user.id, "wrong-pass", "NewPassw0rd").await.is_err());
        svc.change_password(user.id, "Str0ngPass", "NewPassw0rd").await.unwrap();
        assert!(svc.login(LoginInput { email: "d@example.com".into(), password: "NewPassw0rd".into() }).await.is_ok());
    }
}
