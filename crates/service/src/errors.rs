use thiserror::Error;

use crate::auth::errors::AuthError;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("validation error: {0}")]
    Validation(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("unauthorized")]
    Unauthorized,
    #[error("gateway error: {0}")]
    Gateway(String),
    #[error("database error: {0}")]
    Db(String),
    #[error("model error: {0}")]
    Model(#[from] models::errors::ModelError),
}

impl ServiceError {
    pub fn not_found(entity: &str) -> Self { Self::NotFound(format!("{} not found", entity)) }
    pub fn forbidden(msg: &str) -> Self { Self::Forbidden(msg.to_string()) }
    pub fn validation(msg: impl Into<String>) -> Self { Self::Validation(msg.into()) }
}

impl From<sea_orm::DbErr> for ServiceError {
    fn from(e: sea_orm::DbErr) -> Self { ServiceError::Db(e.to_string()) }
}

impl From<AuthError> for ServiceError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::Validation(m) => ServiceError::Validation(m),
            AuthError::Conflict => ServiceError::Conflict("user already exists".into()),
            AuthError::NotFound => ServiceError::not_found("user"),
            AuthError::Unauthorized | AuthError::Inactive | AuthError::TokenError(_) => ServiceError::Unauthorized,
            AuthError::HashError(m) | AuthError::Repository(m) => ServiceError::Db(m),
        }
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;
