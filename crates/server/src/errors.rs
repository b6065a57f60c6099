use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use common::types::ApiResponse;
use service::auth::errors::AuthError;
use service::ServiceError;
use thiserror::Error;
use tracing::{error, warn};

/// Handler error rendered as `{"success": false, "error": ...}`.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self { status, message: message.into() }
    }

    pub fn unauthorized() -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "authentication required")
    }

    pub fn forbidden() -> Self {
        Self::new(StatusCode::FORBIDDEN, "admin only")
    }
}

impl From<ServiceError> for ApiError {
    fn from(e: ServiceError) -> Self {
        let status = match &e {
            ServiceError::Validation(_) => StatusCode::BAD_REQUEST,
            ServiceError::Model(_) => StatusCode::BAD_REQUEST,
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::Forbidden(_) => StatusCode::FORBIDDEN,
            ServiceError::Conflict(_) => StatusCode::CONFLICT,
            ServiceError::Unauthorized => StatusCode::UNAUTHORIZED,
            ServiceError::Gateway(_) => StatusCode::BAD_GATEWAY,
            ServiceError::Db(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let message = match e {
            ServiceError::Validation(m)
            | ServiceError::NotFound(m)
            | ServiceError::Forbidden(m)
            | ServiceError::Conflict(m) => m,
            ServiceError::Model(m) => m.to_string(),
            ServiceError::Unauthorized => "unauthorized".into(),
            ServiceError::Gateway(m) => format!("payment or lookup provider failed: {m}"),
            ServiceError::Db(m) => m,
        };
        Self::new(status, message)
    }
}

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::Validation(m) => Self::new(StatusCode::BAD_REQUEST, m),
            AuthError::Conflict => Self::new(StatusCode::CONFLICT, "user already exists"),
            AuthError::NotFound => Self::new(StatusCode::NOT_FOUND, "user not found"),
            AuthError::Unauthorized => Self::new(StatusCode::UNAUTHORIZED, "invalid credentials"),
            AuthError::Inactive => Self::new(StatusCode::UNAUTHORIZED, "account disabled"),
            AuthError::TokenError(_) => Self::new(StatusCode::UNAUTHORIZED, "invalid or expired token"),
            AuthError::HashError(m) | AuthError::Repository(m) => Self::new(StatusCode::INTERNAL_SERVER_ERROR, m),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!(status = %self.status, error = %self.message, "request failed");
        } else {
            warn!(status = %self.status, error = %self.message, "request rejected");
        }
        // internals stay in the log
        let message = if self.status == StatusCode::INTERNAL_SERVER_ERROR { "internal error".to_string() } else { self.message };
        (self.status, Json(ApiResponse::<()>::err(message))).into_response()
    }
}

/// Success envelope for handlers.
pub type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

pub fn ok<T: serde::Serialize>(data: T) -> ApiResult<T> {
    Ok(Json(ApiResponse::ok(data)))
}

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error(transparent)]
    Any(#[from] anyhow::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_errors_map_to_statuses() {
        let cases = [
            (ServiceError::validation("x"), StatusCode::BAD_REQUEST),
            (ServiceError::not_found("x"), StatusCode::NOT_FOUND),
            (ServiceError::forbidden("x"), StatusCode::FORBIDDEN),
            (ServiceError::Conflict("x".into()), StatusCode::CONFLICT),
            (ServiceError::Unauthorized, StatusCode::UNAUTHORIZED),
            (ServiceError::Gateway("x".into()), StatusCode::BAD_GATEWAY),
            (ServiceError::Db("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status, status);
        }
    }

    #[test]
    fn inactive_accounts_are_unauthorized() {
        assert_eq!(ApiError::from(AuthError::Inactive).status, StatusCode::UNAUTHORIZED);
    }
}
