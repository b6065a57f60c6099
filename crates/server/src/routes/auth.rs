use axum::extract::{Request, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::middleware::Next;
use axum::response::Response;
use axum::{Extension, Json};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};
use service::auth::domain::{AuthUser, LoginInput, RegisterInput};
use service::users;
use tracing::{info, warn};

use crate::errors::{ok, ApiError, ApiResult};
use crate::state::ServerState;

pub const AUTH_COOKIE: &str = "auth_token";

#[derive(Serialize)]
pub struct LoginOutput {
    pub user: AuthUser,
    pub token: String,
    pub expires_at: i64,
}

#[derive(Deserialize)]
pub struct ChangePasswordInput {
    pub current_password: String,
    pub new_password: String,
}

/// Bearer token from `Authorization`, falling back to the `auth_token` cookie.
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    if let Some(h) = headers.get(header::AUTHORIZATION).and_then(|v| v.to_str().ok()) {
        return h.strip_prefix("Bearer ").map(|t| t.trim().to_string()).filter(|t| !t.is_empty());
    }
    CookieJar::from_headers(headers)
        .get(AUTH_COOKIE)
        .map(|c| c.value().to_string())
        .filter(|t| !t.is_empty())
}

#[utoipa::path(post, path = "/api/auth/register", tag = "auth", request_body = crate::openapi::RegisterRequest, responses((status = 200, description = "Registered"), (status = 400, description = "Bad Request"), (status = 409, description = "Conflict")))]
pub async fn register(State(state): State<ServerState>, Json(input): Json<RegisterInput>) -> ApiResult<AuthUser> {
    let user = state.auth_service().register(input).await?;
    ok(user)
}

#[utoipa::path(post, path = "/api/auth/login", tag = "auth", request_body = crate::openapi::LoginRequest, responses((status = 200, description = "Logged In"), (status = 401, description = "Unauthorized")))]
pub async fn login(State(state): State<ServerState>, jar: CookieJar, Json(input): Json<LoginInput>) -> Result<(CookieJar, Json<common::types::ApiResponse<LoginOutput>>), ApiError> {
    let session = state.auth_service().login(input).await?;
    let mut cookie = Cookie::new(AUTH_COOKIE, session.token.clone());
    cookie.set_path("/");
    cookie.set_http_only(true);
    cookie.set_secure(state.cookie_secure);
    cookie.set_same_site(SameSite::Lax);
    let jar = jar.add(cookie);
    let out = LoginOutput { user: session.user, token: session.token, expires_at: session.expires_at };
    Ok((jar, Json(common::types::ApiResponse::ok(out))))
}

pub async fn logout(jar: CookieJar) -> (CookieJar, StatusCode) {
    let mut cookie = Cookie::from(AUTH_COOKIE);
    cookie.set_path("/");
    (jar.remove(cookie), StatusCode::NO_CONTENT)
}

/// Full profile of the caller.
pub async fn me(State(state): State<ServerState>, Extension(user): Extension<AuthUser>) -> ApiResult<models::user::Model> {
    ok(users::get_user(&state.db, user.id).await?)
}

pub async fn change_password(
    State(state): State<ServerState>,
    Extension(user): Extension<AuthUser>,
    Json(input): Json<ChangePasswordInput>,
) -> ApiResult<bool> {
    state.auth_service().change_password(user.id, &input.current_password, &input.new_password).await?;
    ok(true)
}

/// Route layer: verifies the session token, re-checks the account is still active and
/// stores the `AuthUser` in request extensions.
pub async fn require_auth(State(state): State<ServerState>, mut req: Request, next: Next) -> Result<Response, ApiError> {
    let path = req.uri().path().to_string();
    let Some(token) = session_token(req.headers()) else {
        warn!(%path, "missing Authorization header and auth_token cookie");
        return Err(ApiError::unauthorized());
    };
    let user = state.auth_service().authenticate(&token).await.map_err(|e| {
        warn!(%path, err = %e, "session rejected");
        ApiError::from(e)
    })?;
    req.extensions_mut().insert(user);
    Ok(next.run(req).await)
}

/// Layered inside [`require_auth`]; rejects non-admin sessions.
pub async fn require_admin(req: Request, next: Next) -> Result<Response, ApiError> {
    match req.extensions().get::<AuthUser>() {
        Some(user) if user.is_admin() => Ok(next.run(req).await),
        Some(user) => {
            info!(user_id = %user.id, path = %req.uri().path(), "admin_route_denied");
            Err(ApiError::forbidden())
        }
        None => Err(ApiError::unauthorized()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn bearer_header_wins_over_cookie() {
        let mut h = HeaderMap::new();
        h.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc"));
        h.insert(header::COOKIE, HeaderValue::from_static("auth_token=zzz"));
        assert_eq!(session_token(&h).as_deref(), Some("abc"));
    }

    #[test]
    fn cookie_fallback_and_bad_scheme() {
        let mut h = HeaderMap::new();
        h.insert(header::COOKIE, HeaderValue::from_static("theme=dark; auth_token=zzz"));
        assert_eq!(session_token(&h).as_deref(), Some("zzz"));

        let mut h = HeaderMap::new();
        h.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(session_token(&h), None);
    }
}
