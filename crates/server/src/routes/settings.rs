use axum::extract::State;
use axum::{Extension, Json};
use models::system_settings;
use service::auth::domain::AuthUser;
use service::settings::{PublicSettings, SettingsUpdate};

use crate::errors::{ok, ApiResult};
use crate::state::ServerState;

#[utoipa::path(get, path = "/api/settings/public", tag = "settings", responses((status = 200, description = "Fee, maintenance flag and support email")))]
pub async fn public(State(state): State<ServerState>) -> ApiResult<PublicSettings> {
    ok(state.settings.public_view())
}

pub async fn admin_get(State(state): State<ServerState>) -> ApiResult<system_settings::Model> {
    let row = state.settings.refresh(&state.db).await?;
    ok((*row).clone())
}

pub async fn admin_update(
    State(state): State<ServerState>,
    Extension(admin): Extension<AuthUser>,
    Json(input): Json<SettingsUpdate>,
) -> ApiResult<system_settings::Model> {
    let row = state.settings.update(&state.db, admin.id, input).await?;
    ok((*row).clone())
}
