use axum::{
    middleware,
    routing::{get, post, put},
    Json, Router,
};
use common::metrics::{encode_metrics, HTTP_REQUESTS_TOTAL};
use common::types::Health;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnFailure, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::openapi::ApiDoc;
use crate::state::ServerState;

pub mod auth;
pub mod bookings;
pub mod catalog;
pub mod chat_ws;
pub mod coupons;
pub mod locations;
pub mod notifications;
pub mod payments;
pub mod providers;
pub mod settings;
pub mod support;
pub mod users;

#[utoipa::path(get, path = "/health", tag = "health", responses((status = 200, description = "OK", body = crate::openapi::HealthResponse)))]
pub async fn health() -> Json<Health> {
    Json(Health { status: "ok" })
}

pub async fn metrics() -> (axum::http::StatusCode, String) {
    encode_metrics()
}

async fn count_requests(req: axum::extract::Request, next: middleware::Next) -> axum::response::Response {
    HTTP_REQUESTS_TOTAL.inc();
    next.run(req).await
}

fn public_routes() -> Router<ServerState> {
    Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/logout", post(auth::logout))
        .route("/api/services", get(catalog::search))
        .route("/api/services/:id", get(catalog::get_public))
        .route("/api/providers/:id", get(providers::get_public))
        .route("/api/locations/cep/:cep", get(locations::cep))
        .route("/api/locations/states/:uf/cities", get(locations::cities))
        .route("/api/settings/public", get(settings::public))
        .route("/api/payments/webhook", post(payments::webhook))
        // authenticates itself: browsers cannot set headers on WebSocket upgrades
        .route("/api/support/ws", get(chat_ws::ws_handler))
}

fn user_routes() -> Router<ServerState> {
    Router::new()
        .route("/api/auth/me", get(auth::me))
        .route("/api/auth/password", post(auth::change_password))
        .route("/api/users/me", put(users::update_me))
        .route("/api/providers/me", get(providers::get_own).post(providers::apply).put(providers::update_own))
        .route("/api/provider/services", get(catalog::list_own).post(catalog::create))
        .route("/api/provider/services/:id", put(catalog::update).delete(catalog::deactivate))
        .route("/api/provider/requests", get(bookings::list_for_provider))
        .route("/api/requests", get(bookings::list_mine).post(bookings::create))
        .route("/api/requests/:id", get(bookings::get))
        .route("/api/requests/:id/status", post(bookings::transition))
        .route("/api/requests/:id/checkout", post(payments::checkout))
        .route("/api/requests/:id/payments", get(payments::list_for_request))
        .route("/api/coupons/validate", post(coupons::validate))
        .route("/api/notifications", get(notifications::list))
        .route("/api/notifications/unread-count", get(notifications::unread_count))
        .route("/api/notifications/read-all", post(notifications::mark_all_read))
        .route("/api/notifications/:id/read", post(notifications::mark_read))
        .route("/api/support/chats", get(support::list_own).post(support::open))
        .route("/api/support/chats/:id/messages", get(support::messages).post(support::post))
        .route("/api/support/chats/:id/read", post(support::mark_read))
}

fn admin_routes() -> Router<ServerState> {
    Router::new()
        .route("/api/admin/users", get(users::admin_list))
        .route("/api/admin/users/:id/active", post(users::admin_set_active))
        .route("/api/admin/providers", get(providers::admin_list))
        .route("/api/admin/providers/:id/moderate", post(providers::moderate))
        .route("/api/admin/services/:id/active", post(catalog::admin_set_active))
        .route("/api/admin/coupons", get(coupons::admin_list).post(coupons::create))
        .route("/api/admin/coupons/:id", put(coupons::update).delete(coupons::deactivate))
        .route("/api/admin/settings", get(settings::admin_get).put(settings::admin_update))
        .route("/api/admin/support/chats", get(support::admin_list))
        .route("/api/admin/support/chats/:id/assign", post(support::assign))
        .route("/api/admin/support/chats/:id/close", post(support::close))
        .route("/api/admin/support/chats/:id/messages", get(support::messages).post(support::post))
        .route("/api/admin/support/chats/:id/read", post(support::mark_read))
        .route("/api/admin/counters", get(notifications::admin_counters))
        .route("/api/admin/payments", get(payments::admin_list))
        .route_layer(middleware::from_fn(auth::require_admin))
}

/// Build the full application router: public, authenticated and admin routes plus docs.
pub fn build_router(state: ServerState, cors: CorsLayer) -> Router {
    // admin_routes' own layer runs after require_auth has stored the user
    let protected = user_routes()
        .merge(admin_routes())
        .route_layer(middleware::from_fn_with_state(state.clone(), auth::require_auth));

    public_routes()
        .merge(protected)
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .with_state(state)
        .layer(middleware::from_fn(count_requests))
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO).include_headers(false))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO).include_headers(false))
                .on_failure(DefaultOnFailure::new().level(Level::ERROR)),
        )
}
