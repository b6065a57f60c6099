#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, Response};
use axum::Router;
use configs::LocationsConfig;
use models::enums::Role;
use sea_orm::DatabaseConnection;
use serde_json::Value;
use server::routes;
use server::state::ServerState;
use service::auth::repo::seaorm::SeaOrmAuthRepository;
use service::auth::repository::mock::MockAuthRepository;
use service::auth::repository::AuthRepository;
use service::auth::service::{AuthConfig, AuthService};
use service::locations::LocationClient;
use service::payments::gateway::mock::MockGateway;
use service::settings::SettingsStore;
use tokio::sync::OnceCell;
use tower::ServiceExt;
use uuid::Uuid;

pub const JWT_SECRET: &str = "router-test-secret-0123456789";
pub const WEBHOOK_SECRET: &str = "whsec-router-tests";

pub fn state_with(db: DatabaseConnection, accounts: Arc<dyn AuthRepository>) -> ServerState {
    ServerState {
        db,
        accounts,
        auth: AuthConfig::new(JWT_SECRET, 1),
        settings: SettingsStore::with_defaults(),
        payments: Arc::new(MockGateway::default()),
        webhook_secret: Arc::from(WEBHOOK_SECRET),
        locations: LocationClient::new(&LocationsConfig::default()).expect("location client"),
        cookie_secure: false,
        chat_capacity: 16,
        relay: Arc::new(OnceCell::new()),
    }
}

/// State over a live database with SeaORM-backed accounts.
pub fn db_state(db: DatabaseConnection) -> ServerState {
    let accounts = Arc::new(SeaOrmAuthRepository { db: db.clone() });
    state_with(db, accounts)
}

/// App over a disconnected handle with in-memory accounts: only paths that never reach the
/// database are meaningful.
pub fn offline() -> (Router, Arc<MockAuthRepository>) {
    let accounts = Arc::new(MockAuthRepository::default());
    let state = state_with(DatabaseConnection::Disconnected, accounts.clone());
    (routes::build_router(state, tower_http::cors::CorsLayer::very_permissive()), accounts)
}

pub fn offline_app() -> Router {
    offline().0
}

/// Seed an active account with `role` and sign a session token for it.
pub fn token_for(accounts: &Arc<MockAuthRepository>, role: Role) -> (String, String) {
    let email = format!("{role}-{}@example.com", Uuid::new_v4().simple());
    let user = accounts.insert_account(&email, role);
    let svc = AuthService::new(accounts.clone(), AuthConfig::new(JWT_SECRET, 1));
    (svc.issue_token(&user).expect("token").0, email)
}

pub async fn send(app: &Router, req: Request<Body>) -> Response<Body> {
    app.clone().oneshot(req).await.expect("infallible")
}

pub async fn json_body(res: Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(res.into_body(), 1 << 20).await.expect("body");
    serde_json::from_slice(&bytes).unwrap_or(Value::Null)
}
