use std::{net::SocketAddr, sync::Arc};

use axum::Router;
use common::utils::logging::init_logging_from_env;
use configs::AppConfig;
use dotenvy::dotenv;
use migration::{Migrator, MigratorTrait};
use sea_orm::DatabaseConnection;
use service::auth::repo::seaorm::SeaOrmAuthRepository;
use service::auth::service::AuthConfig;
use service::locations::LocationClient;
use service::payments::mercadopago::MercadoPagoClient;
use service::settings::SettingsStore;
use tokio::sync::OnceCell;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::errors::StartupError;
use crate::routes;
use crate::state::ServerState;

fn build_cors() -> CorsLayer {
    CorsLayer::very_permissive()
}

fn bind_addr(cfg: &AppConfig) -> Result<SocketAddr, StartupError> {
    format!("{}:{}", cfg.server.host, cfg.server.port)
        .parse()
        .map_err(|e| StartupError::InvalidConfig(format!("bad bind address: {e}")))
}

/// Assemble the shared state from config and an open connection.
pub async fn build_state(cfg: &AppConfig, db: DatabaseConnection) -> Result<ServerState, StartupError> {
    let settings = SettingsStore::load(&db).await.map_err(|e| StartupError::Any(e.into()))?;
    let payments = MercadoPagoClient::new(&cfg.payments).map_err(|e| StartupError::Any(e.into()))?;
    let locations = LocationClient::new(&cfg.locations).map_err(|e| StartupError::Any(e.into()))?;

    Ok(ServerState {
        accounts: Arc::new(SeaOrmAuthRepository { db: db.clone() }),
        db,
        auth: AuthConfig::new(cfg.auth.jwt_secret.clone(), cfg.auth.token_ttl_hours),
        settings,
        payments: Arc::new(payments),
        webhook_secret: Arc::from(cfg.payments.webhook_secret.as_str()),
        locations,
        cookie_secure: cfg.server.cookie_secure,
        chat_capacity: cfg.chat.channel_capacity,
        relay: Arc::new(OnceCell::new()),
    })
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!(event = "shutdown_signal", "draining connections");
    }
}

/// Public entry: load config, connect, migrate, then serve until Ctrl+C.
pub async fn run() -> anyhow::Result<()> {
    dotenv().ok();
    init_logging_from_env();

    let cfg = AppConfig::load_and_validate().map_err(|e| StartupError::InvalidConfig(e.to_string()))?;

    let db = models::db::connect_with_config(&cfg.database).await?;
    if cfg.database.run_migrations {
        Migrator::up(&db, None).await?;
        info!(event = "migrations_applied", "database schema up to date");
    }
    if cfg.payments.webhook_secret.is_empty() {
        tracing::warn!("payments.webhook_secret is empty; webhook signatures are not verified");
    }

    let state = build_state(&cfg, db).await?;
    let app: Router = routes::build_router(state, build_cors());

    let addr = bind_addr(&cfg)?;
    info!(%addr, "starting myserv api");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;
    info!(event = "stopped", "server stopped");
    Ok(())
}
