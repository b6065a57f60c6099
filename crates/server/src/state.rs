use std::sync::Arc;

use sea_orm::DatabaseConnection;
use service::auth::repository::AuthRepository;
use service::auth::service::{AuthConfig, AuthService};
use service::locations::LocationClient;
use service::payments::PaymentGateway;
use service::settings::SettingsStore;
use service::support::{ChatEvent, ChatRelay};
use tokio::sync::OnceCell;
use tracing::info;

/// Shared application state handed to every handler.
#[derive(Clone)]
pub struct ServerState {
    pub db: DatabaseConnection,
    /// Account lookups behind sessions; SeaORM in production.
    pub accounts: Arc<dyn AuthRepository>,
    pub auth: AuthConfig,
    pub settings: SettingsStore,
    pub payments: Arc<dyn PaymentGateway>,
    /// Empty disables webhook signature checks.
    pub webhook_secret: Arc<str>,
    pub locations: LocationClient,
    pub cookie_secure: bool,
    pub chat_capacity: usize,
    /// Created by the first support WebSocket, then reused.
    pub relay: Arc<OnceCell<ChatRelay>>,
}

impl ServerState {
    pub fn auth_service(&self) -> AuthService<dyn AuthRepository> {
        AuthService::new(self.accounts.clone(), self.auth.clone())
    }

    pub async fn relay(&self) -> &ChatRelay {
        self.relay
            .get_or_init(|| async {
                info!(capacity = self.chat_capacity, "chat_relay_initialized");
                ChatRelay::new(self.chat_capacity)
            })
            .await
    }

    /// Publish only if some WebSocket already brought the relay up. Returns receivers reached.
    pub fn publish(&self, event: ChatEvent) -> usize {
        self.relay.get().map_or(0, |relay| relay.publish(event))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use configs::LocationsConfig;
    use service::auth::repository::mock::MockAuthRepository;
    use service::payments::gateway::mock::MockGateway;
    use uuid::Uuid;

    fn offline_state() -> ServerState {
        ServerState {
            db: DatabaseConnection::Disconnected,
            accounts: Arc::new(MockAuthRepository::default()),
            auth: AuthConfig::new("state-test-secret-0123", 1),
            settings: SettingsStore::with_defaults(),
            payments: Arc::new(MockGateway::default()),
            webhook_secret: Arc::from(""),
            locations: LocationClient::new(&LocationsConfig::default()).unwrap(),
            cookie_secure: false,
            chat_capacity: 8,
            relay: Arc::new(OnceCell::new()),
        }
    }

    #[tokio::test]
    async fn publish_before_first_socket_is_a_no_op() {
        let state = offline_state();
        assert_eq!(state.publish(ChatEvent::Closed { chat_id: Uuid::new_v4() }), 0);
        assert!(state.relay.get().is_none());
    }

    #[tokio::test]
    async fn relay_is_built_once_and_shared_by_clones() {
        let state = offline_state();
        let cloned = state.clone();
        let first: *const ChatRelay = state.relay().await;
        assert!(std::ptr::eq(first, state.relay().await));
        assert!(std::ptr::eq(first, cloned.relay().await));
    }

    #[tokio::test]
    async fn rest_events_reach_subscribers_once_relay_is_up() {
        let state = offline_state();
        let chat_id = Uuid::new_v4();
        let mut admin = state.relay().await.subscribe_admin();
        let mut room = state.relay().await.subscribe(chat_id);

        assert_eq!(state.publish(ChatEvent::Closed { chat_id }), 2);
        assert!(matches!(admin.recv().await, Ok(ChatEvent::Closed { chat_id: id }) if id == chat_id));
        assert!(matches!(room.recv().await, Ok(ChatEvent::Closed { chat_id: id }) if id == chat_id));
    }
}
