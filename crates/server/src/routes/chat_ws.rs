//! `GET /api/support/ws`: live support chat over WebSocket.
//!
//! Client frames are JSON tagged by `type` (`join`, `leave`, `message`, `read`); server frames
//! are [`ChatEvent`]s. Messages and reads are persisted through the support service first and
//! only then relayed. Admins receive every chat's events through the admin room.

use std::collections::HashMap;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::response::Response;
use common::metrics::WS_CONNECTIONS;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use service::auth::domain::AuthUser;
use service::support::chat;
use service::support::{ChatEvent, ChatRelay};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::errors::ApiError;
use crate::routes::auth::session_token;
use crate::state::ServerState;

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    pub token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientFrame {
    Join { chat_id: Uuid },
    Leave { chat_id: Uuid },
    Message { chat_id: Uuid, body: String },
    Read { chat_id: Uuid },
}

pub async fn ws_handler(
    State(state): State<ServerState>,
    Query(q): Query<WsQuery>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> Result<Response, ApiError> {
    let token = q
        .token
        .filter(|t| !t.is_empty())
        .or_else(|| session_token(&headers))
        .ok_or_else(ApiError::unauthorized)?;
    let user = state.auth_service().authenticate(&token).await?;
    Ok(ws.on_upgrade(move |socket| handle_socket(state, user, socket)))
}

fn forward(mut rx: broadcast::Receiver<ChatEvent>, tx: mpsc::UnboundedSender<ChatEvent>) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => {
                    if tx.send(event).is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    debug!(skipped, "chat_subscriber_lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}

/// Abort a forwarder and wait until its receiver is dropped.
async fn stop(handle: JoinHandle<()>) {
    handle.abort();
    let _ = handle.await;
}

struct Session<'a> {
    state: &'a ServerState,
    relay: &'a ChatRelay,
    user: AuthUser,
    out: mpsc::UnboundedSender<ChatEvent>,
    rooms: HashMap<Uuid, JoinHandle<()>>,
}

impl Session<'_> {
    fn send(&self, event: ChatEvent) {
        let _ = self.out.send(event);
    }

    async fn handle(&mut self, frame: ClientFrame) {
        let db = &self.state.db;
        match frame {
            ClientFrame::Join { chat_id } => match chat::get_visible(db, &self.user, chat_id).await {
                Ok(_) => {
                    // admins already get every chat through the admin room
                    if !self.user.is_admin() && !self.rooms.contains_key(&chat_id) {
                        let handle = forward(self.relay.subscribe(chat_id), self.out.clone());
                        self.rooms.insert(chat_id, handle);
                    }
                    self.send(ChatEvent::Joined { chat_id });
                }
                Err(e) => self.send(ChatEvent::error(e.to_string())),
            },
            ClientFrame::Leave { chat_id } => {
                if let Some(handle) = self.rooms.remove(&chat_id) {
                    stop(handle).await;
                    self.relay.release(chat_id);
                }
            }
            ClientFrame::Message { chat_id, body } => match chat::post(db, &self.user, chat_id, &body).await {
                Ok(message) => {
                    self.relay.publish(ChatEvent::Message { chat_id, message });
                }
                Err(e) => self.send(ChatEvent::error(e.to_string())),
            },
            ClientFrame::Read { chat_id } => match chat::mark_read(db, &self.user, chat_id).await {
                Ok(count) => {
                    if count > 0 {
                        self.relay.publish(ChatEvent::ReadReceipt { chat_id, reader_id: self.user.id, count });
                    }
                }
                Err(e) => self.send(ChatEvent::error(e.to_string())),
            },
        }
    }

    async fn close(self) {
        for (chat_id, handle) in self.rooms {
            stop(handle).await;
            self.relay.release(chat_id);
        }
    }
}

async fn handle_socket(state: ServerState, user: AuthUser, socket: WebSocket) {
    let relay = state.relay().await;
    let (mut ws_tx, mut ws_rx) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<ChatEvent>();
    WS_CONNECTIONS.inc();
    info!(user_id = %user.id, admin = user.is_admin(), "support_ws_connected");

    let send_task = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let Ok(text) = serde_json::to_string(&event) else { continue };
            if ws_tx.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
    });
    let admin_room = user.is_admin().then(|| forward(relay.subscribe_admin(), tx.clone()));

    let mut session = Session { state: &state, relay, user, out: tx, rooms: HashMap::new() };
    while let Some(msg) = ws_rx.next().await {
        match msg {
            Ok(Message::Text(text)) => match serde_json::from_str::<ClientFrame>(&text) {
                Ok(frame) => session.handle(frame).await,
                Err(e) => {
                    warn!(user_id = %session.user.id, error = %e, "invalid support ws frame");
                    session.send(ChatEvent::error(format!("invalid frame: {e}")));
                }
            },
            Ok(Message::Close(_)) | Err(_) => break,
            _ => {}
        }
    }

    let user_id = session.user.id;
    session.close().await;
    if let Some(handle) = admin_room {
        handle.abort();
    }
    send_task.abort();
    WS_CONNECTIONS.dec();
    info!(%user_id, "support_ws_disconnected");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_frames_parse() {
        let id = Uuid::new_v4();
        let f: ClientFrame = serde_json::from_str(&format!(r#"{{"type":"message","chat_id":"{id}","body":"oi"}}"#)).unwrap();
        assert_eq!(f, ClientFrame::Message { chat_id: id, body: "oi".into() });
        let f: ClientFrame = serde_json::from_str(&format!(r#"{{"type":"join","chat_id":"{id}"}}"#)).unwrap();
        assert_eq!(f, ClientFrame::Join { chat_id: id });
        assert!(serde_json::from_str::<ClientFrame>(r#"{"type":"shout"}"#).is_err());
    }

    #[tokio::test]
    async fn forwarder_stops_when_socket_side_is_gone() {
        let relay = ChatRelay::new(4);
        let chat_id = Uuid::new_v4();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let handle = forward(relay.subscribe(chat_id), tx);
        relay.publish(ChatEvent::Closed { chat_id });
        assert_eq!(rx.recv().await, Some(ChatEvent::Closed { chat_id }));
        drop(rx);
        relay.publish(ChatEvent::Closed { chat_id });
        assert!(handle.await.is_ok());
    }
}
