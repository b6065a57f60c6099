//! In-process fan-out of support chat events to connected WebSocket clients.
//!
//! Every chat has its own broadcast room; every event is also copied to the admin room so
//! the support inbox can refresh without joining each chat. Lagging receivers drop events.

use dashmap::DashMap;
use models::support_message;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::debug;
use uuid::Uuid;

/// Frames the server sends over the support WebSocket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatEvent {
    Joined { chat_id: Uuid },
    Message { chat_id: Uuid, message: support_message::Model },
    ReadReceipt { chat_id: Uuid, reader_id: Uuid, count: u64 },
    Assigned { chat_id: Uuid, admin_id: Uuid },
    Closed { chat_id: Uuid },
    Error { message: String },
}

impl ChatEvent {
    pub fn chat_id(&self) -> Option<Uuid> {
        match self {
            ChatEvent::Joined { chat_id }
            | ChatEvent::Message { chat_id, .. }
            | ChatEvent::ReadReceipt { chat_id, .. }
            | ChatEvent::Assigned { chat_id, .. }
            | ChatEvent::Closed { chat_id } => Some(*chat_id),
            ChatEvent::Error { .. } => None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        ChatEvent::Error { message: message.into() }
    }
}

pub struct ChatRelay {
    rooms: DashMap<Uuid, broadcast::Sender<ChatEvent>>,
    admin: broadcast::Sender<ChatEvent>,
    capacity: usize,
}

impl ChatRelay {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (admin, _) = broadcast::channel(capacity);
        Self { rooms: DashMap::new(), admin, capacity }
    }

    pub fn subscribe(&self, chat_id: Uuid) -> broadcast::Receiver<ChatEvent> {
        self.rooms
            .entry(chat_id)
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe()
    }

    pub fn subscribe_admin(&self) -> broadcast::Receiver<ChatEvent> {
        self.admin.subscribe()
    }

    /// Send to the chat's room and the admin room. Returns the number of receivers reached.
    pub fn publish(&self, event: ChatEvent) -> usize {
        let Some(chat_id) = event.chat_id() else { return 0 };
        let mut reached = 0;
        if let Some(room) = self.rooms.get(&chat_id) {
            reached += room.send(event.clone()).unwrap_or(0);
        }
        reached += self.admin.send(event).unwrap_or(0);
        debug!(%chat_id, reached, "chat_event_published");
        reached
    }

    /// Drop the room once nobody listens to it anymore.
    pub fn release(&self, chat_id: Uuid) {
        self.rooms.remove_if(&chat_id, |_, tx| tx.receiver_count() == 0);
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }
}
