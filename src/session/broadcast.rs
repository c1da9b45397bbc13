use std::sync::atomic::{AtomicU64, Ordering};

use axum::extract::ws::Message;
use dashmap::DashMap;

use crate::api::events::EventFrame;

pub type ConnectionId = u64;

/// Fan-out capability for one session's live connections.
///
/// All mutation of the connection set goes through `attach`/`detach`;
/// `broadcast` serializes once and sends to everyone. A connection
/// whose channel is closed is treated as dead and silently detached --
/// that is cleanup, not an error path, so `broadcast` never fails.
pub struct BroadcastHub {
    connections: DashMap<ConnectionId, flume::Sender<Message>>,
    next_id: AtomicU64,
}

impl BroadcastHub {
    pub fn new() -> Self {
        Self {
            connections: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn attach(&self, tx: flume::Sender<Message>) -> ConnectionId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.connections.insert(id, tx);
        id
    }

    pub fn detach(&self, id: ConnectionId) {
        self.connections.remove(&id);
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Sends a frame to a single connection (used for the snapshot on
    /// attach).
    pub fn send_to(&self, id: ConnectionId, frame: &EventFrame) {
        let Ok(json) = serde_json::to_string(frame) else {
            return;
        };
        let dead = match self.connections.get(&id) {
            Some(conn) => conn.send(Message::Text(json.into())).is_err(),
            None => false,
        };
        if dead {
            self.connections.remove(&id);
        }
    }

    pub fn broadcast(&self, frame: &EventFrame) {
        let Ok(json) = serde_json::to_string(frame) else {
            return;
        };
        let mut dead = Vec::new();
        for conn in self.connections.iter() {
            if conn
                .value()
                .send(Message::Text(json.clone().into()))
                .is_err()
            {
                dead.push(*conn.key());
            }
        }
        for id in dead {
            self.connections.remove(&id);
            tracing::debug!("Detached dead connection {}", id);
        }
    }
}

impl Default for BroadcastHub {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for BroadcastHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BroadcastHub")
            .field("connections", &self.connections.len())
            .finish()
    }
}
