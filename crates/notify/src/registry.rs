//! Live-connection registry backing the in-app channel.
//!
//! Tracks which users currently hold an open real-time session. Both
//! directions (connection → user and user → connections) live in one
//! structure behind a single `RwLock`, so connect/disconnect can never leave
//! the two views out of sync.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use tokio::sync::{mpsc, RwLock};
use uuid::Uuid;

use fileops_store::models::Notification;

use crate::adapter::LivePush;

/// Channel sender half for pushing JSON payloads to one connection.
pub type ConnectionSender = mpsc::UnboundedSender<serde_json::Value>;

struct Connection {
    user_id: Uuid,
    sender: ConnectionSender,
}

#[derive(Default)]
struct Inner {
    connections: HashMap<String, Connection>,
    by_user: HashMap<Uuid, HashSet<String>>,
}

impl Inner {
    fn unlink(&mut self, conn_id: &str) {
        if let Some(conn) = self.connections.remove(conn_id) {
            if let Some(set) = self.by_user.get_mut(&conn.user_id) {
                set.remove(conn_id);
                if set.is_empty() {
                    self.by_user.remove(&conn.user_id);
                }
            }
        }
    }
}

/// Manages all active real-time connections.
///
/// Thread-safe via interior `RwLock`; designed to be wrapped in `Arc` and
/// shared between the WebSocket layer and the in-app adapter.
#[derive(Default)]
pub struct ConnectionRegistry {
    inner: RwLock<Inner>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection for a user.
    ///
    /// Returns the receiver half of the outbound message channel so the
    /// caller can forward payloads to the socket. Re-registering an existing
    /// connection id replaces the previous connection.
    pub async fn connect(
        &self,
        conn_id: String,
        user_id: Uuid,
    ) -> mpsc::UnboundedReceiver<serde_json::Value> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut inner = self.inner.write().await;
        inner.unlink(&conn_id);
        inner.connections.insert(
            conn_id.clone(),
            Connection {
                user_id,
                sender: tx,
            },
        );
        inner.by_user.entry(user_id).or_default().insert(conn_id);
        rx
    }

    /// Remove a connection by its id. Unknown ids are a no-op.
    pub async fn disconnect(&self, conn_id: &str) {
        self.inner.write().await.unlink(conn_id);
    }

    /// Current number of active connections.
    pub async fn connection_count(&self) -> usize {
        self.inner.read().await.connections.len()
    }

    /// Send a payload to every connection of one user.
    ///
    /// Connections whose channel has closed are skipped; they are cleaned
    /// up when their socket task disconnects. Returns how many connections
    /// accepted the payload.
    pub async fn send_raw(&self, user_id: Uuid, payload: serde_json::Value) -> usize {
        let inner = self.inner.read().await;
        let Some(conn_ids) = inner.by_user.get(&user_id) else {
            return 0;
        };
        let mut sent = 0;
        for conn_id in conn_ids {
            if let Some(conn) = inner.connections.get(conn_id) {
                if conn.sender.send(payload.clone()).is_ok() {
                    sent += 1;
                }
            }
        }
        sent
    }

    /// Drop every connection, closing all outbound channels.
    ///
    /// Used during graceful shutdown; socket tasks observe their receiver
    /// closing and terminate.
    pub async fn shutdown_all(&self) {
        let mut inner = self.inner.write().await;
        let count = inner.connections.len();
        inner.connections.clear();
        inner.by_user.clear();
        tracing::info!(count, "Closed all live connections");
    }
}

#[async_trait]
impl LivePush for ConnectionRegistry {
    async fn send_to_user(&self, user_id: Uuid, notification: &Notification) -> bool {
        let payload = serde_json::json!({
            "type": "notification",
            "notification": notification,
        });
        self.send_raw(user_id, payload).await > 0
    }

    async fn is_user_connected(&self, user_id: Uuid) -> bool {
        let inner = self.inner.read().await;
        inner
            .by_user
            .get(&user_id)
            .is_some_and(|set| !set.is_empty())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
