use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use uuid::Uuid;

use fileops_notify::ConnectionRegistry;

use crate::middleware::auth::AuthUser;
use crate::state::AppState;

/// Interval between heartbeat pings.
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

/// GET /api/v1/ws
///
/// Upgrades the connection and registers it for in-app push. Identity comes
/// from the gateway headers on the upgrade request.
pub async fn ws_handler(
    auth: AuthUser,
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state.registry, auth.user_id))
}

/// Manage a single WebSocket connection after upgrade.
///
/// Splits the socket into a sink (outbound) and stream (inbound), then:
///   1. Registers the connection with the registry.
///   2. Spawns a sender task forwarding registry payloads and heartbeats.
///   3. Processes inbound messages on the current task.
///   4. Cleans up on disconnect.
async fn handle_socket(socket: WebSocket, registry: Arc<ConnectionRegistry>, user_id: Uuid) {
    let conn_id = Uuid::new_v4().to_string();
    tracing::info!(conn_id = %conn_id, user_id = %user_id, "WebSocket connected");

    let mut rx = registry.connect(conn_id.clone(), user_id).await;

    let (mut sink, mut stream) = socket.split();

    // Sender task: forward registry payloads and keep the connection alive.
    let sender_conn_id = conn_id.clone();
    let send_task = tokio::spawn(async move {
        let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
        loop {
            tokio::select! {
                payload = rx.recv() => match payload {
                    Some(payload) => {
                        let text = payload.to_string();
                        if sink.send(Message::Text(text.into())).await.is_err() {
                            tracing::debug!(conn_id = %sender_conn_id, "WebSocket sink closed");
                            break;
                        }
                    }
                    // Registry dropped the connection (shutdown).
                    None => {
                        let _ = sink.send(Message::Close(None)).await;
                        break;
                    }
                },
                _ = heartbeat.tick() => {
                    if sink.send(Message::Ping(Bytes::new())).await.is_err() {
                        break;
                    }
                }
            }
        }
    });

    // Receiver loop: process inbound messages.
    while let Some(result) = stream.next().await {
        match result {
            Ok(Message::Close(_)) => break,
            Ok(Message::Pong(_)) => {
                tracing::trace!(conn_id = %conn_id, "Pong received");
            }
            Ok(_msg) => {
                // The in-app channel is push-only; inbound text is ignored.
            }
            Err(e) => {
                tracing::debug!(conn_id = %conn_id, error = %e, "WebSocket receive error");
                break;
            }
        }
    }

    registry.disconnect(&conn_id).await;
    send_task.abort();
    tracing::info!(conn_id = %conn_id, user_id = %user_id, "WebSocket disconnected");
}
