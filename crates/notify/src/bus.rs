//! In-process event bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`EventBus`] is the ingestion boundary between the wider platform and
//! the delivery engine: file and processing lifecycle events are published
//! here and the [`EventBridge`](crate::bridge::EventBridge) turns them into
//! `send` calls. Shared via `Arc<EventBus>` across the application.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

use fileops_core::{NotificationKind, Priority};

// ---------------------------------------------------------------------------
// PlatformEvent
// ---------------------------------------------------------------------------

/// A domain event destined for a user's notification stream.
///
/// Constructed via [`PlatformEvent::new`] and enriched with the builder
/// methods [`with_tenant`](PlatformEvent::with_tenant),
/// [`with_priority`](PlatformEvent::with_priority), and
/// [`with_payload`](PlatformEvent::with_payload).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformEvent {
    pub kind: NotificationKind,
    /// The user whose notification stream receives this event.
    pub user_id: Uuid,
    pub tenant_id: Option<Uuid>,
    pub title: String,
    pub message: String,
    pub priority: Priority,
    /// Free-form JSON payload carrying event-specific data.
    pub payload: serde_json::Value,
    /// When the event was created (UTC).
    pub timestamp: DateTime<Utc>,
}

impl PlatformEvent {
    /// Create a new event with the required fields.
    pub fn new(
        kind: NotificationKind,
        user_id: Uuid,
        title: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            user_id,
            tenant_id: None,
            title: title.into(),
            message: message.into(),
            priority: Priority::default(),
            payload: serde_json::Value::Object(Default::default()),
            timestamp: Utc::now(),
        }
    }

    /// Attach the owning tenant.
    pub fn with_tenant(mut self, tenant_id: Uuid) -> Self {
        self.tenant_id = Some(tenant_id);
        self
    }

    /// Override the default priority.
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Set the JSON payload for the event.
    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 1024;

/// In-process fan-out event bus.
///
/// Wraps a [`broadcast::Sender`] so that any number of subscribers can
/// independently receive every published [`PlatformEvent`].
pub struct EventBus {
    sender: broadcast::Sender<PlatformEvent>,
}

impl EventBus {
    /// Create a bus with a specific channel capacity.
    ///
    /// When the buffer is full, the oldest un-consumed messages are dropped
    /// and slow receivers observe a `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all current subscribers.
    ///
    /// If there are no active subscribers the event is silently dropped.
    pub fn publish(&self, event: PlatformEvent) {
        // Ignore the SendError — it only means there are zero receivers.
        let _ = self.sender.send(event);
    }

    /// Subscribe to all events published on this bus.
    pub fn subscribe(&self) -> broadcast::Receiver<PlatformEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn publish_and_receive_single_subscriber() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe();
        let user = Uuid::new_v4();

        let event = PlatformEvent::new(NotificationKind::FileUploaded, user, "t", "m")
            .with_priority(Priority::High)
            .with_payload(serde_json::json!({"file_name": "a.txt"}));
        bus.publish(event);

        let received = rx.recv().await.expect("should receive the event");
        assert_eq!(received.kind, NotificationKind::FileUploaded);
        assert_eq!(received.user_id, user);
        assert_eq!(received.priority, Priority::High);
        assert_eq!(received.payload["file_name"], "a.txt");
    }

    #[tokio::test]
    async fn multiple_subscribers_receive_same_event() {
        let bus = EventBus::default();
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        bus.publish(PlatformEvent::new(
            NotificationKind::FileShared,
            Uuid::new_v4(),
            "t",
            "m",
        ));

        assert_eq!(rx1.recv().await.unwrap().kind, NotificationKind::FileShared);
        assert_eq!(rx2.recv().await.unwrap().kind, NotificationKind::FileShared);
    }

    #[test]
    fn publish_with_no_subscribers_does_not_panic() {
        let bus = EventBus::default();
        bus.publish(PlatformEvent::new(
            NotificationKind::FileDeleted,
            Uuid::new_v4(),
            "t",
            "m",
        ));
    }
}
