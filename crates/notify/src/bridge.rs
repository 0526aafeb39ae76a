//! Event-to-notification bridge.
//!
//! Subscribes to the platform [`EventBus`](crate::bus::EventBus) and turns
//! each event into a `send` call. Runs as a long-lived background task and
//! shuts down when the bus sender is dropped.

use std::sync::Arc;

use tokio::sync::broadcast;

use fileops_core::CoreError;

use crate::bus::PlatformEvent;
use crate::error::EngineError;
use crate::service::{NotificationService, SendRequest};

/// Background task translating platform events into notification sends.
pub struct EventBridge {
    service: Arc<NotificationService>,
}

impl EventBridge {
    pub fn new(service: Arc<NotificationService>) -> Self {
        Self { service }
    }

    /// Run the bridge loop.
    ///
    /// Processes events until the channel closes (i.e. the bus is dropped).
    /// A user having notifications disabled is normal and logged quietly;
    /// anything else is an error worth surfacing.
    pub async fn run(self, mut receiver: broadcast::Receiver<PlatformEvent>) {
        loop {
            match receiver.recv().await {
                Ok(event) => self.handle(event).await,
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "Event bridge lagged, events were dropped");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!("Event bus closed, event bridge shutting down");
                    break;
                }
            }
        }
    }

    async fn handle(&self, event: PlatformEvent) {
        let request = SendRequest {
            user_id: event.user_id,
            tenant_id: event.tenant_id,
            kind: event.kind,
            title: event.title,
            message: event.message,
            data: Some(event.payload),
            priority: Some(event.priority),
            channels: None,
            template_id: None,
            expires_at: None,
        };

        match self.service.send(request).await {
            Ok(outcome) => {
                tracing::debug!(
                    notification_id = %outcome.notification.id,
                    kind = %outcome.notification.kind,
                    "Event routed to notification"
                );
            }
            Err(EngineError::Core(CoreError::NotificationsDisabled { user_id })) => {
                tracing::debug!(user_id = %user_id, "Event skipped, notifications disabled");
            }
            Err(e) => {
                tracing::error!(kind = %event.kind, error = %e, "Failed to route event");
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use uuid::Uuid;

    use fileops_core::{Channel, NotificationKind};
    use fileops_store::models::NotificationFilter;
    use fileops_store::{
        MemoryAuditStore, MemoryDeliveryStore, MemoryNotificationStore, MemoryPreferenceStore,
        NotificationStore,
    };

    use crate::adapter::{InAppAdapter, ChannelAdapter};
    use crate::audit::AuditLogger;
    use crate::bus::EventBus;
    use crate::preferences::PreferenceService;
    use crate::registry::ConnectionRegistry;

    #[tokio::test]
    async fn published_event_becomes_notification() {
        let notifications = Arc::new(MemoryNotificationStore::new());
        let audit = AuditLogger::new(Arc::new(MemoryAuditStore::new()));
        let adapters: Vec<Arc<dyn ChannelAdapter>> = vec![Arc::new(InAppAdapter::new(
            Arc::new(ConnectionRegistry::new()),
            Arc::new(MemoryDeliveryStore::new()),
            audit.clone(),
        ))];
        let service = Arc::new(NotificationService::new(
            notifications.clone(),
            Arc::new(PreferenceService::new(Arc::new(MemoryPreferenceStore::new()))),
            adapters,
            audit,
            100,
        ));

        let bus = EventBus::default();
        let bridge = EventBridge::new(service);
        let handle = tokio::spawn(bridge.run(bus.subscribe()));

        let user = Uuid::new_v4();
        bus.publish(
            PlatformEvent::new(NotificationKind::ProcessingCompleted, user, "Done", "ok")
                .with_payload(serde_json::json!({"file_name": "clip.mp4"})),
        );

        // Wait for the bridge to drain the event.
        let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
        loop {
            let listed = notifications
                .list_for_user(user, &NotificationFilter::default())
                .await
                .unwrap();
            if !listed.is_empty() {
                assert_eq!(listed[0].kind, NotificationKind::ProcessingCompleted);
                assert_eq!(listed[0].channels, vec![Channel::InApp]);
                break;
            }
            assert!(
                tokio::time::Instant::now() < deadline,
                "bridge never created the notification"
            );
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        drop(bus);
        let _ = tokio::time::timeout(Duration::from_secs(1), handle).await;
    }
}
