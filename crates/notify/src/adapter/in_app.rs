//! In-app channel adapter.
//!
//! Delivery always succeeds at the channel level: the stored notification is
//! itself the durable record, so a user without a live connection simply
//! sees it on their next fetch. There is no retry loop because there is
//! nothing to retry.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use fileops_core::audit::AuditAction;
use fileops_core::Channel;
use fileops_store::models::{DeliveryStatus, Notification, NotificationDelivery};
use fileops_store::traits::metadata_keys;
use fileops_store::DeliveryStore;

use crate::adapter::{ChannelAdapter, ChannelOutcome};
use crate::audit::{AuditLogger, RequestContext};

// ---------------------------------------------------------------------------
// LivePush
// ---------------------------------------------------------------------------

/// Narrow interface to the real-time push layer.
///
/// Implemented by [`ConnectionRegistry`](crate::registry::ConnectionRegistry);
/// authentication of the underlying channel is handled outside the engine.
#[async_trait]
pub trait LivePush: Send + Sync {
    /// Push a notification to every live connection of a user.
    ///
    /// Returns `true` when at least one connection received it.
    async fn send_to_user(&self, user_id: Uuid, notification: &Notification) -> bool;

    /// Whether the user currently has any live connection.
    async fn is_user_connected(&self, user_id: Uuid) -> bool;
}

// ---------------------------------------------------------------------------
// InAppAdapter
// ---------------------------------------------------------------------------

/// Delivers notifications to live connections, or leaves them queued for
/// the user's next fetch.
pub struct InAppAdapter {
    push: Arc<dyn LivePush>,
    deliveries: Arc<dyn DeliveryStore>,
    audit: AuditLogger,
}

impl InAppAdapter {
    pub fn new(push: Arc<dyn LivePush>, deliveries: Arc<dyn DeliveryStore>, audit: AuditLogger) -> Self {
        Self {
            push,
            deliveries,
            audit,
        }
    }
}

#[async_trait]
impl ChannelAdapter for InAppAdapter {
    fn channel(&self) -> Channel {
        Channel::InApp
    }

    async fn deliver(&self, notification: &Notification) -> ChannelOutcome {
        let pushed_live = if self.push.is_user_connected(notification.user_id).await {
            self.push.send_to_user(notification.user_id, notification).await
        } else {
            false
        };

        let now = Utc::now();
        let mut delivery = NotificationDelivery::pending(
            notification.id,
            Channel::InApp,
            notification.user_id.to_string(),
            now,
        );
        delivery.attempts = 1;
        delivery.last_attempt_at = Some(now);
        delivery.status = DeliveryStatus::Delivered;
        delivery.delivered_at = Some(now);
        delivery.metadata = serde_json::json!({ (metadata_keys::PUSHED_LIVE): pushed_live });

        if let Err(e) = self.deliveries.insert(delivery).await {
            tracing::error!(notification_id = %notification.id, error = %e, "Failed to record in-app delivery");
        }

        self.audit
            .record(
                notification.id,
                AuditAction::Delivered,
                Some(Channel::InApp),
                notification.user_id,
                notification.tenant_id,
                serde_json::json!({ "pushed_live": pushed_live }),
                &RequestContext::default(),
            )
            .await;

        ChannelOutcome::ok()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
