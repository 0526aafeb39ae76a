//! Background expiry sweep.
//!
//! [`ExpirySweeper`] runs as a background task, periodically deleting
//! notifications whose `expires_at` has passed and auditing each removal.
//! The loop exits gracefully when the provided cancellation token fires.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio_util::sync::CancellationToken;

use fileops_core::audit::AuditAction;
use fileops_store::NotificationStore;

use crate::audit::{AuditLogger, RequestContext};

/// Background service that removes expired notifications.
pub struct ExpirySweeper {
    notifications: Arc<dyn NotificationStore>,
    audit: AuditLogger,
    interval: Duration,
}

impl ExpirySweeper {
    pub fn new(
        notifications: Arc<dyn NotificationStore>,
        audit: AuditLogger,
        interval: Duration,
    ) -> Self {
        Self {
            notifications,
            audit,
            interval,
        }
    }

    /// Run the sweep loop until `cancel` fires.
    pub async fn run(&self, cancel: CancellationToken) {
        let mut interval = tokio::time::interval(self.interval);
        // The first tick completes immediately; skip it so startup does not
        // race stores still being seeded.
        interval.tick().await;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Expiry sweeper cancelled");
                    break;
                }
                _ = interval.tick() => {
                    self.sweep().await;
                }
            }
        }
    }

    /// Delete everything past its expiry and audit each removal.
    pub async fn sweep(&self) {
        let removed = match self.notifications.delete_expired(Utc::now()).await {
            Ok(removed) => removed,
            Err(e) => {
                tracing::error!(error = %e, "Expiry sweep failed");
                return;
            }
        };

        for notification in &removed {
            self.audit
                .record(
                    notification.id,
                    AuditAction::Deleted,
                    None,
                    notification.user_id,
                    notification.tenant_id,
                    serde_json::json!({ "expired": true }),
                    &RequestContext::default(),
                )
                .await;
        }

        if !removed.is_empty() {
            tracing::info!(count = removed.len(), "Swept expired notifications");
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;
    use uuid::Uuid;

    use fileops_core::audit::AuditAction;
    use fileops_core::{Channel, NotificationKind, Priority};
    use fileops_store::models::Notification;
    use fileops_store::{AuditStore, MemoryAuditStore, MemoryNotificationStore};

    #[tokio::test]
    async fn sweep_removes_expired_and_audits() {
        let notifications = Arc::new(MemoryNotificationStore::new());
        let audit_store = Arc::new(MemoryAuditStore::new());
        let sweeper = ExpirySweeper::new(
            notifications.clone(),
            AuditLogger::new(audit_store.clone()),
            Duration::from_secs(3600),
        );

        let now = Utc::now();
        let expired = Notification {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            tenant_id: None,
            kind: NotificationKind::SystemAnnouncement,
            title: "t".into(),
            message: "m".into(),
            data: serde_json::Value::Object(Default::default()),
            priority: Priority::Low,
            channels: vec![Channel::InApp],
            template_id: None,
            read: false,
            read_at: None,
            expires_at: Some(now - ChronoDuration::minutes(5)),
            created_at: now - ChronoDuration::hours(1),
            updated_at: now - ChronoDuration::hours(1),
        };
        let expired_id = expired.id;
        notifications.insert(expired).await.unwrap();

        sweeper.sweep().await;

        assert!(notifications.get(expired_id).await.unwrap().is_none());
        let entries = audit_store.list_for_notification(expired_id).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].action, AuditAction::Deleted);
        assert_eq!(entries[0].details["expired"], true);
    }
}
