//! Read-side delivery tracking and reporting.
//!
//! Aggregates over delivery and audit records only; no transport access.
//! `retry_all_failed` flips exhausted deliveries back to `pending` and stops
//! there. Actual re-delivery is left to an external sweep or operator
//! action, so a reset delivery stays pending until something re-drives it.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use fileops_core::audit::AuditAction;
use fileops_core::{Channel, CoreError};
use fileops_store::models::{
    DeliveryStatus, Notification, NotificationAudit, NotificationDelivery, Timestamp,
};
use fileops_store::{AuditStore, DeliveryStore, NotificationStore};

use crate::audit::{AuditLogger, RequestContext};
use crate::error::EngineResult;

/// Upper bound on notifications scanned per stats/history/retry call.
const SCAN_LIMIT: usize = 500;

// ---------------------------------------------------------------------------
// DeliveryStats
// ---------------------------------------------------------------------------

/// Aggregated delivery counts for one user.
#[derive(Debug, Default, Serialize)]
pub struct DeliveryStats {
    pub total: u64,
    pub by_status: HashMap<DeliveryStatus, u64>,
    pub by_channel: HashMap<Channel, u64>,
    /// Mean of `delivered_at - notification.created_at` over delivered
    /// records, in milliseconds. `None` when nothing was delivered.
    pub average_latency_ms: Option<i64>,
}

/// One delivery alongside its notification's creation time.
#[derive(Debug, Serialize)]
pub struct HistoryEntry {
    #[serde(flatten)]
    pub delivery: NotificationDelivery,
    pub notification_created_at: Timestamp,
}

// ---------------------------------------------------------------------------
// TrackingService
// ---------------------------------------------------------------------------

/// Read/aggregate surface over delivery and audit records.
pub struct TrackingService {
    notifications: Arc<dyn NotificationStore>,
    deliveries: Arc<dyn DeliveryStore>,
    audit_store: Arc<dyn AuditStore>,
    audit: AuditLogger,
    /// Deliveries at or past this attempt count are not eligible for retry.
    max_attempts: u32,
}

impl TrackingService {
    pub fn new(
        notifications: Arc<dyn NotificationStore>,
        deliveries: Arc<dyn DeliveryStore>,
        audit_store: Arc<dyn AuditStore>,
        max_attempts: u32,
    ) -> Self {
        Self {
            notifications,
            deliveries,
            audit_store: audit_store.clone(),
            audit: AuditLogger::new(audit_store),
            max_attempts,
        }
    }

    /// Load a user's recent notifications and the deliveries hanging off them.
    async fn recent_deliveries(
        &self,
        user_id: Uuid,
    ) -> EngineResult<(Vec<Notification>, Vec<NotificationDelivery>)> {
        let notifications = self.notifications.recent_for_user(user_id, SCAN_LIMIT).await?;
        let ids: Vec<Uuid> = notifications.iter().map(|n| n.id).collect();
        let deliveries = self.deliveries.list_for_notifications(&ids).await?;
        Ok((notifications, deliveries))
    }

    /// Aggregate delivery counts by status and channel, plus mean latency.
    pub async fn delivery_stats(
        &self,
        user_id: Uuid,
        from: Option<Timestamp>,
        to: Option<Timestamp>,
    ) -> EngineResult<DeliveryStats> {
        let (notifications, deliveries) = self.recent_deliveries(user_id).await?;
        let created_at: HashMap<Uuid, Timestamp> =
            notifications.iter().map(|n| (n.id, n.created_at)).collect();

        let mut stats = DeliveryStats::default();
        let mut latency_sum_ms: i64 = 0;
        let mut latency_count: i64 = 0;

        for delivery in deliveries {
            let Some(&created) = created_at.get(&delivery.notification_id) else {
                continue;
            };
            if from.is_some_and(|f| created < f) || to.is_some_and(|t| created > t) {
                continue;
            }

            stats.total += 1;
            *stats.by_status.entry(delivery.status).or_default() += 1;
            *stats.by_channel.entry(delivery.channel).or_default() += 1;

            if delivery.status == DeliveryStatus::Delivered {
                if let Some(delivered_at) = delivery.delivered_at {
                    latency_sum_ms += (delivered_at - created).num_milliseconds();
                    latency_count += 1;
                }
            }
        }

        if latency_count > 0 {
            stats.average_latency_ms = Some(latency_sum_ms / latency_count);
        }
        Ok(stats)
    }

    /// Recent deliveries for a user, newest first.
    pub async fn history(
        &self,
        user_id: Uuid,
        limit: usize,
        offset: usize,
    ) -> EngineResult<Vec<HistoryEntry>> {
        let (notifications, deliveries) = self.recent_deliveries(user_id).await?;
        let created_at: HashMap<Uuid, Timestamp> =
            notifications.iter().map(|n| (n.id, n.created_at)).collect();

        let mut entries: Vec<HistoryEntry> = deliveries
            .into_iter()
            .filter_map(|d| {
                created_at.get(&d.notification_id).map(|&created| HistoryEntry {
                    delivery: d,
                    notification_created_at: created,
                })
            })
            .collect();
        entries.sort_by(|a, b| b.delivery.created_at.cmp(&a.delivery.created_at));
        Ok(entries.into_iter().skip(offset).take(limit).collect())
    }

    /// Ownership-checked audit trail for one notification.
    pub async fn audit_trail(
        &self,
        notification_id: Uuid,
        user_id: Uuid,
    ) -> EngineResult<Vec<NotificationAudit>> {
        let owned = self
            .notifications
            .get(notification_id)
            .await?
            .is_some_and(|n| n.user_id == user_id);
        if !owned {
            return Err(CoreError::NotFound {
                entity: "Notification",
                id: notification_id,
            }
            .into());
        }
        Ok(self.audit_store.list_for_notification(notification_id).await?)
    }

    /// Flip failed deliveries with remaining attempt budget back to pending.
    ///
    /// Returns how many deliveries were reset. Reset records keep their
    /// attempt count; a subsequent re-drive continues the lineage.
    pub async fn retry_all_failed(
        &self,
        user_id: Uuid,
        ctx: &RequestContext,
    ) -> EngineResult<u64> {
        let (notifications, deliveries) = self.recent_deliveries(user_id).await?;
        let tenant_of: HashMap<Uuid, Option<Uuid>> =
            notifications.iter().map(|n| (n.id, n.tenant_id)).collect();

        let mut reset = 0;
        for mut delivery in deliveries {
            if delivery.status != DeliveryStatus::Failed
                || delivery.attempts >= self.max_attempts
            {
                continue;
            }

            delivery.status = DeliveryStatus::Pending;
            delivery.error_message = None;
            delivery.failed_at = None;
            let notification_id = delivery.notification_id;
            let channel = delivery.channel;
            if self.deliveries.update(delivery).await? {
                reset += 1;
                self.audit
                    .record(
                        notification_id,
                        AuditAction::Retried,
                        Some(channel),
                        user_id,
                        tenant_of.get(&notification_id).copied().flatten(),
                        serde_json::Value::Object(Default::default()),
                        ctx,
                    )
                    .await;
            }
        }

        if reset > 0 {
            tracing::info!(user_id = %user_id, reset, "Reset failed deliveries for retry");
        }
        Ok(reset)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    use fileops_core::{NotificationKind, Priority};
    use fileops_store::{MemoryAuditStore, MemoryDeliveryStore, MemoryNotificationStore};

    struct Fixture {
        tracking: TrackingService,
        notifications: Arc<MemoryNotificationStore>,
        deliveries: Arc<MemoryDeliveryStore>,
    }

    fn fixture() -> Fixture {
        let notifications = Arc::new(MemoryNotificationStore::new());
        let deliveries = Arc::new(MemoryDeliveryStore::new());
        let audit_store = Arc::new(MemoryAuditStore::new());
        let tracking = TrackingService::new(
            notifications.clone(),
            deliveries.clone(),
            audit_store,
            3,
        );
        Fixture {
            tracking,
            notifications,
            deliveries,
        }
    }

    fn notification(user_id: Uuid) -> Notification {
        let now = Utc::now();
        Notification {
            id: Uuid::new_v4(),
            user_id,
            tenant_id: None,
            kind: NotificationKind::FileUploaded,
            title: "t".into(),
            message: "m".into(),
            data: serde_json::Value::Object(Default::default()),
            priority: Priority::Medium,
            channels: vec![Channel::Email],
            template_id: None,
            read: false,
            read_at: None,
            expires_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    async fn seed_delivery(
        f: &Fixture,
        user_id: Uuid,
        status: DeliveryStatus,
        attempts: u32,
        latency_ms: i64,
    ) -> NotificationDelivery {
        let n = notification(user_id);
        let mut d = NotificationDelivery::pending(n.id, Channel::Email, "u@x.com", n.created_at);
        d.status = status;
        d.attempts = attempts;
        if status == DeliveryStatus::Delivered {
            d.delivered_at = Some(n.created_at + Duration::milliseconds(latency_ms));
        }
        if status == DeliveryStatus::Failed {
            d.failed_at = Some(Utc::now());
            d.error_message = Some("boom".into());
        }
        f.notifications.insert(n).await.unwrap();
        f.deliveries.insert(d.clone()).await.unwrap();
        d
    }

    #[tokio::test]
    async fn stats_count_by_status_and_channel() {
        let f = fixture();
        let user = Uuid::new_v4();
        seed_delivery(&f, user, DeliveryStatus::Delivered, 1, 100).await;
        seed_delivery(&f, user, DeliveryStatus::Delivered, 1, 300).await;
        seed_delivery(&f, user, DeliveryStatus::Failed, 3, 0).await;

        let stats = f.tracking.delivery_stats(user, None, None).await.unwrap();

        assert_eq!(stats.total, 3);
        assert_eq!(stats.by_status[&DeliveryStatus::Delivered], 2);
        assert_eq!(stats.by_status[&DeliveryStatus::Failed], 1);
        assert_eq!(stats.by_channel[&Channel::Email], 3);
        assert_eq!(stats.average_latency_ms, Some(200));
    }

    #[tokio::test]
    async fn stats_latency_absent_without_deliveries() {
        let f = fixture();
        let user = Uuid::new_v4();
        seed_delivery(&f, user, DeliveryStatus::Failed, 3, 0).await;

        let stats = f.tracking.delivery_stats(user, None, None).await.unwrap();
        assert_eq!(stats.average_latency_ms, None);
    }

    #[tokio::test]
    async fn stats_respect_time_range() {
        let f = fixture();
        let user = Uuid::new_v4();
        seed_delivery(&f, user, DeliveryStatus::Delivered, 1, 100).await;

        let future = Utc::now() + Duration::hours(1);
        let stats = f
            .tracking
            .delivery_stats(user, Some(future), None)
            .await
            .unwrap();
        assert_eq!(stats.total, 0);
    }

    #[tokio::test]
    async fn retry_resets_only_eligible_failures() {
        let f = fixture();
        let user = Uuid::new_v4();
        let eligible = seed_delivery(&f, user, DeliveryStatus::Failed, 2, 0).await;
        let exhausted = seed_delivery(&f, user, DeliveryStatus::Failed, 3, 0).await;
        let delivered = seed_delivery(&f, user, DeliveryStatus::Delivered, 1, 50).await;

        let reset = f
            .tracking
            .retry_all_failed(user, &RequestContext::default())
            .await
            .unwrap();
        assert_eq!(reset, 1);

        let eligible_now = f.deliveries.get(eligible.id).await.unwrap().unwrap();
        assert_eq!(eligible_now.status, DeliveryStatus::Pending);
        assert!(eligible_now.error_message.is_none());
        assert!(eligible_now.failed_at.is_none());
        // Attempt count survives the reset.
        assert_eq!(eligible_now.attempts, 2);

        let exhausted_now = f.deliveries.get(exhausted.id).await.unwrap().unwrap();
        assert_eq!(exhausted_now.status, DeliveryStatus::Failed);

        let delivered_now = f.deliveries.get(delivered.id).await.unwrap().unwrap();
        assert_eq!(delivered_now.status, DeliveryStatus::Delivered);
    }

    #[tokio::test]
    async fn audit_trail_is_ownership_checked() {
        let f = fixture();
        let user = Uuid::new_v4();
        let n = notification(user);
        let id = n.id;
        f.notifications.insert(n).await.unwrap();

        assert!(f.tracking.audit_trail(id, user).await.is_ok());
        assert!(f.tracking.audit_trail(id, Uuid::new_v4()).await.is_err());
    }

    #[tokio::test]
    async fn history_is_paginated_newest_first() {
        let f = fixture();
        let user = Uuid::new_v4();
        for _ in 0..5 {
            seed_delivery(&f, user, DeliveryStatus::Delivered, 1, 10).await;
        }

        let page = f.tracking.history(user, 2, 0).await.unwrap();
        assert_eq!(page.len(), 2);
        let rest = f.tracking.history(user, 10, 2).await.unwrap();
        assert_eq!(rest.len(), 3);
    }
}
