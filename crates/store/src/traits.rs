//! Storage seams the engine depends on.
//!
//! Not-found and not-owned are expressed through `Option`/`bool` returns;
//! [`StoreError`] is reserved for backend failures.

use async_trait::async_trait;
use uuid::Uuid;

use fileops_core::NotificationKind;

use crate::error::StoreError;
use crate::models::{
    Notification, NotificationAudit, NotificationDelivery, NotificationFilter,
    NotificationPreferences, Timestamp, WebhookRegistration,
};

/// Persistence for [`Notification`] records.
#[async_trait]
pub trait NotificationStore: Send + Sync {
    async fn insert(&self, notification: Notification) -> Result<(), StoreError>;

    async fn get(&self, id: Uuid) -> Result<Option<Notification>, StoreError>;

    /// List a user's notifications, newest first.
    async fn list_for_user(
        &self,
        user_id: Uuid,
        filter: &NotificationFilter,
    ) -> Result<Vec<Notification>, StoreError>;

    /// The user's most recent notifications, newest first (retry scans).
    async fn recent_for_user(
        &self,
        user_id: Uuid,
        limit: usize,
    ) -> Result<Vec<Notification>, StoreError>;

    /// Mark a notification read.
    ///
    /// Returns `None` when the notification does not exist or belongs to a
    /// different user, otherwise `Some(was_unread)`.
    async fn mark_read(
        &self,
        id: Uuid,
        user_id: Uuid,
        now: Timestamp,
    ) -> Result<Option<bool>, StoreError>;

    /// Mark all unread notifications read; returns how many were flipped.
    async fn mark_all_read(&self, user_id: Uuid, now: Timestamp) -> Result<u64, StoreError>;

    async fn unread_count(&self, user_id: Uuid) -> Result<u64, StoreError>;

    /// Ownership-checked hard delete.
    async fn delete(&self, id: Uuid, user_id: Uuid) -> Result<bool, StoreError>;

    /// Remove every notification whose `expires_at` has passed, returning
    /// the removed records so the caller can audit them.
    async fn delete_expired(&self, now: Timestamp) -> Result<Vec<Notification>, StoreError>;
}

/// Persistence for [`NotificationDelivery`] records.
#[async_trait]
pub trait DeliveryStore: Send + Sync {
    async fn insert(&self, delivery: NotificationDelivery) -> Result<(), StoreError>;

    /// Replace a delivery record by id. Returns `false` if unknown.
    async fn update(&self, delivery: NotificationDelivery) -> Result<bool, StoreError>;

    async fn get(&self, id: Uuid) -> Result<Option<NotificationDelivery>, StoreError>;

    async fn list_for_notification(
        &self,
        notification_id: Uuid,
    ) -> Result<Vec<NotificationDelivery>, StoreError>;

    /// All deliveries belonging to any of the given notifications.
    async fn list_for_notifications(
        &self,
        notification_ids: &[Uuid],
    ) -> Result<Vec<NotificationDelivery>, StoreError>;
}

/// Append-only persistence for [`NotificationAudit`] entries.
#[async_trait]
pub trait AuditStore: Send + Sync {
    async fn append(&self, entry: NotificationAudit) -> Result<(), StoreError>;

    async fn list_for_notification(
        &self,
        notification_id: Uuid,
    ) -> Result<Vec<NotificationAudit>, StoreError>;

    /// A user's audit entries, newest first.
    async fn list_for_user(
        &self,
        user_id: Uuid,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<NotificationAudit>, StoreError>;
}

/// Persistence for per-user [`NotificationPreferences`].
#[async_trait]
pub trait PreferenceStore: Send + Sync {
    async fn get(&self, user_id: Uuid) -> Result<Option<NotificationPreferences>, StoreError>;

    async fn put(&self, preferences: NotificationPreferences) -> Result<(), StoreError>;

    /// Drop the stored record so the next read sees defaults.
    async fn delete(&self, user_id: Uuid) -> Result<bool, StoreError>;
}

/// Persistence for [`WebhookRegistration`] records.
#[async_trait]
pub trait WebhookStore: Send + Sync {
    async fn insert(&self, registration: WebhookRegistration) -> Result<(), StoreError>;

    async fn get(&self, id: Uuid) -> Result<Option<WebhookRegistration>, StoreError>;

    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<WebhookRegistration>, StoreError>;

    /// Active registrations subscribed to `kind` that match the user or
    /// tenant of a notification.
    async fn list_matching(
        &self,
        user_id: Uuid,
        tenant_id: Option<Uuid>,
        kind: NotificationKind,
    ) -> Result<Vec<WebhookRegistration>, StoreError>;

    /// Replace a registration by id. Returns `false` if unknown.
    async fn update(&self, registration: WebhookRegistration) -> Result<bool, StoreError>;

    /// Ownership-checked delete.
    async fn delete(&self, id: Uuid, user_id: Uuid) -> Result<bool, StoreError>;
}

/// Delivery metadata keys shared between adapters and reporting.
pub mod metadata_keys {
    /// Webhook registration id carried on webhook delivery records.
    pub const WEBHOOK_ID: &str = "webhook_id";
    /// Whether an in-app push reached a live connection.
    pub const PUSHED_LIVE: &str = "pushed_live";
}
