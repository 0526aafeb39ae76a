//! In-memory store implementations.
//!
//! Each store is a `tokio::sync::RwLock`-guarded map, designed to be wrapped
//! in `Arc` and shared across the engine. These back the embedded engine in
//! the composition root and stand in as fakes in tests.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use fileops_core::NotificationKind;

use crate::error::StoreError;
use crate::models::{
    Notification, NotificationAudit, NotificationDelivery, NotificationFilter,
    NotificationPreferences, Timestamp, WebhookRegistration,
};
use crate::traits::{
    AuditStore, DeliveryStore, NotificationStore, PreferenceStore, WebhookStore,
};

// ---------------------------------------------------------------------------
// MemoryNotificationStore
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MemoryNotificationStore {
    rows: RwLock<HashMap<Uuid, Notification>>,
}

impl MemoryNotificationStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl NotificationStore for MemoryNotificationStore {
    async fn insert(&self, notification: Notification) -> Result<(), StoreError> {
        self.rows
            .write()
            .await
            .insert(notification.id, notification);
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Notification>, StoreError> {
        Ok(self.rows.read().await.get(&id).cloned())
    }

    async fn list_for_user(
        &self,
        user_id: Uuid,
        filter: &NotificationFilter,
    ) -> Result<Vec<Notification>, StoreError> {
        let rows = self.rows.read().await;
        let mut matching: Vec<Notification> = rows
            .values()
            .filter(|n| n.user_id == user_id)
            .filter(|n| !filter.unread_only || !n.read)
            .filter(|n| filter.kind.is_none_or(|k| n.kind == k))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(matching
            .into_iter()
            .skip(filter.offset)
            .take(filter.limit)
            .collect())
    }

    async fn recent_for_user(
        &self,
        user_id: Uuid,
        limit: usize,
    ) -> Result<Vec<Notification>, StoreError> {
        self.list_for_user(
            user_id,
            &NotificationFilter {
                limit,
                ..Default::default()
            },
        )
        .await
    }

    async fn mark_read(
        &self,
        id: Uuid,
        user_id: Uuid,
        now: Timestamp,
    ) -> Result<Option<bool>, StoreError> {
        let mut rows = self.rows.write().await;
        let Some(row) = rows.get_mut(&id).filter(|n| n.user_id == user_id) else {
            return Ok(None);
        };
        if row.read {
            return Ok(Some(false));
        }
        row.read = true;
        row.read_at = Some(now);
        row.updated_at = now;
        Ok(Some(true))
    }

    async fn mark_all_read(&self, user_id: Uuid, now: Timestamp) -> Result<u64, StoreError> {
        let mut rows = self.rows.write().await;
        let mut flipped = 0;
        for row in rows.values_mut() {
            if row.user_id == user_id && !row.read {
                row.read = true;
                row.read_at = Some(now);
                row.updated_at = now;
                flipped += 1;
            }
        }
        Ok(flipped)
    }

    async fn unread_count(&self, user_id: Uuid) -> Result<u64, StoreError> {
        let rows = self.rows.read().await;
        Ok(rows
            .values()
            .filter(|n| n.user_id == user_id && !n.read)
            .count() as u64)
    }

    async fn delete(&self, id: Uuid, user_id: Uuid) -> Result<bool, StoreError> {
        let mut rows = self.rows.write().await;
        match rows.get(&id) {
            Some(n) if n.user_id == user_id => {
                rows.remove(&id);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn delete_expired(&self, now: Timestamp) -> Result<Vec<Notification>, StoreError> {
        let mut rows = self.rows.write().await;
        let expired_ids: Vec<Uuid> = rows
            .values()
            .filter(|n| n.expires_at.is_some_and(|at| at <= now))
            .map(|n| n.id)
            .collect();
        let mut removed = Vec::with_capacity(expired_ids.len());
        for id in expired_ids {
            if let Some(n) = rows.remove(&id) {
                removed.push(n);
            }
        }
        Ok(removed)
    }
}

// ---------------------------------------------------------------------------
// MemoryDeliveryStore
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MemoryDeliveryStore {
    rows: RwLock<HashMap<Uuid, NotificationDelivery>>,
}

impl MemoryDeliveryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DeliveryStore for MemoryDeliveryStore {
    async fn insert(&self, delivery: NotificationDelivery) -> Result<(), StoreError> {
        self.rows.write().await.insert(delivery.id, delivery);
        Ok(())
    }

    async fn update(&self, delivery: NotificationDelivery) -> Result<bool, StoreError> {
        let mut rows = self.rows.write().await;
        if !rows.contains_key(&delivery.id) {
            return Ok(false);
        }
        rows.insert(delivery.id, delivery);
        Ok(true)
    }

    async fn get(&self, id: Uuid) -> Result<Option<NotificationDelivery>, StoreError> {
        Ok(self.rows.read().await.get(&id).cloned())
    }

    async fn list_for_notification(
        &self,
        notification_id: Uuid,
    ) -> Result<Vec<NotificationDelivery>, StoreError> {
        let rows = self.rows.read().await;
        let mut matching: Vec<NotificationDelivery> = rows
            .values()
            .filter(|d| d.notification_id == notification_id)
            .cloned()
            .collect();
        matching.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(matching)
    }

    async fn list_for_notifications(
        &self,
        notification_ids: &[Uuid],
    ) -> Result<Vec<NotificationDelivery>, StoreError> {
        let rows = self.rows.read().await;
        let mut matching: Vec<NotificationDelivery> = rows
            .values()
            .filter(|d| notification_ids.contains(&d.notification_id))
            .cloned()
            .collect();
        matching.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(matching)
    }
}

// ---------------------------------------------------------------------------
// MemoryAuditStore
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MemoryAuditStore {
    rows: RwLock<Vec<NotificationAudit>>,
}

impl MemoryAuditStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AuditStore for MemoryAuditStore {
    async fn append(&self, entry: NotificationAudit) -> Result<(), StoreError> {
        self.rows.write().await.push(entry);
        Ok(())
    }

    async fn list_for_notification(
        &self,
        notification_id: Uuid,
    ) -> Result<Vec<NotificationAudit>, StoreError> {
        let rows = self.rows.read().await;
        Ok(rows
            .iter()
            .filter(|e| e.notification_id == notification_id)
            .cloned()
            .collect())
    }

    async fn list_for_user(
        &self,
        user_id: Uuid,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<NotificationAudit>, StoreError> {
        let rows = self.rows.read().await;
        let mut matching: Vec<NotificationAudit> = rows
            .iter()
            .filter(|e| e.user_id == user_id)
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(matching.into_iter().skip(offset).take(limit).collect())
    }
}

// ---------------------------------------------------------------------------
// MemoryPreferenceStore
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MemoryPreferenceStore {
    rows: RwLock<HashMap<Uuid, NotificationPreferences>>,
}

impl MemoryPreferenceStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PreferenceStore for MemoryPreferenceStore {
    async fn get(&self, user_id: Uuid) -> Result<Option<NotificationPreferences>, StoreError> {
        Ok(self.rows.read().await.get(&user_id).cloned())
    }

    async fn put(&self, preferences: NotificationPreferences) -> Result<(), StoreError> {
        self.rows
            .write()
            .await
            .insert(preferences.user_id, preferences);
        Ok(())
    }

    async fn delete(&self, user_id: Uuid) -> Result<bool, StoreError> {
        Ok(self.rows.write().await.remove(&user_id).is_some())
    }
}

// ---------------------------------------------------------------------------
// MemoryWebhookStore
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MemoryWebhookStore {
    rows: RwLock<HashMap<Uuid, WebhookRegistration>>,
}

impl MemoryWebhookStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl WebhookStore for MemoryWebhookStore {
    async fn insert(&self, registration: WebhookRegistration) -> Result<(), StoreError> {
        self.rows
            .write()
            .await
            .insert(registration.id, registration);
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<WebhookRegistration>, StoreError> {
        Ok(self.rows.read().await.get(&id).cloned())
    }

    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<WebhookRegistration>, StoreError> {
        let rows = self.rows.read().await;
        let mut matching: Vec<WebhookRegistration> = rows
            .values()
            .filter(|w| w.user_id == user_id)
            .cloned()
            .collect();
        matching.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(matching)
    }

    async fn list_matching(
        &self,
        user_id: Uuid,
        tenant_id: Option<Uuid>,
        kind: NotificationKind,
    ) -> Result<Vec<WebhookRegistration>, StoreError> {
        let rows = self.rows.read().await;
        Ok(rows
            .values()
            .filter(|w| w.matches(user_id, tenant_id, kind))
            .cloned()
            .collect())
    }

    async fn update(&self, registration: WebhookRegistration) -> Result<bool, StoreError> {
        let mut rows = self.rows.write().await;
        if !rows.contains_key(&registration.id) {
            return Ok(false);
        }
        rows.insert(registration.id, registration);
        Ok(true)
    }

    async fn delete(&self, id: Uuid, user_id: Uuid) -> Result<bool, StoreError> {
        let mut rows = self.rows.write().await;
        match rows.get(&id) {
            Some(w) if w.user_id == user_id => {
                rows.remove(&id);
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use fileops_core::{Channel, Priority};

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
            channels: vec![Channel::InApp],
            template_id: None,
            read: false,
            read_at: None,
            expires_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn mark_read_is_ownership_checked() {
        let store = MemoryNotificationStore::new();
        let user = Uuid::new_v4();
        let n = notification(user);
        let id = n.id;
        store.insert(n).await.unwrap();

        let outcome = store.mark_read(id, Uuid::new_v4(), Utc::now()).await.unwrap();
        assert!(outcome.is_none());

        let outcome = store.mark_read(id, user, Utc::now()).await.unwrap();
        assert_eq!(outcome, Some(true));

        // Second call observes the already-read state.
        let outcome = store.mark_read(id, user, Utc::now()).await.unwrap();
        assert_eq!(outcome, Some(false));
    }

    #[tokio::test]
    async fn unread_only_filter() {
        let store = MemoryNotificationStore::new();
        let user = Uuid::new_v4();
        let read = {
            let mut n = notification(user);
            n.read = true;
            n
        };
        store.insert(read).await.unwrap();
        store.insert(notification(user)).await.unwrap();

        let unread = store
            .list_for_user(
                user,
                &NotificationFilter {
                    unread_only: true,
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(unread.len(), 1);
        assert_eq!(store.unread_count(user).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn delete_expired_removes_and_returns() {
        let store = MemoryNotificationStore::new();
        let user = Uuid::new_v4();
        let mut stale = notification(user);
        stale.expires_at = Some(Utc::now() - Duration::hours(1));
        let stale_id = stale.id;
        let mut fresh = notification(user);
        fresh.expires_at = Some(Utc::now() + Duration::hours(1));
        store.insert(stale).await.unwrap();
        store.insert(fresh).await.unwrap();

        let removed = store.delete_expired(Utc::now()).await.unwrap();
        assert_eq!(removed.len(), 1);
        assert_eq!(removed[0].id, stale_id);
        assert!(store.get(stale_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn delivery_update_requires_existing_row() {
        let store = MemoryDeliveryStore::new();
        let delivery =
            NotificationDelivery::pending(Uuid::new_v4(), Channel::Email, "u@x.com", Utc::now());

        assert!(!store.update(delivery.clone()).await.unwrap());
        store.insert(delivery.clone()).await.unwrap();
        assert!(store.update(delivery).await.unwrap());
    }

    #[tokio::test]
    async fn webhook_list_matching_filters() {
        let store = MemoryWebhookStore::new();
        let user = Uuid::new_v4();
        let now = Utc::now();
        let hook = WebhookRegistration {
            id: Uuid::new_v4(),
            user_id: user,
            tenant_id: None,
            url: "https://example.com".into(),
            secret: "s".into(),
            events: vec![NotificationKind::FileUploaded],
            active: true,
            headers: HashMap::new(),
            failure_count: 0,
            last_delivery_at: None,
            last_delivery_status: None,
            created_at: now,
            updated_at: now,
        };
        store.insert(hook).await.unwrap();

        let hits = store
            .list_matching(user, None, NotificationKind::FileUploaded)
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);

        let misses = store
            .list_matching(user, None, NotificationKind::FileDeleted)
            .await
            .unwrap();
        assert!(misses.is_empty());
    }
}
