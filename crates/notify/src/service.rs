//! The delivery orchestrator.
//!
//! [`NotificationService`] validates a send request against the user's
//! preferences, persists the notification with its resolved channel
//! snapshot, dispatches every resolved channel concurrently, and aggregates
//! per-channel results. One channel's failure never fails another channel or
//! the overall send: once the notification exists, `send` resolves
//! successfully and failures appear only in the result map.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use futures::future::join_all;
use uuid::Uuid;

use fileops_core::audit::AuditAction;
use fileops_core::{Channel, CoreError, NotificationKind, Priority};
use fileops_store::models::{Notification, NotificationFilter, Timestamp};
use fileops_store::NotificationStore;

use crate::adapter::{ChannelAdapter, ChannelOutcome};
use crate::audit::{AuditLogger, RequestContext};
use crate::error::EngineResult;
use crate::preferences::{resolve_channels, PreferenceService};

// ---------------------------------------------------------------------------
// Request / outcome types
// ---------------------------------------------------------------------------

/// Input to [`NotificationService::send`].
#[derive(Debug, Clone)]
pub struct SendRequest {
    pub user_id: Uuid,
    pub tenant_id: Option<Uuid>,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    /// Free-form payload; also the template variable bag.
    pub data: Option<serde_json::Value>,
    /// Defaults to [`Priority::Medium`].
    pub priority: Option<Priority>,
    /// Explicit channel override used as the candidate set when present.
    pub channels: Option<Vec<Channel>>,
    pub template_id: Option<String>,
    pub expires_at: Option<Timestamp>,
}

impl SendRequest {
    /// Minimal request with required fields only.
    pub fn new(
        user_id: Uuid,
        kind: NotificationKind,
        title: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            user_id,
            tenant_id: None,
            kind,
            title: title.into(),
            message: message.into(),
            data: None,
            priority: None,
            channels: None,
            template_id: None,
            expires_at: None,
        }
    }
}

/// Result of one send: the created notification plus per-channel outcomes.
#[derive(Debug, serde::Serialize)]
pub struct SendOutcome {
    pub notification: Notification,
    pub channels: HashMap<Channel, ChannelOutcome>,
}

/// Aggregate result of a bulk send.
#[derive(Debug, Default, serde::Serialize)]
pub struct BulkOutcome {
    pub sent: usize,
    pub failed: usize,
}

// ---------------------------------------------------------------------------
// NotificationService
// ---------------------------------------------------------------------------

/// Central delivery coordinator.
pub struct NotificationService {
    notifications: Arc<dyn NotificationStore>,
    preferences: Arc<PreferenceService>,
    adapters: HashMap<Channel, Arc<dyn ChannelAdapter>>,
    audit: AuditLogger,
    bulk_batch_size: usize,
}

impl NotificationService {
    pub fn new(
        notifications: Arc<dyn NotificationStore>,
        preferences: Arc<PreferenceService>,
        adapters: Vec<Arc<dyn ChannelAdapter>>,
        audit: AuditLogger,
        bulk_batch_size: usize,
    ) -> Self {
        let adapters = adapters.into_iter().map(|a| (a.channel(), a)).collect();
        Self {
            notifications,
            preferences,
            adapters,
            audit,
            bulk_batch_size: bulk_batch_size.max(1),
        }
    }

    // -----------------------------------------------------------------------
    // Send
    // -----------------------------------------------------------------------

    /// Create a notification and fan it out to all resolved channels.
    pub async fn send(&self, request: SendRequest) -> EngineResult<SendOutcome> {
        if request.title.trim().is_empty() {
            return Err(CoreError::Validation("title must not be empty".into()).into());
        }
        if request.message.trim().is_empty() {
            return Err(CoreError::Validation("message must not be empty".into()).into());
        }

        let priority = request.priority.unwrap_or_default();
        let prefs = self.preferences.load_or_default(request.user_id).await?;
        let channels = resolve_channels(
            &prefs,
            request.kind,
            priority,
            request.channels.as_deref(),
            Utc::now(),
        )?;

        let now = Utc::now();
        let notification = Notification {
            id: Uuid::new_v4(),
            user_id: request.user_id,
            tenant_id: request.tenant_id,
            kind: request.kind,
            title: request.title,
            message: request.message,
            data: request
                .data
                .unwrap_or_else(|| serde_json::Value::Object(Default::default())),
            priority,
            channels: channels.clone(),
            template_id: request.template_id,
            read: false,
            read_at: None,
            expires_at: request.expires_at,
            created_at: now,
            updated_at: now,
        };
        self.notifications.insert(notification.clone()).await?;

        self.audit
            .record(
                notification.id,
                AuditAction::Created,
                None,
                notification.user_id,
                notification.tenant_id,
                serde_json::json!({
                    "kind": notification.kind,
                    "priority": notification.priority,
                    "channels": notification.channels,
                }),
                &RequestContext::default(),
            )
            .await;

        let channel_results = self.dispatch(&notification).await;

        Ok(SendOutcome {
            notification,
            channels: channel_results,
        })
    }

    /// Launch one delivery task per resolved channel and await them all.
    ///
    /// Each adapter runs in its own task so a slow transport cannot delay
    /// the others and a panicking adapter is contained at this boundary.
    async fn dispatch(&self, notification: &Notification) -> HashMap<Channel, ChannelOutcome> {
        let mut handles = Vec::with_capacity(notification.channels.len());
        for channel in &notification.channels {
            let channel = *channel;
            match self.adapters.get(&channel) {
                Some(adapter) => {
                    let adapter = Arc::clone(adapter);
                    let n = notification.clone();
                    handles.push((
                        channel,
                        tokio::spawn(async move { adapter.deliver(&n).await }),
                    ));
                }
                None => {
                    tracing::error!(channel = %channel, "No adapter registered for channel");
                }
            }
        }

        let mut results = HashMap::new();
        for channel in &notification.channels {
            if !self.adapters.contains_key(channel) {
                results.insert(*channel, ChannelOutcome::failed("no adapter registered"));
            }
        }
        for (channel, handle) in handles {
            let outcome = match handle.await {
                Ok(outcome) => outcome,
                Err(e) => {
                    tracing::error!(channel = %channel, error = %e, "Channel delivery task failed");
                    ChannelOutcome::failed(format!("delivery task failed: {e}"))
                }
            };
            results.insert(channel, outcome);
        }
        results
    }

    /// Send the same notification to many users, chunked to bound the
    /// number of simultaneous deliveries.
    ///
    /// Per-user failures are logged and counted, never propagated; one bad
    /// user cannot abort the batch.
    pub async fn send_bulk(
        &self,
        user_ids: &[Uuid],
        template: SendRequest,
    ) -> EngineResult<BulkOutcome> {
        let mut outcome = BulkOutcome::default();

        for chunk in user_ids.chunks(self.bulk_batch_size) {
            let sends = chunk.iter().map(|user_id| {
                let mut request = template.clone();
                request.user_id = *user_id;
                self.send(request)
            });
            for (user_id, result) in chunk.iter().zip(join_all(sends).await) {
                match result {
                    Ok(_) => outcome.sent += 1,
                    Err(e) => {
                        outcome.failed += 1;
                        tracing::warn!(user_id = %user_id, error = %e, "Bulk send failed for user");
                    }
                }
            }
        }

        tracing::info!(
            sent = outcome.sent,
            failed = outcome.failed,
            "Bulk send completed"
        );
        Ok(outcome)
    }

    // -----------------------------------------------------------------------
    // Read side
    // -----------------------------------------------------------------------

    pub async fn get_notifications(
        &self,
        user_id: Uuid,
        filter: &NotificationFilter,
    ) -> EngineResult<Vec<Notification>> {
        Ok(self.notifications.list_for_user(user_id, filter).await?)
    }

    /// Fetch one notification, treating another user's record as absent.
    pub async fn get_notification(&self, id: Uuid, user_id: Uuid) -> EngineResult<Notification> {
        self.notifications
            .get(id)
            .await?
            .filter(|n| n.user_id == user_id)
            .ok_or_else(|| {
                CoreError::NotFound {
                    entity: "Notification",
                    id,
                }
                .into()
            })
    }

    /// Mark a notification read. Marking an already-read notification is a
    /// no-op success.
    pub async fn mark_as_read(
        &self,
        id: Uuid,
        user_id: Uuid,
        ctx: &RequestContext,
    ) -> EngineResult<Notification> {
        let was_unread = self
            .notifications
            .mark_read(id, user_id, Utc::now())
            .await?
            .ok_or(CoreError::NotFound {
                entity: "Notification",
                id,
            })?;

        if was_unread {
            let notification = self.get_notification(id, user_id).await?;
            self.audit
                .record(
                    id,
                    AuditAction::Read,
                    None,
                    user_id,
                    notification.tenant_id,
                    serde_json::Value::Object(Default::default()),
                    ctx,
                )
                .await;
            return Ok(notification);
        }
        self.get_notification(id, user_id).await
    }

    /// Mark all unread notifications read; returns how many were flipped.
    pub async fn mark_all_as_read(
        &self,
        user_id: Uuid,
        ctx: &RequestContext,
    ) -> EngineResult<u64> {
        let count = self.notifications.mark_all_read(user_id, Utc::now()).await?;
        if count > 0 {
            // One aggregate entry; per-notification granularity is not
            // useful for a bulk flip.
            self.audit
                .record(
                    Uuid::nil(),
                    AuditAction::Read,
                    None,
                    user_id,
                    None,
                    serde_json::json!({ "marked_read": count }),
                    ctx,
                )
                .await;
        }
        Ok(count)
    }

    /// Ownership-checked hard delete.
    pub async fn delete_notification(
        &self,
        id: Uuid,
        user_id: Uuid,
        ctx: &RequestContext,
    ) -> EngineResult<()> {
        let deleted = self.notifications.delete(id, user_id).await?;
        if !deleted {
            return Err(CoreError::NotFound {
                entity: "Notification",
                id,
            }
            .into());
        }
        self.audit
            .record(
                id,
                AuditAction::Deleted,
                None,
                user_id,
                None,
                serde_json::Value::Object(Default::default()),
                ctx,
            )
            .await;
        Ok(())
    }

    pub async fn get_unread_count(&self, user_id: Uuid) -> EngineResult<u64> {
        Ok(self.notifications.unread_count(user_id).await?)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
