//! Notification engine entity models and DTOs.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use fileops_core::audit::AuditAction;
use fileops_core::{Channel, NotificationKind, Priority};

pub use fileops_core::types::Timestamp;

// ---------------------------------------------------------------------------
// Notification
// ---------------------------------------------------------------------------

/// An immutable record that something happened, created once by `send`.
///
/// `channels` is the channel set resolved at creation time; later preference
/// changes do not retroactively affect it. Only `read`/`read_at` (and the
/// accompanying `updated_at`) change after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub tenant_id: Option<Uuid>,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    /// Free-form payload, also used as the template variable bag.
    pub data: serde_json::Value,
    pub priority: Priority,
    pub channels: Vec<Channel>,
    pub template_id: Option<String>,
    pub read: bool,
    pub read_at: Option<Timestamp>,
    pub expires_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Filter for notification listing.
#[derive(Debug, Clone, Deserialize)]
pub struct NotificationFilter {
    pub unread_only: bool,
    pub kind: Option<NotificationKind>,
    pub limit: usize,
    pub offset: usize,
}

impl Default for NotificationFilter {
    fn default() -> Self {
        Self {
            unread_only: false,
            kind: None,
            limit: 50,
            offset: 0,
        }
    }
}

// ---------------------------------------------------------------------------
// NotificationDelivery
// ---------------------------------------------------------------------------

/// Delivery lifecycle state.
///
/// `pending → delivered` and `pending → failed` are the only forward
/// transitions; a manual retry flips `failed → pending`. `Sent` is reserved
/// and never produced by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    Pending,
    Sent,
    Delivered,
    Failed,
}

impl DeliveryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryStatus::Pending => "pending",
            DeliveryStatus::Sent => "sent",
            DeliveryStatus::Delivered => "delivered",
            DeliveryStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One attempt lineage for a (notification, recipient endpoint) pair.
///
/// The email adapter creates one per notification; the webhook adapter
/// creates one per matching registration, with the registration id carried
/// in `metadata`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationDelivery {
    pub id: Uuid,
    pub notification_id: Uuid,
    pub channel: Channel,
    pub status: DeliveryStatus,
    /// Email address, webhook URL, or connection token.
    pub recipient: String,
    pub attempts: u32,
    pub last_attempt_at: Option<Timestamp>,
    pub delivered_at: Option<Timestamp>,
    pub failed_at: Option<Timestamp>,
    pub error_message: Option<String>,
    pub metadata: serde_json::Value,
    pub created_at: Timestamp,
}

impl NotificationDelivery {
    /// Create a pending delivery record for a notification and recipient.
    pub fn pending(
        notification_id: Uuid,
        channel: Channel,
        recipient: impl Into<String>,
        now: Timestamp,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            notification_id,
            channel,
            status: DeliveryStatus::Pending,
            recipient: recipient.into(),
            attempts: 0,
            last_attempt_at: None,
            delivered_at: None,
            failed_at: None,
            error_message: None,
            metadata: serde_json::Value::Object(Default::default()),
            created_at: now,
        }
    }
}

// ---------------------------------------------------------------------------
// NotificationAudit
// ---------------------------------------------------------------------------

/// Append-only audit log entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationAudit {
    pub id: Uuid,
    pub notification_id: Uuid,
    pub action: AuditAction,
    pub channel: Option<Channel>,
    pub user_id: Uuid,
    pub tenant_id: Option<Uuid>,
    pub details: serde_json::Value,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub timestamp: Timestamp,
}

// ---------------------------------------------------------------------------
// NotificationPreferences
// ---------------------------------------------------------------------------

/// Per-channel opt-in and delivery address.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelPreference {
    pub enabled: bool,
    /// Email address or push token; webhooks carry their own URLs.
    pub address: Option<String>,
    #[serde(default)]
    pub verified: bool,
}

/// Per-notification-kind routing preference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypePreference {
    pub enabled: bool,
    pub channels: Vec<Channel>,
    /// Notifications below this priority resolve to record-only delivery.
    #[serde(default)]
    pub minimum_priority: Option<Priority>,
}

/// Quiet-hours suppression window.
///
/// `start`/`end` are `"HH:mm"` in the user's `timezone`; a start later than
/// the end spans midnight. `weekdays` uses 0 = Monday; empty applies daily.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuietHours {
    pub enabled: bool,
    pub start: String,
    pub end: String,
    pub timezone: String,
    #[serde(default = "default_true")]
    pub allow_urgent_override: bool,
    #[serde(default)]
    pub weekdays: Vec<u8>,
}

fn default_true() -> bool {
    true
}

/// Digest delivery settings. Stored and exposed over the API; digest
/// assembly itself is handled outside the delivery engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DigestSettings {
    pub enabled: bool,
    /// `"daily"` or `"weekly"`.
    pub interval: String,
}

/// One preference record per user, default-constructed on first read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationPreferences {
    pub user_id: Uuid,
    /// Global kill switch: `false` rejects every send for this user.
    pub enabled: bool,
    pub channels: HashMap<Channel, ChannelPreference>,
    pub type_preferences: HashMap<NotificationKind, TypePreference>,
    pub quiet_hours: Option<QuietHours>,
    pub digest: Option<DigestSettings>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl NotificationPreferences {
    /// Default preferences: all channels enabled, no addresses, no quiet
    /// hours, no per-kind overrides.
    pub fn default_for(user_id: Uuid, now: Timestamp) -> Self {
        let channels = Channel::all()
            .into_iter()
            .map(|c| {
                (
                    c,
                    ChannelPreference {
                        enabled: true,
                        address: None,
                        verified: false,
                    },
                )
            })
            .collect();

        Self {
            user_id,
            enabled: true,
            channels,
            type_preferences: HashMap::new(),
            quiet_hours: None,
            digest: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply a partial update.
    ///
    /// Each provided section replaces its previous value wholesale; omitted
    /// sections are kept. This is deliberately not a recursive merge, so a
    /// partial `channels` map drops channel entries it does not name.
    pub fn apply(&mut self, update: PreferencesUpdate, now: Timestamp) {
        if let Some(enabled) = update.enabled {
            self.enabled = enabled;
        }
        if let Some(channels) = update.channels {
            self.channels = channels;
        }
        if let Some(type_preferences) = update.type_preferences {
            self.type_preferences = type_preferences;
        }
        if let Some(quiet_hours) = update.quiet_hours {
            self.quiet_hours = Some(quiet_hours);
        }
        if let Some(digest) = update.digest {
            self.digest = Some(digest);
        }
        self.updated_at = now;
    }
}

/// Per-section preference update. Absent sections are untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PreferencesUpdate {
    pub enabled: Option<bool>,
    pub channels: Option<HashMap<Channel, ChannelPreference>>,
    pub type_preferences: Option<HashMap<NotificationKind, TypePreference>>,
    pub quiet_hours: Option<QuietHours>,
    pub digest: Option<DigestSettings>,
}

// ---------------------------------------------------------------------------
// WebhookRegistration
// ---------------------------------------------------------------------------

/// A user-registered callback endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookRegistration {
    pub id: Uuid,
    pub user_id: Uuid,
    pub tenant_id: Option<Uuid>,
    pub url: String,
    /// HMAC signing secret. Never serialized into API responses.
    #[serde(skip_serializing)]
    pub secret: String,
    pub events: Vec<NotificationKind>,
    pub active: bool,
    #[serde(default)]
    pub headers: HashMap<String, String>,
    pub failure_count: u32,
    pub last_delivery_at: Option<Timestamp>,
    pub last_delivery_status: Option<DeliveryStatus>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl WebhookRegistration {
    /// Whether this registration should receive the given notification.
    pub fn matches(
        &self,
        user_id: Uuid,
        tenant_id: Option<Uuid>,
        kind: NotificationKind,
    ) -> bool {
        if !self.active || !self.events.contains(&kind) {
            return false;
        }
        self.user_id == user_id
            || (self.tenant_id.is_some() && self.tenant_id == tenant_id)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn now() -> Timestamp {
        Utc::now()
    }

    #[test]
    fn default_preferences_enable_all_channels() {
        let prefs = NotificationPreferences::default_for(Uuid::new_v4(), now());
        assert!(prefs.enabled);
        for channel in Channel::all() {
            assert!(prefs.channels[&channel].enabled);
        }
        assert!(prefs.quiet_hours.is_none());
    }

    #[test]
    fn apply_replaces_only_provided_sections() {
        let mut prefs = NotificationPreferences::default_for(Uuid::new_v4(), now());
        let mut channels = HashMap::new();
        channels.insert(
            Channel::Email,
            ChannelPreference {
                enabled: true,
                address: Some("u@x.com".into()),
                verified: true,
            },
        );

        prefs.apply(
            PreferencesUpdate {
                channels: Some(channels),
                ..Default::default()
            },
            now(),
        );

        // Channels section replaced wholesale: only email remains.
        assert_eq!(prefs.channels.len(), 1);
        assert_eq!(
            prefs.channels[&Channel::Email].address.as_deref(),
            Some("u@x.com")
        );
        // Untouched sections keep their defaults.
        assert!(prefs.enabled);
        assert!(prefs.type_preferences.is_empty());
    }

    #[test]
    fn apply_keeps_quiet_hours_when_absent() {
        let mut prefs = NotificationPreferences::default_for(Uuid::new_v4(), now());
        prefs.quiet_hours = Some(QuietHours {
            enabled: true,
            start: "22:00".into(),
            end: "07:00".into(),
            timezone: "UTC".into(),
            allow_urgent_override: true,
            weekdays: vec![],
        });

        prefs.apply(
            PreferencesUpdate {
                enabled: Some(false),
                ..Default::default()
            },
            now(),
        );

        assert!(!prefs.enabled);
        assert!(prefs.quiet_hours.is_some());
    }

    #[test]
    fn pending_delivery_starts_clean() {
        let d = NotificationDelivery::pending(Uuid::new_v4(), Channel::Email, "u@x.com", now());
        assert_eq!(d.status, DeliveryStatus::Pending);
        assert_eq!(d.attempts, 0);
        assert!(d.last_attempt_at.is_none());
        assert!(d.error_message.is_none());
    }

    #[test]
    fn webhook_matches_by_user() {
        let user = Uuid::new_v4();
        let hook = hook_for(user, None, vec![NotificationKind::FileUploaded]);
        assert!(hook.matches(user, None, NotificationKind::FileUploaded));
        assert!(!hook.matches(Uuid::new_v4(), None, NotificationKind::FileUploaded));
    }

    #[test]
    fn webhook_matches_by_tenant() {
        let tenant = Uuid::new_v4();
        let hook = hook_for(Uuid::new_v4(), Some(tenant), vec![NotificationKind::FileShared]);
        assert!(hook.matches(Uuid::new_v4(), Some(tenant), NotificationKind::FileShared));
    }

    #[test]
    fn webhook_requires_subscription_and_active() {
        let user = Uuid::new_v4();
        let mut hook = hook_for(user, None, vec![NotificationKind::FileUploaded]);
        assert!(!hook.matches(user, None, NotificationKind::FileDeleted));

        hook.active = false;
        assert!(!hook.matches(user, None, NotificationKind::FileUploaded));
    }

    fn hook_for(
        user_id: Uuid,
        tenant_id: Option<Uuid>,
        events: Vec<NotificationKind>,
    ) -> WebhookRegistration {
        WebhookRegistration {
            id: Uuid::new_v4(),
            user_id,
            tenant_id,
            url: "https://example.com/hook".into(),
            secret: "s".into(),
            events,
            active: true,
            headers: HashMap::new(),
            failure_count: 0,
            last_delivery_at: None,
            last_delivery_status: None,
            created_at: now(),
            updated_at: now(),
        }
    }
}
