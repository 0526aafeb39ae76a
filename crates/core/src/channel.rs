//! Channel, priority, and notification kind enums.
//!
//! These are closed enums: the wire representation (snake_case strings) must
//! match the values stored in delivery records and sent in webhook payloads.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Channel
// ---------------------------------------------------------------------------

/// A delivery channel the engine can fan out to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    InApp,
    Email,
    Webhook,
}

impl Channel {
    /// Stable string form, matching the serde representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::InApp => "in_app",
            Channel::Email => "email",
            Channel::Webhook => "webhook",
        }
    }

    /// All channels, in dispatch-display order.
    pub fn all() -> [Channel; 3] {
        [Channel::InApp, Channel::Email, Channel::Webhook]
    }
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Channel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "in_app" => Ok(Channel::InApp),
            "email" => Ok(Channel::Email),
            "webhook" => Ok(Channel::Webhook),
            other => Err(format!("Unknown channel: {other}")),
        }
    }
}

// ---------------------------------------------------------------------------
// Priority
// ---------------------------------------------------------------------------

/// Notification priority.
///
/// Ordered: `Low < Medium < High < Urgent`. Urgent notifications bypass
/// quiet-hours suppression.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
            Priority::Urgent => "urgent",
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// NotificationKind
// ---------------------------------------------------------------------------

/// The closed set of notification types the platform emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    FileUploaded,
    FileShared,
    FileDeleted,
    ProcessingCompleted,
    ProcessingFailed,
    StorageQuotaWarning,
    SecurityAlert,
    SystemAnnouncement,
}

impl NotificationKind {
    /// Stable string form, matching the serde representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::FileUploaded => "file_uploaded",
            NotificationKind::FileShared => "file_shared",
            NotificationKind::FileDeleted => "file_deleted",
            NotificationKind::ProcessingCompleted => "processing_completed",
            NotificationKind::ProcessingFailed => "processing_failed",
            NotificationKind::StorageQuotaWarning => "storage_quota_warning",
            NotificationKind::SecurityAlert => "security_alert",
            NotificationKind::SystemAnnouncement => "system_announcement",
        }
    }

    /// Every kind, for registries and seeding default templates.
    pub fn all() -> [NotificationKind; 8] {
        [
            NotificationKind::FileUploaded,
            NotificationKind::FileShared,
            NotificationKind::FileDeleted,
            NotificationKind::ProcessingCompleted,
            NotificationKind::ProcessingFailed,
            NotificationKind::StorageQuotaWarning,
            NotificationKind::SecurityAlert,
            NotificationKind::SystemAnnouncement,
        ]
    }
}

impl std::fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for NotificationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NotificationKind::all()
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| format!("Unknown notification kind: {s}"))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
