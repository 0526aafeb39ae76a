//! Per-user preference management and channel resolution.
//!
//! [`PreferenceService`] owns the read/update surface over the preference
//! store; [`resolve_channels`] turns preferences plus a notification's kind
//! and priority into the channel set snapshotted onto the notification at
//! creation time.

use std::sync::Arc;

use chrono::{DateTime, Datelike, Timelike, Utc};
use uuid::Uuid;

use fileops_core::{quiet_hours, Channel, CoreError, NotificationKind, Priority};
use fileops_store::models::{
    ChannelPreference, DigestSettings, NotificationPreferences, PreferencesUpdate, QuietHours,
};
use fileops_store::PreferenceStore;

use crate::error::EngineResult;

// ---------------------------------------------------------------------------
// PreferenceService
// ---------------------------------------------------------------------------

/// Service surface over the preference store.
pub struct PreferenceService {
    store: Arc<dyn PreferenceStore>,
}

impl PreferenceService {
    pub fn new(store: Arc<dyn PreferenceStore>) -> Self {
        Self { store }
    }

    /// Load a user's preferences, lazily creating the default record on
    /// first read.
    pub async fn load_or_default(&self, user_id: Uuid) -> EngineResult<NotificationPreferences> {
        if let Some(prefs) = self.store.get(user_id).await? {
            return Ok(prefs);
        }
        let prefs = NotificationPreferences::default_for(user_id, Utc::now());
        self.store.put(prefs.clone()).await?;
        Ok(prefs)
    }

    /// Apply a per-section partial update and return the stored result.
    pub async fn update(
        &self,
        user_id: Uuid,
        update: PreferencesUpdate,
    ) -> EngineResult<NotificationPreferences> {
        let mut prefs = self.load_or_default(user_id).await?;
        prefs.apply(update, Utc::now());
        self.store.put(prefs.clone()).await?;
        Ok(prefs)
    }

    /// Drop any stored record and return fresh defaults.
    pub async fn reset(&self, user_id: Uuid) -> EngineResult<NotificationPreferences> {
        self.store.delete(user_id).await?;
        self.load_or_default(user_id).await
    }

    /// Flip a single channel's enabled flag in place.
    pub async fn set_channel_enabled(
        &self,
        user_id: Uuid,
        channel: Channel,
        enabled: bool,
    ) -> EngineResult<NotificationPreferences> {
        let mut prefs = self.load_or_default(user_id).await?;
        let entry = prefs.channels.entry(channel).or_insert_with(|| ChannelPreference {
            enabled,
            address: None,
            verified: false,
        });
        entry.enabled = enabled;
        prefs.updated_at = Utc::now();
        self.store.put(prefs.clone()).await?;
        Ok(prefs)
    }

    /// Replace the quiet-hours section.
    pub async fn set_quiet_hours(
        &self,
        user_id: Uuid,
        quiet_hours: QuietHours,
    ) -> EngineResult<NotificationPreferences> {
        self.update(
            user_id,
            PreferencesUpdate {
                quiet_hours: Some(quiet_hours),
                ..Default::default()
            },
        )
        .await
    }

    /// Replace the digest section.
    pub async fn set_digest(
        &self,
        user_id: Uuid,
        digest: DigestSettings,
    ) -> EngineResult<NotificationPreferences> {
        self.update(
            user_id,
            PreferencesUpdate {
                digest: Some(digest),
                ..Default::default()
            },
        )
        .await
    }
}

// ---------------------------------------------------------------------------
// Channel resolution
// ---------------------------------------------------------------------------

/// Resolve the delivery channel set for one notification.
///
/// Rejects with [`CoreError::NotificationsDisabled`] when the user's global
/// kill switch is off. An empty result is valid: the notification is
/// recorded but delivered nowhere.
pub fn resolve_channels(
    prefs: &NotificationPreferences,
    kind: NotificationKind,
    priority: Priority,
    explicit: Option<&[Channel]>,
    now: DateTime<Utc>,
) -> Result<Vec<Channel>, CoreError> {
    if !prefs.enabled {
        return Err(CoreError::NotificationsDisabled {
            user_id: prefs.user_id,
        });
    }

    // Candidate set: explicit caller override, then the kind's preference,
    // then the global default.
    let mut channels: Vec<Channel> = match explicit {
        Some(list) => list.to_vec(),
        None => match prefs.type_preferences.get(&kind) {
            Some(tp) if tp.enabled => {
                if tp.minimum_priority.is_some_and(|min| priority < min) {
                    // Below the kind's priority floor: record only.
                    return Ok(Vec::new());
                }
                tp.channels.clone()
            }
            Some(_) => Vec::new(),
            None => vec![Channel::InApp],
        },
    };
    dedup_in_order(&mut channels);

    if quiet_hours_suppresses(prefs, priority, now) {
        channels.retain(|c| *c == Channel::InApp);
    }

    // Per-channel opt-out: drop anything explicitly disabled.
    channels.retain(|c| prefs.channels.get(c).is_none_or(|p| p.enabled));

    Ok(channels)
}

/// Whether the user's quiet-hours window is active for this send.
fn quiet_hours_suppresses(
    prefs: &NotificationPreferences,
    priority: Priority,
    now: DateTime<Utc>,
) -> bool {
    let Some(qh) = prefs.quiet_hours.as_ref().filter(|qh| qh.enabled) else {
        return false;
    };

    if priority == Priority::Urgent && qh.allow_urgent_override {
        return false;
    }

    // Evaluate in the user's configured timezone; an unknown zone name
    // falls back to UTC.
    let tz: chrono_tz::Tz = qh.timezone.parse().unwrap_or(chrono_tz::UTC);
    let local = now.with_timezone(&tz);
    let minutes = local.hour() * 60 + local.minute();

    quiet_hours::is_active(&qh.start, &qh.end, &qh.weekdays, local.weekday(), minutes)
}

fn dedup_in_order(channels: &mut Vec<Channel>) {
    let mut seen = Vec::with_capacity(channels.len());
    channels.retain(|c| {
        if seen.contains(c) {
            false
        } else {
            seen.push(*c);
            true
        }
    });
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use fileops_store::models::{ChannelPreference, TypePreference};
    use fileops_store::MemoryPreferenceStore;

    fn prefs(user_id: Uuid) -> NotificationPreferences {
        NotificationPreferences::default_for(user_id, Utc::now())
    }

    fn quiet_all_day() -> QuietHours {
        QuietHours {
            enabled: true,
            start: "00:00".into(),
            end: "23:59".into(),
            timezone: "UTC".into(),
            allow_urgent_override: true,
            weekdays: vec![],
        }
    }

    #[test]
    fn disabled_user_is_rejected() {
        let mut p = prefs(Uuid::new_v4());
        p.enabled = false;
        let err = resolve_channels(
            &p,
            NotificationKind::FileUploaded,
            Priority::Medium,
            None,
            Utc::now(),
        )
        .unwrap_err();
        assert!(matches!(err, CoreError::NotificationsDisabled { .. }));
    }

    #[test]
    fn default_set_is_in_app() {
        let p = prefs(Uuid::new_v4());
        let channels = resolve_channels(
            &p,
            NotificationKind::FileUploaded,
            Priority::Medium,
            None,
            Utc::now(),
        )
        .unwrap();
        assert_eq!(channels, vec![Channel::InApp]);
    }

    #[test]
    fn type_preference_channels_are_used() {
        let mut p = prefs(Uuid::new_v4());
        p.type_preferences.insert(
            NotificationKind::FileUploaded,
            TypePreference {
                enabled: true,
                channels: vec![Channel::InApp, Channel::Email],
                minimum_priority: None,
            },
        );
        let channels = resolve_channels(
            &p,
            NotificationKind::FileUploaded,
            Priority::Medium,
            None,
            Utc::now(),
        )
        .unwrap();
        assert_eq!(channels, vec![Channel::InApp, Channel::Email]);
    }

    #[test]
    fn disabled_type_resolves_to_empty() {
        let mut p = prefs(Uuid::new_v4());
        p.type_preferences.insert(
            NotificationKind::FileUploaded,
            TypePreference {
                enabled: false,
                channels: vec![Channel::Email],
                minimum_priority: None,
            },
        );
        let channels = resolve_channels(
            &p,
            NotificationKind::FileUploaded,
            Priority::Medium,
            None,
            Utc::now(),
        )
        .unwrap();
        assert!(channels.is_empty());
    }

    #[test]
    fn explicit_override_wins_over_type_preference() {
        let mut p = prefs(Uuid::new_v4());
        p.type_preferences.insert(
            NotificationKind::FileUploaded,
            TypePreference {
                enabled: true,
                channels: vec![Channel::Email],
                minimum_priority: None,
            },
        );
        let channels = resolve_channels(
            &p,
            NotificationKind::FileUploaded,
            Priority::Medium,
            Some(&[Channel::Webhook]),
            Utc::now(),
        )
        .unwrap();
        assert_eq!(channels, vec![Channel::Webhook]);
    }

    #[test]
    fn quiet_hours_collapse_to_in_app() {
        let mut p = prefs(Uuid::new_v4());
        p.quiet_hours = Some(quiet_all_day());
        let channels = resolve_channels(
            &p,
            NotificationKind::FileUploaded,
            Priority::High,
            Some(&[Channel::InApp, Channel::Email, Channel::Webhook]),
            Utc::now(),
        )
        .unwrap();
        assert_eq!(channels, vec![Channel::InApp]);
    }

    #[test]
    fn urgent_bypasses_quiet_hours() {
        let mut p = prefs(Uuid::new_v4());
        p.quiet_hours = Some(quiet_all_day());
        let channels = resolve_channels(
            &p,
            NotificationKind::SecurityAlert,
            Priority::Urgent,
            Some(&[Channel::InApp, Channel::Email]),
            Utc::now(),
        )
        .unwrap();
        assert_eq!(channels, vec![Channel::InApp, Channel::Email]);
    }

    #[test]
    fn urgent_is_suppressed_when_override_disallowed() {
        let mut p = prefs(Uuid::new_v4());
        p.quiet_hours = Some(QuietHours {
            allow_urgent_override: false,
            ..quiet_all_day()
        });
        let channels = resolve_channels(
            &p,
            NotificationKind::SecurityAlert,
            Priority::Urgent,
            Some(&[Channel::InApp, Channel::Email]),
            Utc::now(),
        )
        .unwrap();
        assert_eq!(channels, vec![Channel::InApp]);
    }

    #[test]
    fn quiet_hours_respect_configured_timezone() {
        // 22:30 in New York is quiet; the same instant is 03:30 UTC.
        let mut p = prefs(Uuid::new_v4());
        p.quiet_hours = Some(QuietHours {
            enabled: true,
            start: "22:00".into(),
            end: "07:00".into(),
            timezone: "America/New_York".into(),
            allow_urgent_override: true,
            weekdays: vec![],
        });
        // 2026-01-15 03:30 UTC == 2026-01-14 22:30 America/New_York (EST).
        let now = Utc.with_ymd_and_hms(2026, 1, 15, 3, 30, 0).unwrap();
        let channels = resolve_channels(
            &p,
            NotificationKind::FileUploaded,
            Priority::Medium,
            Some(&[Channel::Email]),
            now,
        )
        .unwrap();
        assert!(channels.is_empty(), "email suppressed, in_app not requested");
    }

    #[test]
    fn quiet_hours_weekday_filter() {
        let mut p = prefs(Uuid::new_v4());
        p.quiet_hours = Some(QuietHours {
            // Weekend-only window (5 = Saturday, 6 = Sunday).
            weekdays: vec![5, 6],
            ..quiet_all_day()
        });
        // 2026-01-14 is a Wednesday.
        let now = Utc.with_ymd_and_hms(2026, 1, 14, 12, 0, 0).unwrap();
        let channels = resolve_channels(
            &p,
            NotificationKind::FileUploaded,
            Priority::Medium,
            Some(&[Channel::Email]),
            now,
        )
        .unwrap();
        assert_eq!(channels, vec![Channel::Email]);
    }

    #[test]
    fn disabled_channel_is_filtered() {
        let mut p = prefs(Uuid::new_v4());
        p.channels.insert(
            Channel::Email,
            ChannelPreference {
                enabled: false,
                address: Some("u@x.com".into()),
                verified: true,
            },
        );
        let channels = resolve_channels(
            &p,
            NotificationKind::FileUploaded,
            Priority::Medium,
            Some(&[Channel::InApp, Channel::Email]),
            Utc::now(),
        )
        .unwrap();
        assert_eq!(channels, vec![Channel::InApp]);
    }

    #[test]
    fn below_minimum_priority_is_record_only() {
        let mut p = prefs(Uuid::new_v4());
        p.type_preferences.insert(
            NotificationKind::FileUploaded,
            TypePreference {
                enabled: true,
                channels: vec![Channel::InApp, Channel::Email],
                minimum_priority: Some(Priority::High),
            },
        );
        let channels = resolve_channels(
            &p,
            NotificationKind::FileUploaded,
            Priority::Low,
            None,
            Utc::now(),
        )
        .unwrap();
        assert!(channels.is_empty());
    }

    #[test]
    fn duplicate_explicit_channels_are_deduped() {
        let p = prefs(Uuid::new_v4());
        let channels = resolve_channels(
            &p,
            NotificationKind::FileUploaded,
            Priority::Medium,
            Some(&[Channel::Email, Channel::Email, Channel::InApp]),
            Utc::now(),
        )
        .unwrap();
        assert_eq!(channels, vec![Channel::Email, Channel::InApp]);
    }

    #[tokio::test]
    async fn load_or_default_persists_lazily() {
        let store = Arc::new(MemoryPreferenceStore::new());
        let service = PreferenceService::new(store.clone());
        let user = Uuid::new_v4();

        assert!(store.get(user).await.unwrap().is_none());
        let prefs = service.load_or_default(user).await.unwrap();
        assert!(prefs.enabled);
        assert!(store.get(user).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn reset_restores_defaults() {
        let store = Arc::new(MemoryPreferenceStore::new());
        let service = PreferenceService::new(store);
        let user = Uuid::new_v4();

        service
            .update(
                user,
                PreferencesUpdate {
                    enabled: Some(false),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let restored = service.reset(user).await.unwrap();
        assert!(restored.enabled);
    }

    #[tokio::test]
    async fn set_channel_enabled_touches_only_that_channel() {
        let store = Arc::new(MemoryPreferenceStore::new());
        let service = PreferenceService::new(store);
        let user = Uuid::new_v4();

        let prefs = service
            .set_channel_enabled(user, Channel::Email, false)
            .await
            .unwrap();
        assert!(!prefs.channels[&Channel::Email].enabled);
        assert!(prefs.channels[&Channel::InApp].enabled);
    }
}
