//! End-to-end engine test: full composition with in-memory stores and a
//! recording email transport.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use uuid::Uuid;

use fileops_core::template::TemplateRegistry;
use fileops_core::{Channel, NotificationKind};
use fileops_notify::adapter::email::{EmailMessage, EmailTransport, TransportError};
use fileops_notify::adapter::{ChannelAdapter, EmailAdapter, InAppAdapter, RetryPolicy, WebhookAdapter};
use fileops_notify::{
    AuditLogger, ConnectionRegistry, NotificationService, PreferenceService, RequestContext,
    SendRequest, TrackingService,
};
use fileops_store::models::{
    ChannelPreference, DeliveryStatus, NotificationPreferences, PreferencesUpdate, TypePreference,
};
use fileops_store::{
    DeliveryStore, MemoryAuditStore, MemoryDeliveryStore, MemoryNotificationStore,
    MemoryPreferenceStore, MemoryWebhookStore, PreferenceStore,
};

/// Records every message instead of talking SMTP.
#[derive(Default)]
struct RecordingTransport {
    sent: Mutex<Vec<EmailMessage>>,
}

#[async_trait]
impl EmailTransport for RecordingTransport {
    async fn send(&self, message: &EmailMessage) -> Result<(), TransportError> {
        self.sent.lock().await.push(message.clone());
        Ok(())
    }
}

struct Engine {
    service: NotificationService,
    tracking: TrackingService,
    registry: Arc<ConnectionRegistry>,
    deliveries: Arc<MemoryDeliveryStore>,
    prefs_store: Arc<MemoryPreferenceStore>,
    transport: Arc<RecordingTransport>,
}

fn engine() -> Engine {
    let notifications = Arc::new(MemoryNotificationStore::new());
    let deliveries = Arc::new(MemoryDeliveryStore::new());
    let audit_store = Arc::new(MemoryAuditStore::new());
    let prefs_store = Arc::new(MemoryPreferenceStore::new());
    let webhooks = Arc::new(MemoryWebhookStore::new());
    let registry = Arc::new(ConnectionRegistry::new());
    let transport = Arc::new(RecordingTransport::default());

    let audit = AuditLogger::new(audit_store.clone());
    let preferences = Arc::new(PreferenceService::new(prefs_store.clone()));
    let policy = RetryPolicy {
        max_attempts: 3,
        base_delay: Duration::from_millis(1),
    };

    let adapters: Vec<Arc<dyn ChannelAdapter>> = vec![
        Arc::new(InAppAdapter::new(
            registry.clone(),
            deliveries.clone(),
            audit.clone(),
        )),
        Arc::new(EmailAdapter::new(
            transport.clone(),
            preferences.clone(),
            Arc::new(TemplateRegistry::with_defaults()),
            deliveries.clone(),
            audit.clone(),
            policy,
        )),
        Arc::new(WebhookAdapter::new(
            webhooks,
            deliveries.clone(),
            audit.clone(),
            policy,
            Duration::from_secs(5),
        )),
    ];

    let service = NotificationService::new(
        notifications.clone(),
        preferences,
        adapters,
        audit,
        100,
    );
    let tracking = TrackingService::new(notifications, deliveries.clone(), audit_store, 3);

    Engine {
        service,
        tracking,
        registry,
        deliveries,
        prefs_store,
        transport,
    }
}

/// The canonical scenario: user opted into in-app + email for file uploads,
/// outside quiet hours, with an address on file.
async fn opt_in_email(prefs_store: &MemoryPreferenceStore, user: Uuid) {
    let mut prefs = NotificationPreferences::default_for(user, Utc::now());
    prefs.apply(
        PreferencesUpdate {
            channels: Some(HashMap::from([
                (
                    Channel::Email,
                    ChannelPreference {
                        enabled: true,
                        address: Some("u@x.com".into()),
                        verified: true,
                    },
                ),
                (
                    Channel::InApp,
                    ChannelPreference {
                        enabled: true,
                        address: None,
                        verified: false,
                    },
                ),
            ])),
            type_preferences: Some(HashMap::from([(
                NotificationKind::FileUploaded,
                TypePreference {
                    enabled: true,
                    channels: vec![Channel::InApp, Channel::Email],
                    minimum_priority: None,
                },
            )])),
            ..Default::default()
        },
        Utc::now(),
    );
    prefs_store.put(prefs).await.unwrap();
}

#[tokio::test]
async fn file_uploaded_fans_out_to_in_app_and_email() {
    let engine = engine();
    let user = Uuid::new_v4();
    opt_in_email(&engine.prefs_store, user).await;

    // The user has a live session.
    let mut rx = engine.registry.connect("conn-1".into(), user).await;

    let outcome = engine
        .service
        .send(SendRequest {
            data: Some(serde_json::json!({"file_name": "report.pdf"})),
            ..SendRequest::new(user, NotificationKind::FileUploaded, "t", "m")
        })
        .await
        .unwrap();

    // Channel snapshot comes from the type preference.
    assert_eq!(
        outcome.notification.channels,
        vec![Channel::InApp, Channel::Email]
    );
    assert!(outcome.channels[&Channel::InApp].success);
    assert!(outcome.channels[&Channel::Email].success);

    // In-app: pushed to the live connection.
    let pushed = rx.recv().await.unwrap();
    assert_eq!(pushed["type"], "notification");
    assert_eq!(
        pushed["notification"]["id"],
        outcome.notification.id.to_string()
    );

    // Email: rendered through the default template for the kind.
    let sent = engine.transport.sent.lock().await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "u@x.com");
    assert_eq!(sent[0].subject, "File uploaded: report.pdf");

    // Both deliveries recorded as delivered.
    let records = engine
        .deliveries
        .list_for_notification(outcome.notification.id)
        .await
        .unwrap();
    assert_eq!(records.len(), 2);
    assert!(records
        .iter()
        .all(|r| r.status == DeliveryStatus::Delivered));

    // Tracking sees them.
    let stats = engine
        .tracking
        .delivery_stats(user, None, None)
        .await
        .unwrap();
    assert_eq!(stats.total, 2);
    assert_eq!(stats.by_status[&DeliveryStatus::Delivered], 2);
    assert!(stats.average_latency_ms.is_some());
}

#[tokio::test]
async fn email_failure_does_not_fail_send_or_in_app() {
    struct AlwaysFailing;

    #[async_trait]
    impl EmailTransport for AlwaysFailing {
        async fn send(&self, _message: &EmailMessage) -> Result<(), TransportError> {
            Err(TransportError::Smtp("mx unreachable".into()))
        }
    }

    let notifications = Arc::new(MemoryNotificationStore::new());
    let deliveries = Arc::new(MemoryDeliveryStore::new());
    let audit = AuditLogger::new(Arc::new(MemoryAuditStore::new()));
    let prefs_store = Arc::new(MemoryPreferenceStore::new());
    let preferences = Arc::new(PreferenceService::new(prefs_store.clone()));
    let registry = Arc::new(ConnectionRegistry::new());

    let adapters: Vec<Arc<dyn ChannelAdapter>> = vec![
        Arc::new(InAppAdapter::new(
            registry,
            deliveries.clone(),
            audit.clone(),
        )),
        Arc::new(EmailAdapter::new(
            Arc::new(AlwaysFailing),
            preferences.clone(),
            Arc::new(TemplateRegistry::with_defaults()),
            deliveries.clone(),
            audit.clone(),
            RetryPolicy {
                max_attempts: 3,
                base_delay: Duration::from_millis(1),
            },
        )),
    ];
    let service = NotificationService::new(notifications, preferences, adapters, audit, 100);

    let user = Uuid::new_v4();
    opt_in_email(&prefs_store, user).await;

    let outcome = service
        .send(SendRequest::new(user, NotificationKind::FileUploaded, "t", "m"))
        .await
        .expect("send resolves even when a channel fails");

    assert!(outcome.channels[&Channel::InApp].success);
    assert!(!outcome.channels[&Channel::Email].success);
    assert!(outcome.channels[&Channel::Email]
        .error
        .as_deref()
        .unwrap()
        .contains("mx unreachable"));

    let records = deliveries
        .list_for_notification(outcome.notification.id)
        .await
        .unwrap();
    let email = records
        .iter()
        .find(|r| r.channel == Channel::Email)
        .unwrap();
    assert_eq!(email.status, DeliveryStatus::Failed);
    assert_eq!(email.attempts, 3);
}

#[tokio::test]
async fn failed_email_can_be_reset_for_retry() {
    struct AlwaysFailing;

    #[async_trait]
    impl EmailTransport for AlwaysFailing {
        async fn send(&self, _message: &EmailMessage) -> Result<(), TransportError> {
            Err(TransportError::Smtp("mx unreachable".into()))
        }
    }

    let notifications = Arc::new(MemoryNotificationStore::new());
    let deliveries = Arc::new(MemoryDeliveryStore::new());
    let audit_store = Arc::new(MemoryAuditStore::new());
    let audit = AuditLogger::new(audit_store.clone());
    let prefs_store = Arc::new(MemoryPreferenceStore::new());
    let preferences = Arc::new(PreferenceService::new(prefs_store.clone()));

    // Two attempts: the failed delivery stays under the retry ceiling of 3.
    let adapters: Vec<Arc<dyn ChannelAdapter>> = vec![Arc::new(EmailAdapter::new(
        Arc::new(AlwaysFailing),
        preferences.clone(),
        Arc::new(TemplateRegistry::with_defaults()),
        deliveries.clone(),
        audit.clone(),
        RetryPolicy {
            max_attempts: 2,
            base_delay: Duration::from_millis(1),
        },
    ))];
    let service =
        NotificationService::new(notifications.clone(), preferences, adapters, audit, 100);
    let tracking = TrackingService::new(notifications, deliveries.clone(), audit_store, 3);

    let user = Uuid::new_v4();
    opt_in_email(&prefs_store, user).await;

    let outcome = service
        .send(SendRequest {
            channels: Some(vec![Channel::Email]),
            ..SendRequest::new(user, NotificationKind::FileUploaded, "t", "m")
        })
        .await
        .unwrap();
    assert!(!outcome.channels[&Channel::Email].success);

    let reset = tracking
        .retry_all_failed(user, &RequestContext::default())
        .await
        .unwrap();
    assert_eq!(reset, 1);

    let records = deliveries
        .list_for_notification(outcome.notification.id)
        .await
        .unwrap();
    assert_eq!(records[0].status, DeliveryStatus::Pending);
    assert!(records[0].error_message.is_none());
}
