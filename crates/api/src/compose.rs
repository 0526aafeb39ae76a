//! Composition root for the delivery engine.
//!
//! All services are explicitly constructed and wired here; nothing in the
//! engine is a process-wide singleton. The stores are the in-memory
//! implementations; the platform owns durable storage behind the same
//! store traits.

use std::sync::Arc;

use fileops_core::template::TemplateRegistry;
use fileops_notify::adapter::{
    ChannelAdapter, EmailAdapter, EmailTransport, InAppAdapter, SmtpEmailTransport,
    UnconfiguredTransport, WebhookAdapter,
};
use fileops_notify::{
    AuditLogger, ConnectionRegistry, EventBus, NotificationService, PreferenceService,
    TrackingService, WebhookService,
};
use fileops_store::{
    MemoryAuditStore, MemoryDeliveryStore, MemoryNotificationStore, MemoryPreferenceStore,
    MemoryWebhookStore, NotificationStore,
};

use crate::config::ServerConfig;
use crate::state::AppState;

/// The wired engine plus the handles background tasks need.
pub struct ComposedEngine {
    pub state: AppState,
    /// Notification store handle for the expiry sweeper.
    pub notifications: Arc<dyn NotificationStore>,
    /// Audit logger handle for background tasks.
    pub audit: AuditLogger,
}

/// Construct every service with in-memory stores.
pub fn compose(config: ServerConfig) -> ComposedEngine {
    let notifications: Arc<dyn NotificationStore> = Arc::new(MemoryNotificationStore::new());
    let deliveries = Arc::new(MemoryDeliveryStore::new());
    let audit_store = Arc::new(MemoryAuditStore::new());
    let preference_store = Arc::new(MemoryPreferenceStore::new());
    let webhook_store = Arc::new(MemoryWebhookStore::new());

    let audit = AuditLogger::new(audit_store.clone());
    let preferences = Arc::new(PreferenceService::new(preference_store));
    let registry = Arc::new(ConnectionRegistry::new());
    let templates = Arc::new(TemplateRegistry::with_defaults());
    let policy = config.engine.retry_policy();

    let email_transport: Arc<dyn EmailTransport> = match &config.smtp {
        Some(smtp) => Arc::new(SmtpEmailTransport::new(smtp.clone())),
        None => {
            tracing::warn!("SMTP not configured, email deliveries will fail");
            Arc::new(UnconfiguredTransport)
        }
    };

    let adapters: Vec<Arc<dyn ChannelAdapter>> = vec![
        Arc::new(InAppAdapter::new(
            registry.clone(),
            deliveries.clone(),
            audit.clone(),
        )),
        Arc::new(EmailAdapter::new(
            email_transport,
            preferences.clone(),
            templates,
            deliveries.clone(),
            audit.clone(),
            policy,
        )),
        Arc::new(WebhookAdapter::new(
            webhook_store.clone(),
            deliveries.clone(),
            audit.clone(),
            policy,
            config.engine.webhook_timeout(),
        )),
    ];

    let service = Arc::new(NotificationService::new(
        notifications.clone(),
        preferences.clone(),
        adapters,
        audit.clone(),
        config.engine.bulk_batch_size,
    ));
    let tracking = Arc::new(TrackingService::new(
        notifications.clone(),
        deliveries,
        audit_store,
        config.engine.retry_attempts,
    ));
    let webhooks = Arc::new(WebhookService::new(
        webhook_store,
        config.engine.webhook_timeout(),
    ));
    let event_bus = Arc::new(EventBus::default());

    let state = AppState {
        config: Arc::new(config),
        service,
        preferences,
        tracking,
        webhooks,
        registry,
        event_bus,
    };

    ComposedEngine {
        state,
        notifications,
        audit,
    }
}
