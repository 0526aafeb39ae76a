use std::sync::Arc;

use fileops_notify::{
    ConnectionRegistry, EventBus, NotificationService, PreferenceService, TrackingService,
    WebhookService,
};

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc`).
#[derive(Clone)]
pub struct AppState {
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Delivery orchestrator.
    pub service: Arc<NotificationService>,
    /// Preference management.
    pub preferences: Arc<PreferenceService>,
    /// Delivery tracking and reporting.
    pub tracking: Arc<TrackingService>,
    /// Webhook registration management.
    pub webhooks: Arc<WebhookService>,
    /// Live-connection registry (in-app channel).
    pub registry: Arc<ConnectionRegistry>,
    /// Platform event bus feeding the delivery engine.
    pub event_bus: Arc<EventBus>,
}
