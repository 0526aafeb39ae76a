//! The notification delivery engine.
//!
//! Building blocks, leaves first:
//!
//! - [`preferences`] — per-user preference service and channel resolution.
//! - [`adapter`] — delivery channel adapters (in-app, email, webhook).
//! - [`registry`] — live-connection registry backing the in-app channel.
//! - [`service`] — the delivery orchestrator ([`NotificationService`]).
//! - [`tracking`] — read-side delivery stats, history, and retry.
//! - [`webhooks`] — webhook registration management and test delivery.
//! - [`bus`] / [`bridge`] — platform event ingestion into `send` calls.
//! - [`sweeper`] — background expiry sweep for stale notifications.

pub mod adapter;
pub mod audit;
pub mod bridge;
pub mod bus;
pub mod config;
pub mod error;
pub mod preferences;
pub mod registry;
pub mod service;
pub mod sweeper;
pub mod tracking;
pub mod webhooks;

pub use audit::{AuditLogger, RequestContext};
pub use bridge::EventBridge;
pub use bus::{EventBus, PlatformEvent};
pub use config::EngineConfig;
pub use error::{EngineError, EngineResult};
pub use preferences::PreferenceService;
pub use registry::ConnectionRegistry;
pub use service::{NotificationService, SendOutcome, SendRequest};
pub use sweeper::ExpirySweeper;
pub use tracking::TrackingService;
pub use webhooks::WebhookService;
