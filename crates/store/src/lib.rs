//! Entity models and storage seams for the notification engine.
//!
//! The engine talks to storage exclusively through the traits in [`traits`]
//! so the composition root decides the backing. [`memory`] provides the
//! concurrency-safe in-memory implementation used by the embedded engine
//! and by tests.

pub mod error;
pub mod memory;
pub mod models;
pub mod traits;

pub use error::StoreError;
pub use memory::{
    MemoryAuditStore, MemoryDeliveryStore, MemoryNotificationStore, MemoryPreferenceStore,
    MemoryWebhookStore,
};
pub use traits::{AuditStore, DeliveryStore, NotificationStore, PreferenceStore, WebhookStore};
