//! Pure domain logic for the notification delivery engine.
//!
//! This crate has zero internal dependencies so it can be used by the
//! store layer, the delivery engine, and any future worker or CLI tooling:
//!
//! - [`channel`] — channel, priority, and notification kind enums.
//! - [`error`] — the domain error taxonomy.
//! - [`template`] — mustache-style template rendering with HTML escaping.
//! - [`quiet_hours`] — quiet-hours window arithmetic.
//! - [`signing`] — webhook HMAC signing, verification, secret generation.
//! - [`backoff`] — exponential retry delay computation.
//! - [`audit`] — audit action constants and sensitive-field redaction.

pub mod audit;
pub mod backoff;
pub mod channel;
pub mod error;
pub mod quiet_hours;
pub mod signing;
pub mod template;
pub mod types;

pub use channel::{Channel, NotificationKind, Priority};
pub use error::CoreError;
