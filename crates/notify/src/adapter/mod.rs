//! Delivery channel adapters.
//!
//! Each adapter owns the full delivery lifecycle for one channel: it creates
//! the delivery record, performs transport attempts with retry/backoff where
//! the channel is external, and records the terminal outcome. Adapters never
//! raise transport failures to the orchestrator; everything is folded into
//! the returned [`ChannelOutcome`].

pub mod email;
pub mod in_app;
pub mod webhook;

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use fileops_core::Channel;
use fileops_store::models::Notification;

pub use email::{
    EmailAdapter, EmailConfig, EmailMessage, EmailTransport, SmtpEmailTransport,
    UnconfiguredTransport,
};
pub use in_app::{InAppAdapter, LivePush};
pub use webhook::WebhookAdapter;

// ---------------------------------------------------------------------------
// ChannelOutcome
// ---------------------------------------------------------------------------

/// Per-channel delivery result reported back to the caller of `send`.
#[derive(Debug, Clone, Serialize)]
pub struct ChannelOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ChannelOutcome {
    pub fn ok() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
        }
    }
}

// ---------------------------------------------------------------------------
// RetryPolicy
// ---------------------------------------------------------------------------

/// Retry policy shared by external-transport adapters.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts, including the first (minimum 1).
    pub max_attempts: u32,
    /// Base delay; attempt `n` waits `base * 2^(n-1)` before attempt `n+1`.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

// ---------------------------------------------------------------------------
// ChannelAdapter
// ---------------------------------------------------------------------------

/// A delivery adapter for one channel.
#[async_trait]
pub trait ChannelAdapter: Send + Sync {
    /// The channel this adapter serves.
    fn channel(&self) -> Channel;

    /// Deliver a notification through this channel.
    ///
    /// Must not fail the overall send: transport and store errors are
    /// reported through the returned outcome.
    async fn deliver(&self, notification: &Notification) -> ChannelOutcome;
}
