//! Best-effort audit logging.
//!
//! Audit writes describe state that has already happened; a failing audit
//! backend is logged and swallowed so it can never roll back the
//! notification or delivery state it records.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use fileops_core::audit::{redact_sensitive_fields, AuditAction};
use fileops_core::Channel;
use fileops_store::models::NotificationAudit;
use fileops_store::AuditStore;

/// Caller metadata propagated from the HTTP layer into audit entries.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

/// Write-side handle over the audit store.
#[derive(Clone)]
pub struct AuditLogger {
    store: Arc<dyn AuditStore>,
}

impl AuditLogger {
    pub fn new(store: Arc<dyn AuditStore>) -> Self {
        Self { store }
    }

    /// Append an audit entry, redacting sensitive detail fields first.
    #[allow(clippy::too_many_arguments)]
    pub async fn record(
        &self,
        notification_id: Uuid,
        action: AuditAction,
        channel: Option<Channel>,
        user_id: Uuid,
        tenant_id: Option<Uuid>,
        details: serde_json::Value,
        ctx: &RequestContext,
    ) {
        let entry = NotificationAudit {
            id: Uuid::new_v4(),
            notification_id,
            action,
            channel,
            user_id,
            tenant_id,
            details: redact_sensitive_fields(&details),
            ip_address: ctx.ip_address.clone(),
            user_agent: ctx.user_agent.clone(),
            timestamp: Utc::now(),
        };

        if let Err(e) = self.store.append(entry).await {
            tracing::warn!(
                notification_id = %notification_id,
                action = %action,
                error = %e,
                "Failed to append audit entry"
            );
        }
    }
}
