//! Webhook channel adapter: signed HTTP POST with retry/backoff and
//! auto-disable on repeated failure.
//!
//! One notification fans out to every active registration subscribed to its
//! kind and matching its user or tenant; registrations are delivered to in
//! parallel, each with its own delivery record and retry lineage. The
//! channel succeeds when at least one registration succeeds, or when no
//! registration matched at all.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use fileops_core::audit::AuditAction;
use fileops_core::{backoff, signing, Channel};
use fileops_store::models::{
    DeliveryStatus, Notification, NotificationDelivery, WebhookRegistration,
};
use fileops_store::traits::metadata_keys;
use fileops_store::{DeliveryStore, WebhookStore};

use crate::adapter::{ChannelAdapter, ChannelOutcome, RetryPolicy};
use crate::audit::{AuditLogger, RequestContext};

/// Consecutive failed deliveries after which a registration is disabled.
pub const FAILURE_DISABLE_THRESHOLD: u32 = 10;

/// Signature header on outbound requests.
pub const SIGNATURE_HEADER: &str = "X-Webhook-Signature";
/// Registration id header on outbound requests.
pub const WEBHOOK_ID_HEADER: &str = "X-Webhook-Id";
/// Delivery record id header on outbound requests.
pub const DELIVERY_ID_HEADER: &str = "X-Delivery-Id";
/// Notification kind header on outbound requests.
pub const EVENT_TYPE_HEADER: &str = "X-Event-Type";

/// Delivers notifications to registered webhook endpoints.
pub struct WebhookAdapter {
    client: reqwest::Client,
    webhooks: Arc<dyn WebhookStore>,
    deliveries: Arc<dyn DeliveryStore>,
    audit: AuditLogger,
    policy: RetryPolicy,
}

impl WebhookAdapter {
    /// Create an adapter whose HTTP client aborts each request at `timeout`.
    pub fn new(
        webhooks: Arc<dyn WebhookStore>,
        deliveries: Arc<dyn DeliveryStore>,
        audit: AuditLogger,
        policy: RetryPolicy,
        timeout: Duration,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to build reqwest HTTP client");
        Self {
            client,
            webhooks,
            deliveries,
            audit,
            policy,
        }
    }

    /// Build the outbound payload for one delivery.
    fn payload(delivery_id: Uuid, notification: &Notification) -> serde_json::Value {
        serde_json::json!({
            "id": delivery_id,
            "type": notification.kind,
            "timestamp": Utc::now(),
            "data": {
                "notificationId": notification.id,
                "title": notification.title,
                "message": notification.message,
                "priority": notification.priority,
                "payload": notification.data,
            },
        })
    }

    /// Deliver to a single registration with retry; returns channel-level
    /// success for this endpoint.
    async fn deliver_to_registration(
        &self,
        notification: &Notification,
        registration: &WebhookRegistration,
    ) -> Result<(), String> {
        let now = Utc::now();
        let mut delivery = NotificationDelivery::pending(
            notification.id,
            Channel::Webhook,
            registration.url.clone(),
            now,
        );
        delivery.metadata = serde_json::json!({ (metadata_keys::WEBHOOK_ID): registration.id });

        let body = match serde_json::to_string(&Self::payload(delivery.id, notification)) {
            Ok(body) => body,
            Err(e) => return Err(format!("Failed to encode webhook payload: {e}")),
        };
        let signature = signing::signature_header(&registration.secret, &body);

        if let Err(e) = self.deliveries.insert(delivery.clone()).await {
            return Err(format!("Failed to record webhook delivery: {e}"));
        }

        let mut last_error = String::new();
        for attempt in 1..=self.policy.max_attempts {
            delivery.attempts = attempt;
            delivery.last_attempt_at = Some(Utc::now());

            match self
                .post_once(registration, &body, &signature, delivery.id, notification)
                .await
            {
                Ok(()) => {
                    delivery.status = DeliveryStatus::Delivered;
                    delivery.delivered_at = Some(Utc::now());
                    delivery.error_message = None;
                    self.update_delivery(&delivery).await;
                    self.record_endpoint_success(registration.id).await;
                    self.audit
                        .record(
                            notification.id,
                            AuditAction::Delivered,
                            Some(Channel::Webhook),
                            notification.user_id,
                            notification.tenant_id,
                            serde_json::json!({
                                "webhook_id": registration.id,
                                "attempts": attempt,
                            }),
                            &RequestContext::default(),
                        )
                        .await;
                    return Ok(());
                }
                Err(e) => {
                    last_error = e;
                    delivery.error_message = Some(last_error.clone());
                    self.update_delivery(&delivery).await;
                    tracing::warn!(
                        webhook_id = %registration.id,
                        url = %registration.url,
                        attempt,
                        max_attempts = self.policy.max_attempts,
                        error = %last_error,
                        "Webhook delivery attempt failed"
                    );
                    if attempt < self.policy.max_attempts {
                        tokio::time::sleep(backoff::retry_delay(self.policy.base_delay, attempt))
                            .await;
                    }
                }
            }
        }

        delivery.status = DeliveryStatus::Failed;
        delivery.failed_at = Some(Utc::now());
        self.update_delivery(&delivery).await;
        self.record_endpoint_failure(registration.id).await;
        self.audit
            .record(
                notification.id,
                AuditAction::Failed,
                Some(Channel::Webhook),
                notification.user_id,
                notification.tenant_id,
                serde_json::json!({
                    "webhook_id": registration.id,
                    "attempts": self.policy.max_attempts,
                    "error": last_error,
                }),
                &RequestContext::default(),
            )
            .await;

        Err(last_error)
    }

    /// Execute one signed POST and check the response status.
    ///
    /// A timeout aborts the request and surfaces as an ordinary retryable
    /// failure, same as any other transport error.
    async fn post_once(
        &self,
        registration: &WebhookRegistration,
        body: &str,
        signature: &str,
        delivery_id: Uuid,
        notification: &Notification,
    ) -> Result<(), String> {
        let mut request = self
            .client
            .post(&registration.url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .header(SIGNATURE_HEADER, signature)
            .header(WEBHOOK_ID_HEADER, registration.id.to_string())
            .header(DELIVERY_ID_HEADER, delivery_id.to_string())
            .header(EVENT_TYPE_HEADER, notification.kind.as_str());

        for (name, value) in &registration.headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let response = request
            .body(body.to_string())
            .send()
            .await
            .map_err(|e| format!("HTTP request failed: {e}"))?;

        if !response.status().is_success() {
            return Err(format!("Webhook returned HTTP {}", response.status().as_u16()));
        }
        Ok(())
    }

    async fn update_delivery(&self, delivery: &NotificationDelivery) {
        if let Err(e) = self.deliveries.update(delivery.clone()).await {
            tracing::error!(delivery_id = %delivery.id, error = %e, "Failed to update webhook delivery");
        }
    }

    /// Reset the failure count after any successful delivery.
    async fn record_endpoint_success(&self, webhook_id: Uuid) {
        // Re-read so a concurrent update is not clobbered with stale data.
        match self.webhooks.get(webhook_id).await {
            Ok(Some(mut registration)) => {
                registration.failure_count = 0;
                registration.last_delivery_at = Some(Utc::now());
                registration.last_delivery_status = Some(DeliveryStatus::Delivered);
                registration.updated_at = Utc::now();
                if let Err(e) = self.webhooks.update(registration).await {
                    tracing::error!(webhook_id = %webhook_id, error = %e, "Failed to update webhook");
                }
            }
            Ok(None) => {}
            Err(e) => {
                tracing::error!(webhook_id = %webhook_id, error = %e, "Failed to load webhook")
            }
        }
    }

    /// Bump the failure count, disabling the registration at the threshold.
    async fn record_endpoint_failure(&self, webhook_id: Uuid) {
        match self.webhooks.get(webhook_id).await {
            Ok(Some(mut registration)) => {
                registration.failure_count += 1;
                registration.last_delivery_at = Some(Utc::now());
                registration.last_delivery_status = Some(DeliveryStatus::Failed);
                registration.updated_at = Utc::now();
                if registration.failure_count >= FAILURE_DISABLE_THRESHOLD {
                    registration.active = false;
                    tracing::warn!(
                        webhook_id = %webhook_id,
                        failure_count = registration.failure_count,
                        "Webhook disabled after repeated failures"
                    );
                }
                if let Err(e) = self.webhooks.update(registration).await {
                    tracing::error!(webhook_id = %webhook_id, error = %e, "Failed to update webhook");
                }
            }
            Ok(None) => {}
            Err(e) => {
                tracing::error!(webhook_id = %webhook_id, error = %e, "Failed to load webhook")
            }
        }
    }
}

#[async_trait]
impl ChannelAdapter for WebhookAdapter {
    fn channel(&self) -> Channel {
        Channel::Webhook
    }

    async fn deliver(&self, notification: &Notification) -> ChannelOutcome {
        let registrations = match self
            .webhooks
            .list_matching(notification.user_id, notification.tenant_id, notification.kind)
            .await
        {
            Ok(regs) => regs,
            Err(e) => return ChannelOutcome::failed(format!("Failed to load webhooks: {e}")),
        };

        // Zero matching endpoints is not a failure.
        if registrations.is_empty() {
            return ChannelOutcome::ok();
        }

        let results = futures::future::join_all(
            registrations
                .iter()
                .map(|reg| self.deliver_to_registration(notification, reg)),
        )
        .await;

        let errors: Vec<String> = results.into_iter().filter_map(Result::err).collect();
        if errors.len() == registrations.len() {
            ChannelOutcome::failed(errors.join("; "))
        } else {
            ChannelOutcome::ok()
        }
    }
}
