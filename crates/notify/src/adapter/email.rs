//! Email channel adapter with SMTP transport and retry/backoff.
//!
//! The transport sits behind [`EmailTransport`] so tests inject fakes;
//! production uses [`SmtpEmailTransport`] over `lettre`. Configuration is
//! loaded from environment variables; if `SMTP_HOST` is not set,
//! [`EmailConfig::from_env`] returns `None` and no mailer should be
//! constructed.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;

use fileops_core::audit::AuditAction;
use fileops_core::template::{render, Rendered, TemplateRegistry};
use fileops_core::{backoff, Channel};
use fileops_store::models::{DeliveryStatus, Notification, NotificationDelivery};
use fileops_store::DeliveryStore;

use crate::adapter::{ChannelAdapter, ChannelOutcome, RetryPolicy};
use crate::audit::{AuditLogger, RequestContext};
use crate::preferences::PreferenceService;

// ---------------------------------------------------------------------------
// Transport seam
// ---------------------------------------------------------------------------

/// A fully rendered outbound email.
#[derive(Debug, Clone)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
    pub html_body: Option<String>,
}

/// Error type for email transport failures.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// SMTP transport-level failure (connection, authentication, etc.).
    #[error("SMTP transport error: {0}")]
    Smtp(String),

    /// The recipient or sender address could not be parsed.
    #[error("Email address parse error: {0}")]
    Address(String),

    /// The MIME message could not be assembled.
    #[error("Email build error: {0}")]
    Build(String),
}

/// Transport seam the adapter sends through.
#[async_trait]
pub trait EmailTransport: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> Result<(), TransportError>;
}

// ---------------------------------------------------------------------------
// EmailConfig
// ---------------------------------------------------------------------------

/// Default SMTP port (STARTTLS).
const DEFAULT_SMTP_PORT: u16 = 587;

/// Default sender address when `SMTP_FROM` is not set.
const DEFAULT_FROM_ADDRESS: &str = "noreply@fileops.local";

/// Configuration for the SMTP email transport.
#[derive(Debug, Clone)]
pub struct EmailConfig {
    /// SMTP server hostname.
    pub smtp_host: String,
    /// SMTP server port (defaults to 587).
    pub smtp_port: u16,
    /// RFC 5322 "From" address.
    pub from_address: String,
    /// Optional SMTP username.
    pub smtp_user: Option<String>,
    /// Optional SMTP password.
    pub smtp_password: Option<String>,
}

impl EmailConfig {
    /// Load configuration from environment variables.
    ///
    /// Returns `None` if `SMTP_HOST` is not set, signalling that email
    /// delivery is not configured.
    ///
    /// | Variable        | Required | Default                  |
    /// |-----------------|----------|--------------------------|
    /// | `SMTP_HOST`     | yes      | —                        |
    /// | `SMTP_PORT`     | no       | `587`                    |
    /// | `SMTP_FROM`     | no       | `noreply@fileops.local`  |
    /// | `SMTP_USER`     | no       | —                        |
    /// | `SMTP_PASSWORD` | no       | —                        |
    pub fn from_env() -> Option<Self> {
        let smtp_host = std::env::var("SMTP_HOST").ok()?;
        Some(Self {
            smtp_host,
            smtp_port: std::env::var("SMTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(DEFAULT_SMTP_PORT),
            from_address: std::env::var("SMTP_FROM")
                .unwrap_or_else(|_| DEFAULT_FROM_ADDRESS.to_string()),
            smtp_user: std::env::var("SMTP_USER").ok(),
            smtp_password: std::env::var("SMTP_PASSWORD").ok(),
        })
    }
}

// ---------------------------------------------------------------------------
// SmtpEmailTransport
// ---------------------------------------------------------------------------

/// Sends email over SMTP via `lettre`.
pub struct SmtpEmailTransport {
    config: EmailConfig,
}

impl SmtpEmailTransport {
    pub fn new(config: EmailConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl EmailTransport for SmtpEmailTransport {
    async fn send(&self, message: &EmailMessage) -> Result<(), TransportError> {
        use lettre::message::{header::ContentType, MultiPart, SinglePart};
        use lettre::transport::smtp::authentication::Credentials;
        use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

        let builder = Message::builder()
            .from(
                self.config
                    .from_address
                    .parse()
                    .map_err(|e| TransportError::Address(format!("{e}")))?,
            )
            .to(message
                .to
                .parse()
                .map_err(|e| TransportError::Address(format!("{e}")))?)
            .subject(&message.subject);

        let email = match &message.html_body {
            Some(html) => builder
                .multipart(MultiPart::alternative_plain_html(
                    message.body.clone(),
                    html.clone(),
                ))
                .map_err(|e| TransportError::Build(e.to_string()))?,
            None => builder
                .header(ContentType::TEXT_PLAIN)
                .body(message.body.clone())
                .map_err(|e| TransportError::Build(e.to_string()))?,
        };

        let mut transport_builder =
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.config.smtp_host)
                .map_err(|e| TransportError::Smtp(e.to_string()))?
                .port(self.config.smtp_port);

        if let (Some(user), Some(pass)) = (&self.config.smtp_user, &self.config.smtp_password) {
            transport_builder =
                transport_builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }

        let mailer = transport_builder.build();
        mailer
            .send(email)
            .await
            .map_err(|e| TransportError::Smtp(e.to_string()))?;

        tracing::info!(to = %message.to, "Notification email sent");
        Ok(())
    }
}

/// Stand-in transport used when SMTP is not configured.
///
/// Every send fails, so email deliveries are recorded as failed rather than
/// silently dropped.
pub struct UnconfiguredTransport;

#[async_trait]
impl EmailTransport for UnconfiguredTransport {
    async fn send(&self, _message: &EmailMessage) -> Result<(), TransportError> {
        Err(TransportError::Smtp("SMTP transport not configured".into()))
    }
}

// ---------------------------------------------------------------------------
// EmailAdapter
// ---------------------------------------------------------------------------

/// Delivers notifications over email with exponential-backoff retry.
pub struct EmailAdapter {
    transport: Arc<dyn EmailTransport>,
    preferences: Arc<PreferenceService>,
    templates: Arc<TemplateRegistry>,
    deliveries: Arc<dyn DeliveryStore>,
    audit: AuditLogger,
    policy: RetryPolicy,
}

impl EmailAdapter {
    pub fn new(
        transport: Arc<dyn EmailTransport>,
        preferences: Arc<PreferenceService>,
        templates: Arc<TemplateRegistry>,
        deliveries: Arc<dyn DeliveryStore>,
        audit: AuditLogger,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            transport,
            preferences,
            templates,
            deliveries,
            audit,
            policy,
        }
    }

    /// Render subject/body via the template registry, falling back to the
    /// notification's raw title and message when no template applies.
    fn render_content(&self, notification: &Notification) -> Rendered {
        let template = notification
            .template_id
            .as_deref()
            .and_then(|id| self.templates.get(id))
            .or_else(|| self.templates.for_kind(notification.kind));

        match template {
            Some(t) => render(t, &notification.data),
            None => Rendered {
                subject: notification.title.clone(),
                body: notification.message.clone(),
                html_body: None,
            },
        }
    }

    /// Record a delivery that failed before any transport attempt.
    async fn fail_without_attempt(
        &self,
        notification: &Notification,
        reason: &str,
    ) -> ChannelOutcome {
        let now = Utc::now();
        let mut delivery =
            NotificationDelivery::pending(notification.id, Channel::Email, "", now);
        delivery.status = DeliveryStatus::Failed;
        delivery.failed_at = Some(now);
        delivery.error_message = Some(reason.to_string());

        if let Err(e) = self.deliveries.insert(delivery).await {
            tracing::error!(notification_id = %notification.id, error = %e, "Failed to record email delivery");
        }
        self.audit
            .record(
                notification.id,
                AuditAction::Failed,
                Some(Channel::Email),
                notification.user_id,
                notification.tenant_id,
                serde_json::json!({ "reason": reason }),
                &RequestContext::default(),
            )
            .await;

        ChannelOutcome::failed(reason)
    }
}

#[async_trait]
impl ChannelAdapter for EmailAdapter {
    fn channel(&self) -> Channel {
        Channel::Email
    }

    async fn deliver(&self, notification: &Notification) -> ChannelOutcome {
        let prefs = match self.preferences.load_or_default(notification.user_id).await {
            Ok(prefs) => prefs,
            Err(e) => return ChannelOutcome::failed(format!("Failed to load preferences: {e}")),
        };

        let Some(address) = prefs
            .channels
            .get(&Channel::Email)
            .and_then(|c| c.address.clone())
        else {
            return self
                .fail_without_attempt(notification, "no address configured")
                .await;
        };

        let rendered = self.render_content(notification);
        let message = EmailMessage {
            to: address.clone(),
            subject: rendered.subject,
            body: rendered.body,
            html_body: rendered.html_body,
        };

        let mut delivery =
            NotificationDelivery::pending(notification.id, Channel::Email, address, Utc::now());
        if let Err(e) = self.deliveries.insert(delivery.clone()).await {
            return ChannelOutcome::failed(format!("Failed to record email delivery: {e}"));
        }

        let mut last_error = String::new();
        for attempt in 1..=self.policy.max_attempts {
            delivery.attempts = attempt;
            delivery.last_attempt_at = Some(Utc::now());

            match self.transport.send(&message).await {
                Ok(()) => {
                    delivery.status = DeliveryStatus::Delivered;
                    delivery.delivered_at = Some(Utc::now());
                    delivery.error_message = None;
                    if let Err(e) = self.deliveries.update(delivery.clone()).await {
                        tracing::error!(delivery_id = %delivery.id, error = %e, "Failed to update email delivery");
                    }
                    self.audit
                        .record(
                            notification.id,
                            AuditAction::Delivered,
                            Some(Channel::Email),
                            notification.user_id,
                            notification.tenant_id,
                            serde_json::json!({ "attempts": attempt }),
                            &RequestContext::default(),
                        )
                        .await;
                    return ChannelOutcome::ok();
                }
                Err(e) => {
                    last_error = e.to_string();
                    delivery.error_message = Some(last_error.clone());
                    if let Err(e) = self.deliveries.update(delivery.clone()).await {
                        tracing::error!(delivery_id = %delivery.id, error = %e, "Failed to update email delivery");
                    }
                    tracing::warn!(
                        notification_id = %notification.id,
                        attempt,
                        max_attempts = self.policy.max_attempts,
                        error = %last_error,
                        "Email delivery attempt failed"
                    );
                    // Back off before the next attempt, not after the last.
                    if attempt < self.policy.max_attempts {
                        tokio::time::sleep(backoff::retry_delay(self.policy.base_delay, attempt))
                            .await;
                    }
                }
            }
        }

        delivery.status = DeliveryStatus::Failed;
        delivery.failed_at = Some(Utc::now());
        if let Err(e) = self.deliveries.update(delivery.clone()).await {
            tracing::error!(delivery_id = %delivery.id, error = %e, "Failed to update email delivery");
        }
        self.audit
            .record(
                notification.id,
                AuditAction::Failed,
                Some(Channel::Email),
                notification.user_id,
                notification.tenant_id,
                serde_json::json!({
                    "attempts": self.policy.max_attempts,
                    "error": last_error,
                }),
                &RequestContext::default(),
            )
            .await;

        ChannelOutcome::failed(last_error)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
