//! Webhook registration management.
//!
//! CRUD over [`WebhookRegistration`] records plus connectivity testing and
//! secret rotation. Secrets are generated server-side and returned exactly
//! once on create/rotate; stored registrations never serialize them.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use fileops_core::{signing, CoreError, NotificationKind};
use fileops_store::models::WebhookRegistration;
use fileops_store::WebhookStore;

use crate::adapter::webhook::{
    DELIVERY_ID_HEADER, EVENT_TYPE_HEADER, SIGNATURE_HEADER, WEBHOOK_ID_HEADER,
};
use crate::error::EngineResult;

// ---------------------------------------------------------------------------
// DTOs
// ---------------------------------------------------------------------------

/// Input for registering a webhook.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateWebhook {
    pub url: String,
    pub events: Vec<NotificationKind>,
    pub tenant_id: Option<Uuid>,
    pub headers: Option<HashMap<String, String>>,
    pub active: Option<bool>,
}

/// Input for updating a webhook. Absent fields are kept.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateWebhook {
    pub url: Option<String>,
    pub events: Option<Vec<NotificationKind>>,
    pub headers: Option<HashMap<String, String>>,
    pub active: Option<bool>,
}

/// A registration plus its plaintext secret, returned exactly once.
#[derive(Debug, Serialize)]
pub struct WebhookWithSecret {
    #[serde(flatten)]
    pub registration: WebhookRegistration,
    /// The signing secret. Shown once; never stored in responses afterwards.
    pub secret: String,
}

/// Outcome of a connectivity test. Transport errors and non-2xx responses
/// are reported here, never raised.
#[derive(Debug, Serialize)]
pub struct WebhookTest {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

// ---------------------------------------------------------------------------
// WebhookService
// ---------------------------------------------------------------------------

/// Management surface over webhook registrations.
pub struct WebhookService {
    store: Arc<dyn WebhookStore>,
    client: reqwest::Client,
}

impl WebhookService {
    pub fn new(store: Arc<dyn WebhookStore>, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to build reqwest HTTP client");
        Self { store, client }
    }

    /// Register a new webhook with a freshly generated secret.
    pub async fn create(
        &self,
        user_id: Uuid,
        input: CreateWebhook,
    ) -> EngineResult<WebhookWithSecret> {
        let url = input.url.trim().to_string();
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(
                CoreError::Validation("url must be an http(s) endpoint".into()).into(),
            );
        }
        if input.events.is_empty() {
            return Err(
                CoreError::Validation("events must not be empty".into()).into(),
            );
        }

        let now = Utc::now();
        let secret = signing::generate_secret();
        let registration = WebhookRegistration {
            id: Uuid::new_v4(),
            user_id,
            tenant_id: input.tenant_id,
            url,
            secret: secret.clone(),
            events: input.events,
            active: input.active.unwrap_or(true),
            headers: input.headers.unwrap_or_default(),
            failure_count: 0,
            last_delivery_at: None,
            last_delivery_status: None,
            created_at: now,
            updated_at: now,
        };
        self.store.insert(registration.clone()).await?;

        tracing::info!(webhook_id = %registration.id, url = %registration.url, "Webhook created");
        Ok(WebhookWithSecret {
            registration,
            secret,
        })
    }

    pub async fn list(&self, user_id: Uuid) -> EngineResult<Vec<WebhookRegistration>> {
        Ok(self.store.list_for_user(user_id).await?)
    }

    /// Fetch one registration, treating another user's record as absent.
    pub async fn get(&self, id: Uuid, user_id: Uuid) -> EngineResult<WebhookRegistration> {
        self.store
            .get(id)
            .await?
            .filter(|w| w.user_id == user_id)
            .ok_or_else(|| {
                CoreError::NotFound {
                    entity: "Webhook",
                    id,
                }
                .into()
            })
    }

    /// Apply a partial update. Reactivating via `active: true` also clears
    /// the failure count so the endpoint gets a fresh disable budget.
    pub async fn update(
        &self,
        id: Uuid,
        user_id: Uuid,
        input: UpdateWebhook,
    ) -> EngineResult<WebhookRegistration> {
        let mut registration = self.get(id, user_id).await?;

        if let Some(url) = input.url {
            let url = url.trim().to_string();
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(
                    CoreError::Validation("url must be an http(s) endpoint".into()).into(),
                );
            }
            registration.url = url;
        }
        if let Some(events) = input.events {
            if events.is_empty() {
                return Err(
                    CoreError::Validation("events must not be empty".into()).into(),
                );
            }
            registration.events = events;
        }
        if let Some(headers) = input.headers {
            registration.headers = headers;
        }
        if let Some(active) = input.active {
            registration.active = active;
            if active {
                registration.failure_count = 0;
            }
        }
        registration.updated_at = Utc::now();

        self.store.update(registration.clone()).await?;
        Ok(registration)
    }

    /// Ownership-checked delete.
    pub async fn delete(&self, id: Uuid, user_id: Uuid) -> EngineResult<()> {
        if !self.store.delete(id, user_id).await? {
            return Err(CoreError::NotFound {
                entity: "Webhook",
                id,
            }
            .into());
        }
        tracing::info!(webhook_id = %id, "Webhook deleted");
        Ok(())
    }

    /// Rotate the signing secret, returning the new plaintext once.
    pub async fn regenerate_secret(
        &self,
        id: Uuid,
        user_id: Uuid,
    ) -> EngineResult<WebhookWithSecret> {
        let mut registration = self.get(id, user_id).await?;
        let secret = signing::generate_secret();
        registration.secret = secret.clone();
        registration.updated_at = Utc::now();
        self.store.update(registration.clone()).await?;

        tracing::info!(webhook_id = %id, "Webhook secret regenerated");
        Ok(WebhookWithSecret {
            registration,
            secret,
        })
    }

    /// POST a signed synthetic payload to verify connectivity.
    ///
    /// Single attempt, no retry. A non-2xx response or transport error is
    /// reported in the returned [`WebhookTest`], not raised.
    pub async fn test(&self, id: Uuid, user_id: Uuid) -> EngineResult<WebhookTest> {
        let registration = self.get(id, user_id).await?;

        let delivery_id = Uuid::new_v4();
        let payload = serde_json::json!({
            "id": delivery_id,
            "type": "webhook.test",
            "timestamp": Utc::now(),
            "data": {
                "webhookId": registration.id,
                "message": "Test delivery to verify webhook connectivity.",
            },
        });
        let body = payload.to_string();
        let signature = signing::signature_header(&registration.secret, &body);

        let mut request = self
            .client
            .post(&registration.url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .header(SIGNATURE_HEADER, signature)
            .header(WEBHOOK_ID_HEADER, registration.id.to_string())
            .header(DELIVERY_ID_HEADER, delivery_id.to_string())
            .header(EVENT_TYPE_HEADER, "webhook.test");
        for (name, value) in &registration.headers {
            request = request.header(name.as_str(), value.as_str());
        }

        match request.body(body).send().await {
            Ok(response) => {
                let status = response.status().as_u16();
                Ok(WebhookTest {
                    success: response.status().is_success(),
                    status_code: Some(status),
                    error: None,
                })
            }
            Err(e) => Ok(WebhookTest {
                success: false,
                status_code: None,
                error: Some(e.to_string()),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
