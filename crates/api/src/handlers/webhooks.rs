//! Handlers for the `/webhooks` resource.
//!
//! Registrations are user-owned; every lookup is ownership-checked and a
//! foreign id reads as 404. Secrets appear in responses only on create and
//! regenerate.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use uuid::Uuid;

use fileops_notify::webhooks::{CreateWebhook, UpdateWebhook};

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// POST /api/v1/webhooks
pub async fn create_webhook(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(mut input): Json<CreateWebhook>,
) -> AppResult<impl IntoResponse> {
    // Default the registration's tenant to the caller's tenant.
    input.tenant_id = input.tenant_id.or(auth.tenant_id);
    let created = state.webhooks.create(auth.user_id, input).await?;

    tracing::info!(
        webhook_id = %created.registration.id,
        user_id = %auth.user_id,
        "Webhook created"
    );

    Ok((StatusCode::CREATED, Json(DataResponse { data: created })))
}

/// GET /api/v1/webhooks
pub async fn list_webhooks(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let webhooks = state.webhooks.list(auth.user_id).await?;
    Ok(Json(DataResponse { data: webhooks }))
}

/// GET /api/v1/webhooks/{id}
pub async fn get_webhook(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let webhook = state.webhooks.get(id, auth.user_id).await?;
    Ok(Json(DataResponse { data: webhook }))
}

/// PUT /api/v1/webhooks/{id}
pub async fn update_webhook(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateWebhook>,
) -> AppResult<impl IntoResponse> {
    let webhook = state.webhooks.update(id, auth.user_id, input).await?;

    tracing::info!(webhook_id = %id, user_id = %auth.user_id, "Webhook updated");

    Ok(Json(DataResponse { data: webhook }))
}

/// DELETE /api/v1/webhooks/{id}
pub async fn delete_webhook(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    state.webhooks.delete(id, auth.user_id).await?;

    tracing::info!(webhook_id = %id, user_id = %auth.user_id, "Webhook deleted");

    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/webhooks/{id}/test
///
/// Sends a signed synthetic payload; transport failures and non-2xx
/// responses are reported in the body, not as errors.
pub async fn test_webhook(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let result = state.webhooks.test(id, auth.user_id).await?;
    Ok(Json(DataResponse { data: result }))
}

/// POST /api/v1/webhooks/{id}/regenerate-secret
pub async fn regenerate_secret(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let rotated = state.webhooks.regenerate_secret(id, auth.user_id).await?;

    tracing::info!(webhook_id = %id, user_id = %auth.user_id, "Webhook secret regenerated");

    Ok(Json(DataResponse { data: rotated }))
}
