//! Handlers for the `/notifications` resource.
//!
//! All endpoints require authentication; `send` and `send-bulk` require an
//! elevated role.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use fileops_core::{Channel, NotificationKind, Priority};
use fileops_store::models::{NotificationFilter, Timestamp};
use fileops_notify::SendRequest;

use crate::error::AppResult;
use crate::middleware::auth::{AuthUser, ClientInfo, RequireElevated};
use crate::response::DataResponse;
use crate::state::AppState;

/// Maximum page size for notification listing.
const MAX_LIMIT: usize = 100;

/// Default page size for notification listing.
const DEFAULT_LIMIT: usize = 50;

// ---------------------------------------------------------------------------
// Query / body types
// ---------------------------------------------------------------------------

/// Query parameters for `GET /notifications`.
#[derive(Debug, Deserialize)]
pub struct NotificationQuery {
    /// If `true`, return only unread notifications. Defaults to `false`.
    pub unread_only: Option<bool>,
    /// Restrict to one notification kind.
    pub kind: Option<NotificationKind>,
    /// Maximum number of results. Defaults to 50, capped at 100.
    pub limit: Option<usize>,
    /// Number of results to skip. Defaults to 0.
    pub offset: Option<usize>,
}

/// Body for `POST /notifications/send`.
#[derive(Debug, Deserialize)]
pub struct SendBody {
    pub user_id: Uuid,
    pub tenant_id: Option<Uuid>,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub data: Option<serde_json::Value>,
    pub priority: Option<Priority>,
    pub channels: Option<Vec<Channel>>,
    pub template_id: Option<String>,
    pub expires_at: Option<Timestamp>,
}

impl SendBody {
    fn into_request(self) -> SendRequest {
        SendRequest {
            user_id: self.user_id,
            tenant_id: self.tenant_id,
            kind: self.kind,
            title: self.title,
            message: self.message,
            data: self.data,
            priority: self.priority,
            channels: self.channels,
            template_id: self.template_id,
            expires_at: self.expires_at,
        }
    }
}

/// Body for `POST /notifications/send-bulk`.
#[derive(Debug, Deserialize)]
pub struct SendBulkBody {
    pub user_ids: Vec<Uuid>,
    #[serde(flatten)]
    pub notification: SendBulkTemplate,
}

/// The per-user template part of a bulk send.
#[derive(Debug, Deserialize)]
pub struct SendBulkTemplate {
    pub tenant_id: Option<Uuid>,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub data: Option<serde_json::Value>,
    pub priority: Option<Priority>,
    pub channels: Option<Vec<Channel>>,
    pub template_id: Option<String>,
    pub expires_at: Option<Timestamp>,
}

// ---------------------------------------------------------------------------
// Read side
// ---------------------------------------------------------------------------

/// GET /api/v1/notifications
pub async fn list_notifications(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<NotificationQuery>,
) -> AppResult<impl IntoResponse> {
    let filter = NotificationFilter {
        unread_only: params.unread_only.unwrap_or(false),
        kind: params.kind,
        limit: params.limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT),
        offset: params.offset.unwrap_or(0),
    };
    let notifications = state.service.get_notifications(auth.user_id, &filter).await?;
    Ok(Json(DataResponse {
        data: notifications,
    }))
}

/// GET /api/v1/notifications/{id}
///
/// Returns 404 when the notification does not exist or belongs to a
/// different user.
pub async fn get_notification(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let notification = state.service.get_notification(id, auth.user_id).await?;
    Ok(Json(DataResponse { data: notification }))
}

/// GET /api/v1/notifications/unread-count
pub async fn unread_count(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let count = state.service.get_unread_count(auth.user_id).await?;
    Ok(Json(serde_json::json!({ "data": { "count": count } })))
}

/// POST /api/v1/notifications/{id}/read
///
/// Idempotent: marking an already-read notification is a no-op success.
pub async fn mark_read(
    auth: AuthUser,
    ClientInfo(ctx): ClientInfo,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let notification = state.service.mark_as_read(id, auth.user_id, &ctx).await?;
    Ok(Json(DataResponse { data: notification }))
}

/// POST /api/v1/notifications/read-all
pub async fn mark_all_read(
    auth: AuthUser,
    ClientInfo(ctx): ClientInfo,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let count = state.service.mark_all_as_read(auth.user_id, &ctx).await?;
    Ok(Json(serde_json::json!({ "data": { "marked_read": count } })))
}

/// DELETE /api/v1/notifications/{id}
pub async fn delete_notification(
    auth: AuthUser,
    ClientInfo(ctx): ClientInfo,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    state
        .service
        .delete_notification(id, auth.user_id, &ctx)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Send (elevated)
// ---------------------------------------------------------------------------

/// POST /api/v1/notifications/send
pub async fn send(
    RequireElevated(caller): RequireElevated,
    State(state): State<AppState>,
    Json(body): Json<SendBody>,
) -> AppResult<impl IntoResponse> {
    let outcome = state.service.send(body.into_request()).await?;

    tracing::info!(
        notification_id = %outcome.notification.id,
        user_id = %outcome.notification.user_id,
        sender = %caller.user_id,
        "Notification sent"
    );

    Ok((StatusCode::CREATED, Json(DataResponse { data: outcome })))
}

/// POST /api/v1/notifications/send-bulk
pub async fn send_bulk(
    RequireElevated(caller): RequireElevated,
    State(state): State<AppState>,
    Json(body): Json<SendBulkBody>,
) -> AppResult<impl IntoResponse> {
    let template = SendRequest {
        user_id: Uuid::nil(),
        tenant_id: body.notification.tenant_id,
        kind: body.notification.kind,
        title: body.notification.title,
        message: body.notification.message,
        data: body.notification.data,
        priority: body.notification.priority,
        channels: body.notification.channels,
        template_id: body.notification.template_id,
        expires_at: body.notification.expires_at,
    };
    let outcome = state.service.send_bulk(&body.user_ids, template).await?;

    tracing::info!(
        sent = outcome.sent,
        failed = outcome.failed,
        sender = %caller.user_id,
        "Bulk notification send completed"
    );

    Ok(Json(DataResponse { data: outcome }))
}
