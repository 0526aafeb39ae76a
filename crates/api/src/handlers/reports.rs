//! Handlers for the `/reports` resource: delivery stats, history, audit
//! trails, and the retry-failed operation.

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use fileops_store::models::Timestamp;

use crate::error::AppResult;
use crate::middleware::auth::{AuthUser, ClientInfo};
use crate::response::DataResponse;
use crate::state::AppState;

/// Maximum page size for history listing.
const MAX_LIMIT: usize = 200;

/// Default page size for history listing.
const DEFAULT_LIMIT: usize = 50;

/// Query parameters for `GET /reports/delivery-stats`.
#[derive(Debug, Deserialize)]
pub struct StatsQuery {
    pub from: Option<Timestamp>,
    pub to: Option<Timestamp>,
}

/// Query parameters for `GET /reports/history`.
#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

/// GET /api/v1/reports/delivery-stats
pub async fn delivery_stats(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<StatsQuery>,
) -> AppResult<impl IntoResponse> {
    let stats = state
        .tracking
        .delivery_stats(auth.user_id, params.from, params.to)
        .await?;
    Ok(Json(DataResponse { data: stats }))
}

/// GET /api/v1/reports/history
pub async fn history(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<HistoryQuery>,
) -> AppResult<impl IntoResponse> {
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT);
    let offset = params.offset.unwrap_or(0);
    let entries = state.tracking.history(auth.user_id, limit, offset).await?;
    Ok(Json(DataResponse { data: entries }))
}

/// GET /api/v1/reports/audit/{notification_id}
///
/// Ownership-checked: a foreign notification id reads as 404.
pub async fn audit_trail(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(notification_id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let entries = state
        .tracking
        .audit_trail(notification_id, auth.user_id)
        .await?;
    Ok(Json(DataResponse { data: entries }))
}

/// POST /api/v1/reports/retry-failed
///
/// Flips failed deliveries with remaining attempt budget back to pending.
/// Re-delivery is driven externally; this only resets state.
pub async fn retry_failed(
    auth: AuthUser,
    ClientInfo(ctx): ClientInfo,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let reset = state.tracking.retry_all_failed(auth.user_id, &ctx).await?;
    Ok(Json(serde_json::json!({ "data": { "reset": reset } })))
}
