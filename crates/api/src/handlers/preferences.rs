//! Handlers for the `/notifications/preferences` resource.

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;

use fileops_core::Channel;
use fileops_store::models::{DigestSettings, PreferencesUpdate, QuietHours};

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// Body for `PUT /preferences/channels/{channel}`.
#[derive(Debug, Deserialize)]
pub struct ChannelToggle {
    pub enabled: bool,
}

/// GET /api/v1/notifications/preferences
///
/// Returns the stored preferences, default-constructed on first read.
pub async fn get_preferences(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let prefs = state.preferences.load_or_default(auth.user_id).await?;
    Ok(Json(DataResponse { data: prefs }))
}

/// PUT /api/v1/notifications/preferences
///
/// Per-section partial update: each provided section replaces its previous
/// value wholesale; omitted sections are kept.
pub async fn update_preferences(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(update): Json<PreferencesUpdate>,
) -> AppResult<impl IntoResponse> {
    let prefs = state.preferences.update(auth.user_id, update).await?;
    Ok(Json(DataResponse { data: prefs }))
}

/// POST /api/v1/notifications/preferences/reset
pub async fn reset_preferences(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let prefs = state.preferences.reset(auth.user_id).await?;
    Ok(Json(DataResponse { data: prefs }))
}

/// PUT /api/v1/notifications/preferences/channels/{channel}
///
/// Enable or disable one channel without touching its address.
pub async fn set_channel(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(channel): Path<String>,
    Json(toggle): Json<ChannelToggle>,
) -> AppResult<impl IntoResponse> {
    let channel: Channel = channel
        .parse()
        .map_err(|e: String| AppError::BadRequest(e))?;
    let prefs = state
        .preferences
        .set_channel_enabled(auth.user_id, channel, toggle.enabled)
        .await?;
    Ok(Json(DataResponse { data: prefs }))
}

/// PUT /api/v1/notifications/preferences/quiet-hours
pub async fn set_quiet_hours(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(quiet_hours): Json<QuietHours>,
) -> AppResult<impl IntoResponse> {
    let prefs = state
        .preferences
        .set_quiet_hours(auth.user_id, quiet_hours)
        .await?;
    Ok(Json(DataResponse { data: prefs }))
}

/// PUT /api/v1/notifications/preferences/digest
pub async fn set_digest(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(digest): Json<DigestSettings>,
) -> AppResult<impl IntoResponse> {
    let prefs = state.preferences.set_digest(auth.user_id, digest).await?;
    Ok(Json(DataResponse { data: prefs }))
}
