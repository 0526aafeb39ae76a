//! Health check route, mounted at the root (not under `/api/v1`).

use axum::routing::get;
use axum::{Json, Router};

use crate::state::AppState;

/// GET /healthz
async fn healthz() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/healthz", get(healthz))
}
