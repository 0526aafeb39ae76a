//! Route definitions.

pub mod health;

use axum::routing::{get, post, put};
use axum::Router;

use crate::handlers::{notifications, preferences, reports, webhooks};
use crate::state::AppState;
use crate::ws;

/// All `/api/v1` routes.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/notifications", notification_routes())
        .nest("/webhooks", webhook_routes())
        .nest("/reports", report_routes())
        .route("/ws", get(ws::handler::ws_handler))
}

/// Routes mounted at `/notifications`.
///
/// ```text
/// GET    /                                  -> list_notifications
/// GET    /unread-count                      -> unread_count
/// POST   /read-all                          -> mark_all_read
/// POST   /send                              -> send            (elevated)
/// POST   /send-bulk                         -> send_bulk       (elevated)
/// GET    /preferences                       -> get_preferences
/// PUT    /preferences                       -> update_preferences
/// POST   /preferences/reset                 -> reset_preferences
/// PUT    /preferences/channels/{channel}    -> set_channel
/// PUT    /preferences/quiet-hours           -> set_quiet_hours
/// PUT    /preferences/digest                -> set_digest
/// GET    /{id}                              -> get_notification
/// POST   /{id}/read                         -> mark_read
/// DELETE /{id}                              -> delete_notification
/// ```
fn notification_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(notifications::list_notifications))
        .route("/unread-count", get(notifications::unread_count))
        .route("/read-all", post(notifications::mark_all_read))
        .route("/send", post(notifications::send))
        .route("/send-bulk", post(notifications::send_bulk))
        .route(
            "/preferences",
            get(preferences::get_preferences).put(preferences::update_preferences),
        )
        .route("/preferences/reset", post(preferences::reset_preferences))
        .route(
            "/preferences/channels/{channel}",
            put(preferences::set_channel),
        )
        .route("/preferences/quiet-hours", put(preferences::set_quiet_hours))
        .route("/preferences/digest", put(preferences::set_digest))
        .route(
            "/{id}",
            get(notifications::get_notification).delete(notifications::delete_notification),
        )
        .route("/{id}/read", post(notifications::mark_read))
}

/// Routes mounted at `/webhooks`.
fn webhook_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(webhooks::list_webhooks).post(webhooks::create_webhook),
        )
        .route(
            "/{id}",
            get(webhooks::get_webhook)
                .put(webhooks::update_webhook)
                .delete(webhooks::delete_webhook),
        )
        .route("/{id}/test", post(webhooks::test_webhook))
        .route(
            "/{id}/regenerate-secret",
            post(webhooks::regenerate_secret),
        )
}

/// Routes mounted at `/reports`.
fn report_routes() -> Router<AppState> {
    Router::new()
        .route("/delivery-stats", get(reports::delivery_stats))
        .route("/history", get(reports::history))
        .route("/audit/{notification_id}", get(reports::audit_trail))
        .route("/retry-failed", post(reports::retry_failed))
}
