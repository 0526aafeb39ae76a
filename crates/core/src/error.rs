use uuid::Uuid;

/// Domain error taxonomy for the notification engine.
///
/// Transient transport failures are deliberately absent: they are retried
/// inside the channel adapters and reported through per-channel delivery
/// results, never raised to callers of `send`.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// The user has globally opted out of notifications.
    #[error("Notifications are disabled for user {user_id}")]
    NotificationsDisabled { user_id: Uuid },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: Uuid },

    #[error("Internal error: {0}")]
    Internal(String),
}
