pub mod notifications;
pub mod preferences;
pub mod reports;
pub mod webhooks;
