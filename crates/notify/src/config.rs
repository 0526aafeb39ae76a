use std::time::Duration;

use crate::adapter::RetryPolicy;

/// Engine tuning knobs loaded from environment variables.
///
/// All fields have defaults suitable for local development; override via
/// environment variables in production.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Maximum delivery attempts per external transport (default: `3`).
    pub retry_attempts: u32,
    /// Base delay for exponential backoff in milliseconds (default: `1000`).
    pub retry_base_delay_ms: u64,
    /// Per-request webhook timeout in seconds (default: `30`).
    pub webhook_timeout_secs: u64,
    /// Users per concurrently-dispatched bulk send chunk (default: `100`).
    pub bulk_batch_size: usize,
    /// Expiry sweep interval in seconds (default: `3600`).
    pub sweep_interval_secs: u64,
}

impl EngineConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                      | Default |
    /// |------------------------------|---------|
    /// | `NOTIFY_RETRY_ATTEMPTS`      | `3`     |
    /// | `NOTIFY_RETRY_BASE_DELAY_MS` | `1000`  |
    /// | `NOTIFY_WEBHOOK_TIMEOUT_SECS`| `30`    |
    /// | `NOTIFY_BULK_BATCH_SIZE`     | `100`   |
    /// | `NOTIFY_SWEEP_INTERVAL_SECS` | `3600`  |
    pub fn from_env() -> Self {
        Self {
            retry_attempts: env_or("NOTIFY_RETRY_ATTEMPTS", 3),
            retry_base_delay_ms: env_or("NOTIFY_RETRY_BASE_DELAY_MS", 1000),
            webhook_timeout_secs: env_or("NOTIFY_WEBHOOK_TIMEOUT_SECS", 30),
            bulk_batch_size: env_or("NOTIFY_BULK_BATCH_SIZE", 100),
            sweep_interval_secs: env_or("NOTIFY_SWEEP_INTERVAL_SECS", 3600),
        }
    }

    /// Retry policy shared by the email and webhook adapters.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.retry_attempts.max(1),
            base_delay: Duration::from_millis(self.retry_base_delay_ms),
        }
    }

    pub fn webhook_timeout(&self) -> Duration {
        Duration::from_secs(self.webhook_timeout_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            retry_attempts: 3,
            retry_base_delay_ms: 1000,
            webhook_timeout_secs: 30,
            bulk_batch_size: 100,
            sweep_interval_secs: 3600,
        }
    }
}

fn env_or<T: std::str::FromStr>(var: &str, default: T) -> T {
    std::env::var(var)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = EngineConfig::default();
        assert_eq!(config.retry_attempts, 3);
        assert_eq!(config.retry_base_delay_ms, 1000);
        assert_eq!(config.webhook_timeout_secs, 30);
        assert_eq!(config.bulk_batch_size, 100);
    }

    #[test]
    fn retry_policy_never_allows_zero_attempts() {
        let config = EngineConfig {
            retry_attempts: 0,
            ..Default::default()
        };
        assert_eq!(config.retry_policy().max_attempts, 1);
    }
}
