//! Retry delay computation for external-transport channels.

use std::time::Duration;

/// Cap on any single backoff delay.
pub const MAX_DELAY: Duration = Duration::from_secs(3600);

/// Compute the delay before retry attempt `attempt` (1-based).
///
/// Follows `base * 2^(attempt-1)`, capped at [`MAX_DELAY`]. Attempt 0 is
/// treated as attempt 1 so callers counting from zero do not underflow.
pub fn retry_delay(base: Duration, attempt: u32) -> Duration {
    let exponent = attempt.saturating_sub(1).min(20);
    let delay = base.saturating_mul(1u32 << exponent);
    delay.min(MAX_DELAY)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn doubles_per_attempt() {
        let base = Duration::from_secs(1);
        assert_eq!(retry_delay(base, 1), Duration::from_secs(1));
        assert_eq!(retry_delay(base, 2), Duration::from_secs(2));
        assert_eq!(retry_delay(base, 3), Duration::from_secs(4));
        assert_eq!(retry_delay(base, 4), Duration::from_secs(8));
    }

    #[test]
    fn attempt_zero_equals_attempt_one() {
        let base = Duration::from_millis(500);
        assert_eq!(retry_delay(base, 0), retry_delay(base, 1));
    }

    #[test]
    fn is_capped() {
        assert_eq!(retry_delay(Duration::from_secs(1), 30), MAX_DELAY);
    }

    #[test]
    fn sub_second_base() {
        let base = Duration::from_millis(250);
        assert_eq!(retry_delay(base, 3), Duration::from_secs(1));
    }
}
