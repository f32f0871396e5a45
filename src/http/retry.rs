//! Retry policy for transient failures.
//!
//! Statuses 429, 500, 502, 503 and 504 are retried, as are timeouts and
//! connection failures. Other statuses fail on the first response.
//!
//! Backoff doubles per retry: `base * 2^(retry - 1)`, so 1 s → 2 s → 4 s with
//! the default 1 s base. A `Retry-After` header raises the delay to at least
//! the server's value. Every delay is capped at `max_delay`.

use crate::config::ClientConfig;
use std::time::Duration;
use tracing::debug;

/// HTTP statuses that are worth retrying.
pub const RETRYABLE_STATUSES: [u16; 5] = [429, 500, 502, 503, 504];

pub fn is_retryable_status(status: u16) -> bool {
    RETRYABLE_STATUSES.contains(&status)
}

/// Retry configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts allowed after the first.
    pub max_retries: u32,
    /// Delay before the first retry.
    pub base_delay: Duration,
    /// Ceiling for any single delay.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&ClientConfig::default())
    }
}

impl RetryPolicy {
    pub fn from_config(config: &ClientConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            base_delay: Duration::from_millis(config.retry_backoff_ms),
            max_delay: Duration::from_millis(config.max_backoff_ms),
        }
    }

    /// Whether another attempt is allowed after `attempts_made` attempts.
    pub fn can_retry(&self, attempts_made: u32) -> bool {
        attempts_made <= self.max_retries
    }

    /// Delay before retry number `retry` (1-based).
    pub fn delay_for(&self, retry: u32, retry_after: Option<Duration>) -> Duration {
        let exp = 1u32 << retry.saturating_sub(1).min(16);
        let backoff = self.base_delay.saturating_mul(exp);
        let delay = match retry_after {
            Some(server) if server > backoff => server,
            _ => backoff,
        };
        let capped = delay.min(self.max_delay);
        debug!(retry, delay_ms = capped.as_millis() as u64, "scheduling retry");
        capped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> RetryPolicy {
        RetryPolicy {
            max_retries: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(120),
        }
    }

    #[test]
    fn retryable_statuses() {
        for s in [429, 500, 502, 503, 504] {
            assert!(is_retryable_status(s), "{s}");
        }
        for s in [400, 401, 403, 404, 422, 501] {
            assert!(!is_retryable_status(s), "{s}");
        }
    }

    #[test]
    fn delay_doubles() {
        let p = policy();
        assert_eq!(p.delay_for(1, None), Duration::from_secs(1));
        assert_eq!(p.delay_for(2, None), Duration::from_secs(2));
        assert_eq!(p.delay_for(3, None), Duration::from_secs(4));
    }

    #[test]
    fn delay_capped_at_max() {
        let p = RetryPolicy {
            max_delay: Duration::from_secs(10),
            ..policy()
        };
        assert_eq!(p.delay_for(30, None), Duration::from_secs(10));
    }

    #[test]
    fn retry_after_raises_delay() {
        let p = policy();
        assert_eq!(
            p.delay_for(1, Some(Duration::from_secs(7))),
            Duration::from_secs(7)
        );
        // a shorter server hint never shortens the backoff
        assert_eq!(
            p.delay_for(3, Some(Duration::from_secs(1))),
            Duration::from_secs(4)
        );
    }

    #[test]
    fn retry_budget() {
        let p = policy();
        assert!(p.can_retry(1));
        assert!(p.can_retry(3));
        assert!(!p.can_retry(4));
    }

    #[test]
    fn from_config_uses_knobs() {
        let c = ClientConfig::builder()
            .max_retries(5)
            .retry_backoff_ms(250)
            .build()
            .unwrap();
        let p = RetryPolicy::from_config(&c);
        assert_eq!(p.max_retries, 5);
        assert_eq!(p.base_delay, Duration::from_millis(250));
    }
}
