//! Retry policy for optimistic-concurrency conflicts.

use std::time::Duration;

use rand::Rng;

/// Configuration for the conditional-write retry loop.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first (1 = no retries).
    pub max_attempts: u32,
    /// Base delay in milliseconds before the first retry.
    pub base_delay_ms: u64,
    /// Upper bound (inclusive) of the uniform jitter added to each delay.
    /// Zero disables jitter.
    pub jitter_ceiling_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 50,
            jitter_ceiling_ms: 100,
        }
    }
}

impl RetryPolicy {
    /// Delay to sleep before retry number `retry` (1-based).
    ///
    /// Exponential: `base * 2^(retry-1)`, plus uniform jitter in
    /// `0..=jitter_ceiling_ms` so concurrent losers do not retry in lockstep.
    pub fn delay_before_retry(&self, retry: u32) -> Duration {
        let exponential = self
            .base_delay_ms
            .saturating_mul(2u64.saturating_pow(retry.saturating_sub(1)));
        let jitter = if self.jitter_ceiling_ms > 0 {
            rand::thread_rng().gen_range(0..=self.jitter_ceiling_ms)
        } else {
            0
        };
        Duration::from_millis(exponential.saturating_add(jitter))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delay_schedule_without_jitter() {
        let policy = RetryPolicy {
            max_attempts: 4,
            base_delay_ms: 50,
            jitter_ceiling_ms: 0,
        };
        assert_eq!(policy.delay_before_retry(1), Duration::from_millis(50));
        assert_eq!(policy.delay_before_retry(2), Duration::from_millis(100));
        assert_eq!(policy.delay_before_retry(3), Duration::from_millis(200));
    }

    #[test]
    fn test_jitter_stays_within_ceiling() {
        let policy = RetryPolicy {
            max_attempts: 3,
            base_delay_ms: 50,
            jitter_ceiling_ms: 100,
        };
        for _ in 0..100 {
            let delay = policy.delay_before_retry(1).as_millis() as u64;
            assert!((50..=150).contains(&delay));
        }
    }

    #[test]
    fn test_default_matches_documented_schedule() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.base_delay_ms, 50);
        assert_eq!(policy.jitter_ceiling_ms, 100);
    }
}
