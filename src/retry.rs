//! Exponential backoff for retrying corpus failures.

use std::time::Duration;

/// How many times, and how far apart, a failed attempt is retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of automatic retries.
    pub ceiling: u32,
    /// Delay before the first retry; doubled for each further one.
    pub base_delay: Duration,
    /// Upper bound on any single delay, jitter included.
    pub max_delay: Duration,
    /// Add up to 50% random jitter to each delay.
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            ceiling: 3,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(5),
            jitter: true,
        }
    }
}

impl RetryPolicy {
    /// Whether a job that has already been retried `retry_count` times may
    /// be retried again.
    pub fn allows(&self, retry_count: u32) -> bool {
        retry_count < self.ceiling
    }

    /// Delay before retry number `retry` (1-based).
    pub fn delay_for(&self, retry: u32) -> Duration {
        let base = self.base_delay.as_millis() as u64;
        let max = self.max_delay.as_millis() as u64;
        let exponent = retry.saturating_sub(1).min(32);
        let exponential = base.saturating_mul(1u64 << exponent);
        let delay = exponential.min(max);

        if self.jitter && delay > 0 {
            let jitter = fastrand::u64(0..=delay / 2);
            Duration::from_millis(delay.saturating_add(jitter).min(max))
        } else {
            Duration::from_millis(delay)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixed() -> RetryPolicy {
        RetryPolicy {
            jitter: false,
            ..Default::default()
        }
    }

    #[test]
    fn delays_double_from_base() {
        let policy = fixed();
        assert_eq!(policy.delay_for(1), Duration::from_millis(100));
        assert_eq!(policy.delay_for(2), Duration::from_millis(200));
        assert_eq!(policy.delay_for(3), Duration::from_millis(400));
    }

    #[test]
    fn delays_are_capped() {
        let policy = fixed();
        assert_eq!(policy.delay_for(7), Duration::from_secs(5));
        assert_eq!(policy.delay_for(u32::MAX), Duration::from_secs(5));
    }

    #[test]
    fn jitter_stays_within_half_and_cap() {
        let policy = RetryPolicy::default();
        for _ in 0..100 {
            let d = policy.delay_for(2);
            assert!(d >= Duration::from_millis(200));
            assert!(d <= Duration::from_millis(300));
        }
        for _ in 0..20 {
            assert!(policy.delay_for(10) <= Duration::from_secs(5));
        }
    }

    #[test]
    fn ceiling_bounds_retries() {
        let policy = fixed();
        assert!(policy.allows(0));
        assert!(policy.allows(2));
        assert!(!policy.allows(3));
        let none = RetryPolicy {
            ceiling: 0,
            ..fixed()
        };
        assert!(!none.allows(0));
    }
}
