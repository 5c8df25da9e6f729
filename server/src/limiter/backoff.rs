//! Jittered exponential backoff for provider retries.

use std::time::Duration;

/// Computes the wait between retry attempts. A server-supplied retry hint
/// always wins (capped at `max_delay`); otherwise the delay doubles per
/// attempt with uniform random jitter stacked on top so concurrent callers
/// do not retry in lockstep.
#[derive(Debug, Clone)]
pub struct BackoffPolicy {
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub jitter_factor: f64,
}

impl BackoffPolicy {
    pub fn new(base_delay: Duration, max_delay: Duration, jitter_factor: f64) -> Self {
        Self {
            base_delay,
            max_delay,
            jitter_factor,
        }
    }

    /// Delay before retrying after the failure of `attempt` (0-indexed).
    pub fn delay_for_attempt(&self, attempt: u32, retry_after_secs: Option<u64>) -> Duration {
        self.delay_with_jitter_unit(attempt, retry_after_secs, rand::random::<f64>())
    }

    /// Same computation with the random jitter unit (`0.0..1.0`) injected.
    fn delay_with_jitter_unit(
        &self,
        attempt: u32,
        retry_after_secs: Option<u64>,
        jitter_unit: f64,
    ) -> Duration {
        if let Some(secs) = retry_after_secs {
            if secs > 0 {
                return Duration::from_secs(secs).min(self.max_delay);
            }
        }

        let base_ms = self.base_delay.as_millis() as u64;
        let exponential = 2u64
            .checked_pow(attempt)
            .and_then(|factor| base_ms.checked_mul(factor))
            .unwrap_or(u64::MAX);
        let capped = exponential.min(self.max_delay.as_millis() as u64);
        let jitter = (capped as f64 * self.jitter_factor * jitter_unit) as u64;

        Duration::from_millis(capped.saturating_add(jitter))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> BackoffPolicy {
        BackoffPolicy::new(Duration::from_millis(100), Duration::from_secs(30), 0.3)
    }

    #[test]
    fn test_delay_is_exponential() {
        let policy = policy();
        assert_eq!(
            policy.delay_with_jitter_unit(0, None, 0.0),
            Duration::from_millis(100)
        );
        assert_eq!(
            policy.delay_with_jitter_unit(1, None, 0.0),
            Duration::from_millis(200)
        );
        assert_eq!(
            policy.delay_with_jitter_unit(2, None, 0.0),
            Duration::from_millis(400)
        );
        assert_eq!(
            policy.delay_with_jitter_unit(3, None, 0.0),
            Duration::from_millis(800)
        );
    }

    #[test]
    fn test_delay_is_monotonic_until_capped() {
        let policy = policy();
        let mut previous = Duration::ZERO;
        for attempt in 0..20 {
            let delay = policy.delay_with_jitter_unit(attempt, None, 0.5);
            assert!(delay >= previous, "attempt {attempt} went backwards");
            previous = delay;
        }
    }

    #[test]
    fn test_delay_is_capped() {
        let policy = policy();
        // 100ms * 2^10 = ~102s, well past the 30s cap
        assert_eq!(
            policy.delay_with_jitter_unit(10, None, 0.0),
            Duration::from_secs(30)
        );
        // even a huge attempt index must not overflow
        assert_eq!(
            policy.delay_with_jitter_unit(63, None, 0.0),
            Duration::from_secs(30)
        );
    }

    #[test]
    fn test_jitter_stays_in_range() {
        let policy = policy();
        for _ in 0..100 {
            let delay = policy.delay_for_attempt(2, None);
            let capped = Duration::from_millis(400);
            let ceiling = Duration::from_millis(400 + 120);
            assert!(delay >= capped, "delay {delay:?} below base");
            assert!(delay <= ceiling, "delay {delay:?} above jitter ceiling");
        }
    }

    #[test]
    fn test_retry_after_overrides_exponential() {
        let policy = policy();
        assert_eq!(
            policy.delay_with_jitter_unit(0, Some(12), 0.9),
            Duration::from_secs(12)
        );
        // hint is still capped at max_delay
        assert_eq!(
            policy.delay_with_jitter_unit(0, Some(600), 0.9),
            Duration::from_secs(30)
        );
        // a zero hint falls back to the exponential schedule
        assert_eq!(
            policy.delay_with_jitter_unit(0, Some(0), 0.0),
            Duration::from_millis(100)
        );
    }
}
