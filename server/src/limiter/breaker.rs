//! Circuit breaker guarding one external dependency.
//!
//! # States
//! - Closed: normal operation, calls pass through
//! - Open: the dependency is rate-limiting us, calls fail fast
//! - Half-Open: cooldown elapsed, a single probe call is admitted
//!
//! # State Transitions
//! ```text
//! Closed → Open: failure_count >= threshold
//! Open → Half-Open: first check() after the cooldown deadline
//! Half-Open → Closed: probe succeeds
//! Half-Open → Open: probe hits another rate limit
//! ```
//!
//! Only rate-limit failures count toward the threshold. Timeouts and network
//! errors are retried by the executor but do not trip the breaker, so a
//! flaky connection cannot lock us out of a healthy provider.
//!
//! One breaker instance guards exactly one dependency. Never share an
//! instance across providers.

use std::sync::Mutex;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

/// Admission decision for a single call.
#[derive(Debug, Clone, Copy)]
pub enum Gate {
    Allow,
    Wait(Duration),
}

#[derive(Debug)]
struct BreakerInner {
    state: CircuitState,
    failure_count: u32,
    last_failure_at: Option<Instant>,
    retry_at: Option<Instant>,
    probe_in_flight: bool,
}

#[derive(Debug)]
pub struct CircuitBreaker {
    failure_threshold: u32,
    reset_timeout: Duration,
    inner: Mutex<BreakerInner>,
}

impl CircuitBreaker {
    pub fn new(failure_threshold: u32, reset_timeout: Duration) -> Self {
        Self {
            failure_threshold,
            reset_timeout,
            inner: Mutex::new(BreakerInner {
                state: CircuitState::Closed,
                failure_count: 0,
                last_failure_at: None,
                retry_at: None,
                probe_in_flight: false,
            }),
        }
    }

    /// Whether a call may proceed right now. While Open, the first check past
    /// the cooldown deadline flips the breaker to Half-Open and admits the
    /// caller as the probe; the check is not idempotent at that boundary.
    pub fn check(&self) -> Gate {
        let mut inner = self.inner.lock().unwrap();
        let now = Instant::now();

        match inner.state {
            CircuitState::Closed => Gate::Allow,
            CircuitState::Open => {
                let retry_at = inner.retry_at.unwrap_or(now);
                if now >= retry_at {
                    inner.state = CircuitState::HalfOpen;
                    inner.probe_in_flight = true;
                    Gate::Allow
                } else {
                    Gate::Wait(retry_at - now)
                }
            }
            CircuitState::HalfOpen => {
                if inner.probe_in_flight {
                    // Probe outcome unknown; advertise a full cooldown.
                    Gate::Wait(self.reset_timeout)
                } else {
                    inner.probe_in_flight = true;
                    Gate::Allow
                }
            }
        }
    }

    pub fn record_success(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.state = CircuitState::Closed;
        inner.failure_count = 0;
        inner.retry_at = None;
        inner.probe_in_flight = false;
    }

    /// A rate-limit failure. Counts toward the threshold; at the threshold
    /// the breaker opens for `reset_timeout`.
    pub fn record_rate_limit(&self) {
        let mut inner = self.inner.lock().unwrap();
        let now = Instant::now();
        inner.failure_count += 1;
        inner.last_failure_at = Some(now);
        inner.probe_in_flight = false;
        if inner.failure_count >= self.failure_threshold {
            inner.state = CircuitState::Open;
            inner.retry_at = Some(now + self.reset_timeout);
        }
    }

    /// A failure that is not a rate limit (timeout, network, server error).
    /// Releases the Half-Open probe slot without affecting the count.
    pub fn record_other_failure(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.last_failure_at = Some(Instant::now());
        inner.probe_in_flight = false;
    }

    pub fn state(&self) -> CircuitState {
        self.inner.lock().unwrap().state
    }

    pub fn failure_count(&self) -> u32 {
        self.inner.lock().unwrap().failure_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn breaker() -> CircuitBreaker {
        CircuitBreaker::new(3, Duration::from_millis(50))
    }

    #[test]
    fn test_closed_allows_calls() {
        let breaker = breaker();
        assert!(matches!(breaker.check(), Gate::Allow));
        assert_eq!(breaker.state(), CircuitState::Closed);
    }

    #[test]
    fn test_opens_at_threshold() {
        let breaker = breaker();
        breaker.record_rate_limit();
        breaker.record_rate_limit();
        assert_eq!(breaker.state(), CircuitState::Closed);

        breaker.record_rate_limit();
        assert_eq!(breaker.state(), CircuitState::Open);

        match breaker.check() {
            Gate::Wait(wait) => assert!(wait <= Duration::from_millis(50)),
            Gate::Allow => panic!("open breaker admitted a call"),
        }
    }

    #[test]
    fn test_success_resets_count() {
        let breaker = breaker();
        breaker.record_rate_limit();
        breaker.record_rate_limit();
        breaker.record_success();
        assert_eq!(breaker.failure_count(), 0);
        assert_eq!(breaker.state(), CircuitState::Closed);
    }

    #[test]
    fn test_half_open_after_cooldown() {
        let breaker = breaker();
        for _ in 0..3 {
            breaker.record_rate_limit();
        }
        assert_eq!(breaker.state(), CircuitState::Open);

        std::thread::sleep(Duration::from_millis(60));
        assert!(matches!(breaker.check(), Gate::Allow));
        assert_eq!(breaker.state(), CircuitState::HalfOpen);
    }

    #[test]
    fn test_half_open_admits_single_probe() {
        let breaker = breaker();
        for _ in 0..3 {
            breaker.record_rate_limit();
        }
        std::thread::sleep(Duration::from_millis(60));

        assert!(matches!(breaker.check(), Gate::Allow));
        // second caller while the probe is in flight is gated
        assert!(matches!(breaker.check(), Gate::Wait(_)));

        // a non-rate-limit probe failure releases the slot, state unchanged
        breaker.record_other_failure();
        assert_eq!(breaker.state(), CircuitState::HalfOpen);
        assert!(matches!(breaker.check(), Gate::Allow));
    }

    #[test]
    fn test_probe_success_closes() {
        let breaker = breaker();
        for _ in 0..3 {
            breaker.record_rate_limit();
        }
        std::thread::sleep(Duration::from_millis(60));
        assert!(matches!(breaker.check(), Gate::Allow));

        breaker.record_success();
        assert_eq!(breaker.state(), CircuitState::Closed);
        assert_eq!(breaker.failure_count(), 0);
        assert!(matches!(breaker.check(), Gate::Allow));
    }

    #[test]
    fn test_probe_rate_limit_reopens() {
        let breaker = breaker();
        for _ in 0..3 {
            breaker.record_rate_limit();
        }
        std::thread::sleep(Duration::from_millis(60));
        assert!(matches!(breaker.check(), Gate::Allow));

        breaker.record_rate_limit();
        assert_eq!(breaker.state(), CircuitState::Open);
        assert!(matches!(breaker.check(), Gate::Wait(_)));
    }
}
