//! Rate-limited, circuit-broken execution of calls to an external provider.

use std::future::Future;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use derive_more::derive::Display;

use super::backoff::BackoffPolicy;
use super::breaker::{CircuitBreaker, Gate};
use super::classify;

#[derive(Debug, Display)]
pub enum ExecuteError {
    /// The breaker is open; no attempt was made.
    #[display("service temporarily unavailable, retry in {}s", wait.as_secs().max(1))]
    ServiceUnavailable { wait: Duration },
    /// Every allowed attempt failed with a retryable error.
    #[display("{attempts} attempts failed, last error: {last_error}")]
    RetriesExhausted { attempts: u32, last_error: String },
    /// A permanent (non-retryable) failure, surfaced on the first attempt
    /// that hit it.
    #[display("{_0:#}")]
    Aborted(anyhow::Error),
    /// The request sat in the deferred queue past its residency deadline.
    #[display("request expired after {}ms in queue", waited.as_millis())]
    QueueTimeout { waited: Duration },
}

impl std::error::Error for ExecuteError {}

/// Wraps every call to one external dependency with minimum inter-call
/// spacing, circuit-breaker gating, a per-attempt timeout, and bounded
/// retries. Construct one instance per dependency and share it; the
/// last-call timestamp and breaker state are meaningless if split across
/// clones of the underlying provider client.
pub struct RateLimitedExecutor {
    breaker: CircuitBreaker,
    backoff: BackoffPolicy,
    min_interval: Duration,
    request_timeout: Duration,
    last_call: Mutex<Option<Instant>>,
}

impl RateLimitedExecutor {
    pub fn new(
        breaker: CircuitBreaker,
        backoff: BackoffPolicy,
        min_interval: Duration,
        request_timeout: Duration,
    ) -> Self {
        Self {
            breaker,
            backoff,
            min_interval,
            request_timeout,
            last_call: Mutex::new(None),
        }
    }

    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    /// Run `f` with up to `max_attempts` tries.
    ///
    /// Per attempt: check the breaker, pace against the last call, run `f`
    /// under the request timeout. Successes close the breaker; rate-limit
    /// failures count against it. Non-retryable failures abort immediately,
    /// everything else sleeps the backoff delay and tries again.
    pub async fn execute<T, F, Fut>(&self, max_attempts: u32, f: F) -> Result<T, ExecuteError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = anyhow::Result<T>>,
    {
        let mut last_error = String::from("no attempts were made");
        let mut attempt = 0;

        while attempt < max_attempts {
            match self.breaker.check() {
                Gate::Wait(wait) => return Err(ExecuteError::ServiceUnavailable { wait }),
                Gate::Allow => {}
            }

            self.pace().await;

            let err = match tokio::time::timeout(self.request_timeout, f()).await {
                Ok(Ok(value)) => {
                    self.breaker.record_success();
                    return Ok(value);
                }
                Ok(Err(err)) => err,
                Err(_) => anyhow::anyhow!(
                    "request timed out after {}ms",
                    self.request_timeout.as_millis()
                ),
            };

            let class = classify::classify(&err);
            if class.is_rate_limit {
                self.breaker.record_rate_limit();
            } else {
                self.breaker.record_other_failure();
            }

            if !class.should_retry() {
                return Err(ExecuteError::Aborted(err));
            }

            last_error = format!("{err:#}");
            attempt += 1;
            tracing::warn!(
                "provider call failed (attempt {}/{}): {}",
                attempt,
                max_attempts,
                last_error
            );

            if attempt >= max_attempts {
                break;
            }
            let delay = self.backoff.delay_for_attempt(attempt - 1, class.retry_after);
            tokio::time::sleep(delay).await;
        }

        Err(ExecuteError::RetriesExhausted {
            attempts: max_attempts,
            last_error,
        })
    }

    /// Sleep out the remainder of the minimum inter-call interval. Callers
    /// racing here each reserve the next free slot before sleeping, so
    /// effective call starts stay serialized.
    async fn pace(&self) {
        let wait = {
            let mut last = self.last_call.lock().unwrap();
            let now = Instant::now();
            let start = match *last {
                Some(previous) => (previous + self.min_interval).max(now),
                None => now,
            };
            *last = Some(start);
            start.saturating_duration_since(now)
        };
        if !wait.is_zero() {
            tokio::time::sleep(wait).await;
        }
    }
}
