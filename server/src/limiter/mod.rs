pub mod backoff;
pub mod breaker;
pub mod classify;
pub mod executor;
pub mod queue;

pub use backoff::BackoffPolicy;
pub use breaker::{CircuitBreaker, CircuitState, Gate};
pub use executor::{ExecuteError, RateLimitedExecutor};
pub use queue::RequestQueue;
