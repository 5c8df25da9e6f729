//! Deferred execution path for non-latency-critical provider calls.
//!
//! Callers enqueue a closure and await its outcome; a single drain task
//! works the queue in FIFO order, feeding each job through the shared
//! executor so queued calls respect the same breaker and pacing rules as
//! direct ones. Jobs that sit in the queue past the residency deadline are
//! rejected without ever running.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use futures::future::BoxFuture;
use futures::FutureExt;
use tokio::sync::oneshot;

use super::executor::{ExecuteError, RateLimitedExecutor};

type Job<T> = Arc<dyn Fn() -> BoxFuture<'static, anyhow::Result<T>> + Send + Sync>;

struct QueuedRequest<T> {
    job: Job<T>,
    reply: oneshot::Sender<Result<T, ExecuteError>>,
    enqueued_at: Instant,
}

pub struct RequestQueue<T> {
    executor: Arc<RateLimitedExecutor>,
    queue_timeout: Duration,
    max_attempts: u32,
    items: Arc<Mutex<VecDeque<QueuedRequest<T>>>>,
    draining: Arc<AtomicBool>,
}

impl<T> Clone for RequestQueue<T> {
    fn clone(&self) -> Self {
        Self {
            executor: self.executor.clone(),
            queue_timeout: self.queue_timeout,
            max_attempts: self.max_attempts,
            items: self.items.clone(),
            draining: self.draining.clone(),
        }
    }
}

impl<T: Send + 'static> RequestQueue<T> {
    pub fn new(
        executor: Arc<RateLimitedExecutor>,
        queue_timeout: Duration,
        max_attempts: u32,
    ) -> Self {
        Self {
            executor,
            queue_timeout,
            max_attempts,
            items: Arc::new(Mutex::new(VecDeque::new())),
            draining: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn len(&self) -> usize {
        self.items.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.lock().unwrap().is_empty()
    }

    /// Queue a job and wait for its result. The job closure may be invoked
    /// more than once (retries), so it must be re-callable.
    pub async fn enqueue<F, Fut>(&self, f: F) -> Result<T, ExecuteError>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = anyhow::Result<T>> + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let job: Job<T> = Arc::new(move || f().boxed());

        self.items.lock().unwrap().push_back(QueuedRequest {
            job,
            reply: tx,
            enqueued_at: Instant::now(),
        });
        self.spawn_drain();

        rx.await.unwrap_or_else(|_| {
            Err(ExecuteError::Aborted(anyhow::anyhow!(
                "queue worker dropped the request"
            )))
        })
    }

    fn spawn_drain(&self) {
        if self.draining.swap(true, Ordering::SeqCst) {
            return;
        }
        let queue = self.clone();
        tokio::spawn(async move {
            queue.drain().await;
        });
    }

    async fn drain(&self) {
        loop {
            let next = self.items.lock().unwrap().pop_front();
            let Some(request) = next else {
                self.draining.store(false, Ordering::SeqCst);
                // an enqueue may have slipped in between the pop and the
                // flag flip; reclaim the drain if so
                let has_work = !self.items.lock().unwrap().is_empty();
                if has_work && !self.draining.swap(true, Ordering::SeqCst) {
                    continue;
                }
                return;
            };

            let waited = request.enqueued_at.elapsed();
            if waited > self.queue_timeout {
                let _ = request
                    .reply
                    .send(Err(ExecuteError::QueueTimeout { waited }));
                continue;
            }

            let job = request.job.clone();
            let result = self
                .executor
                .execute(self.max_attempts, move || (*job)())
                .await;
            let _ = request.reply.send(result);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::limiter::{BackoffPolicy, CircuitBreaker};

    fn queue(queue_timeout: Duration) -> RequestQueue<u32> {
        let executor = Arc::new(RateLimitedExecutor::new(
            CircuitBreaker::new(100, Duration::from_secs(1)),
            BackoffPolicy::new(Duration::from_millis(1), Duration::from_millis(2), 0.0),
            Duration::ZERO,
            Duration::from_secs(1),
        ));
        RequestQueue::new(executor, queue_timeout, 1)
    }

    #[tokio::test]
    async fn test_fifo_order() {
        let queue = queue(Duration::from_secs(5));
        let order = Arc::new(Mutex::new(Vec::new()));

        let tasks: Vec<_> = (0..3u32)
            .map(|i| {
                let queue = queue.clone();
                let order = order.clone();
                async move {
                    queue
                        .enqueue(move || {
                            let order = order.clone();
                            async move {
                                order.lock().unwrap().push(i);
                                Ok(i)
                            }
                        })
                        .await
                }
            })
            .collect();

        let results = futures::future::join_all(tasks).await;
        for (i, result) in results.into_iter().enumerate() {
            assert_eq!(result.unwrap(), i as u32);
        }
        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn test_residency_timeout_drops_waiters() {
        let queue = queue(Duration::from_millis(10));

        let slow = queue.clone();
        let slow_handle = tokio::spawn(async move {
            slow.enqueue(|| async {
                tokio::time::sleep(Duration::from_millis(50)).await;
                Ok(1)
            })
            .await
        });
        // give the drain a moment to pick up the slow job
        tokio::time::sleep(Duration::from_millis(5)).await;

        let late = queue
            .enqueue(|| async { Ok(2) })
            .await;
        assert!(matches!(late, Err(ExecuteError::QueueTimeout { .. })));

        assert_eq!(slow_handle.await.unwrap().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_queue_drains_to_empty_and_restarts() {
        let queue = queue(Duration::from_secs(5));
        assert_eq!(queue.enqueue(|| async { Ok(10) }).await.unwrap(), 10);
        assert!(queue.is_empty());
        // a fresh enqueue after the drain exited must still run
        assert_eq!(queue.enqueue(|| async { Ok(11) }).await.unwrap(), 11);
    }

    #[tokio::test]
    async fn test_queue_propagates_errors() {
        let queue = queue(Duration::from_secs(5));
        let result = queue
            .enqueue(|| async { Err(anyhow::anyhow!("401 Unauthorized")) })
            .await;
        assert!(matches!(result, Err(ExecuteError::Aborted(_))));
    }
}
