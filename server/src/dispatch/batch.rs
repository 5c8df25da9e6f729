//! Chunked fan-out of many messages with bounded concurrency.

use std::future::Future;

use futures::future;
use serde::Serialize;

use super::{DispatchResult, OutboundMessage};

#[derive(Debug, Serialize)]
pub struct BatchOutcome {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    pub results: Vec<DispatchResult>,
}

/// Send every message through `send`, at most `concurrency` in flight.
/// Chunk boundaries are barriers: chunk N+1 never starts before all of
/// chunk N has settled. A single message's failure never aborts the batch;
/// it lands in the aggregate counts instead.
pub async fn dispatch_batch<F, Fut>(
    messages: &[OutboundMessage],
    concurrency: usize,
    send: F,
) -> BatchOutcome
where
    F: Fn(OutboundMessage) -> Fut,
    Fut: Future<Output = DispatchResult>,
{
    let concurrency = concurrency.max(1);
    let mut results = Vec::with_capacity(messages.len());

    for chunk in messages.chunks(concurrency) {
        let settled = future::join_all(chunk.iter().cloned().map(&send)).await;
        results.extend(settled);
    }

    let successful = results.iter().filter(|r| r.success).count();
    BatchOutcome {
        total: messages.len(),
        successful,
        failed: messages.len() - successful,
        results,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::EmailMessage;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    fn messages(n: usize) -> Vec<OutboundMessage> {
        (0..n)
            .map(|i| {
                OutboundMessage::Email(EmailMessage {
                    to: format!("user{i}@example.com"),
                    name: None,
                    subject: "hello".to_string(),
                    html: "<p>hello</p>".to_string(),
                    text: None,
                })
            })
            .collect()
    }

    #[tokio::test]
    async fn test_aggregates_failures_without_aborting() {
        let messages = messages(10);
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();

        let outcome = dispatch_batch(&messages, 3, move |_message| {
            let calls = calls_clone.clone();
            async move {
                let index = calls.fetch_add(1, Ordering::SeqCst);
                // messages 4 and 7 fail
                if index == 3 || index == 6 {
                    DispatchResult::failed("smtp", "mailbox unavailable")
                } else {
                    DispatchResult::ok("smtp", None)
                }
            }
        })
        .await;

        assert_eq!(outcome.total, 10);
        assert_eq!(outcome.successful, 8);
        assert_eq!(outcome.failed, 2);
        assert_eq!(outcome.results.len(), 10);
        assert_eq!(calls.load(Ordering::SeqCst), 10);
    }

    #[tokio::test]
    async fn test_concurrency_high_water_mark() {
        let messages = messages(10);
        let in_flight = Arc::new(AtomicUsize::new(0));
        let high_water = Arc::new(AtomicUsize::new(0));
        let in_flight_clone = in_flight.clone();
        let high_water_clone = high_water.clone();

        let outcome = dispatch_batch(&messages, 3, move |_message| {
            let in_flight = in_flight_clone.clone();
            let high_water = high_water_clone.clone();
            async move {
                let current = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                high_water.fetch_max(current, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(5)).await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
                DispatchResult::ok("smtp", None)
            }
        })
        .await;

        assert_eq!(outcome.successful, 10);
        assert!(high_water.load(Ordering::SeqCst) <= 3);
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let outcome = dispatch_batch(&[], 3, |_message| async {
            DispatchResult::ok("smtp", None)
        })
        .await;
        assert_eq!(outcome.total, 0);
        assert_eq!(outcome.successful, 0);
        assert_eq!(outcome.failed, 0);
    }
}
