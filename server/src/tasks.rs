//! Bodies of the periodic jobs wired up in `main`: the campaign and
//! automation sweeps (every 5 minutes) and the deferred-notification flush
//! (daily). The scheduler itself lives with the deployment; these functions
//! only do one tick of work each.

use std::time::Duration;

use futures::future;
use serde::Serialize;
use tokio::task::JoinHandle;
use tokio::time::interval;

use crate::{
    automation::{self, ItemOutcome},
    campaign,
    dispatch::OutboundMessage,
    error::AppResult,
    model::{automation::AutomationQueueItemCtrl, campaign::CampaignCtrl},
    notify,
    server_config::cfg,
    ServerState,
};

/// One campaign sweep tick: find due scheduled campaigns and run each one
/// in its own task. A campaign blowing up must not block its siblings, so
/// the handles are joined with their errors logged and dropped.
pub async fn check_scheduled_campaigns(state: &ServerState) -> AppResult<usize> {
    let due = CampaignCtrl::find_due(&state.conn, cfg.campaign.sweep_limit).await?;
    if due.is_empty() {
        return Ok(0);
    }

    tracing::info!("Campaign sweep found {} due campaigns", due.len());

    let handles: Vec<JoinHandle<()>> = due
        .into_iter()
        .map(|due_campaign| {
            let conn = state.conn.clone();
            let dispatcher = state.dispatcher.clone();
            tokio::spawn(async move {
                let send = |message: OutboundMessage| {
                    let dispatcher = dispatcher.clone();
                    async move { dispatcher.send(&message).await }
                };
                match campaign::process_campaign(
                    &conn,
                    due_campaign.id,
                    cfg.dispatch.batch_concurrency,
                    cfg.campaign.recipient_cap,
                    send,
                )
                .await
                {
                    Ok(summary) => {
                        tracing::info!(
                            "Scheduled campaign {} done: {:?} ({}/{})",
                            summary.campaign_id,
                            summary.status,
                            summary.sent,
                            summary.total_recipients
                        );
                    }
                    Err(e) => {
                        tracing::error!(
                            "Scheduled campaign {} failed: {:?}",
                            due_campaign.id,
                            e
                        );
                    }
                }
            })
        })
        .collect();

    let count = handles.len();
    for result in future::join_all(handles).await {
        if let Err(e) = result {
            tracing::error!("Campaign task panicked: {:?}", e);
        }
    }

    Ok(count)
}

#[derive(Debug, Default, Serialize)]
pub struct AutomationSweepOutcome {
    pub processed: usize,
    pub sent: usize,
    pub failed: usize,
    pub errors: Vec<String>,
}

/// One automation sweep tick: process every due queue item independently.
/// Item failures are collected, never propagated, so one bad recipient
/// cannot stall the rest of the queue.
pub async fn run_automation_queue(state: &ServerState) -> AppResult<AutomationSweepOutcome> {
    let due_ids = AutomationQueueItemCtrl::find_due_ids(&state.conn, cfg.automation.sweep_limit)
        .await?;
    let mut outcome = AutomationSweepOutcome::default();
    if due_ids.is_empty() {
        return Ok(outcome);
    }

    tracing::info!("Automation sweep found {} due items", due_ids.len());

    for item_id in due_ids {
        let dispatcher = state.dispatcher.clone();
        let send = |message: OutboundMessage| {
            let dispatcher = dispatcher.clone();
            async move { dispatcher.send(&message).await }
        };

        outcome.processed += 1;
        match automation::process_queue_item(&state.conn, item_id, send).await {
            Ok(ItemOutcome::Sent) => outcome.sent += 1,
            Ok(ItemOutcome::Failed(error)) => {
                outcome.failed += 1;
                outcome.errors.push(format!("item {item_id}: {error}"));
            }
            Ok(ItemOutcome::Skipped) => {}
            Err(e) => {
                outcome.failed += 1;
                outcome.errors.push(format!("item {item_id}: {e}"));
                tracing::error!("Automation item {} errored: {:?}", item_id, e);
            }
        }
    }

    tracing::info!(
        "Automation sweep done: {} processed, {} sent, {} failed",
        outcome.processed,
        outcome.sent,
        outcome.failed
    );

    Ok(outcome)
}

/// One deferred-notification flush tick.
pub async fn flush_deferred_notifications(state: &ServerState) -> AppResult<usize> {
    let push = state.push_client.clone();
    notify::deferred::flush_due_notifications(&state.conn, cfg.quiet_hours.flush_limit, |message| {
        let push = push.clone();
        async move { push.send(&message).await }
    })
    .await
}

/// Periodic status line: breaker state and queue depth for the AI provider.
pub fn watch(state: ServerState) -> JoinHandle<()> {
    let mut interval = interval(Duration::from_secs(60));
    tokio::spawn(async move {
        loop {
            interval.tick().await;
            tracing::info!(
                "AI limiter status: breaker {:?} ({} consecutive rate limits), {} queued requests",
                state.ai_executor.breaker().state(),
                state.ai_executor.breaker().failure_count(),
                state.insight_queue.len()
            );
        }
    })
}
