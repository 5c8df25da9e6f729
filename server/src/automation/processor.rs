//! Advances one materialized automation step: claim, render, dispatch,
//! record the run.

use std::future::Future;

use sea_orm::DatabaseConnection;

use crate::{
    campaign::template,
    db_core::prelude::*,
    dispatch::{DispatchResult, EmailMessage, OutboundMessage},
    error::{AppError, AppResult},
    model::automation::{AutomationCtrl, AutomationQueueItemCtrl, AutomationRunCtrl},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
    Sent,
    Failed(String),
    /// Another worker claimed the item first.
    Skipped,
}

/// Process one due queue item. Dispatch failures are absorbed into the
/// item's status and run record rather than propagated, so a sweep over
/// many items can keep going; only missing rows and database errors
/// surface as `Err`.
pub async fn process_queue_item<F, Fut>(
    conn: &DatabaseConnection,
    item_id: i32,
    send: F,
) -> AppResult<ItemOutcome>
where
    F: Fn(OutboundMessage) -> Fut,
    Fut: Future<Output = DispatchResult>,
{
    let item = AutomationQueueItemCtrl::get_by_id(conn, item_id).await?;
    let (automation, steps) = AutomationCtrl::get_with_steps(conn, item.automation_id).await?;
    let step = steps
        .iter()
        .find(|step| step.step_index == item.step_index)
        .ok_or_else(|| {
            AppError::NotFound(format!(
                "Automation {} has no step {}",
                automation.name, item.step_index
            ))
        })?;

    if !AutomationQueueItemCtrl::try_claim_processing(conn, item_id).await? {
        return Ok(ItemOutcome::Skipped);
    }

    let rendered = template::render_recipient_message(
        &step.subject,
        &step.content,
        &item.recipient_email,
        item.recipient_name.as_deref().unwrap_or(""),
        item.template_data.as_ref(),
    );
    let message = OutboundMessage::Email(EmailMessage {
        to: item.recipient_email.clone(),
        name: item.recipient_name.clone(),
        subject: rendered.subject,
        html: rendered.html,
        text: None,
    });

    let result = send(message).await;

    if result.success {
        AutomationQueueItemCtrl::mark_sent(conn, item_id).await?;
        AutomationRunCtrl::insert(
            conn,
            item.automation_id,
            &item.recipient_email,
            item.step_index,
            true,
            None,
        )
        .await?;
        Ok(ItemOutcome::Sent)
    } else {
        let error = result
            .error
            .unwrap_or_else(|| "dispatch failed".to_string());
        tracing::error!(
            "Automation {} step {} failed for {}: {}",
            automation.name,
            item.step_index,
            item.recipient_email,
            error
        );
        AutomationQueueItemCtrl::mark_failed(conn, item_id, &error).await?;
        AutomationRunCtrl::insert(
            conn,
            item.automation_id,
            &item.recipient_email,
            item.step_index,
            false,
            Some(&error),
        )
        .await?;
        Ok(ItemOutcome::Failed(error))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::common::{
        automation_fixture, exec_ok, queue_item_fixture, step_fixture,
    };
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn base_mock() -> MockDatabase {
        MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![queue_item_fixture(
                7,
                1,
                0,
                "ada@example.com",
                AutomationQueueStatus::Pending,
            )]])
            .append_query_results([vec![automation_fixture(1, true)]])
            .append_query_results([vec![step_fixture(1, 1, 0, 0)]])
    }

    #[tokio::test]
    async fn test_successful_dispatch_marks_sent() {
        let conn = base_mock()
            // claim, mark sent, run record
            .append_exec_results([exec_ok(1), exec_ok(1), exec_ok(1)])
            .into_connection();

        let outcome = process_queue_item(&conn, 7, |_message| async {
            DispatchResult::ok("smtp", Some("abc".to_string()))
        })
        .await
        .unwrap();

        assert_eq!(outcome, ItemOutcome::Sent);
    }

    #[tokio::test]
    async fn test_dispatch_failure_is_absorbed() {
        let conn = base_mock()
            .append_exec_results([exec_ok(1), exec_ok(1), exec_ok(1)])
            .into_connection();

        let outcome = process_queue_item(&conn, 7, |_message| async {
            DispatchResult::failed("smtp", "mailbox unavailable")
        })
        .await
        .unwrap();

        assert_eq!(
            outcome,
            ItemOutcome::Failed("mailbox unavailable".to_string())
        );
    }

    #[tokio::test]
    async fn test_already_claimed_item_is_skipped() {
        let conn = base_mock().append_exec_results([exec_ok(0)]).into_connection();

        let outcome = process_queue_item(&conn, 7, |_message| async {
            DispatchResult::ok("smtp", None)
        })
        .await
        .unwrap();

        assert_eq!(outcome, ItemOutcome::Skipped);
    }

    #[tokio::test]
    async fn test_missing_step_fails() {
        let conn = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![queue_item_fixture(
                7,
                1,
                5,
                "ada@example.com",
                AutomationQueueStatus::Pending,
            )]])
            .append_query_results([vec![automation_fixture(1, true)]])
            .append_query_results([vec![step_fixture(1, 1, 0, 0)]])
            .into_connection();

        let result = process_queue_item(&conn, 7, |_message| async {
            DispatchResult::ok("smtp", None)
        })
        .await;

        assert!(matches!(result, Err(AppError::NotFound(_))));
    }
}
