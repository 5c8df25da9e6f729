//! Entry into a drip automation.
//!
//! Enrollment materializes the whole sequence up front: one queue row per
//! step, each with its due time fixed at enrollment from the cumulative
//! step delays. The sweep later advances each row independently; no step
//! ever triggers the next one. Editing an automation does not reschedule
//! rows that are already materialized.

use chrono::Duration;
use sea_orm::DatabaseConnection;

use crate::{
    db_core::prelude::*,
    error::{AppError, AppResult},
    model::automation::{AutomationCtrl, AutomationQueueItemCtrl},
};

/// Enroll a recipient into an automation. Rejects inactive automations and
/// duplicate enrollments (any existing run record or queue row for this
/// recipient). Returns the number of steps queued.
pub async fn enroll_recipient(
    conn: &DatabaseConnection,
    automation_id: i32,
    recipient_email: &str,
    recipient_name: Option<&str>,
    template_data: Option<serde_json::Value>,
) -> AppResult<usize> {
    let (automation, steps) = AutomationCtrl::get_with_steps(conn, automation_id).await?;

    if !automation.is_active {
        return Err(AppError::BadRequest(format!(
            "Automation {} is not active",
            automation.name
        )));
    }
    if steps.is_empty() {
        return Err(AppError::BadRequest(format!(
            "Automation {} has no steps",
            automation.name
        )));
    }

    if AutomationCtrl::has_runs(conn, automation_id, recipient_email).await?
        || AutomationQueueItemCtrl::exists_for_recipient(conn, automation_id, recipient_email)
            .await?
    {
        return Err(AppError::Conflict(format!(
            "{recipient_email} is already enrolled in automation {automation_id}"
        )));
    }

    let now = chrono::Utc::now();
    let mut cumulative = Duration::zero();
    let rows: Vec<automation_queue_item::ActiveModel> = steps
        .iter()
        .map(|step| {
            cumulative += Duration::minutes(step.delay_minutes as i64);
            automation_queue_item::ActiveModel {
                id: ActiveValue::NotSet,
                automation_id: ActiveValue::Set(automation_id),
                step_index: ActiveValue::Set(step.step_index),
                recipient_email: ActiveValue::Set(recipient_email.to_string()),
                recipient_name: ActiveValue::Set(recipient_name.map(|s| s.to_string())),
                scheduled_at: ActiveValue::Set((now + cumulative).into()),
                status: ActiveValue::Set(AutomationQueueStatus::Pending),
                template_data: ActiveValue::Set(template_data.clone()),
                error_message: ActiveValue::Set(None),
                sent_at: ActiveValue::Set(None),
                created_at: ActiveValue::Set(now.into()),
            }
        })
        .collect();

    AutomationQueueItemCtrl::insert_many(conn, rows).await?;

    tracing::info!(
        "Enrolled {} into automation {} ({} steps)",
        recipient_email,
        automation.name,
        steps.len()
    );

    Ok(steps.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::common::{automation_fixture, exec_ok, run_fixture, step_fixture};
    use sea_orm::{DatabaseBackend, MockDatabase};

    #[tokio::test]
    async fn test_enrollment_queues_all_steps() {
        let conn = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![automation_fixture(1, true)]])
            .append_query_results([vec![
                step_fixture(1, 1, 0, 0),
                step_fixture(2, 1, 1, 60),
                step_fixture(3, 1, 2, 1440),
            ]])
            .append_query_results([Vec::<automation_run::Model>::new()])
            .append_query_results([Vec::<automation_queue_item::Model>::new()])
            .append_exec_results([exec_ok(3)])
            .into_connection();

        let queued = enroll_recipient(&conn, 1, "ada@example.com", Some("Ada"), None)
            .await
            .unwrap();
        assert_eq!(queued, 3);
    }

    #[tokio::test]
    async fn test_duplicate_enrollment_is_rejected() {
        let conn = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![automation_fixture(1, true)]])
            .append_query_results([vec![step_fixture(1, 1, 0, 0)]])
            .append_query_results([vec![run_fixture(1, 1, "ada@example.com")]])
            .into_connection();

        let result = enroll_recipient(&conn, 1, "ada@example.com", None, None).await;
        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_inactive_automation_is_rejected() {
        let conn = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![automation_fixture(1, false)]])
            .append_query_results([vec![step_fixture(1, 1, 0, 0)]])
            .into_connection();

        let result = enroll_recipient(&conn, 1, "ada@example.com", None, None).await;
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_mid_sequence_recipient_cannot_reenroll() {
        let item = crate::testing::common::queue_item_fixture(
            7,
            1,
            0,
            "ada@example.com",
            AutomationQueueStatus::Sent,
        );
        let conn = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![automation_fixture(1, true)]])
            .append_query_results([vec![step_fixture(1, 1, 0, 0)]])
            .append_query_results([Vec::<automation_run::Model>::new()])
            .append_query_results([vec![item]])
            .into_connection();

        let result = enroll_recipient(&conn, 1, "ada@example.com", None, None).await;
        assert!(matches!(result, Err(AppError::Conflict(_))));
    }
}
