use anyhow::Context;
use sea_orm::{QueryOrder, QuerySelect};

use crate::{
    db_core::prelude::*,
    error::{AppError, AppResult},
};

pub struct AutomationCtrl;

impl AutomationCtrl {
    pub async fn get_with_steps(
        conn: &DatabaseConnection,
        id: i32,
    ) -> AppResult<(automation::Model, Vec<automation_step::Model>)> {
        let automation = Automation::find_by_id(id)
            .one(conn)
            .await
            .context("Error fetching automation")?
            .ok_or(AppError::NotFound("Automation not found".to_string()))?;

        let steps = AutomationStep::find()
            .filter(automation_step::Column::AutomationId.eq(id))
            .order_by_asc(automation_step::Column::StepIndex)
            .all(conn)
            .await
            .context("Error fetching automation steps")?;

        Ok((automation, steps))
    }

    /// Whether the recipient already has any run record for this automation.
    pub async fn has_runs(
        conn: &DatabaseConnection,
        automation_id: i32,
        recipient_email: &str,
    ) -> AppResult<bool> {
        let runs = AutomationRun::find()
            .filter(automation_run::Column::AutomationId.eq(automation_id))
            .filter(automation_run::Column::RecipientEmail.eq(recipient_email))
            .limit(1)
            .all(conn)
            .await
            .context("Error fetching automation runs")?;

        Ok(!runs.is_empty())
    }
}

pub struct AutomationQueueItemCtrl;

impl AutomationQueueItemCtrl {
    pub async fn get_by_id(
        conn: &DatabaseConnection,
        id: i32,
    ) -> AppResult<automation_queue_item::Model> {
        let item = AutomationQueueItem::find_by_id(id)
            .one(conn)
            .await
            .context("Error fetching automation queue item")?
            .ok_or(AppError::NotFound(
                "Automation queue item not found".to_string(),
            ))?;

        Ok(item)
    }

    /// Whether any queue rows exist for this recipient in this automation,
    /// regardless of status. Guards against re-enrollment mid-sequence.
    pub async fn exists_for_recipient(
        conn: &DatabaseConnection,
        automation_id: i32,
        recipient_email: &str,
    ) -> AppResult<bool> {
        let rows = AutomationQueueItem::find()
            .filter(automation_queue_item::Column::AutomationId.eq(automation_id))
            .filter(automation_queue_item::Column::RecipientEmail.eq(recipient_email))
            .limit(1)
            .all(conn)
            .await
            .context("Error fetching automation queue rows")?;

        Ok(!rows.is_empty())
    }

    /// Claim a due item by flipping pending → processing. Zero affected
    /// rows means another worker already claimed it.
    pub async fn try_claim_processing(conn: &DatabaseConnection, id: i32) -> AppResult<bool> {
        let result = AutomationQueueItem::update_many()
            .col_expr(
                automation_queue_item::Column::Status,
                Expr::value(AutomationQueueStatus::Processing),
            )
            .filter(automation_queue_item::Column::Id.eq(id))
            .filter(automation_queue_item::Column::Status.eq(AutomationQueueStatus::Pending))
            .exec(conn)
            .await
            .context("Error claiming automation queue item")?;

        Ok(result.rows_affected > 0)
    }

    pub async fn mark_sent(conn: &DatabaseConnection, id: i32) -> AppResult<()> {
        let now: sea_orm::prelude::DateTimeWithTimeZone = chrono::Utc::now().into();
        AutomationQueueItem::update_many()
            .col_expr(
                automation_queue_item::Column::Status,
                Expr::value(AutomationQueueStatus::Sent),
            )
            .col_expr(automation_queue_item::Column::SentAt, Expr::value(Some(now)))
            .filter(automation_queue_item::Column::Id.eq(id))
            .exec(conn)
            .await
            .context("Error marking automation queue item sent")?;

        Ok(())
    }

    pub async fn mark_failed(conn: &DatabaseConnection, id: i32, error: &str) -> AppResult<()> {
        AutomationQueueItem::update_many()
            .col_expr(
                automation_queue_item::Column::Status,
                Expr::value(AutomationQueueStatus::Failed),
            )
            .col_expr(
                automation_queue_item::Column::ErrorMessage,
                Expr::value(Some(error.to_string())),
            )
            .filter(automation_queue_item::Column::Id.eq(id))
            .exec(conn)
            .await
            .context("Error marking automation queue item failed")?;

        Ok(())
    }

    /// Operator retry: put a failed item back in the queue. Failed items
    /// are never re-queued automatically.
    pub async fn requeue(conn: &DatabaseConnection, id: i32) -> AppResult<bool> {
        let result = AutomationQueueItem::update_many()
            .col_expr(
                automation_queue_item::Column::Status,
                Expr::value(AutomationQueueStatus::Pending),
            )
            .col_expr(
                automation_queue_item::Column::ErrorMessage,
                Expr::value(Option::<String>::None),
            )
            .filter(automation_queue_item::Column::Id.eq(id))
            .filter(automation_queue_item::Column::Status.eq(AutomationQueueStatus::Failed))
            .exec(conn)
            .await
            .context("Error re-queueing automation queue item")?;

        Ok(result.rows_affected > 0)
    }

    /// Pending items whose due time has arrived, oldest first.
    pub async fn find_due_ids(conn: &DatabaseConnection, limit: u64) -> AppResult<Vec<i32>> {
        let now: sea_orm::prelude::DateTimeWithTimeZone = chrono::Utc::now().into();
        let items = AutomationQueueItem::find()
            .filter(automation_queue_item::Column::Status.eq(AutomationQueueStatus::Pending))
            .filter(automation_queue_item::Column::ScheduledAt.lte(now))
            .order_by_asc(automation_queue_item::Column::ScheduledAt)
            .limit(limit)
            .all(conn)
            .await
            .context("Error fetching due automation queue items")?;

        Ok(items.into_iter().map(|item| item.id).collect())
    }

    pub async fn insert_many(
        conn: &DatabaseConnection,
        rows: Vec<automation_queue_item::ActiveModel>,
    ) -> AppResult<()> {
        if rows.is_empty() {
            return Ok(());
        }
        AutomationQueueItem::insert_many(rows)
            .exec_without_returning(conn)
            .await
            .context("Error inserting automation queue rows")?;

        Ok(())
    }
}

pub struct AutomationRunCtrl;

impl AutomationRunCtrl {
    pub async fn insert(
        conn: &DatabaseConnection,
        automation_id: i32,
        recipient_email: &str,
        step_index: i32,
        success: bool,
        error_message: Option<&str>,
    ) -> AppResult<()> {
        let active_model = automation_run::ActiveModel {
            id: ActiveValue::NotSet,
            automation_id: ActiveValue::Set(automation_id),
            recipient_email: ActiveValue::Set(recipient_email.to_string()),
            step_index: ActiveValue::Set(step_index),
            success: ActiveValue::Set(success),
            error_message: ActiveValue::Set(error_message.map(|s| s.to_string())),
            created_at: ActiveValue::Set(chrono::Utc::now().into()),
        };

        AutomationRun::insert(active_model)
            .exec_without_returning(conn)
            .await
            .context("Error inserting automation run")?;

        Ok(())
    }
}
