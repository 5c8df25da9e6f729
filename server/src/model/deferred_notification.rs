use anyhow::Context;
use sea_orm::{QueryOrder, QuerySelect};

use crate::{db_core::prelude::*, error::AppResult};

#[derive(Debug, Clone)]
pub struct NewDeferredNotification {
    pub device_token: String,
    pub platform: PushPlatform,
    pub title: String,
    pub body: String,
    pub data: Option<serde_json::Value>,
    pub resume_at: sea_orm::prelude::DateTimeWithTimeZone,
}

pub struct DeferredNotificationCtrl;

impl DeferredNotificationCtrl {
    pub async fn insert(
        conn: &DatabaseConnection,
        notification: NewDeferredNotification,
    ) -> AppResult<()> {
        let active_model = deferred_notification::ActiveModel {
            id: ActiveValue::NotSet,
            device_token: ActiveValue::Set(notification.device_token),
            platform: ActiveValue::Set(notification.platform),
            title: ActiveValue::Set(notification.title),
            body: ActiveValue::Set(notification.body),
            data: ActiveValue::Set(notification.data),
            resume_at: ActiveValue::Set(notification.resume_at),
            status: ActiveValue::Set(DeferredStatus::Pending),
            sent_at: ActiveValue::Set(None),
            created_at: ActiveValue::Set(chrono::Utc::now().into()),
        };

        DeferredNotification::insert(active_model)
            .exec_without_returning(conn)
            .await
            .context("Error inserting deferred notification")?;

        Ok(())
    }

    /// Pending notifications whose resume time has arrived, oldest first.
    pub async fn find_due(
        conn: &DatabaseConnection,
        limit: u64,
    ) -> AppResult<Vec<deferred_notification::Model>> {
        let now: sea_orm::prelude::DateTimeWithTimeZone = chrono::Utc::now().into();
        let notifications = DeferredNotification::find()
            .filter(deferred_notification::Column::Status.eq(DeferredStatus::Pending))
            .filter(deferred_notification::Column::ResumeAt.lte(now))
            .order_by_asc(deferred_notification::Column::ResumeAt)
            .limit(limit)
            .all(conn)
            .await
            .context("Error fetching due deferred notifications")?;

        Ok(notifications)
    }

    pub async fn mark_sent(conn: &DatabaseConnection, id: i32) -> AppResult<()> {
        let now: sea_orm::prelude::DateTimeWithTimeZone = chrono::Utc::now().into();
        DeferredNotification::update_many()
            .col_expr(
                deferred_notification::Column::Status,
                Expr::value(DeferredStatus::Sent),
            )
            .col_expr(deferred_notification::Column::SentAt, Expr::value(Some(now)))
            .filter(deferred_notification::Column::Id.eq(id))
            .exec(conn)
            .await
            .context("Error marking deferred notification sent")?;

        Ok(())
    }
}
