use anyhow::Context;
use sea_orm::{QueryOrder, QuerySelect};

use crate::{
    db_core::prelude::*,
    error::{AppError, AppResult},
};

pub struct CampaignCtrl;

impl CampaignCtrl {
    pub async fn get_by_id(conn: &DatabaseConnection, id: i32) -> AppResult<campaign::Model> {
        let campaign = Campaign::find_by_id(id)
            .one(conn)
            .await
            .context("Error fetching campaign")?
            .ok_or(AppError::NotFound("Campaign not found".to_string()))?;

        Ok(campaign)
    }

    /// Claim a campaign for sending. Conditional update so two racing
    /// workers cannot both claim the same campaign: zero affected rows
    /// means someone else got there first (or the campaign is not in a
    /// sendable state).
    pub async fn try_claim_sending(conn: &DatabaseConnection, id: i32) -> AppResult<bool> {
        let now: sea_orm::prelude::DateTimeWithTimeZone = chrono::Utc::now().into();
        let result = Campaign::update_many()
            .col_expr(campaign::Column::Status, Expr::value(CampaignStatus::Sending))
            .col_expr(campaign::Column::UpdatedAt, Expr::value(now))
            .filter(campaign::Column::Id.eq(id))
            .filter(
                campaign::Column::Status
                    .is_in([CampaignStatus::Draft, CampaignStatus::Scheduled]),
            )
            .exec(conn)
            .await
            .context("Error claiming campaign")?;

        Ok(result.rows_affected > 0)
    }

    pub async fn mark_failed(conn: &DatabaseConnection, id: i32, error: &str) -> AppResult<()> {
        let now: sea_orm::prelude::DateTimeWithTimeZone = chrono::Utc::now().into();
        Campaign::update_many()
            .col_expr(campaign::Column::Status, Expr::value(CampaignStatus::Failed))
            .col_expr(
                campaign::Column::ErrorMessage,
                Expr::value(Some(error.to_string())),
            )
            .col_expr(campaign::Column::UpdatedAt, Expr::value(now))
            .filter(campaign::Column::Id.eq(id))
            .exec(conn)
            .await
            .context("Error marking campaign failed")?;

        Ok(())
    }

    pub async fn mark_finished(
        conn: &DatabaseConnection,
        id: i32,
        status: CampaignStatus,
        sent_count: usize,
        total_recipients: usize,
    ) -> AppResult<()> {
        let now: sea_orm::prelude::DateTimeWithTimeZone = chrono::Utc::now().into();
        Campaign::update_many()
            .col_expr(campaign::Column::Status, Expr::value(status))
            .col_expr(
                campaign::Column::SentCount,
                Expr::value(sent_count as i32),
            )
            .col_expr(
                campaign::Column::TotalRecipients,
                Expr::value(total_recipients as i32),
            )
            .col_expr(campaign::Column::SentAt, Expr::value(Some(now)))
            .col_expr(campaign::Column::UpdatedAt, Expr::value(now))
            .filter(campaign::Column::Id.eq(id))
            .exec(conn)
            .await
            .context("Error finishing campaign")?;

        Ok(())
    }

    /// Scheduled campaigns whose send time has arrived, oldest first.
    pub async fn find_due(
        conn: &DatabaseConnection,
        limit: u64,
    ) -> AppResult<Vec<campaign::Model>> {
        let now: sea_orm::prelude::DateTimeWithTimeZone = chrono::Utc::now().into();
        let campaigns = Campaign::find()
            .filter(campaign::Column::Status.eq(CampaignStatus::Scheduled))
            .filter(campaign::Column::ScheduledAt.lte(now))
            .order_by_asc(campaign::Column::ScheduledAt)
            .limit(limit)
            .all(conn)
            .await
            .context("Error fetching due campaigns")?;

        Ok(campaigns)
    }
}
