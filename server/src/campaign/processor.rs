//! Campaign send lifecycle: draft/scheduled → sending → sent | partial | failed.

use std::future::Future;

use sea_orm::DatabaseConnection;
use serde::Serialize;

use super::template;
use crate::{
    db_core::prelude::*,
    dispatch::{dispatch_batch, DispatchResult, EmailMessage, OutboundMessage},
    error::{AppError, AppResult},
    model::{campaign::CampaignCtrl, segment::SegmentCtrl},
};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CampaignSummary {
    pub campaign_id: i32,
    pub status: CampaignStatus,
    pub total_recipients: usize,
    pub sent: usize,
    pub failed: usize,
}

/// Run one campaign to completion.
///
/// The campaign is claimed with a conditional status flip before any work
/// happens, so a second worker racing on the same campaign backs off with a
/// conflict. Individual send failures are absorbed into the aggregate and
/// decide `sent` vs `partial`; only recipient resolution failing marks the
/// campaign `failed`.
pub async fn process_campaign<F, Fut>(
    conn: &DatabaseConnection,
    campaign_id: i32,
    concurrency: usize,
    recipient_cap: u64,
    send: F,
) -> AppResult<CampaignSummary>
where
    F: Fn(OutboundMessage) -> Fut,
    Fut: Future<Output = DispatchResult>,
{
    let campaign = CampaignCtrl::get_by_id(conn, campaign_id).await?;

    if !CampaignCtrl::try_claim_sending(conn, campaign_id).await? {
        return Err(AppError::Conflict(format!(
            "Campaign {campaign_id} is not in a sendable state"
        )));
    }

    tracing::info!(
        "Sending campaign {} ({}) to segment {}",
        campaign_id,
        campaign.name,
        campaign.segment_id
    );

    let recipients =
        match SegmentCtrl::resolve_recipients(conn, campaign.segment_id, recipient_cap).await {
            Ok(recipients) => recipients,
            Err(e) => {
                CampaignCtrl::mark_failed(conn, campaign_id, &e.to_string()).await?;
                return Err(e);
            }
        };

    let messages: Vec<OutboundMessage> = recipients
        .iter()
        .map(|recipient| {
            let rendered = template::render_recipient_message(
                &campaign.subject,
                &campaign.content,
                &recipient.email,
                recipient.name.as_deref().unwrap_or(""),
                None,
            );
            OutboundMessage::Email(EmailMessage {
                to: recipient.email.clone(),
                name: recipient.name.clone(),
                subject: rendered.subject,
                html: rendered.html,
                text: None,
            })
        })
        .collect();

    let outcome = dispatch_batch(&messages, concurrency, send).await;

    let status = if outcome.failed == 0 {
        CampaignStatus::Sent
    } else {
        CampaignStatus::Partial
    };
    CampaignCtrl::mark_finished(conn, campaign_id, status.clone(), outcome.successful, outcome.total)
        .await?;

    tracing::info!(
        "Campaign {} finished: {:?}, {}/{} delivered",
        campaign_id,
        status,
        outcome.successful,
        outcome.total
    );

    Ok(CampaignSummary {
        campaign_id,
        status,
        total_recipients: outcome.total,
        sent: outcome.successful,
        failed: outcome.failed,
    })
}
