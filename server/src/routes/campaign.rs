use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::{
    campaign::{process_campaign, CampaignSummary},
    dispatch::OutboundMessage,
    error::{AppError, AppJsonResult},
    insight,
    server_config::cfg,
    ServerState,
};

/// Manual trigger for a draft (or already-due scheduled) campaign.
pub async fn send_campaign(
    State(state): State<ServerState>,
    Path(campaign_id): Path<i32>,
) -> AppJsonResult<CampaignSummary> {
    let dispatcher = state.dispatcher.clone();
    let send = |message: OutboundMessage| {
        let dispatcher = dispatcher.clone();
        async move { dispatcher.send(&message).await }
    };

    let summary = process_campaign(
        &state.conn,
        campaign_id,
        cfg.dispatch.batch_concurrency,
        cfg.campaign.recipient_cap,
        send,
    )
    .await?;

    Ok(Json(summary))
}

pub async fn campaign_insight(
    State(state): State<ServerState>,
    Path(campaign_id): Path<i32>,
) -> AppJsonResult<insight::CampaignInsight> {
    let generated = insight::generate_campaign_insight(
        &state.conn,
        state.http_client.clone(),
        &state.insight_queue,
        campaign_id,
    )
    .await?;

    Ok(Json(generated))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestContentRequest {
    pub brief: String,
}

pub async fn suggest_content(
    State(state): State<ServerState>,
    Json(request): Json<SuggestContentRequest>,
) -> AppJsonResult<Value> {
    if request.brief.trim().is_empty() {
        return Err(AppError::BadRequest("brief must not be empty".to_string()));
    }

    let content =
        insight::suggest_campaign_content(&state.http_client, &state.ai_executor, &request.brief)
            .await?;

    Ok(Json(json!({ "draft": content })))
}
