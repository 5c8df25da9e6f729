//! AI-generated campaign analysis and content suggestions.
//!
//! Two call paths into the provider: finished-campaign insights go through
//! the deferred request queue (an admin can wait a few extra seconds), while
//! content suggestions for the compose screen call the executor directly.

use std::sync::Arc;

use anyhow::{anyhow, Context};
use indoc::formatdoc;
use once_cell::sync::Lazy;
use regex::Regex;
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};

use crate::{
    db_core::prelude::*,
    error::{AppError, AppResult},
    limiter::{RateLimitedExecutor, RequestQueue},
    model::campaign::CampaignCtrl,
    server_config::cfg,
    HttpClient,
};

use super::chat::send_chat_prompt;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CampaignInsight {
    pub headline: String,
    pub analysis: String,
    pub suggestions: Vec<String>,
}

fn insight_system_prompt() -> String {
    formatdoc! {r#"
        You are an analyst for a neighborhood food-sharing marketplace.
        You review the delivery results of an email campaign and explain them to the admin team.
        You will only respond with a JSON object with the keys headline, analysis and suggestions (a list of strings). Do not provide explanations outside the JSON."#}
}

fn insight_user_prompt(campaign: &campaign::Model) -> String {
    let status = match campaign.status {
        CampaignStatus::Sent => "fully delivered",
        CampaignStatus::Partial => "partially delivered",
        CampaignStatus::Failed => "failed",
        _ => "not finished",
    };
    formatdoc! {r#"
        Review this campaign and summarize how it went.
        <campaign>
        name: {name}
        subject: {subject}
        outcome: {status}
        delivered: {sent} of {total} recipients
        </campaign>"#,
        name = campaign.name,
        subject = campaign.subject,
        status = status,
        sent = campaign.sent_count,
        total = campaign.total_recipients,
    }
}

impl CampaignInsight {
    /// Parse the model's JSON answer, falling back to regex extraction when
    /// the provider wraps or mangles the object.
    fn from_content(content: &str) -> anyhow::Result<Self> {
        if let Ok(insight) = serde_json::from_str::<CampaignInsight>(content) {
            return Ok(insight);
        }

        static RE_HEADLINE: Lazy<Regex> =
            Lazy::new(|| Regex::new(r#""headline":\s*"([^"]*)""#).unwrap());
        static RE_ANALYSIS: Lazy<Regex> =
            Lazy::new(|| Regex::new(r#""analysis":\s*"([^"]*)""#).unwrap());

        let headline = RE_HEADLINE
            .captures(content)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
            .ok_or_else(|| anyhow!("No headline in response: {content}"))?;
        let analysis = RE_ANALYSIS
            .captures(content)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
            .unwrap_or_default();

        Ok(CampaignInsight {
            headline,
            analysis,
            suggestions: Vec::new(),
        })
    }
}

/// Analyze a finished campaign. The provider call rides the deferred queue,
/// so it respects the breaker and pacing without jumping ahead of other
/// background work.
pub async fn generate_campaign_insight(
    conn: &DatabaseConnection,
    http_client: HttpClient,
    queue: &RequestQueue<String>,
    campaign_id: i32,
) -> AppResult<CampaignInsight> {
    let campaign = CampaignCtrl::get_by_id(conn, campaign_id).await?;
    if !matches!(
        campaign.status,
        CampaignStatus::Sent | CampaignStatus::Partial | CampaignStatus::Failed
    ) {
        return Err(AppError::BadRequest(format!(
            "Campaign {campaign_id} has not finished sending"
        )));
    }

    let system = insight_system_prompt();
    let user = insight_user_prompt(&campaign);

    let content = queue
        .enqueue(move || {
            let http_client = http_client.clone();
            let system = system.clone();
            let user = user.clone();
            async move { send_chat_prompt(&http_client, &system, &user).await }
        })
        .await?;

    Ok(CampaignInsight::from_content(&content)
        .context("Could not parse campaign insight")?)
}

fn suggestion_system_prompt() -> String {
    formatdoc! {r#"
        You are a copywriter for a neighborhood food-sharing marketplace.
        You draft short, warm campaign emails that nudge members to share or pick up surplus food.
        You will only respond with a JSON object with the keys subject and content. Do not provide explanations or multiple drafts."#}
}

/// Draft campaign copy for the compose screen. Latency matters here, so the
/// call goes straight through the executor.
pub async fn suggest_campaign_content(
    http_client: &HttpClient,
    executor: &Arc<RateLimitedExecutor>,
    brief: &str,
) -> AppResult<String> {
    let system = suggestion_system_prompt();
    let user = formatdoc! {r#"
        Draft a campaign email for this brief between the <brief> tags.
        <brief>{brief}</brief>"#,
        brief = brief,
    };

    let http_client = http_client.clone();
    let content = executor
        .execute(cfg.limiter.max_attempts, move || {
            let http_client = http_client.clone();
            let system = system.clone();
            let user = user.clone();
            async move { send_chat_prompt(&http_client, &system, &user).await }
        })
        .await?;

    Ok(content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_prompt_shape() {
        let prompt = insight_system_prompt();
        assert!(prompt.contains("JSON object"));
        assert!(prompt.contains("headline"));
        assert!(!prompt.ends_with('\n'));
    }

    #[test]
    fn test_insight_parses_clean_json() {
        let content = r#"{"headline": "Strong delivery", "analysis": "Nearly every send landed.", "suggestions": ["Try a shorter subject"]}"#;
        let insight = CampaignInsight::from_content(content).unwrap();
        assert_eq!(insight.headline, "Strong delivery");
        assert_eq!(insight.suggestions.len(), 1);
    }

    #[test]
    fn test_insight_falls_back_to_regex() {
        let content = r#"Here you go: {"headline": "Mixed results", "analysis": "A third of sends bounced."} hope that helps"#;
        let insight = CampaignInsight::from_content(content).unwrap();
        assert_eq!(insight.headline, "Mixed results");
        assert_eq!(insight.analysis, "A third of sends bounced.");
        assert!(insight.suggestions.is_empty());
    }

    #[test]
    fn test_insight_rejects_garbage() {
        assert!(CampaignInsight::from_content("no json here").is_err());
    }
}
