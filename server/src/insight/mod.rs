pub(crate) mod chat;
pub mod generate;

pub use generate::{generate_campaign_insight, suggest_campaign_content, CampaignInsight};
