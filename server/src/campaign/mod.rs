pub mod processor;
pub mod template;

pub use processor::{process_campaign, CampaignSummary};
