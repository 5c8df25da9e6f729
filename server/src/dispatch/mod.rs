pub mod batch;
pub mod email;
pub mod push;

use std::time::Duration;

use entity::sea_orm_active_enums::PushPlatform;
use serde::Serialize;

pub use batch::{dispatch_batch, BatchOutcome};
pub use email::Mailer;
pub use push::PushClient;

/// Outcome of a single provider send. Never persisted directly; folded into
/// the aggregate counts of the owning campaign or queue item.
#[derive(Debug, Clone, Serialize)]
pub struct DispatchResult {
    pub success: bool,
    pub message_id: Option<String>,
    pub provider: Option<String>,
    pub error: Option<String>,
}

impl DispatchResult {
    pub fn ok(provider: &str, message_id: Option<String>) -> Self {
        Self {
            success: true,
            message_id,
            provider: Some(provider.to_string()),
            error: None,
        }
    }

    pub fn failed(provider: &str, error: impl Into<String>) -> Self {
        Self {
            success: false,
            message_id: None,
            provider: Some(provider.to_string()),
            error: Some(error.into()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct EmailMessage {
    pub to: String,
    pub name: Option<String>,
    pub subject: String,
    pub html: String,
    pub text: Option<String>,
}

#[derive(Debug, Clone)]
pub struct PushMessage {
    pub device_token: String,
    pub platform: PushPlatform,
    pub title: String,
    pub body: String,
    pub data: Option<serde_json::Value>,
}

#[derive(Debug, Clone)]
pub enum OutboundMessage {
    Email(EmailMessage),
    Push(PushMessage),
}

/// Routes a message to the right provider client, retrying failed sends a
/// bounded number of times with a linearly growing delay. This retry policy
/// belongs to the email/push providers and is independent of the AI
/// executor's.
#[derive(Clone)]
pub struct Dispatcher {
    mailer: Mailer,
    push: PushClient,
    max_attempts: u32,
    retry_delay: Duration,
}

impl Dispatcher {
    pub fn new(mailer: Mailer, push: PushClient, max_attempts: u32, retry_delay: Duration) -> Self {
        Self {
            mailer,
            push,
            max_attempts: max_attempts.max(1),
            retry_delay,
        }
    }

    pub async fn send(&self, message: &OutboundMessage) -> DispatchResult {
        let mut last = DispatchResult::failed("dispatch", "no attempts were made");
        for attempt in 0..self.max_attempts {
            if attempt > 0 {
                tokio::time::sleep(self.retry_delay * attempt).await;
            }
            let result = match message {
                OutboundMessage::Email(email) => self.mailer.send(email).await,
                OutboundMessage::Push(push) => self.push.send(push).await,
            };
            if result.success {
                return result;
            }
            tracing::warn!(
                "dispatch attempt {}/{} failed: {:?}",
                attempt + 1,
                self.max_attempts,
                result.error
            );
            last = result;
        }
        last
    }
}
