//! Chat-completion calls to the AI provider.
//!
//! Errors surface as plain `anyhow` errors whose text carries the HTTP
//! status and any retry hint, so the executor's classifier can label them
//! without this module knowing anything about retry policy.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::server_config::cfg;
use crate::HttpClient;

const AI_ENDPOINT: &str = "https://api.mistral.ai/v1/chat/completions";

pub async fn send_chat_prompt(
    http_client: &HttpClient,
    system_prompt: &str,
    user_prompt: &str,
) -> anyhow::Result<String> {
    let resp = http_client
        .post(AI_ENDPOINT)
        .bearer_auth(&cfg.api.key)
        .json(&json!(
          {
            "model": &cfg.model.id,
            "temperature": cfg.model.temperature,
            "messages": [
              {
                "role": "system",
                "content": system_prompt
              },
              {
                "role": "user",
                "content": user_prompt
              }
            ],
            "response_format": { "type": "json_object" }
          }
        ))
        .send()
        .await
        .context("chat request failed")?;

    let status = resp.status();
    if !status.is_success() {
        let retry_after = resp
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .map(|v| format!(", retry-after: {v}"))
            .unwrap_or_default();
        let body = resp.text().await.unwrap_or_default();
        anyhow::bail!("chat api returned {status}: {body}{retry_after}");
    }

    let value = resp
        .json::<serde_json::Value>()
        .await
        .context("could not read chat response")?;

    let parsed = serde_json::from_value::<ChatApiResponseOrError>(value.clone())
        .context(format!("Could not parse chat response: {value}"))?;

    let parsed = match parsed {
        ChatApiResponseOrError::Error(error) => {
            anyhow::bail!("chat api error: {}", error.message);
        }
        ChatApiResponseOrError::Response(parsed) => parsed,
    };

    let choice = parsed.choices.first().context("No choices in response")?;
    Ok(choice.message.content.clone())
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PromptUsage {
    pub prompt_tokens: i64,
    pub completion_tokens: i64,
    pub total_tokens: i64,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    Stop,
    Length,
    ModelLength,
    Error,
    ToolCalls,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatChoice {
    pub index: i32,
    pub message: ChatMessage,
    pub finish_reason: FinishReason,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatApiResponse {
    pub choices: Vec<ChatChoice>,
    pub usage: PromptUsage,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatApiError {
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChatApiResponseOrError {
    Response(ChatApiResponse),
    Error(ChatApiError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_parsing() {
        let raw = json!({
            "choices": [{
                "index": 0,
                "message": { "role": "assistant", "content": "{\"headline\": \"ok\"}" },
                "finish_reason": "stop"
            }],
            "usage": { "prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15 }
        });
        let parsed: ChatApiResponseOrError = serde_json::from_value(raw).unwrap();
        match parsed {
            ChatApiResponseOrError::Response(resp) => {
                assert_eq!(resp.choices.len(), 1);
                assert_eq!(resp.usage.total_tokens, 15);
            }
            ChatApiResponseOrError::Error(_) => panic!("parsed as error"),
        }
    }

    #[test]
    fn test_error_parsing() {
        let raw = json!({ "message": "Requests rate limit exceeded" });
        let parsed: ChatApiResponseOrError = serde_json::from_value(raw).unwrap();
        match parsed {
            ChatApiResponseOrError::Error(error) => {
                assert_eq!(error.message, "Requests rate limit exceeded");
            }
            ChatApiResponseOrError::Response(_) => panic!("parsed as response"),
        }
    }
}
