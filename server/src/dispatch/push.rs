//! Push delivery through the configured push gateway.

use serde::Deserialize;
use serde_json::json;

use super::{DispatchResult, PushMessage};
use crate::HttpClient;

#[derive(Clone)]
pub struct PushClient {
    http_client: HttpClient,
    endpoint: String,
}

#[derive(Debug, Deserialize)]
struct PushGatewayResponse {
    success: bool,
    id: Option<String>,
    error: Option<String>,
}

impl PushClient {
    pub fn new(http_client: HttpClient, endpoint: String) -> Self {
        Self {
            http_client,
            endpoint,
        }
    }

    pub async fn send(&self, message: &PushMessage) -> DispatchResult {
        let payload = json!({
            "to": message.device_token,
            "platform": message.platform,
            "title": message.title,
            "body": message.body,
            "data": message.data,
        });

        let resp = match self.http_client.post(&self.endpoint).json(&payload).send().await {
            Ok(resp) => resp,
            Err(e) => return DispatchResult::failed("push", e.to_string()),
        };

        let status = resp.status();
        match resp.json::<PushGatewayResponse>().await {
            Ok(body) if body.success => DispatchResult::ok("push", body.id),
            Ok(body) => DispatchResult::failed(
                "push",
                body.error
                    .unwrap_or_else(|| format!("push gateway returned {status}")),
            ),
            // some gateways answer 200 with an empty body
            Err(_) if status.is_success() => DispatchResult::ok("push", None),
            Err(e) => {
                DispatchResult::failed("push", format!("push gateway returned {status}: {e}"))
            }
        }
    }
}
