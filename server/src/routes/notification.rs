use axum::extract::State;
use axum::Json;
use chrono::Utc;
use chrono_tz::Tz;
use entity::sea_orm_active_enums::PushPlatform;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::{
    error::{AppError, AppJsonResult},
    model::deferred_notification::NewDeferredNotification,
    notify::quiet_hours,
    server_config::cfg,
    ServerState,
};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueDeferredRequest {
    pub device_token: String,
    pub platform: PushPlatform,
    pub title: String,
    pub body: String,
    pub data: Option<Value>,
    /// Explicit resume time; when absent the configured quiet-hours end
    /// decides it.
    pub resume_at: Option<chrono::DateTime<Utc>>,
}

/// Park a notification until quiet hours end. The caller has already
/// decided the recipient is inside their quiet window; this endpoint only
/// persists the deferral.
pub async fn queue_deferred(
    State(state): State<ServerState>,
    Json(request): Json<QueueDeferredRequest>,
) -> AppJsonResult<Value> {
    if request.device_token.trim().is_empty() {
        return Err(AppError::BadRequest(
            "deviceToken must not be empty".to_string(),
        ));
    }

    let resume_at = match request.resume_at {
        Some(at) => at,
        None => {
            let tz: Tz = cfg.quiet_hours.timezone.parse().map_err(|_| {
                AppError::Internal(anyhow::anyhow!(
                    "invalid quiet hours timezone in config: {}",
                    cfg.quiet_hours.timezone
                ))
            })?;
            quiet_hours::next_resume_time(Utc::now(), tz, cfg.quiet_hours.end_hour)
        }
    };

    quiet_hours::queue_for_quiet_hours(
        &state.conn,
        NewDeferredNotification {
            device_token: request.device_token,
            platform: request.platform,
            title: request.title,
            body: request.body,
            data: request.data,
            resume_at: resume_at.into(),
        },
    )
    .await?;

    Ok(Json(json!({ "deferred": true, "resumeAt": resume_at })))
}
