use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::{
    automation,
    error::{AppError, AppJsonResult},
    model::automation::AutomationQueueItemCtrl,
    ServerState,
};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollRequest {
    pub email: String,
    pub name: Option<String>,
    pub template_data: Option<Value>,
}

pub async fn enroll_recipient(
    State(state): State<ServerState>,
    Path(automation_id): Path<i32>,
    Json(request): Json<EnrollRequest>,
) -> AppJsonResult<Value> {
    if request.email.trim().is_empty() {
        return Err(AppError::BadRequest("email must not be empty".to_string()));
    }

    let queued_steps = automation::enroll_recipient(
        &state.conn,
        automation_id,
        &request.email,
        request.name.as_deref(),
        request.template_data,
    )
    .await?;

    Ok(Json(json!({ "queuedSteps": queued_steps })))
}

/// Operator retry for a failed queue item; the sweep never re-queues
/// failed items on its own.
pub async fn retry_queue_item(
    State(state): State<ServerState>,
    Path(item_id): Path<i32>,
) -> AppJsonResult<Value> {
    let requeued = AutomationQueueItemCtrl::requeue(&state.conn, item_id).await?;
    if !requeued {
        return Err(AppError::Conflict(format!(
            "Queue item {item_id} is not in a failed state"
        )));
    }

    Ok(Json(json!({ "requeued": true })))
}
