//! Flush of notifications that were parked during quiet hours.

use std::future::Future;

use sea_orm::DatabaseConnection;

use crate::{
    dispatch::{DispatchResult, PushMessage},
    error::AppResult,
    model::deferred_notification::DeferredNotificationCtrl,
};

/// Dispatch every due pending notification and mark it sent. A failed send
/// leaves the row pending so the next flush picks it up again.
pub async fn flush_due_notifications<F, Fut>(
    conn: &DatabaseConnection,
    limit: u64,
    send: F,
) -> AppResult<usize>
where
    F: Fn(PushMessage) -> Fut,
    Fut: Future<Output = DispatchResult>,
{
    let due = DeferredNotificationCtrl::find_due(conn, limit).await?;
    if due.is_empty() {
        return Ok(0);
    }

    tracing::info!("Flushing {} deferred notifications", due.len());

    let mut flushed = 0;
    for notification in due {
        let message = PushMessage {
            device_token: notification.device_token.clone(),
            platform: notification.platform.clone(),
            title: notification.title.clone(),
            body: notification.body.clone(),
            data: notification.data.clone(),
        };

        let result = send(message).await;
        if result.success {
            DeferredNotificationCtrl::mark_sent(conn, notification.id).await?;
            flushed += 1;
        } else {
            tracing::error!(
                "Deferred push {} failed, leaving pending: {:?}",
                notification.id,
                result.error
            );
        }
    }

    Ok(flushed)
}
