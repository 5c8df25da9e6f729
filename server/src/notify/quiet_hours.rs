//! Quiet-hours deferral for push notifications.
//!
//! Whether a given send should be deferred is the caller's decision; this
//! module supplies the window test, the resume-time computation, and the
//! insert that parks a notification until the window ends.

use chrono::{DateTime, Duration, TimeZone, Timelike, Utc};
use chrono_tz::Tz;
use sea_orm::DatabaseConnection;

use crate::{
    error::AppResult,
    model::deferred_notification::{DeferredNotificationCtrl, NewDeferredNotification},
};

/// Whether `hour` falls inside the quiet window. Windows may wrap midnight
/// (start 22, end 8). A zero-length window never matches.
pub fn hour_is_quiet(hour: u32, start_hour: u32, end_hour: u32) -> bool {
    if start_hour == end_hour {
        return false;
    }
    if start_hour < end_hour {
        hour >= start_hour && hour < end_hour
    } else {
        hour >= start_hour || hour < end_hour
    }
}

pub fn is_within_quiet_hours(
    now: DateTime<Utc>,
    tz: Tz,
    start_hour: u32,
    end_hour: u32,
) -> bool {
    let local = now.with_timezone(&tz);
    hour_is_quiet(local.hour(), start_hour, end_hour)
}

/// The next moment the quiet window ends, in UTC. If today's window end has
/// already passed, the notification resumes tomorrow.
pub fn next_resume_time(now: DateTime<Utc>, tz: Tz, end_hour: u32) -> DateTime<Utc> {
    let local = now.with_timezone(&tz);
    let mut resume_date = local.date_naive();
    if local.hour() >= end_hour {
        resume_date = resume_date + Duration::days(1);
    }
    let naive = resume_date
        .and_hms_opt(end_hour, 0, 0)
        .expect("end_hour is validated to 0..24");

    match tz.from_local_datetime(&naive).earliest() {
        Some(resumed) => resumed.with_timezone(&Utc),
        // the resume instant fell into a DST gap; push past it
        None => now + Duration::hours(1),
    }
}

/// Park a notification until the recipient's quiet hours end.
pub async fn queue_for_quiet_hours(
    conn: &DatabaseConnection,
    notification: NewDeferredNotification,
) -> AppResult<()> {
    tracing::info!(
        "Deferring push for {} until {}",
        notification.device_token,
        notification.resume_at
    );
    DeferredNotificationCtrl::insert(conn, notification).await
}
