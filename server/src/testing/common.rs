//! Fixture rows and mock-database helpers shared across module tests.

use chrono::{TimeZone, Utc};
use sea_orm::MockExecResult;

use crate::db_core::prelude::*;

fn fixed_time() -> sea_orm::prelude::DateTimeWithTimeZone {
    Utc.with_ymd_and_hms(2025, 1, 15, 12, 0, 0).unwrap().into()
}

pub fn exec_ok(rows_affected: u64) -> MockExecResult {
    MockExecResult {
        last_insert_id: 0,
        rows_affected,
    }
}

pub fn campaign_fixture(id: i32, status: CampaignStatus) -> campaign::Model {
    campaign::Model {
        id,
        name: "Weekly surplus roundup".to_string(),
        subject: "Fresh picks for {{ name }}".to_string(),
        content: "<p>Hi {{ name }}, new meals are waiting near you.</p>".to_string(),
        segment_id: 1,
        status,
        scheduled_at: Some(fixed_time()),
        sent_count: 0,
        total_recipients: 0,
        sent_at: None,
        error_message: None,
        created_at: fixed_time(),
        updated_at: fixed_time(),
    }
}

pub fn member_fixture(id: i32, email: &str) -> segment_member::Model {
    segment_member::Model {
        id,
        segment_id: 1,
        email: email.to_string(),
        name: Some("Ada".to_string()),
        created_at: fixed_time(),
    }
}

pub fn automation_fixture(id: i32, is_active: bool) -> automation::Model {
    automation::Model {
        id,
        name: "New member welcome".to_string(),
        is_active,
        created_at: fixed_time(),
    }
}

pub fn step_fixture(
    id: i32,
    automation_id: i32,
    step_index: i32,
    delay_minutes: i32,
) -> automation_step::Model {
    automation_step::Model {
        id,
        automation_id,
        step_index,
        delay_minutes,
        subject: "Welcome to the neighborhood, {{ name }}".to_string(),
        content: "<p>Hi {{ name }}, here is how sharing works.</p>".to_string(),
        created_at: fixed_time(),
    }
}

pub fn queue_item_fixture(
    id: i32,
    automation_id: i32,
    step_index: i32,
    email: &str,
    status: AutomationQueueStatus,
) -> automation_queue_item::Model {
    automation_queue_item::Model {
        id,
        automation_id,
        step_index,
        recipient_email: email.to_string(),
        recipient_name: Some("Ada".to_string()),
        scheduled_at: fixed_time(),
        status,
        template_data: None,
        error_message: None,
        sent_at: None,
        created_at: fixed_time(),
    }
}

pub fn run_fixture(id: i32, automation_id: i32, email: &str) -> automation_run::Model {
    automation_run::Model {
        id,
        automation_id,
        recipient_email: email.to_string(),
        step_index: 0,
        success: true,
        error_message: None,
        created_at: fixed_time(),
    }
}

pub fn deferred_fixture(id: i32, device_token: &str) -> deferred_notification::Model {
    deferred_notification::Model {
        id,
        device_token: device_token.to_string(),
        platform: PushPlatform::Ios,
        title: "A meal you saved is available".to_string(),
        body: "Homemade lasagna was just relisted near you.".to_string(),
        data: None,
        resume_at: fixed_time(),
        status: DeferredStatus::Pending,
        sent_at: None,
        created_at: fixed_time(),
    }
}
