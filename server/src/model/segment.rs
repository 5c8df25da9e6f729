use anyhow::Context;
use sea_orm::QuerySelect;

use crate::{db_core::prelude::*, error::AppResult};

#[derive(Debug, Clone)]
pub struct SegmentRecipient {
    pub email: String,
    pub name: Option<String>,
}

pub struct SegmentCtrl;

impl SegmentCtrl {
    /// Resolve a segment's audience, capped at `limit` members. The cap is
    /// a safety net against accidentally mailing an unbounded audience.
    pub async fn resolve_recipients(
        conn: &DatabaseConnection,
        segment_id: i32,
        limit: u64,
    ) -> AppResult<Vec<SegmentRecipient>> {
        let members = SegmentMember::find()
            .filter(segment_member::Column::SegmentId.eq(segment_id))
            .limit(limit)
            .all(conn)
            .await
            .context("Error resolving segment recipients")?;

        Ok(members
            .into_iter()
            .map(|member| SegmentRecipient {
                email: member.email,
                name: member.name,
            })
            .collect())
    }
}
