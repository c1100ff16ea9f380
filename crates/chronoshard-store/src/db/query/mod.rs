//! Filter and patch builders, one module per entity.
//!
//! Builders validate identifier formats at the boundary and return
//! [`Filter`](crate::db::filter::Filter) trees; they never talk to the
//! driver themselves.

pub mod events;
pub mod instances;
pub mod scope;
pub mod trackings;

#[cfg(test)]
mod trackings_tests;

use chrono::{DateTime, Utc};
use chronoshard_core::types::AttendanceStatus;
use serde_json::Value;

use crate::db::filter::{Update, time_value};

/// ## Summary
/// Builds the attendance patch shared by events and occurrences: accept
/// adds the actor to `accepted_ids` and removes them from
/// `declined_ids`, decline is the mirror. Returns `None` for a neutral
/// reply, which performs no write at all.
#[must_use]
pub fn attendance_patch(
    user_id: &str,
    status: AttendanceStatus,
    now: DateTime<Utc>,
) -> Option<Update> {
    let user = Value::from(user_id);
    match status {
        AttendanceStatus::Accept => Some(
            Update::default()
                .add_to_set("accepted_ids", user.clone())
                .pull("declined_ids", user)
                .set("updated_at", time_value(now)),
        ),
        AttendanceStatus::Decline => Some(
            Update::default()
                .add_to_set("declined_ids", user.clone())
                .pull("accepted_ids", user)
                .set("updated_at", time_value(now)),
        ),
        AttendanceStatus::Neutral => None,
    }
}
