use chrono::{DateTime, Utc};
use chronoshard_core::types::Repeat;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::fanout::MergeOrder;

/// One concrete occurrence of a recurring [`super::event::Event`].
///
/// `event_id` is a relation, not ownership: once materialized, an
/// occurrence's lifecycle is independent of the master event. The
/// occurrence is stored in the owning event's shard so all of an event's
/// occurrences are co-located.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecurringInstance {
    pub id: Uuid,
    pub event_id: Uuid,
    pub shop_id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub start_time: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub end_time: DateTime<Utc>,
    pub all_day: bool,

    pub repeat: Repeat,
    #[serde(
        default,
        with = "chrono::serde::ts_milliseconds_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub repeat_until: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by_id: Option<String>,
    pub system: bool,
    pub public: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assign_ids: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department_ids: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch_ids: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room_ids: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accepted_ids: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub declined_ids: Option<Vec<String>>,

    #[serde(
        default,
        with = "chrono::serde::ts_milliseconds_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub notify_time: Option<DateTime<Utc>>,

    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub updated_at: DateTime<Utc>,
    #[serde(
        default,
        with = "chrono::serde::ts_milliseconds_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl MergeOrder for RecurringInstance {
    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn id(&self) -> Uuid {
        self.id
    }
}
