use chrono::{DateTime, Utc};
use chronoshard_core::types::Repeat;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One already-materialized `[start, end]` window inside a tracking
/// row's month bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedRange {
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub start_time: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub end_time: DateTime<Utc>,
}

/// Generation ledger row: occurrences for `event_id` have been
/// materialized inside the `(month, year)` bucket for the listed ranges.
///
/// At most one live row should exist per `(event_id, month, year)`;
/// the ledger is advisory, enforced by callers consulting it before
/// expanding, not by a storage constraint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecurringTracking {
    pub id: Uuid,
    pub event_id: Uuid,
    pub shop_id: String,

    pub month: u32,
    pub year: i32,

    /// Pattern snapshot, copied from the event at generation time.
    pub repeat: Repeat,
    #[serde(
        default,
        with = "chrono::serde::ts_milliseconds_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub repeat_until: Option<DateTime<Utc>>,

    #[serde(default)]
    pub ranges: Vec<GeneratedRange>,

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

impl RecurringTracking {
    /// ## Summary
    /// Returns the sub-ranges of `[from, to]` not covered by any stored
    /// range, in chronological order. An empty result means the window
    /// is fully generated.
    #[must_use]
    pub fn uncovered_ranges(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Vec<(DateTime<Utc>, DateTime<Utc>)> {
        if from >= to {
            return Vec::new();
        }

        let mut covered: Vec<GeneratedRange> = self
            .ranges
            .iter()
            .copied()
            .filter(|r| r.end_time > from && r.start_time < to)
            .collect();
        covered.sort_by_key(|r| r.start_time);

        let mut gaps = Vec::new();
        let mut cursor = from;
        for range in covered {
            if range.start_time > cursor {
                gaps.push((cursor, range.start_time));
            }
            cursor = cursor.max(range.end_time);
            if cursor >= to {
                break;
            }
        }
        if cursor < to {
            gaps.push((cursor, to));
        }
        gaps
    }
}
