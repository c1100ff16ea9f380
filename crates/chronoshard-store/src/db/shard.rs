//! Shard routing: identifiers map to `(year, period)` buckets, buckets
//! map to physical collection names.
//!
//! A document's bucket is derived once from its routing identifier's
//! embedded timestamp and never recomputed; shard assignment is
//! immutable even when the document's own fields later change.

use chrono::{DateTime, Datelike, Utc};
use chronoshard_core::types::EntityKind;
use uuid::Uuid;

use crate::db::id::id_timestamp;
use crate::error::StoreResult;

/// One physical partition of a sharded entity: a calendar year and the
/// quarter within it (1..=4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Bucket {
    pub year: i32,
    pub period: u8,
}

impl Bucket {
    /// ## Summary
    /// Buckets a UTC instant: `period` is the calendar quarter.
    #[must_use]
    pub fn of_time(at: DateTime<Utc>) -> Self {
        let period = u8::try_from(at.month0() / 3).unwrap_or(0) + 1;
        Self {
            year: at.year(),
            period,
        }
    }
}

impl std::fmt::Display for Bucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}_{}", self.year, self.period)
    }
}

/// ## Summary
/// Buckets an identifier via its embedded timestamp. Deterministic: the
/// same identifier yields the same bucket on every node.
///
/// ## Errors
/// Returns [`crate::error::StoreError::InvalidIdentifier`] if the
/// identifier carries no embedded timestamp.
pub fn bucket_of(id: Uuid) -> StoreResult<Bucket> {
    Ok(Bucket::of_time(id_timestamp(id)?))
}

/// ## Summary
/// Resolves the physical collection name for an entity kind and bucket,
/// e.g. `events_2024_3`.
#[must_use]
pub fn collection_name(kind: EntityKind, bucket: Bucket) -> String {
    format!("{}_{}_{}", kind.as_str(), bucket.year, bucket.period)
}

/// ## Summary
/// Enumerates every bucket the closed range `[from, to]` touches, in
/// chronological order. An inverted range yields only `from`'s bucket.
#[must_use]
pub fn buckets_in_range(from: DateTime<Utc>, to: DateTime<Utc>) -> Vec<Bucket> {
    let last = Bucket::of_time(to);
    let mut buckets = Vec::new();
    let mut current = Bucket::of_time(from);
    loop {
        buckets.push(current);
        if current == last || (current.year, current.period) > (last.year, last.period) {
            break;
        }
        current = if current.period == 4 {
            Bucket {
                year: current.year + 1,
                period: 1,
            }
        } else {
            Bucket {
                year: current.year,
                period: current.period + 1,
            }
        };
    }
    buckets
}

/// A `(year, month)` pair, the grain of the generation ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

/// ## Summary
/// Enumerates every `(year, month)` the closed range `[from, to]`
/// touches, in chronological order. An inverted range yields only
/// `from`'s month.
#[must_use]
pub fn month_buckets(from: DateTime<Utc>, to: DateTime<Utc>) -> Vec<YearMonth> {
    let mut months = Vec::new();
    let (mut year, mut month) = (from.year(), from.month());
    loop {
        months.push(YearMonth { year, month });
        if (year, month) >= (to.year(), to.month()) {
            break;
        }
        if month == 12 {
            year += 1;
            month = 1;
        } else {
            month += 1;
        }
    }
    months
}
