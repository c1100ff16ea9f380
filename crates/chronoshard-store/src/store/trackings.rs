//! Generation ledger.
//!
//! One unsharded collection records which `(event, month, year)` buckets
//! the recurrence expander has already materialized, and for which
//! ranges. The ledger is advisory: it prevents duplicate expansion only
//! because callers consult it before expanding; there is no storage
//! uniqueness constraint behind it.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use chronoshard_core::clock::Clock;
use chronoshard_core::constants::RECURRING_TRACKINGS_COLLECTION;
use chronoshard_core::types::{Repeat, Scope};
use serde_json::Value;

use crate::db::driver::{Collection, Database};
use crate::db::filter::FindOptions;
use crate::db::id::{IdClock, parse_id};
use crate::db::query::trackings as tracking_query;
use crate::error::{StoreError, StoreResult};
use crate::model::tracking::{GeneratedRange, RecurringTracking};
use crate::model::{from_document, to_document};
use crate::store::decode_all;

/// Request to record a completed generation pass for one month bucket.
#[derive(Debug, Clone)]
pub struct CreateTracking {
    pub event_id: String,
    pub month: u32,
    pub year: i32,
    /// Pattern snapshot, copied from the event at generation time.
    pub repeat: Repeat,
    pub repeat_until: Option<DateTime<Utc>>,
    pub ranges: Vec<GeneratedRange>,
}

/// Deletion criteria; at least one must be set.
#[derive(Debug, Clone, Default)]
pub struct DeleteTrackings {
    pub ids: Vec<String>,
    pub event_id: Option<String>,
    pub month_gte: Option<u32>,
    pub year_gte: Option<i32>,
}

impl DeleteTrackings {
    fn is_empty(&self) -> bool {
        self.ids.is_empty()
            && self.event_id.is_none()
            && self.month_gte.is_none()
            && self.year_gte.is_none()
    }
}

/// Append/query log of completed generation passes.
pub struct RecurringTrackingLedger<D: Database> {
    db: Arc<D>,
    ids: IdClock,
    clock: Clock,
}

impl<D: Database> RecurringTrackingLedger<D> {
    #[must_use]
    pub fn new(db: Arc<D>, clock: Clock) -> Self {
        Self {
            db,
            ids: IdClock::new(clock.clone()),
            clock,
        }
    }

    fn collection(&self) -> D::Coll {
        self.db.collection(RECURRING_TRACKINGS_COLLECTION)
    }

    /// ## Summary
    /// Records that occurrences were materialized for an event's
    /// `(month, year)` bucket. A live row already covering the bucket is
    /// logged as a duplicate-expansion signal but does not block the
    /// write — the ledger stays advisory.
    ///
    /// ## Errors
    /// `InvalidArgument` for an out-of-range month; `InvalidIdentifier`
    /// for a malformed event id; `Storage` on driver failure.
    #[tracing::instrument(skip_all, fields(shop = %sc.shop_id, event = %input.event_id, month = input.month, year = input.year))]
    pub async fn create(&self, sc: &Scope, input: CreateTracking) -> StoreResult<RecurringTracking> {
        if input.month == 0 || input.month > 12 {
            return Err(StoreError::InvalidArgument("month must be within 1..=12"));
        }
        let event_id = parse_id(&input.event_id)?;

        let col = self.collection();
        let bucket_probe = tracking_query::by_event(sc, event_id)?
            .and_with(crate::db::filter::Filter::Eq(
                "month".to_string(),
                Value::from(input.month),
            ))
            .and_with(crate::db::filter::Filter::Eq(
                "year".to_string(),
                Value::from(input.year),
            ));
        let existing = col
            .find_one(&bucket_probe)
            .await
            .map_err(StoreError::storage("trackings.create"))?;
        if existing.is_some() {
            tracing::warn!(
                event = %event_id,
                month = input.month,
                year = input.year,
                "tracking row already present for bucket; concurrent expansion likely"
            );
        }

        let now = self.clock.now();
        let row = RecurringTracking {
            id: self.ids.generate(),
            event_id,
            shop_id: sc.shop_id.clone(),
            month: input.month,
            year: input.year,
            repeat: input.repeat,
            repeat_until: input.repeat_until,
            ranges: input.ranges,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };

        let doc = to_document(&row).map_err(StoreError::storage("trackings.create"))?;
        col.insert_one(doc)
            .await
            .map_err(StoreError::storage("trackings.create"))?;

        Ok(row)
    }

    /// ## Summary
    /// Returns rows proving generation already happened inside
    /// `[from, to]`: a touched `(year, month)`, an overlapping stored
    /// range, and a recurrence horizon not ending before `from`. The
    /// expander skips these buckets.
    ///
    /// ## Errors
    /// `InvalidIdentifier` if the scope's shop id is malformed;
    /// `Storage` on driver failure.
    #[tracing::instrument(skip_all, fields(shop = %sc.shop_id, from = %from, to = %to))]
    pub async fn get_generated_in_range(
        &self,
        sc: &Scope,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> StoreResult<Vec<RecurringTracking>> {
        let filter = tracking_query::generated_in_range(sc, from, to)?;
        let docs = self
            .collection()
            .find(&filter, &FindOptions::default())
            .await
            .map_err(StoreError::storage("trackings.get_generated_in_range"))?;
        decode_all(docs, "trackings.get_generated_in_range")
    }

    /// ## Summary
    /// Returns rows of still-live recurrences whose coverage of
    /// `[from, to]` is incomplete: daily/weekly rows missing a stored
    /// range starting inside the window, monthly/yearly rows missing a
    /// touched `(year, month)` bucket. Use
    /// [`RecurringTracking::uncovered_ranges`] to turn a row into the
    /// concrete gaps to expand.
    ///
    /// ## Errors
    /// `InvalidIdentifier` if the scope's shop id is malformed;
    /// `Storage` on driver failure.
    #[tracing::instrument(skip_all, fields(shop = %sc.shop_id, from = %from, to = %to))]
    pub async fn get_ungenerated_in_range(
        &self,
        sc: &Scope,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> StoreResult<Vec<RecurringTracking>> {
        let filter = tracking_query::ungenerated_in_range(sc, from, to)?;
        let docs = self
            .collection()
            .find(&filter, &FindOptions::default())
            .await
            .map_err(StoreError::storage("trackings.get_ungenerated_in_range"))?;
        decode_all(docs, "trackings.get_ungenerated_in_range")
    }

    /// ## Summary
    /// Extends the recurrence horizon on every live row of an event.
    /// This is the only mutation the ledger supports.
    ///
    /// ## Errors
    /// `InvalidIdentifier` for a malformed event id; `Storage` on driver
    /// failure.
    #[tracing::instrument(skip_all, fields(shop = %sc.shop_id, event = %event_id, until = %repeat_until))]
    pub async fn extend_repeat_until(
        &self,
        sc: &Scope,
        event_id: &str,
        repeat_until: DateTime<Utc>,
    ) -> StoreResult<()> {
        let event_id = parse_id(event_id)?;
        let filter = tracking_query::by_event(sc, event_id)?;
        let patch = tracking_query::extend_repeat_until_patch(repeat_until);

        self.collection()
            .update_many(&filter, &patch)
            .await
            .map_err(StoreError::storage("trackings.extend_repeat_until"))?;
        Ok(())
    }

    /// ## Summary
    /// Soft-deletes rows by any combination of row ids, owning event,
    /// and month/year lower bounds. Used when the owning event is
    /// deleted or its recurrence is shortened.
    ///
    /// ## Errors
    /// `InvalidArgument` when no criterion is supplied;
    /// `InvalidIdentifier` for malformed ids; `Storage` on driver
    /// failure.
    #[tracing::instrument(skip_all, fields(shop = %sc.shop_id))]
    pub async fn delete(&self, sc: &Scope, input: &DeleteTrackings) -> StoreResult<()> {
        if input.is_empty() {
            return Err(StoreError::InvalidArgument(
                "tracking deletion requires at least one criterion",
            ));
        }
        let filter = tracking_query::delete(sc, input)?;

        self.collection()
            .soft_delete_many(&filter, self.clock.now())
            .await
            .map_err(StoreError::storage("trackings.delete"))?;
        Ok(())
    }
}
