//! Materialized-occurrence store.
//!
//! Occurrences live in their owning event's shard, so every per-event
//! operation is single-shard; only multi-event reads fan out. Writing an
//! occurrence requires a well-formed `event_id` but the store does not
//! verify the event exists — ownership validation belongs to the
//! recurrence expander.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use chronoshard_core::clock::Clock;
use chronoshard_core::types::{AttendanceStatus, EntityKind, Repeat, Scope};
use uuid::Uuid;

use crate::db::driver::{Collection, Database, Document};
use crate::db::fanout::FanOut;
use crate::db::filter::id_value;
use crate::db::id::{IdClock, parse_id};
use crate::db::query::scope::VisibilityOptions;
use crate::db::query::{self, instances as instance_query};
use crate::db::shard::{Bucket, bucket_of, collection_name};
use crate::error::{StoreError, StoreResult};
use crate::model::instance::RecurringInstance;
use crate::model::{from_document, to_document};
use crate::store::{decode_all, list_sort, optional_ids, optional_strings};

/// Request to materialize one occurrence of an event.
#[derive(Debug, Clone)]
pub struct CreateInstance {
    pub title: String,
    pub description: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub all_day: bool,
    pub repeat: Repeat,
    pub repeat_until: Option<DateTime<Utc>>,
    pub system: bool,
    pub public: bool,
    pub assign_ids: Vec<String>,
    pub department_ids: Vec<String>,
    pub branch_ids: Vec<String>,
    pub room_ids: Vec<String>,
    pub notify_time: Option<DateTime<Utc>>,
}

/// Request to update one occurrence. Same unset-on-empty contract as
/// event updates.
#[derive(Debug, Clone)]
pub struct UpdateInstance {
    pub id: String,
    pub event_id: String,
    pub title: String,
    pub description: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub all_day: bool,
    pub public: bool,
    pub assign_ids: Vec<String>,
    pub department_ids: Vec<String>,
    pub branch_ids: Vec<String>,
    pub room_ids: Vec<String>,
    pub notify_time: Option<DateTime<Utc>>,
}

/// Per-event list request with optional open-ended bounds.
#[derive(Debug, Clone, Default)]
pub struct ListInstances {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub visibility: VisibilityOptions,
}

/// Multi-event read request; the window applies only when both bounds
/// are present and overlaps strictly.
#[derive(Debug, Clone, Default)]
pub struct ListInstancesByEvents {
    pub event_ids: Vec<String>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub notify_time: Option<DateTime<Utc>>,
}

/// Selected-occurrence delete request. An empty id list addresses every
/// occurrence of the event.
#[derive(Debug, Clone)]
pub struct DeleteInstances {
    pub event_id: String,
    pub ids: Vec<String>,
}

/// Attendance reply for one occurrence.
#[derive(Debug, Clone)]
pub struct UpdateInstanceAttendance {
    pub id: String,
    pub event_id: String,
    pub status: AttendanceStatus,
}

/// CRUD and batch operations over materialized occurrences.
pub struct RecurringInstanceStore<D: Database> {
    db: Arc<D>,
    ids: IdClock,
    clock: Clock,
    fanout: FanOut,
}

impl<D: Database> RecurringInstanceStore<D> {
    #[must_use]
    pub fn new(db: Arc<D>, clock: Clock, fanout: FanOut) -> Self {
        Self {
            db,
            ids: IdClock::new(clock.clone()),
            clock,
            fanout,
        }
    }

    fn shard(&self, bucket: Bucket) -> D::Coll {
        self.db
            .collection(&collection_name(EntityKind::RecurringInstances, bucket))
    }

    fn build_instance(
        &self,
        sc: &Scope,
        event_id: Uuid,
        input: CreateInstance,
        now: DateTime<Utc>,
    ) -> StoreResult<RecurringInstance> {
        Ok(RecurringInstance {
            id: self.ids.generate(),
            event_id,
            shop_id: sc.shop_id.clone(),
            title: input.title,
            description: input.description.filter(|d| !d.is_empty()),
            start_time: input.start_time,
            end_time: input.end_time,
            all_day: input.all_day,
            repeat: input.repeat,
            repeat_until: input.repeat_until,
            created_by_id: (!input.system).then(|| sc.user_id.clone()),
            system: input.system,
            public: input.public,
            assign_ids: optional_strings(&input.assign_ids),
            department_ids: optional_ids(&input.department_ids)?,
            branch_ids: optional_ids(&input.branch_ids)?,
            room_ids: optional_ids(&input.room_ids)?,
            accepted_ids: None,
            declined_ids: None,
            notify_time: input.notify_time,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        })
    }

    /// ## Summary
    /// Materializes one occurrence in the owning event's shard.
    ///
    /// ## Errors
    /// `InvalidIdentifier` for a malformed event or audience id;
    /// `Storage` on driver failure.
    #[tracing::instrument(skip_all, fields(shop = %sc.shop_id, event = %event_id))]
    pub async fn create(
        &self,
        sc: &Scope,
        event_id: &str,
        input: CreateInstance,
    ) -> StoreResult<RecurringInstance> {
        let event_id = parse_id(event_id)?;
        let instance = self.build_instance(sc, event_id, input, self.clock.now())?;

        let doc = to_document(&instance).map_err(StoreError::storage("instances.create"))?;
        self.shard(bucket_of(event_id)?)
            .insert_one(doc)
            .await
            .map_err(StoreError::storage("instances.create"))?;

        Ok(instance)
    }

    /// ## Summary
    /// Materializes a batch of occurrences for one event. Every item is
    /// validated and built before any write; the first failure aborts
    /// the whole batch with zero writes. An empty batch is a no-op.
    ///
    /// ## Errors
    /// `InvalidIdentifier` from any item's validation; `Storage` on
    /// driver failure.
    #[tracing::instrument(skip_all, fields(shop = %sc.shop_id, event = %event_id, count = items.len()))]
    pub async fn create_many(
        &self,
        sc: &Scope,
        event_id: &str,
        items: Vec<CreateInstance>,
    ) -> StoreResult<Vec<RecurringInstance>> {
        if items.is_empty() {
            return Ok(Vec::new());
        }

        let event_id = parse_id(event_id)?;
        let now = self.clock.now();

        let instances = items
            .into_iter()
            .map(|item| self.build_instance(sc, event_id, item, now))
            .collect::<StoreResult<Vec<_>>>()?;
        let docs = instances
            .iter()
            .map(to_document)
            .collect::<Result<Vec<Document>, _>>()
            .map_err(StoreError::storage("instances.create_many"))?;

        self.shard(bucket_of(event_id)?)
            .insert_many(docs)
            .await
            .map_err(StoreError::storage("instances.create_many"))?;

        Ok(instances)
    }

    /// ## Summary
    /// Fetches one live occurrence. The owning event id locates the
    /// shard.
    ///
    /// ## Errors
    /// `InvalidIdentifier` for malformed ids; `NotFound` if the
    /// occurrence is absent or soft-deleted; `Storage` on driver failure.
    #[tracing::instrument(skip_all, fields(shop = %sc.shop_id, id = %id, event = %event_id))]
    pub async fn detail(
        &self,
        sc: &Scope,
        id: &str,
        event_id: &str,
    ) -> StoreResult<RecurringInstance> {
        let id = parse_id(id)?;
        let event_id = parse_id(event_id)?;
        let filter = instance_query::detail(sc, id)?;

        let doc = self
            .shard(bucket_of(event_id)?)
            .find_one(&filter)
            .await
            .map_err(StoreError::storage("instances.detail"))?
            .ok_or(StoreError::NotFound("recurring instance"))?;

        from_document(doc).map_err(StoreError::storage("instances.detail"))
    }

    /// ## Summary
    /// Applies a `{set, unset}` patch to one occurrence and returns its
    /// new state.
    ///
    /// ## Errors
    /// `InvalidIdentifier` from patch building; `NotFound` if no live
    /// occurrence matches; `Storage` on driver failure.
    #[tracing::instrument(skip_all, fields(shop = %sc.shop_id, id = %input.id))]
    pub async fn update(&self, sc: &Scope, input: &UpdateInstance) -> StoreResult<RecurringInstance> {
        let id = parse_id(&input.id)?;
        let event_id = parse_id(&input.event_id)?;
        let filter = instance_query::detail(sc, id)?;
        let patch = instance_query::update_patch(input, self.clock.now())?;

        let shard = self.shard(bucket_of(event_id)?);
        let matched = shard
            .update_one(&filter, &patch)
            .await
            .map_err(StoreError::storage("instances.update"))?;
        if matched == 0 {
            return Err(StoreError::NotFound("recurring instance"));
        }

        let doc = shard
            .find_one(&filter)
            .await
            .map_err(StoreError::storage("instances.update"))?
            .ok_or(StoreError::NotFound("recurring instance"))?;
        from_document(doc).map_err(StoreError::storage("instances.update"))
    }

    /// ## Summary
    /// Soft-deletes selected occurrences of an event, or all of them
    /// when no ids are given.
    ///
    /// ## Errors
    /// `InvalidIdentifier` for malformed ids; `Storage` on driver
    /// failure.
    #[tracing::instrument(skip_all, fields(shop = %sc.shop_id, event = %input.event_id))]
    pub async fn delete(&self, sc: &Scope, input: &DeleteInstances) -> StoreResult<()> {
        let event_id = parse_id(&input.event_id)?;
        let ids = input
            .ids
            .iter()
            .map(|id| parse_id(id))
            .collect::<StoreResult<Vec<_>>>()?;
        let filter = instance_query::delete(sc, event_id, &ids)?;

        self.shard(bucket_of(event_id)?)
            .soft_delete_many(&filter, self.clock.now())
            .await
            .map_err(StoreError::storage("instances.delete"))?;
        Ok(())
    }

    /// ## Summary
    /// Lists one event's live occurrences visible to the actor, newest
    /// first. Bounds may be open-ended on either side.
    ///
    /// ## Errors
    /// `InvalidIdentifier` for malformed ids; `Storage` on driver
    /// failure.
    #[tracing::instrument(skip_all, fields(shop = %sc.shop_id, event = %event_id))]
    pub async fn list(
        &self,
        sc: &Scope,
        event_id: &str,
        opt: &ListInstances,
    ) -> StoreResult<Vec<RecurringInstance>> {
        let event_id = parse_id(event_id)?;
        let filter = instance_query::list(sc, event_id, opt)?;

        let docs = self
            .shard(bucket_of(event_id)?)
            .find(&filter, &list_sort())
            .await
            .map_err(StoreError::storage("instances.list"))?;
        decode_all(docs, "instances.list")
    }

    /// ## Summary
    /// Soft-deletes every live occurrence of an event. Used when the
    /// master event is deleted.
    ///
    /// ## Errors
    /// `InvalidIdentifier` for a malformed event id; `Storage` on driver
    /// failure.
    #[tracing::instrument(skip_all, fields(shop = %sc.shop_id, event = %event_id))]
    pub async fn delete_by_event_id(&self, sc: &Scope, event_id: &str) -> StoreResult<()> {
        let event_id = parse_id(event_id)?;
        let filter = instance_query::by_event(sc, event_id)?;

        self.shard(bucket_of(event_id)?)
            .soft_delete_many(&filter, self.clock.now())
            .await
            .map_err(StoreError::storage("instances.delete_by_event_id"))?;
        Ok(())
    }

    /// ## Summary
    /// Soft-deletes every occurrence starting strictly after `date`.
    /// Used when a recurrence is shortened.
    ///
    /// ## Errors
    /// `InvalidArgument` when `date` is missing; `InvalidIdentifier` for
    /// a malformed event id; `Storage` on driver failure.
    #[tracing::instrument(skip_all, fields(shop = %sc.shop_id, event = %event_id))]
    pub async fn delete_next_after(
        &self,
        sc: &Scope,
        event_id: &str,
        date: Option<DateTime<Utc>>,
    ) -> StoreResult<()> {
        let Some(date) = date else {
            return Err(StoreError::InvalidArgument(
                "delete-next requires a cutoff date",
            ));
        };
        let event_id = parse_id(event_id)?;
        let filter = instance_query::next_after(sc, event_id, date)?;

        self.shard(bucket_of(event_id)?)
            .soft_delete_many(&filter, self.clock.now())
            .await
            .map_err(StoreError::storage("instances.delete_next_after"))?;
        Ok(())
    }

    /// ## Summary
    /// Records the actor's attendance reply on one occurrence, with the
    /// same semantics as the event store: accept and decline are
    /// idempotent set moves, neutral performs no write.
    ///
    /// ## Errors
    /// `InvalidIdentifier` for malformed ids; `NotFound` if no live
    /// occurrence matches; `Storage` on driver failure.
    #[tracing::instrument(skip_all, fields(shop = %sc.shop_id, id = %input.id, status = ?input.status))]
    pub async fn update_attendance(
        &self,
        sc: &Scope,
        input: &UpdateInstanceAttendance,
    ) -> StoreResult<()> {
        let id = parse_id(&input.id)?;
        let event_id = parse_id(&input.event_id)?;
        let Some(patch) = query::attendance_patch(&sc.user_id, input.status, self.clock.now())
        else {
            tracing::debug!("neutral attendance reply, skipping write");
            return Ok(());
        };

        let filter = instance_query::detail(sc, id)?
            .and_with(crate::db::filter::Filter::Eq(
                "event_id".to_string(),
                id_value(event_id),
            ));
        let matched = self
            .shard(bucket_of(event_id)?)
            .update_one(&filter, &patch)
            .await
            .map_err(StoreError::storage("instances.update_attendance"))?;
        if matched == 0 {
            return Err(StoreError::NotFound("recurring instance"));
        }
        Ok(())
    }

    /// ## Summary
    /// Reads occurrences of many events in one logical call: event ids
    /// are grouped by their shard, one concurrent read per shard, merged
    /// newest-first.
    ///
    /// ## Errors
    /// `InvalidIdentifier` on the first malformed event id; the first
    /// shard error otherwise, with partial results discarded.
    #[tracing::instrument(skip_all, fields(shop = %sc.shop_id, count = opt.event_ids.len()))]
    pub async fn list_by_event_ids(
        &self,
        sc: &Scope,
        opt: ListInstancesByEvents,
    ) -> StoreResult<Vec<RecurringInstance>> {
        let mut groups: HashMap<Bucket, Vec<Uuid>> = HashMap::new();
        for raw in &opt.event_ids {
            let event_id = parse_id(raw)?;
            groups.entry(bucket_of(event_id)?).or_default().push(event_id);
        }

        let sc = sc.clone();
        let opt = Arc::new(opt);
        self.fanout
            .run(groups.into_iter().collect(), |(bucket, event_ids)| {
                let db = Arc::clone(&self.db);
                let sc = sc.clone();
                let opt = Arc::clone(&opt);
                async move {
                    let filter = instance_query::by_event_ids(&sc, &event_ids, &opt)?;
                    let col =
                        db.collection(&collection_name(EntityKind::RecurringInstances, bucket));
                    let docs = col
                        .find(&filter, &list_sort())
                        .await
                        .map_err(StoreError::storage("instances.list_by_event_ids"))?;
                    decode_all(docs, "instances.list_by_event_ids")
                }
            })
            .await
    }
}
