//! Master event store.
//!
//! Events are sharded by start time: the identifier is generated from
//! the event's start instant, and the shard is derived from that
//! identifier once, at creation. List-style reads fan out over every
//! bucket the requested window touches.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use chronoshard_core::clock::Clock;
use chronoshard_core::types::{AttendanceStatus, EntityKind, Repeat, Scope};
use chronoshard_core::util::time::{end_of_day, start_of_day};
use uuid::Uuid;

use crate::db::driver::{Collection, Database};
use crate::db::fanout::FanOut;
use crate::db::id::{id_at, parse_id};
use crate::db::query::{self, events as event_query};
use crate::db::shard::{Bucket, bucket_of, buckets_in_range, collection_name};
use crate::error::{StoreError, StoreResult};
use crate::model::event::Event;
use crate::model::{from_document, to_document};
use crate::db::query::scope::VisibilityOptions;
use crate::store::{decode_all, list_sort, optional_ids, optional_strings};

/// Request to create a master event.
#[derive(Debug, Clone)]
pub struct CreateEvent {
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

/// Request to update a master event.
///
/// Empty audience lists, a missing description, and missing
/// `repeat_until`/`notify_time` clear the stored field; an empty title
/// leaves the stored title untouched.
#[derive(Debug, Clone)]
pub struct UpdateEvent {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub all_day: bool,
    pub repeat: Repeat,
    pub repeat_until: Option<DateTime<Utc>>,
    pub public: bool,
    pub assign_ids: Vec<String>,
    pub department_ids: Vec<String>,
    pub branch_ids: Vec<String>,
    pub room_ids: Vec<String>,
    pub notify_time: Option<DateTime<Utc>>,
}

/// List request: the closed window `[from, to]` plus optional filters.
#[derive(Debug, Clone)]
pub struct ListEvents {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    pub ids: Vec<String>,
    pub need_repeat: Option<bool>,
    pub visibility: VisibilityOptions,
}

/// System-job list request: tenant-wide, no visibility clause.
#[derive(Debug, Clone)]
pub struct SystemListEvents {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    pub need_repeat: Option<bool>,
    pub notify_time: Option<DateTime<Utc>>,
}

/// CRUD and fan-out reads over master events.
pub struct EventStore<D: Database> {
    db: Arc<D>,
    clock: Clock,
    fanout: FanOut,
}

impl<D: Database> EventStore<D> {
    #[must_use]
    pub fn new(db: Arc<D>, clock: Clock, fanout: FanOut) -> Self {
        Self { db, clock, fanout }
    }

    fn shard(&self, bucket: Bucket) -> D::Coll {
        self.db
            .collection(&collection_name(EntityKind::Events, bucket))
    }

    /// ## Summary
    /// Creates a master event in the shard of its start time.
    ///
    /// Non-system events require an acting user, who becomes the owner;
    /// system events carry no owner. All-day events are normalized to
    /// the full start day.
    ///
    /// ## Errors
    /// `InvalidArgument` for an ownerless non-system event or a
    /// `repeat_until` without a repeat pattern; `InvalidIdentifier` for
    /// malformed audience ids; `Storage` on driver failure.
    #[tracing::instrument(skip_all, fields(shop = %sc.shop_id, title = %input.title))]
    pub async fn create(&self, sc: &Scope, input: CreateEvent) -> StoreResult<Event> {
        if !input.system && sc.user_id.is_empty() {
            return Err(StoreError::InvalidArgument(
                "non-system events require an owner",
            ));
        }
        if input.repeat == Repeat::None && input.repeat_until.is_some() {
            return Err(StoreError::InvalidArgument(
                "repeat_until requires a repeating event",
            ));
        }

        let now = self.clock.now();
        let id = id_at(input.start_time);

        let (start_time, end_time) = if input.all_day {
            (start_of_day(input.start_time), end_of_day(input.start_time))
        } else {
            (input.start_time, input.end_time)
        };

        let event = Event {
            id,
            shop_id: sc.shop_id.clone(),
            title: input.title,
            description: input.description.filter(|d| !d.is_empty()),
            start_time,
            end_time,
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
        };

        let doc = to_document(&event).map_err(StoreError::storage("events.create"))?;
        self.shard(bucket_of(id)?)
            .insert_one(doc)
            .await
            .map_err(StoreError::storage("events.create"))?;

        Ok(event)
    }

    /// ## Summary
    /// Fetches one live event by id.
    ///
    /// ## Errors
    /// `InvalidIdentifier` for a malformed id; `NotFound` if the event is
    /// absent or soft-deleted; `Storage` on driver failure.
    #[tracing::instrument(skip_all, fields(shop = %sc.shop_id, id = %id))]
    pub async fn detail(&self, sc: &Scope, id: &str) -> StoreResult<Event> {
        let id = parse_id(id)?;
        let filter = event_query::detail(sc, id)?;

        let doc = self
            .shard(bucket_of(id)?)
            .find_one(&filter)
            .await
            .map_err(StoreError::storage("events.detail"))?
            .ok_or(StoreError::NotFound("event"))?;

        from_document(doc).map_err(StoreError::storage("events.detail"))
    }

    /// ## Summary
    /// Applies a `{set, unset}` patch to one event and returns its new
    /// state. No prior document is loaded to validate unrelated fields.
    ///
    /// ## Errors
    /// `InvalidIdentifier` / `InvalidArgument` from patch building;
    /// `NotFound` if no live event matches; `Storage` on driver failure.
    #[tracing::instrument(skip_all, fields(shop = %sc.shop_id, id = %input.id))]
    pub async fn update(&self, sc: &Scope, input: &UpdateEvent) -> StoreResult<Event> {
        let id = parse_id(&input.id)?;
        let filter = event_query::detail(sc, id)?;
        let patch = event_query::update_patch(input, self.clock.now())?;

        let shard = self.shard(bucket_of(id)?);
        let matched = shard
            .update_one(&filter, &patch)
            .await
            .map_err(StoreError::storage("events.update"))?;
        if matched == 0 {
            return Err(StoreError::NotFound("event"));
        }

        let doc = shard
            .find_one(&filter)
            .await
            .map_err(StoreError::storage("events.update"))?
            .ok_or(StoreError::NotFound("event"))?;
        from_document(doc).map_err(StoreError::storage("events.update"))
    }

    /// ## Summary
    /// Soft-deletes one event. The row remains physically present and is
    /// excluded from every subsequent read.
    ///
    /// ## Errors
    /// `InvalidIdentifier` for a malformed id; `NotFound` if no live
    /// event matches; `Storage` on driver failure.
    #[tracing::instrument(skip_all, fields(shop = %sc.shop_id, id = %id))]
    pub async fn soft_delete(&self, sc: &Scope, id: &str) -> StoreResult<()> {
        let id = parse_id(id)?;
        let filter = event_query::detail(sc, id)?;

        let matched = self
            .shard(bucket_of(id)?)
            .soft_delete_one(&filter, self.clock.now())
            .await
            .map_err(StoreError::storage("events.soft_delete"))?;
        if matched == 0 {
            return Err(StoreError::NotFound("event"));
        }
        Ok(())
    }

    /// ## Summary
    /// Lists events visible to the actor whose window overlaps
    /// `[from, to]`, fanning out over every touched bucket and merging
    /// newest-first.
    ///
    /// ## Errors
    /// `InvalidIdentifier` for malformed filter ids; the first shard
    /// error otherwise, with partial results discarded.
    #[tracing::instrument(skip_all, fields(shop = %sc.shop_id, from = %opt.from, to = %opt.to))]
    pub async fn list(&self, sc: &Scope, opt: &ListEvents) -> StoreResult<Vec<Event>> {
        let filter = event_query::list(sc, opt)?;
        let shards = buckets_in_range(opt.from, opt.to);
        tracing::debug!(shards = shards.len(), "listing events across buckets");

        self.fanout
            .run(shards, |bucket| {
                let db = Arc::clone(&self.db);
                let filter = filter.clone();
                async move {
                    let col = db.collection(&collection_name(EntityKind::Events, bucket));
                    let docs = col
                        .find(&filter, &list_sort())
                        .await
                        .map_err(StoreError::storage("events.list"))?;
                    decode_all(docs, "events.list")
                }
            })
            .await
    }

    /// ## Summary
    /// Tenant-wide list for system jobs (notification sweeps); same
    /// fan-out as [`EventStore::list`] without the visibility clause.
    ///
    /// ## Errors
    /// The first shard error; partial results are discarded.
    #[tracing::instrument(skip_all, fields(shop = %sc.shop_id))]
    pub async fn system_list(&self, sc: &Scope, opt: &SystemListEvents) -> StoreResult<Vec<Event>> {
        let filter = event_query::system_list(sc, opt)?;
        let shards = buckets_in_range(opt.from, opt.to);

        self.fanout
            .run(shards, |bucket| {
                let db = Arc::clone(&self.db);
                let filter = filter.clone();
                async move {
                    let col = db.collection(&collection_name(EntityKind::Events, bucket));
                    let docs = col
                        .find(&filter, &list_sort())
                        .await
                        .map_err(StoreError::storage("events.system_list"))?;
                    decode_all(docs, "events.system_list")
                }
            })
            .await
    }

    /// ## Summary
    /// Fetches events by id, grouping ids that share a bucket into one
    /// query and running the bucket reads concurrently.
    ///
    /// ## Errors
    /// `InvalidIdentifier` on the first malformed id; the first shard
    /// error otherwise.
    #[tracing::instrument(skip_all, fields(shop = %sc.shop_id, count = ids.len()))]
    pub async fn list_by_ids(&self, sc: &Scope, ids: &[String]) -> StoreResult<Vec<Event>> {
        let mut groups: HashMap<Bucket, Vec<Uuid>> = HashMap::new();
        for raw in ids {
            let id = parse_id(raw)?;
            groups.entry(bucket_of(id)?).or_default().push(id);
        }

        let sc = sc.clone();
        self.fanout
            .run(groups.into_iter().collect(), |(bucket, ids)| {
                let db = Arc::clone(&self.db);
                let sc = sc.clone();
                async move {
                    let filter = event_query::by_ids(&sc, &ids)?;
                    let col = db.collection(&collection_name(EntityKind::Events, bucket));
                    let docs = col
                        .find(&filter, &list_sort())
                        .await
                        .map_err(StoreError::storage("events.list_by_ids"))?;
                    decode_all(docs, "events.list_by_ids")
                }
            })
            .await
    }

    /// ## Summary
    /// Records the actor's attendance reply. Accepting adds the actor to
    /// `accepted_ids` and removes them from `declined_ids`; declining is
    /// the mirror; a neutral reply performs no write at all.
    ///
    /// ## Errors
    /// `InvalidIdentifier` for a malformed id; `NotFound` if no live
    /// event matches; `Storage` on driver failure.
    #[tracing::instrument(skip_all, fields(shop = %sc.shop_id, id = %id, status = ?status))]
    pub async fn update_attendance(
        &self,
        sc: &Scope,
        id: &str,
        status: AttendanceStatus,
    ) -> StoreResult<()> {
        let id = parse_id(id)?;
        let Some(patch) = query::attendance_patch(&sc.user_id, status, self.clock.now()) else {
            tracing::debug!("neutral attendance reply, skipping write");
            return Ok(());
        };

        let filter = event_query::detail(sc, id)?;
        let matched = self
            .shard(bucket_of(id)?)
            .update_one(&filter, &patch)
            .await
            .map_err(StoreError::storage("events.update_attendance"))?;
        if matched == 0 {
            return Err(StoreError::NotFound("event"));
        }
        Ok(())
    }

    /// ## Summary
    /// Extends (or shortens) the recurrence horizon of one event.
    ///
    /// ## Errors
    /// `InvalidIdentifier` for a malformed id; `NotFound` if no live
    /// event matches; `Storage` on driver failure.
    #[tracing::instrument(skip_all, fields(shop = %sc.shop_id, id = %id, until = %repeat_until))]
    pub async fn update_repeat_until(
        &self,
        sc: &Scope,
        id: &str,
        repeat_until: DateTime<Utc>,
    ) -> StoreResult<()> {
        let id = parse_id(id)?;
        let filter = event_query::detail(sc, id)?;
        let patch = event_query::repeat_until_patch(repeat_until, self.clock.now());

        let matched = self
            .shard(bucket_of(id)?)
            .update_one(&filter, &patch)
            .await
            .map_err(StoreError::storage("events.update_repeat_until"))?;
        if matched == 0 {
            return Err(StoreError::NotFound("event"));
        }
        Ok(())
    }
}
