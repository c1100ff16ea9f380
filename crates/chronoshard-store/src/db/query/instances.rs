//! Query composition for materialized occurrences.

use chrono::{DateTime, Utc};
use chronoshard_core::types::Scope;
use serde_json::Value;
use uuid::Uuid;

use crate::db::filter::{Filter, Update, id_value, time_value};
use crate::db::query::events::{list_field, string_values};
use crate::db::query::scope;
use crate::error::StoreResult;
use crate::store::instances::{ListInstances, ListInstancesByEvents, UpdateInstance};

/// ## Summary
/// Returns the point-lookup predicate for one occurrence.
///
/// ## Errors
/// Returns `InvalidIdentifier` if the scope's shop id is malformed.
pub fn detail(sc: &Scope, id: Uuid) -> StoreResult<Filter> {
    Ok(scope::base(sc)?.and_with(Filter::Eq("id".to_string(), id_value(id))))
}

/// ## Summary
/// Builds the per-event list predicate with optional open-ended time
/// bounds and the visibility clause.
///
/// ## Errors
/// Returns `InvalidIdentifier` for a malformed id in the options or the
/// scope.
pub fn list(sc: &Scope, event_id: Uuid, opt: &ListInstances) -> StoreResult<Filter> {
    let mut filter = scope::base(sc)?
        .and_with(Filter::Eq("event_id".to_string(), id_value(event_id)));

    match (opt.from, opt.to) {
        (Some(from), Some(to)) => {
            filter = filter.and_with(Filter::And(vec![
                Filter::Lte("start_time".to_string(), time_value(to)),
                Filter::Gte("end_time".to_string(), time_value(from)),
            ]));
        }
        (Some(from), None) => {
            filter = filter.and_with(Filter::Gte("end_time".to_string(), time_value(from)));
        }
        (None, Some(to)) => {
            filter = filter.and_with(Filter::Lte("start_time".to_string(), time_value(to)));
        }
        (None, None) => {}
    }

    filter = filter.and_with(scope::visibility(sc, &opt.visibility)?);

    Ok(filter)
}

/// ## Summary
/// Returns the predicate for deleting selected occurrences of an event.
/// An empty id list addresses every occurrence of the event.
///
/// ## Errors
/// Returns `InvalidIdentifier` if the scope's shop id is malformed.
pub fn delete(sc: &Scope, event_id: Uuid, ids: &[Uuid]) -> StoreResult<Filter> {
    let mut filter = scope::base(sc)?;
    if !ids.is_empty() {
        let values = ids.iter().map(|id| id_value(*id)).collect();
        filter = filter.and_with(Filter::In("id".to_string(), values));
    }
    Ok(filter.and_with(Filter::Eq("event_id".to_string(), id_value(event_id))))
}

/// ## Summary
/// Returns the predicate for every occurrence of an event.
///
/// ## Errors
/// Returns `InvalidIdentifier` if the scope's shop id is malformed.
pub fn by_event(sc: &Scope, event_id: Uuid) -> StoreResult<Filter> {
    Ok(scope::base(sc)?.and_with(Filter::Eq("event_id".to_string(), id_value(event_id))))
}

/// ## Summary
/// Returns the predicate for occurrences strictly after a date, used
/// when a recurrence is shortened.
///
/// ## Errors
/// Returns `InvalidIdentifier` if the scope's shop id is malformed.
pub fn next_after(sc: &Scope, event_id: Uuid, after: DateTime<Utc>) -> StoreResult<Filter> {
    Ok(by_event(sc, event_id)?
        .and_with(Filter::Gt("start_time".to_string(), time_value(after))))
}

/// ## Summary
/// Builds the per-shard predicate for a multi-event read: occurrences of
/// any listed event, with a strict-overlap window and an optional
/// notify-time match.
///
/// ## Errors
/// Returns `InvalidIdentifier` if the scope's shop id is malformed.
pub fn by_event_ids(
    sc: &Scope,
    event_ids: &[Uuid],
    opt: &ListInstancesByEvents,
) -> StoreResult<Filter> {
    let values = event_ids.iter().map(|id| id_value(*id)).collect();
    let mut filter = scope::base(sc)?.and_with(Filter::In("event_id".to_string(), values));

    if let (Some(from), Some(to)) = (opt.from, opt.to) {
        filter = filter.and_with(Filter::And(vec![
            Filter::Gt("end_time".to_string(), time_value(from)),
            Filter::Lt("start_time".to_string(), time_value(to)),
        ]));
    }

    if let Some(notify_time) = opt.notify_time {
        filter = filter.and_with(Filter::Eq("notify_time".to_string(), time_value(notify_time)));
    }

    Ok(filter)
}

/// ## Summary
/// Translates an occurrence update into a `{set, unset}` patch, with the
/// same unset-on-empty contract as the event patch.
///
/// ## Errors
/// Returns `InvalidIdentifier` for a malformed department, branch, or
/// room id.
pub fn update_patch(opt: &UpdateInstance, now: DateTime<Utc>) -> StoreResult<Update> {
    let mut patch = Update::default();

    if !opt.title.is_empty() {
        patch = patch.set("title", Value::from(opt.title.as_str()));
    }

    patch = match opt.description.as_deref() {
        Some(description) if !description.is_empty() => {
            patch.set("description", Value::from(description))
        }
        _ => patch.unset("description"),
    };

    patch = patch
        .set("start_time", time_value(opt.start_time))
        .set("end_time", time_value(opt.end_time))
        .set("all_day", Value::from(opt.all_day))
        .set("public", Value::from(opt.public));

    patch = list_field(patch, "assign_ids", string_values(&opt.assign_ids));
    patch = list_field(patch, "department_ids", scope::id_values(&opt.department_ids)?);
    patch = list_field(patch, "branch_ids", scope::id_values(&opt.branch_ids)?);
    patch = list_field(patch, "room_ids", scope::id_values(&opt.room_ids)?);

    if let Some(notify_time) = opt.notify_time {
        patch = patch.set("notify_time", time_value(notify_time));
    }

    Ok(patch.set("updated_at", time_value(now)))
}
