//! Query composition for master events.

use chrono::{DateTime, Utc};
use chronoshard_core::types::{Repeat, Scope};
use serde_json::Value;
use uuid::Uuid;

use crate::db::filter::{Filter, Update, id_value, time_value};
use crate::db::query::scope;
use crate::error::{StoreError, StoreResult};
use crate::store::events::{ListEvents, SystemListEvents, UpdateEvent};

/// ## Summary
/// Returns the point-lookup predicate for one event.
///
/// ## Errors
/// Returns `InvalidIdentifier` if the scope's shop id is malformed.
pub fn detail(sc: &Scope, id: Uuid) -> StoreResult<Filter> {
    Ok(scope::base(sc)?.and_with(Filter::Eq("id".to_string(), id_value(id))))
}

/// ## Summary
/// Returns the predicate matching any of the given ids.
///
/// ## Errors
/// Returns `InvalidIdentifier` if the scope's shop id is malformed.
pub fn by_ids(sc: &Scope, ids: &[Uuid]) -> StoreResult<Filter> {
    let values = ids.iter().map(|id| id_value(*id)).collect();
    Ok(scope::base(sc)?.and_with(Filter::In("id".to_string(), values)))
}

/// ## Summary
/// Builds the list predicate: ids, repeat selector, time-window overlap,
/// and the visibility clause.
///
/// ## Errors
/// Returns `InvalidIdentifier` for a malformed id in the options or the
/// scope.
pub fn list(sc: &Scope, opt: &ListEvents) -> StoreResult<Filter> {
    let mut filter = scope::base(sc)?;

    if !opt.ids.is_empty() {
        let values = scope::id_values(&opt.ids)?;
        filter = filter.and_with(Filter::In("id".to_string(), values));
    }

    if let Some(need_repeat) = opt.need_repeat {
        filter = filter.and_with(repeat_selector(need_repeat));
    }

    filter = filter.and_with(overlap(opt.from, opt.to));
    filter = filter.and_with(scope::visibility(sc, &opt.visibility)?);

    Ok(filter)
}

/// ## Summary
/// Builds the system-job list predicate. System reads skip the
/// visibility clause: they see everything in the tenant.
///
/// ## Errors
/// Returns `InvalidIdentifier` if the scope's shop id is malformed.
pub fn system_list(sc: &Scope, opt: &SystemListEvents) -> StoreResult<Filter> {
    let mut filter = scope::base(sc)?;

    if let Some(notify_time) = opt.notify_time {
        filter = filter.and_with(Filter::Eq("notify_time".to_string(), time_value(notify_time)));
    }

    if let Some(need_repeat) = opt.need_repeat {
        filter = filter.and_with(repeat_selector(need_repeat));
    }

    filter = filter.and_with(overlap(opt.from, opt.to));

    Ok(filter)
}

fn repeat_selector(need_repeat: bool) -> Filter {
    let none = Value::from(Repeat::None.as_str());
    if need_repeat {
        Filter::Ne("repeat".to_string(), none)
    } else {
        Filter::Eq("repeat".to_string(), none)
    }
}

/// Inclusive time-window overlap: the document's window touches
/// `[from, to]`.
fn overlap(from: DateTime<Utc>, to: DateTime<Utc>) -> Filter {
    Filter::And(vec![
        Filter::Gte("end_time".to_string(), time_value(from)),
        Filter::Lte("start_time".to_string(), time_value(to)),
    ])
}

/// ## Summary
/// Translates an update request into a `{set, unset}` patch.
///
/// Audience lists supplied empty are *unset* (the field is removed), not
/// set to an empty value; the same applies to a missing description,
/// repeat-until, and notify-time. Callers rely on field removal to mean
/// "clear this restriction".
///
/// ## Errors
/// Returns `InvalidIdentifier` for a malformed department, branch, or
/// room id, and `InvalidArgument` when `repeat_until` is supplied for a
/// non-repeating event.
pub fn update_patch(opt: &UpdateEvent, now: DateTime<Utc>) -> StoreResult<Update> {
    if opt.repeat == Repeat::None && opt.repeat_until.is_some() {
        return Err(StoreError::InvalidArgument(
            "repeat_until requires a repeating event",
        ));
    }

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
        .set("repeat", Value::from(opt.repeat.as_str()))
        .set("public", Value::from(opt.public));

    patch = list_field(patch, "assign_ids", string_values(&opt.assign_ids));
    patch = list_field(patch, "department_ids", scope::id_values(&opt.department_ids)?);
    patch = list_field(patch, "branch_ids", scope::id_values(&opt.branch_ids)?);
    patch = list_field(patch, "room_ids", scope::id_values(&opt.room_ids)?);

    patch = match opt.repeat_until {
        Some(until) => patch.set("repeat_until", time_value(until)),
        None => patch.unset("repeat_until"),
    };
    patch = match opt.notify_time {
        Some(notify) => patch.set("notify_time", time_value(notify)),
        None => patch.unset("notify_time"),
    };

    Ok(patch.set("updated_at", time_value(now)))
}

/// ## Summary
/// Builds the single-field patch extending a recurrence horizon.
#[must_use]
pub fn repeat_until_patch(repeat_until: DateTime<Utc>, now: DateTime<Utc>) -> Update {
    Update::default()
        .set("repeat_until", time_value(repeat_until))
        .set("updated_at", time_value(now))
}

pub(crate) fn list_field(patch: Update, field: &str, values: Vec<Value>) -> Update {
    if values.is_empty() {
        patch.unset(field)
    } else {
        patch.set(field, Value::Array(values))
    }
}

pub(crate) fn string_values(values: &[String]) -> Vec<Value> {
    values.iter().map(|v| Value::from(v.as_str())).collect()
}
