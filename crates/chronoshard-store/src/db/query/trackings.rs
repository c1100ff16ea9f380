//! Query composition for the generation ledger.
//!
//! The coverage predicates are deliberately asymmetric: daily and weekly
//! patterns can materialize many occurrences per month bucket, so they
//! are checked per stored range; monthly and yearly patterns produce at
//! most one occurrence per bucket, so any row for a touched
//! `(month, year)` counts as coverage.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use chronoshard_core::types::{Repeat, Scope};
use serde_json::Value;
use uuid::Uuid;

use crate::db::filter::{Filter, Update, id_value, time_value};
use crate::db::query::scope;
use crate::db::shard::{YearMonth, month_buckets};
use crate::error::StoreResult;
use crate::store::trackings::DeleteTrackings;

/// ## Summary
/// Builds the "already generated" predicate: rows for a touched
/// `(year, month)` whose stored ranges overlap `[from, to]` and whose
/// recurrence has not ended before `from`.
///
/// ## Errors
/// Returns `InvalidIdentifier` if the scope's shop id is malformed.
pub fn generated_in_range(
    sc: &Scope,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> StoreResult<Filter> {
    let months = month_buckets(from, to);
    let in_months = Filter::Or(year_month_conditions(&months));
    let range_overlap = Filter::ElemMatch(
        "ranges".to_string(),
        vec![
            Filter::Lte("start_time".to_string(), time_value(to)),
            Filter::Gte("end_time".to_string(), time_value(from)),
        ],
    );

    let patterns = [Repeat::Daily, Repeat::Weekly, Repeat::Monthly, Repeat::Yearly]
        .into_iter()
        .map(|repeat| {
            Filter::And(vec![
                repeat_is(repeat),
                in_months.clone(),
                range_overlap.clone(),
            ])
        })
        .collect();

    Ok(scope::base(sc)?
        .and_with(Filter::Or(patterns))
        .and_with(still_repeating(from)))
}

/// ## Summary
/// Builds the complement predicate: rows whose recurrence is still live
/// but whose coverage of `[from, to]` is incomplete — daily/weekly by
/// the absence of a stored range starting inside the window,
/// monthly/yearly by the absence of a row for some touched
/// `(year, month)`.
///
/// ## Errors
/// Returns `InvalidIdentifier` if the scope's shop id is malformed.
pub fn ungenerated_in_range(
    sc: &Scope,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> StoreResult<Filter> {
    let months = month_buckets(from, to);

    let no_range_in_window = Filter::Not(Box::new(Filter::ElemMatch(
        "ranges".to_string(),
        vec![
            Filter::Gte("start_time".to_string(), time_value(from)),
            Filter::Lte("start_time".to_string(), time_value(to)),
        ],
    )));
    let some_month_uncovered = Filter::Or(month_not_covered_conditions(&months));

    let patterns = Filter::Or(vec![
        Filter::And(vec![repeat_is(Repeat::Daily), no_range_in_window.clone()]),
        Filter::And(vec![repeat_is(Repeat::Weekly), no_range_in_window]),
        Filter::And(vec![repeat_is(Repeat::Monthly), some_month_uncovered.clone()]),
        Filter::And(vec![repeat_is(Repeat::Yearly), some_month_uncovered]),
    ]);

    Ok(scope::base(sc)?
        .and_with(Filter::Exists("repeat".to_string(), true))
        .and_with(still_repeating(from))
        .and_with(patterns))
}

/// ## Summary
/// Returns the predicate selecting every live row of an event.
///
/// ## Errors
/// Returns `InvalidIdentifier` if the scope's shop id is malformed.
pub fn by_event(sc: &Scope, event_id: Uuid) -> StoreResult<Filter> {
    Ok(scope::base(sc)?.and_with(Filter::Eq("event_id".to_string(), id_value(event_id))))
}

/// ## Summary
/// Builds the deletion predicate from any combination of row ids, an
/// owning event, and month/year lower bounds.
///
/// ## Errors
/// Returns `InvalidIdentifier` for a malformed id in the criteria or the
/// scope.
pub fn delete(sc: &Scope, opt: &DeleteTrackings) -> StoreResult<Filter> {
    let mut filter = scope::base(sc)?;

    if !opt.ids.is_empty() {
        let values = scope::id_values(&opt.ids)?;
        filter = filter.and_with(Filter::In("id".to_string(), values));
    }

    if let Some(event_id) = opt.event_id.as_deref() {
        let event_id = crate::db::id::parse_id(event_id)?;
        filter = filter.and_with(Filter::Eq("event_id".to_string(), id_value(event_id)));
    }

    if let Some(month) = opt.month_gte {
        filter = filter.and_with(Filter::Gte("month".to_string(), Value::from(month)));
    }

    if let Some(year) = opt.year_gte {
        filter = filter.and_with(Filter::Gte("year".to_string(), Value::from(year)));
    }

    Ok(filter)
}

/// ## Summary
/// Builds the patch extending a row's recurrence horizon. The ledger is
/// otherwise immutable.
#[must_use]
pub fn extend_repeat_until_patch(repeat_until: DateTime<Utc>) -> Update {
    Update::default().set("repeat_until", time_value(repeat_until))
}

fn repeat_is(repeat: Repeat) -> Filter {
    Filter::Eq("repeat".to_string(), Value::from(repeat.as_str()))
}

/// The recurrence has no horizon or one that ends at or after `from`.
fn still_repeating(from: DateTime<Utc>) -> Filter {
    Filter::Or(vec![
        Filter::IsNull("repeat_until".to_string()),
        Filter::Gte("repeat_until".to_string(), time_value(from)),
    ])
}

fn year_month_conditions(months: &[YearMonth]) -> Vec<Filter> {
    months
        .iter()
        .map(|ym| {
            Filter::And(vec![
                Filter::Eq("year".to_string(), Value::from(ym.year)),
                Filter::Eq("month".to_string(), Value::from(ym.month)),
            ])
        })
        .collect()
}

/// One condition per touched year: the row does not cover that year's
/// touched months.
fn month_not_covered_conditions(months: &[YearMonth]) -> Vec<Filter> {
    let mut by_year: BTreeMap<i32, Vec<Value>> = BTreeMap::new();
    for ym in months {
        by_year.entry(ym.year).or_default().push(Value::from(ym.month));
    }

    by_year
        .into_iter()
        .map(|(year, months)| {
            Filter::Or(vec![
                Filter::Ne("year".to_string(), Value::from(year)),
                Filter::Nin("month".to_string(), months),
            ])
        })
        .collect()
}
