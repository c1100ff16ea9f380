//! Unit tests for the ledger coverage predicates.

use chrono::{DateTime, TimeZone, Utc};
use chronoshard_core::types::Scope;
use serde_json::{Value, json};

use crate::db::driver::Document;
use crate::db::memory::matches;
use crate::db::query::trackings::{generated_in_range, ungenerated_in_range};

const SHOP: &str = "018f4a7e-0000-7000-8000-00000000aaaa";

fn sc() -> Scope {
    Scope::new(SHOP, "user-1")
}

fn jan(day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, day, 0, 0, 0).unwrap()
}

fn ms(at: DateTime<Utc>) -> i64 {
    at.timestamp_millis()
}

fn row(value: Value) -> Document {
    value.as_object().cloned().unwrap_or_default()
}

fn daily_row() -> Document {
    row(json!({
        "shop_id": SHOP,
        "repeat": "daily",
        "month": 1,
        "year": 2024,
        "ranges": [{"start_time": ms(jan(5)), "end_time": ms(jan(10))}],
    }))
}

#[test]
fn generated_matches_an_overlapping_range_in_a_touched_month() {
    let filter = generated_in_range(&sc(), jan(5), jan(8)).unwrap();
    assert!(matches(&daily_row(), &filter));
}

#[test]
fn generated_rejects_a_disjoint_window() {
    let feb = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap();
    let feb_end = Utc.with_ymd_and_hms(2024, 2, 28, 0, 0, 0).unwrap();

    let filter = generated_in_range(&sc(), feb, feb_end).unwrap();
    assert!(!matches(&daily_row(), &filter));
}

#[test]
fn generated_respects_the_recurrence_horizon() {
    let mut ended = daily_row();
    ended.insert("repeat_until".to_string(), json!(ms(jan(3))));

    let filter = generated_in_range(&sc(), jan(5), jan(8)).unwrap();
    assert!(!matches(&ended, &filter));

    ended.insert("repeat_until".to_string(), json!(ms(jan(20))));
    assert!(matches(&ended, &filter));
}

#[test]
fn daily_coverage_is_checked_per_stored_range() {
    // A range starts inside [Jan 1, Jan 31]: the bucket counts as
    // generated and the row is not reported.
    let filter = ungenerated_in_range(&sc(), jan(1), jan(31)).unwrap();
    assert!(!matches(&daily_row(), &filter));

    // No stored range starts inside [Jan 11, Jan 31]: the tail of the
    // month still needs expansion.
    let filter = ungenerated_in_range(&sc(), jan(11), jan(31)).unwrap();
    assert!(matches(&daily_row(), &filter));
}

#[test]
fn monthly_coverage_is_bucket_grained() {
    let monthly = row(json!({
        "shop_id": SHOP,
        "repeat": "monthly",
        "month": 1,
        "year": 2024,
        "ranges": [{"start_time": ms(jan(15)), "end_time": ms(jan(15))}],
    }));

    // The row covers January; a January-only window is complete.
    let filter = ungenerated_in_range(&sc(), jan(1), jan(31)).unwrap();
    assert!(!matches(&monthly, &filter));

    // A February-only window finds its bucket uncovered by this row.
    let feb = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap();
    let feb_end = Utc.with_ymd_and_hms(2024, 2, 28, 0, 0, 0).unwrap();
    let filter = ungenerated_in_range(&sc(), feb, feb_end).unwrap();
    assert!(matches(&monthly, &filter));

    // A window mixing a covered and an uncovered month of one year does
    // not flag the row: coverage checks are called one month at a time.
    let filter = ungenerated_in_range(&sc(), jan(1), feb_end).unwrap();
    assert!(!matches(&monthly, &filter));
}

#[test]
fn ungenerated_skips_recurrences_that_already_ended() {
    let mut ended = daily_row();
    ended.insert("repeat_until".to_string(), json!(ms(jan(3))));

    let filter = ungenerated_in_range(&sc(), jan(11), jan(31)).unwrap();
    assert!(!matches(&ended, &filter));
}

#[test]
fn year_boundary_windows_touch_both_year_groups() {
    let december = row(json!({
        "shop_id": SHOP,
        "repeat": "monthly",
        "month": 12,
        "year": 2024,
        "ranges": [],
    }));

    let from = Utc.with_ymd_and_hms(2024, 12, 1, 0, 0, 0).unwrap();
    let to = Utc.with_ymd_and_hms(2025, 1, 31, 0, 0, 0).unwrap();

    // December is covered but January 2025 is not, so the row reports
    // work remaining.
    let filter = ungenerated_in_range(&sc(), from, to).unwrap();
    assert!(matches(&december, &filter));
}
