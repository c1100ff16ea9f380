//! Integration tests for the generation ledger over the in-memory
//! driver.

mod common;

use chrono::{DateTime, TimeZone, Utc};
use chronoshard_core::types::Repeat;
use chronoshard_store::error::StoreError;
use chronoshard_store::model::tracking::GeneratedRange;
use chronoshard_store::store::trackings::{CreateTracking, DeleteTrackings};

use common::{harness, scope};

const EVENT: &str = "018f4a7e-5b7a-7000-8000-000000000123";
const OTHER_EVENT: &str = "018f4a7e-5b7a-7000-8000-000000000456";

fn jan(day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, day, 0, 0, 0).unwrap()
}

fn feb(day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 2, day, 0, 0, 0).unwrap()
}

fn daily_january() -> CreateTracking {
    CreateTracking {
        event_id: EVENT.to_string(),
        month: 1,
        year: 2024,
        repeat: Repeat::Daily,
        repeat_until: None,
        ranges: vec![GeneratedRange {
            start_time: jan(5),
            end_time: jan(10),
        }],
    }
}

#[test_log::test(tokio::test)]
async fn generated_rows_are_found_by_overlapping_windows_only() {
    let h = harness();
    let sc = scope();

    h.ledger.create(&sc, daily_january()).await.unwrap();

    let hits = h.ledger.get_generated_in_range(&sc, jan(5), jan(8)).await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].event_id.to_string(), EVENT);

    let misses = h.ledger.get_generated_in_range(&sc, feb(1), feb(28)).await.unwrap();
    assert!(misses.is_empty());
}

#[test_log::test(tokio::test)]
async fn daily_rows_report_remaining_work_per_range() {
    let h = harness();
    let sc = scope();

    let row = h.ledger.create(&sc, daily_january()).await.unwrap();

    // A stored range starts inside January, so the bucket is not
    // reported for the full month.
    let covered = h
        .ledger
        .get_ungenerated_in_range(&sc, jan(1), jan(31))
        .await
        .unwrap();
    assert!(covered.is_empty());

    // The tail of the month has no range start and needs expansion.
    let pending = h
        .ledger
        .get_ungenerated_in_range(&sc, jan(11), jan(31))
        .await
        .unwrap();
    assert_eq!(pending.len(), 1);

    // The gaps of the whole month are exactly what was never generated.
    let gaps = row.uncovered_ranges(jan(1), jan(31));
    assert_eq!(gaps, vec![(jan(1), jan(5)), (jan(10), jan(31))]);
}

#[test_log::test(tokio::test)]
async fn monthly_rows_are_tracked_at_bucket_grain() {
    let h = harness();
    let sc = scope();

    h.ledger
        .create(
            &sc,
            CreateTracking {
                event_id: EVENT.to_string(),
                month: 1,
                year: 2024,
                repeat: Repeat::Monthly,
                repeat_until: None,
                ranges: vec![GeneratedRange {
                    start_time: jan(15),
                    end_time: jan(15),
                }],
            },
        )
        .await
        .unwrap();

    let january_only = h
        .ledger
        .get_ungenerated_in_range(&sc, jan(1), jan(31))
        .await
        .unwrap();
    assert!(january_only.is_empty());

    let february_only = h
        .ledger
        .get_ungenerated_in_range(&sc, feb(1), feb(28))
        .await
        .unwrap();
    assert_eq!(february_only.len(), 1);
}

#[test_log::test(tokio::test)]
async fn extend_repeat_until_revives_an_ended_recurrence() {
    let h = harness();
    let sc = scope();

    let input = CreateTracking {
        event_id: EVENT.to_string(),
        month: 2,
        year: 2024,
        repeat: Repeat::Daily,
        repeat_until: Some(jan(20)),
        ranges: vec![GeneratedRange {
            start_time: feb(5),
            end_time: feb(6),
        }],
    };
    h.ledger.create(&sc, input).await.unwrap();

    // Horizon ended before the window: not reported as generated.
    let before = h.ledger.get_generated_in_range(&sc, feb(1), feb(28)).await.unwrap();
    assert!(before.is_empty());

    h.ledger
        .extend_repeat_until(&sc, EVENT, Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap())
        .await
        .unwrap();

    let after = h.ledger.get_generated_in_range(&sc, feb(1), feb(28)).await.unwrap();
    assert_eq!(after.len(), 1);

    // The ledger mutation touches only the horizon.
    assert_eq!(
        after[0].ranges,
        vec![GeneratedRange {
            start_time: feb(5),
            end_time: feb(6),
        }]
    );
}

#[test_log::test(tokio::test)]
async fn delete_by_event_soft_deletes_the_rows() {
    let h = harness();
    let sc = scope();

    h.ledger.create(&sc, daily_january()).await.unwrap();
    let mut second = daily_january();
    second.event_id = OTHER_EVENT.to_string();
    h.ledger.create(&sc, second).await.unwrap();

    h.ledger
        .delete(
            &sc,
            &DeleteTrackings {
                event_id: Some(EVENT.to_string()),
                ..DeleteTrackings::default()
            },
        )
        .await
        .unwrap();

    let remaining = h.ledger.get_generated_in_range(&sc, jan(5), jan(8)).await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].event_id.to_string(), OTHER_EVENT);

    // Rows stay physically present.
    assert_eq!(h.db.raw_documents("recurring_trackings").len(), 2);
}

#[test_log::test(tokio::test)]
async fn delete_by_month_lower_bound_trims_the_tail() {
    let h = harness();
    let sc = scope();

    for month in 1..=3 {
        let mut input = daily_january();
        input.month = month;
        input.ranges = Vec::new();
        h.ledger.create(&sc, input).await.unwrap();
    }

    h.ledger
        .delete(
            &sc,
            &DeleteTrackings {
                month_gte: Some(2),
                year_gte: Some(2024),
                ..DeleteTrackings::default()
            },
        )
        .await
        .unwrap();

    let raw = h.db.raw_documents("recurring_trackings");
    let live = raw.iter().filter(|d| !d.contains_key("deleted_at")).count();
    assert_eq!(live, 1);
}

#[test_log::test(tokio::test)]
async fn delete_without_criteria_is_rejected() {
    let h = harness();
    let sc = scope();

    let err = h.ledger.delete(&sc, &DeleteTrackings::default()).await.unwrap_err();
    assert!(matches!(err, StoreError::InvalidArgument(_)));
}

#[test_log::test(tokio::test)]
async fn out_of_range_month_is_rejected() {
    let h = harness();
    let sc = scope();

    let mut input = daily_january();
    input.month = 13;
    let err = h.ledger.create(&sc, input).await.unwrap_err();
    assert!(matches!(err, StoreError::InvalidArgument(_)));
}

#[test_log::test(tokio::test)]
async fn duplicate_bucket_rows_are_allowed_but_observable() {
    let h = harness();
    let sc = scope();

    h.ledger.create(&sc, daily_january()).await.unwrap();
    // The ledger is advisory: a concurrent expander that missed the
    // first row can still write a second one.
    h.ledger.create(&sc, daily_january()).await.unwrap();

    assert_eq!(h.db.raw_documents("recurring_trackings").len(), 2);
}
