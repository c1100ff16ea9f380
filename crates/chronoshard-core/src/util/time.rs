//! Day-boundary helpers for all-day windows.

use chrono::{DateTime, NaiveTime, TimeZone, Utc};

/// ## Summary
/// Returns midnight (00:00:00.000) of the instant's UTC day.
#[must_use]
pub fn start_of_day(at: DateTime<Utc>) -> DateTime<Utc> {
    Utc.from_utc_datetime(&at.date_naive().and_time(NaiveTime::MIN))
}

/// ## Summary
/// Returns the last millisecond (23:59:59.999) of the instant's UTC day.
#[must_use]
pub fn end_of_day(at: DateTime<Utc>) -> DateTime<Utc> {
    let end = NaiveTime::from_hms_milli_opt(23, 59, 59, 999).unwrap_or(NaiveTime::MIN);
    Utc.from_utc_datetime(&at.date_naive().and_time(end))
}
