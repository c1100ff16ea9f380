//! Shared fixtures: a frozen clock, an in-memory database, and the three
//! stores wired against it.

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use chronoshard_core::clock::Clock;
use chronoshard_core::types::{Repeat, Scope};
use chronoshard_store::db::fanout::FanOut;
use chronoshard_store::db::memory::MemoryDatabase;
use chronoshard_store::store::events::{CreateEvent, EventStore};
use chronoshard_store::store::instances::{CreateInstance, RecurringInstanceStore};
use chronoshard_store::store::trackings::RecurringTrackingLedger;

pub const SHOP: &str = "018f4a7e-5b7a-7000-8000-00000000aaaa";
pub const OTHER_SHOP: &str = "018f4a7e-5b7a-7000-8000-00000000bbbb";
pub const USER: &str = "user-1";
pub const DEPARTMENT: &str = "018f4a7e-5b7a-7000-8000-00000000dddd";

pub struct Harness {
    pub db: MemoryDatabase,
    pub events: EventStore<MemoryDatabase>,
    pub instances: RecurringInstanceStore<MemoryDatabase>,
    pub ledger: RecurringTrackingLedger<MemoryDatabase>,
}

#[must_use]
pub fn harness() -> Harness {
    let db = MemoryDatabase::new();
    let shared = Arc::new(db.clone());
    let clock = Clock::fixed(frozen_now());
    Harness {
        events: EventStore::new(Arc::clone(&shared), clock.clone(), FanOut::new(4)),
        instances: RecurringInstanceStore::new(Arc::clone(&shared), clock.clone(), FanOut::new(4)),
        ledger: RecurringTrackingLedger::new(shared, clock),
        db,
    }
}

#[must_use]
pub fn frozen_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap()
}

#[must_use]
pub fn scope() -> Scope {
    Scope::new(SHOP, USER)
}

#[must_use]
pub fn at(year: i32, month: u32, day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, hour, 0, 0).unwrap()
}

#[must_use]
pub fn basic_event(title: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> CreateEvent {
    CreateEvent {
        title: title.to_string(),
        description: None,
        start_time: start,
        end_time: end,
        all_day: false,
        repeat: Repeat::None,
        repeat_until: None,
        system: false,
        public: false,
        assign_ids: Vec::new(),
        department_ids: Vec::new(),
        branch_ids: Vec::new(),
        room_ids: Vec::new(),
        notify_time: None,
    }
}

#[must_use]
pub fn basic_instance(start: DateTime<Utc>, end: DateTime<Utc>) -> CreateInstance {
    CreateInstance {
        title: "occurrence".to_string(),
        description: None,
        start_time: start,
        end_time: end,
        all_day: false,
        repeat: Repeat::Weekly,
        repeat_until: None,
        system: false,
        public: false,
        assign_ids: Vec::new(),
        department_ids: Vec::new(),
        branch_ids: Vec::new(),
        room_ids: Vec::new(),
        notify_time: None,
    }
}
