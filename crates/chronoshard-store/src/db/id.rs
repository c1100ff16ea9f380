//! Time-ordered identifier generation and inspection.
//!
//! Identifiers are UUID v7: the creation instant is embedded in the id
//! and recoverable without a storage round-trip, which is what shard
//! routing relies on.

use chrono::{DateTime, Utc};
use chronoshard_core::clock::Clock;
use uuid::Uuid;

use crate::error::{StoreError, StoreResult};

/// Identifier factory bound to an injected clock.
#[derive(Debug, Clone)]
pub struct IdClock {
    clock: Clock,
}

impl IdClock {
    #[must_use]
    pub fn new(clock: Clock) -> Self {
        Self { clock }
    }

    /// ## Summary
    /// Generates an identifier stamped with the clock's current instant.
    #[must_use]
    pub fn generate(&self) -> Uuid {
        id_at(self.clock.now())
    }
}

/// ## Summary
/// Generates an identifier embedding the supplied instant.
///
/// Master events use this with their start time, so an event's shard is
/// its start-time bucket rather than its insertion-time bucket. Instants
/// before the epoch are clamped to it.
#[must_use]
pub fn id_at(at: DateTime<Utc>) -> Uuid {
    let seconds = u64::try_from(at.timestamp()).unwrap_or(0);
    let timestamp =
        uuid::Timestamp::from_unix(uuid::NoContext, seconds, at.timestamp_subsec_nanos());
    Uuid::new_v7(timestamp)
}

/// ## Summary
/// Parses an identifier received at the API boundary.
///
/// ## Errors
/// Returns [`StoreError::InvalidIdentifier`] if the string is not a
/// well-formed identifier.
pub fn parse_id(raw: &str) -> StoreResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| StoreError::InvalidIdentifier(raw.to_string()))
}

/// ## Summary
/// Recovers the creation instant embedded in an identifier. Pure: reads
/// the id, never consults a clock.
///
/// ## Errors
/// Returns [`StoreError::InvalidIdentifier`] if the identifier carries no
/// embedded timestamp (wrong version) or the timestamp is out of range.
pub fn id_timestamp(id: Uuid) -> StoreResult<DateTime<Utc>> {
    let timestamp = id
        .get_timestamp()
        .ok_or_else(|| StoreError::InvalidIdentifier(id.to_string()))?;
    let (seconds, nanos) = timestamp.to_unix();
    let seconds =
        i64::try_from(seconds).map_err(|_| StoreError::InvalidIdentifier(id.to_string()))?;
    DateTime::from_timestamp(seconds, nanos)
        .ok_or_else(|| StoreError::InvalidIdentifier(id.to_string()))
}
