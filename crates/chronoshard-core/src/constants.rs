/// Collection family names shared across crates
pub const EVENTS_COLLECTION: &str = "events";
pub const RECURRING_INSTANCES_COLLECTION: &str = "recurring_instances";
pub const RECURRING_TRACKINGS_COLLECTION: &str = "recurring_trackings";
