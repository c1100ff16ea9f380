use serde::{Deserialize, Serialize};

/// Recurrence pattern of a master event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Repeat {
    None,
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl Repeat {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::Yearly => "yearly",
        }
    }

    /// True for every pattern except [`Repeat::None`].
    #[must_use]
    pub const fn is_recurring(self) -> bool {
        !matches!(self, Self::None)
    }
}

impl std::fmt::Display for Repeat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Attendance reply of an actor to an event or occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttendanceStatus {
    Accept,
    Decline,
    /// Observed behavior: a neutral reply performs no write at all.
    Neutral,
}

/// Sharded collection families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Events,
    RecurringInstances,
}

impl EntityKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Events => crate::constants::EVENTS_COLLECTION,
            Self::RecurringInstances => crate::constants::RECURRING_INSTANCES_COLLECTION,
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tenant and actor identity attached to every store operation.
///
/// `user_id` may be empty for system actors; stores that require an owner
/// validate it explicitly.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Scope {
    pub shop_id: String,
    pub user_id: String,
}

impl Scope {
    #[must_use]
    pub fn new(shop_id: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            shop_id: shop_id.into(),
            user_id: user_id.into(),
        }
    }
}
