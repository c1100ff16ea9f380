//! Injected time source.
//!
//! ## Summary
//! Every component that stamps documents receives a `Clock` at
//! construction instead of calling wall-clock time directly, so tests can
//! freeze or script the current instant.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};

/// A zero-argument "now" provider.
///
/// Cloning is cheap; clones share the same underlying source.
#[derive(Clone)]
pub struct Clock(Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>);

impl Clock {
    /// ## Summary
    /// Returns a clock backed by the system wall clock.
    #[must_use]
    pub fn system() -> Self {
        Self(Arc::new(Utc::now))
    }

    /// ## Summary
    /// Returns a clock frozen at `at`. Intended for tests.
    #[must_use]
    pub fn fixed(at: DateTime<Utc>) -> Self {
        Self(Arc::new(move || at))
    }

    /// ## Summary
    /// Wraps an arbitrary now-provider.
    pub fn from_fn(f: impl Fn() -> DateTime<Utc> + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    /// ## Summary
    /// Returns the current instant according to this clock.
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        (self.0)()
    }
}

impl fmt::Debug for Clock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Clock").finish()
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::system()
    }
}
