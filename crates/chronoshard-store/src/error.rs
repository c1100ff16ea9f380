use thiserror::Error;

use crate::db::driver::DriverError;

/// Store layer errors
#[derive(Error, Debug)]
pub enum StoreError {
    /// Malformed identifier or reference. Local, never retried.
    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),

    /// A required argument is missing or inconsistent. Local.
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    /// Point lookup hit an absent or soft-deleted row.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// Driver failure, wrapped with the failing operation for
    /// diagnosability. The caller may retry.
    #[error("{op}: {source}")]
    Storage {
        op: &'static str,
        #[source]
        source: DriverError,
    },

    #[error(transparent)]
    Core(#[from] chronoshard_core::error::CoreError),
}

impl StoreError {
    /// Adapter for `map_err`: tags a [`DriverError`] with the operation name.
    pub(crate) fn storage(op: &'static str) -> impl Fn(DriverError) -> Self {
        move |source| Self::Storage { op, source }
    }
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;
