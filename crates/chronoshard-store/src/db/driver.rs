//! The outbound storage interface.
//!
//! The real document database sits behind these traits; the store crate
//! only ever issues inserts, filtered finds, operator-based updates, and
//! soft deletes. Soft deletion stamps `deleted_at` and never physically
//! removes a document.

use std::future::Future;

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::db::filter::{Filter, FindOptions, Update};

/// A stored document, as the driver sees it.
pub type Document = Map<String, Value>;

/// Driver-level errors
#[derive(Error, Debug)]
pub enum DriverError {
    /// Transport or backend failure; the caller may retry.
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    /// A document could not be encoded or decoded.
    #[error("corrupt document: {0}")]
    Corrupt(String),
}

pub type DriverResult<T> = std::result::Result<T, DriverError>;

/// Handle to a logical database holding named collections.
///
/// Collection names are dynamic: sharded entities resolve one collection
/// per `(year, period)` bucket.
pub trait Database: Send + Sync + 'static {
    type Coll: Collection + Send + Sync + 'static;

    fn collection(&self, name: &str) -> Self::Coll;
}

/// Operations the store layer requires of every collection.
pub trait Collection: Send + Sync {
    fn insert_one(&self, doc: Document) -> impl Future<Output = DriverResult<()>> + Send;

    fn insert_many(&self, docs: Vec<Document>) -> impl Future<Output = DriverResult<()>> + Send;

    fn find_one(&self, filter: &Filter)
    -> impl Future<Output = DriverResult<Option<Document>>> + Send;

    /// Materializes every matching document, sorted per `options`.
    fn find(
        &self,
        filter: &Filter,
        options: &FindOptions,
    ) -> impl Future<Output = DriverResult<Vec<Document>>> + Send;

    /// Applies the patch to the first match; returns the matched count.
    fn update_one(
        &self,
        filter: &Filter,
        update: &Update,
    ) -> impl Future<Output = DriverResult<u64>> + Send;

    /// Applies the patch to every match; returns the matched count.
    fn update_many(
        &self,
        filter: &Filter,
        update: &Update,
    ) -> impl Future<Output = DriverResult<u64>> + Send;

    /// Stamps `deleted_at` on the first match; returns the matched count.
    fn soft_delete_one(
        &self,
        filter: &Filter,
        deleted_at: DateTime<Utc>,
    ) -> impl Future<Output = DriverResult<u64>> + Send;

    /// Stamps `deleted_at` on every match; returns the matched count.
    fn soft_delete_many(
        &self,
        filter: &Filter,
        deleted_at: DateTime<Utc>,
    ) -> impl Future<Output = DriverResult<u64>> + Send;
}
