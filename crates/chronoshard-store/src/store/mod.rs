//! The three stores: master events, materialized occurrences, and the
//! generation ledger. Each takes a tenant [`Scope`] as the first
//! argument of every operation and validates identifier formats at the
//! boundary.
//!
//! [`Scope`]: chronoshard_core::types::Scope

pub mod events;
pub mod instances;
pub mod trackings;

use crate::db::driver::Document;
use crate::db::filter::{FindOptions, Order};
use crate::db::id::parse_id;
use crate::error::{StoreError, StoreResult};
use crate::model::from_document;

/// Sort applied to every list-style read: newest first, identifier as
/// the stable tie-break.
pub(crate) fn list_sort() -> FindOptions {
    FindOptions::default()
        .sorted_by("created_at", Order::Desc)
        .sorted_by("id", Order::Desc)
}

pub(crate) fn decode_all<T: serde::de::DeserializeOwned>(
    docs: Vec<Document>,
    op: &'static str,
) -> StoreResult<Vec<T>> {
    docs.into_iter()
        .map(|doc| from_document(doc).map_err(StoreError::storage(op)))
        .collect()
}

/// Validates id formats and turns an empty list into an absent field.
pub(crate) fn optional_ids(ids: &[String]) -> StoreResult<Option<Vec<String>>> {
    if ids.is_empty() {
        return Ok(None);
    }
    for id in ids {
        parse_id(id)?;
    }
    Ok(Some(ids.to_vec()))
}

/// Turns an empty list into an absent field without format validation;
/// actor ids are opaque to the store.
pub(crate) fn optional_strings(values: &[String]) -> Option<Vec<String>> {
    if values.is_empty() {
        None
    } else {
        Some(values.to_vec())
    }
}
