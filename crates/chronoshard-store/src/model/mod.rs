//! Typed documents persisted by the stores.
//!
//! Timestamps serialize as epoch milliseconds so the driver compares
//! them as integers; optional list fields serialize as *absent* when
//! cleared, which is what the unset-on-empty update contract produces.

pub mod event;
pub mod instance;
pub mod tracking;

use serde::Serialize;
use serde_json::Value;

use crate::db::driver::{Document, DriverError, DriverResult};

/// ## Summary
/// Encodes a model into a driver document.
///
/// ## Errors
/// Returns [`DriverError::Corrupt`] if the model does not serialize to a
/// JSON object.
pub(crate) fn to_document<T: Serialize>(model: &T) -> DriverResult<Document> {
    match serde_json::to_value(model) {
        Ok(Value::Object(doc)) => Ok(doc),
        Ok(_) => Err(DriverError::Corrupt("model is not an object".to_string())),
        Err(err) => Err(DriverError::Corrupt(err.to_string())),
    }
}

/// ## Summary
/// Decodes a driver document into a model.
///
/// ## Errors
/// Returns [`DriverError::Corrupt`] if the document does not match the
/// model shape.
pub(crate) fn from_document<T: serde::de::DeserializeOwned>(doc: Document) -> DriverResult<T> {
    serde_json::from_value(Value::Object(doc)).map_err(|err| DriverError::Corrupt(err.to_string()))
}
