//! Composable query predicates and update patches.
//!
//! Filters are a small AST evaluated by the driver; stores build them
//! through the functions in [`crate::db::query`] and never hand-write
//! driver-specific syntax.

use serde_json::{Map, Value};

/// A predicate over stored documents.
///
/// Field paths are top-level keys except inside [`Filter::ElemMatch`],
/// where they resolve against the matched array element.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Every branch matches.
    And(Vec<Filter>),
    /// At least one branch matches.
    Or(Vec<Filter>),
    /// The inner filter does not match.
    Not(Box<Filter>),

    /// Field equals the value. A missing field only matches `Null`.
    Eq(String, Value),
    /// Field differs from the value; a missing field matches.
    Ne(String, Value),
    Gt(String, Value),
    Gte(String, Value),
    Lt(String, Value),
    Lte(String, Value),

    /// Field value is one of the listed values.
    In(String, Vec<Value>),
    /// Field value is none of the listed values; a missing field matches.
    Nin(String, Vec<Value>),

    /// Field presence, regardless of value.
    Exists(String, bool),
    /// Field is absent or `Null`.
    IsNull(String),

    /// Array field has an element equal to the value.
    Contains(String, Value),
    /// Array field intersects the listed values.
    ContainsAny(String, Vec<Value>),
    /// Array-of-documents field has one element satisfying every
    /// condition.
    ElemMatch(String, Vec<Filter>),
}

impl Filter {
    /// ## Summary
    /// Conjoins `self` with `other`, flattening nested `And`s so built-up
    /// filters stay shallow.
    #[must_use]
    pub fn and_with(self, other: Filter) -> Filter {
        match self {
            Filter::And(mut branches) => {
                branches.push(other);
                Filter::And(branches)
            }
            first => Filter::And(vec![first, other]),
        }
    }
}

/// Sort direction for [`FindOptions`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    Asc,
    Desc,
}

/// Options for `find`: sort keys applied in sequence, optional limit.
#[derive(Debug, Clone, Default)]
pub struct FindOptions {
    pub sort: Vec<(String, Order)>,
    pub limit: Option<usize>,
}

impl FindOptions {
    /// ## Summary
    /// Appends a sort key.
    #[must_use]
    pub fn sorted_by(mut self, field: impl Into<String>, order: Order) -> Self {
        self.sort.push((field.into(), order));
        self
    }

    #[must_use]
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// An update patch with distinct operator groups.
///
/// `unset` removes fields from the stored document, it does not write an
/// empty value; callers rely on the distinction.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Update {
    pub set: Map<String, Value>,
    pub unset: Vec<String>,
    pub add_to_set: Map<String, Value>,
    pub pull: Map<String, Value>,
    pub push: Map<String, Value>,
}

impl Update {
    #[must_use]
    pub fn set(mut self, field: impl Into<String>, value: Value) -> Self {
        self.set.insert(field.into(), value);
        self
    }

    #[must_use]
    pub fn unset(mut self, field: impl Into<String>) -> Self {
        self.unset.push(field.into());
        self
    }

    /// ## Summary
    /// Appends the value to the array field unless an equal element is
    /// already present.
    #[must_use]
    pub fn add_to_set(mut self, field: impl Into<String>, value: Value) -> Self {
        self.add_to_set.insert(field.into(), value);
        self
    }

    /// ## Summary
    /// Removes every element equal to the value from the array field.
    #[must_use]
    pub fn pull(mut self, field: impl Into<String>, value: Value) -> Self {
        self.pull.insert(field.into(), value);
        self
    }

    /// ## Summary
    /// Appends the value to the array field unconditionally.
    #[must_use]
    pub fn push(mut self, field: impl Into<String>, value: Value) -> Self {
        self.push.insert(field.into(), value);
        self
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
            && self.unset.is_empty()
            && self.add_to_set.is_empty()
            && self.pull.is_empty()
            && self.push.is_empty()
    }
}

/// ## Summary
/// Encodes a UTC instant the way models store it: epoch milliseconds.
#[must_use]
pub fn time_value(at: chrono::DateTime<chrono::Utc>) -> Value {
    Value::from(at.timestamp_millis())
}

/// ## Summary
/// Encodes an identifier the way models store it: hyphenated string.
#[must_use]
pub fn id_value(id: uuid::Uuid) -> Value {
    Value::String(id.to_string())
}
