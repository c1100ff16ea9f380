//! In-memory driver implementation.
//!
//! Backs tests and small embedded deployments. Documents live in
//! per-collection vectors behind an `RwLock`; filters and patches are
//! evaluated faithfully, including the unset-removes-field and
//! add-to-set-deduplicates contracts. Collections can be marked as
//! failing to drive error paths in fan-out tests.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::db::driver::{Collection, Database, Document, DriverError, DriverResult};
use crate::db::filter::{Filter, FindOptions, Order, Update};

#[derive(Default)]
struct MemoryInner {
    collections: RwLock<HashMap<String, Vec<Document>>>,
    failing: RwLock<HashSet<String>>,
}

/// A process-local document database.
#[derive(Clone, Default)]
pub struct MemoryDatabase {
    inner: Arc<MemoryInner>,
}

impl MemoryDatabase {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// ## Summary
    /// Marks a collection as failing: every subsequent operation on it
    /// returns [`DriverError::Unavailable`] until restored.
    pub fn fail_collection(&self, name: &str) {
        self.lock_failing().insert(name.to_string());
    }

    /// ## Summary
    /// Clears a failure injected with [`MemoryDatabase::fail_collection`].
    pub fn restore_collection(&self, name: &str) {
        self.lock_failing().remove(name);
    }

    /// ## Summary
    /// Returns the names of collections that hold at least one document.
    #[must_use]
    pub fn collection_names(&self) -> Vec<String> {
        self.lock_collections().keys().cloned().collect()
    }

    /// ## Summary
    /// Returns every physical document of a collection, soft-deleted rows
    /// included. Intended for assertions.
    #[must_use]
    pub fn raw_documents(&self, name: &str) -> Vec<Document> {
        self.lock_collections().get(name).cloned().unwrap_or_default()
    }

    fn lock_collections(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<String, Vec<Document>>> {
        // Lock poisoning only happens if a holder panicked; propagating
        // the panic is the least surprising behavior for a test driver.
        match self.inner.collections.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn lock_failing(&self) -> std::sync::RwLockWriteGuard<'_, HashSet<String>> {
        match self.inner.failing.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl Database for MemoryDatabase {
    type Coll = MemoryCollection;

    fn collection(&self, name: &str) -> MemoryCollection {
        MemoryCollection {
            name: name.to_string(),
            db: self.clone(),
        }
    }
}

/// Handle to one named collection of a [`MemoryDatabase`].
#[derive(Clone)]
pub struct MemoryCollection {
    name: String,
    db: MemoryDatabase,
}

impl MemoryCollection {
    fn check_available(&self) -> DriverResult<()> {
        if self.db.lock_failing().contains(&self.name) {
            return Err(DriverError::Unavailable(format!(
                "collection {} is unreachable",
                self.name
            )));
        }
        Ok(())
    }

    fn with_docs<T>(&self, f: impl FnOnce(&mut Vec<Document>) -> T) -> DriverResult<T> {
        self.check_available()?;
        let mut collections = self.db.lock_collections();
        let docs = collections.entry(self.name.clone()).or_default();
        Ok(f(docs))
    }
}

impl Collection for MemoryCollection {
    async fn insert_one(&self, doc: Document) -> DriverResult<()> {
        self.with_docs(|docs| docs.push(doc))
    }

    async fn insert_many(&self, mut new_docs: Vec<Document>) -> DriverResult<()> {
        self.with_docs(|docs| docs.append(&mut new_docs))
    }

    async fn find_one(&self, filter: &Filter) -> DriverResult<Option<Document>> {
        self.with_docs(|docs| docs.iter().find(|doc| matches(doc, filter)).cloned())
    }

    async fn find(&self, filter: &Filter, options: &FindOptions) -> DriverResult<Vec<Document>> {
        self.with_docs(|docs| {
            let mut found: Vec<Document> = docs
                .iter()
                .filter(|doc| matches(doc, filter))
                .cloned()
                .collect();
            sort_documents(&mut found, &options.sort);
            if let Some(limit) = options.limit {
                found.truncate(limit);
            }
            found
        })
    }

    async fn update_one(&self, filter: &Filter, update: &Update) -> DriverResult<u64> {
        self.with_docs(|docs| {
            for doc in &mut *docs {
                if matches(doc, filter) {
                    apply_update(doc, update);
                    return 1;
                }
            }
            0
        })
    }

    async fn update_many(&self, filter: &Filter, update: &Update) -> DriverResult<u64> {
        self.with_docs(|docs| {
            let mut matched = 0;
            for doc in &mut *docs {
                if matches(doc, filter) {
                    apply_update(doc, update);
                    matched += 1;
                }
            }
            matched
        })
    }

    async fn soft_delete_one(
        &self,
        filter: &Filter,
        deleted_at: DateTime<Utc>,
    ) -> DriverResult<u64> {
        let patch = Update::default().set("deleted_at", Value::from(deleted_at.timestamp_millis()));
        self.update_one(filter, &patch).await
    }

    async fn soft_delete_many(
        &self,
        filter: &Filter,
        deleted_at: DateTime<Utc>,
    ) -> DriverResult<u64> {
        let patch = Update::default().set("deleted_at", Value::from(deleted_at.timestamp_millis()));
        self.update_many(filter, &patch).await
    }
}

/// ## Summary
/// Evaluates a filter against a document.
#[must_use]
pub fn matches(doc: &Document, filter: &Filter) -> bool {
    match filter {
        Filter::And(branches) => branches.iter().all(|f| matches(doc, f)),
        Filter::Or(branches) => branches.iter().any(|f| matches(doc, f)),
        Filter::Not(inner) => !matches(doc, inner),
        Filter::Eq(field, value) => match doc.get(field) {
            Some(found) => found == value,
            None => value.is_null(),
        },
        Filter::Ne(field, value) => match doc.get(field) {
            Some(found) => found != value,
            None => !value.is_null(),
        },
        Filter::Gt(field, value) => compare_field(doc, field, value, Ordering::is_gt),
        Filter::Gte(field, value) => compare_field(doc, field, value, Ordering::is_ge),
        Filter::Lt(field, value) => compare_field(doc, field, value, Ordering::is_lt),
        Filter::Lte(field, value) => compare_field(doc, field, value, Ordering::is_le),
        Filter::In(field, values) => doc.get(field).is_some_and(|found| values.contains(found)),
        Filter::Nin(field, values) => doc
            .get(field)
            .is_none_or(|found| !values.contains(found)),
        Filter::Exists(field, expected) => doc.contains_key(field) == *expected,
        Filter::IsNull(field) => doc.get(field).is_none_or(Value::is_null),
        Filter::Contains(field, value) => as_array(doc, field)
            .is_some_and(|items| items.contains(value)),
        Filter::ContainsAny(field, values) => as_array(doc, field)
            .is_some_and(|items| items.iter().any(|item| values.contains(item))),
        Filter::ElemMatch(field, conditions) => as_array(doc, field).is_some_and(|items| {
            items.iter().any(|item| {
                item.as_object()
                    .is_some_and(|element| conditions.iter().all(|c| matches(element, c)))
            })
        }),
    }
}

fn as_array<'doc>(doc: &'doc Document, field: &str) -> Option<&'doc Vec<Value>> {
    doc.get(field).and_then(Value::as_array)
}

fn compare_field(
    doc: &Document,
    field: &str,
    value: &Value,
    accept: impl Fn(Ordering) -> bool,
) -> bool {
    doc.get(field)
        .and_then(|found| compare_values(found, value))
        .is_some_and(accept)
}

/// Orders two scalar values of the same shape. Mixed or non-scalar
/// shapes are incomparable and fail range predicates.
fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_i64(), y.as_i64()) {
            (Some(i), Some(j)) => Some(i.cmp(&j)),
            _ => x.as_f64().zip(y.as_f64()).and_then(|(i, j)| i.partial_cmp(&j)),
        },
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

fn sort_documents(docs: &mut [Document], sort: &[(String, Order)]) {
    if sort.is_empty() {
        return;
    }
    docs.sort_by(|a, b| {
        for (field, order) in sort {
            let ordering = match (a.get(field), b.get(field)) {
                (Some(x), Some(y)) => compare_values(x, y).unwrap_or(Ordering::Equal),
                (Some(_), None) => Ordering::Greater,
                (None, Some(_)) => Ordering::Less,
                (None, None) => Ordering::Equal,
            };
            let ordering = match order {
                Order::Asc => ordering,
                Order::Desc => ordering.reverse(),
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    });
}

/// ## Summary
/// Applies an update patch in operator-group order: set, unset,
/// add-to-set, pull, push.
pub fn apply_update(doc: &mut Document, update: &Update) {
    for (field, value) in &update.set {
        doc.insert(field.clone(), value.clone());
    }
    for field in &update.unset {
        doc.remove(field);
    }
    for (field, value) in &update.add_to_set {
        let entry = doc
            .entry(field.clone())
            .or_insert_with(|| Value::Array(Vec::new()));
        if let Value::Array(items) = entry
            && !items.contains(value)
        {
            items.push(value.clone());
        }
    }
    for (field, value) in &update.pull {
        if let Some(Value::Array(items)) = doc.get_mut(field) {
            items.retain(|item| item != value);
        }
    }
    for (field, value) in &update.push {
        let entry = doc
            .entry(field.clone())
            .or_insert_with(|| Value::Array(Vec::new()));
        if let Value::Array(items) = entry {
            items.push(value.clone());
        }
    }
}
