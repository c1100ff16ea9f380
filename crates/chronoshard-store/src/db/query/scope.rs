//! Tenant isolation and visibility predicates.

use chronoshard_core::types::Scope;
use serde_json::Value;

use crate::db::filter::Filter;
use crate::db::id::parse_id;
use crate::error::StoreResult;

/// ## Summary
/// Returns the tenant-match predicate for a scope.
///
/// ## Errors
/// Returns `InvalidIdentifier` if the scope's shop id is malformed.
pub fn tenant(sc: &Scope) -> StoreResult<Filter> {
    parse_id(&sc.shop_id)?;
    Ok(Filter::Eq("shop_id".to_string(), Value::from(sc.shop_id.as_str())))
}

/// ## Summary
/// Returns the soft-delete exclusion predicate.
#[must_use]
pub fn not_deleted() -> Filter {
    Filter::IsNull("deleted_at".to_string())
}

/// ## Summary
/// Returns the base predicate every read and write goes through: tenant
/// match plus soft-delete exclusion.
///
/// ## Errors
/// Returns `InvalidIdentifier` if the scope's shop id is malformed.
pub fn base(sc: &Scope) -> StoreResult<Filter> {
    Ok(tenant(sc)?.and_with(not_deleted()))
}

/// Actor context for list-style visibility: the branches and departments
/// the acting user belongs to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VisibilityOptions {
    pub branch_ids: Vec<String>,
    pub department_ids: Vec<String>,
}

/// ## Summary
/// Builds the visibility clause for list-style reads as one OR-group to
/// be intersected with the rest of the filter. A document is visible if
/// any of the following holds:
/// - the actor is directly assigned,
/// - the actor's department is targeted,
/// - the actor's branch is targeted and the document carries neither a
///   department nor an assignment restriction,
/// - the actor created the document,
/// - the document is a system document,
/// - the document is public.
///
/// ## Errors
/// Returns `InvalidIdentifier` if a supplied branch or department id is
/// malformed.
pub fn visibility(sc: &Scope, opt: &VisibilityOptions) -> StoreResult<Filter> {
    let mut clauses = Vec::new();

    if !opt.branch_ids.is_empty() {
        let branches = id_values(&opt.branch_ids)?;
        clauses.push(Filter::And(vec![
            Filter::ContainsAny("branch_ids".to_string(), branches),
            Filter::Exists("department_ids".to_string(), false),
            Filter::Exists("assign_ids".to_string(), false),
        ]));
    }

    if !opt.department_ids.is_empty() {
        let departments = id_values(&opt.department_ids)?;
        clauses.push(Filter::ContainsAny("department_ids".to_string(), departments));
    }

    clauses.push(Filter::Contains(
        "assign_ids".to_string(),
        Value::from(sc.user_id.as_str()),
    ));
    clauses.push(Filter::Eq(
        "created_by_id".to_string(),
        Value::from(sc.user_id.as_str()),
    ));
    clauses.push(Filter::Eq("system".to_string(), Value::from(true)));
    clauses.push(Filter::Eq("public".to_string(), Value::from(true)));

    Ok(Filter::Or(clauses))
}

/// ## Summary
/// Validates a list of identifiers and returns them as filter values.
///
/// ## Errors
/// Returns `InvalidIdentifier` on the first malformed entry.
pub fn id_values(ids: &[String]) -> StoreResult<Vec<Value>> {
    ids.iter()
        .map(|id| parse_id(id).map(|_| Value::from(id.as_str())))
        .collect()
}
