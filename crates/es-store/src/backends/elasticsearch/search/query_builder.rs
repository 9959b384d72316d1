//! Elasticsearch Query DSL builder.
//!
//! Translates engine-agnostic [`Query`] values into Elasticsearch Query DSL
//! JSON. Every leaf maps to exactly one clause shape.

use serde_json::{Value, json};

use crate::error::{StorageError, StorageResult};
use crate::types::{Predicate, Query, SortDirective};

use super::fields::map_field;

/// A complete Elasticsearch search request ready to be sent.
#[derive(Debug, Clone, PartialEq)]
pub struct EsQuery {
    /// The complete search body.
    pub body: Value,
    /// The index to search.
    pub index: String,
}

/// Builds Elasticsearch search requests for one index.
pub struct EsQueryBuilder<'a> {
    index: &'a str,
}

impl<'a> EsQueryBuilder<'a> {
    /// Creates a new query builder.
    pub fn new(index: &'a str) -> Self {
        Self { index }
    }

    /// Builds the search body for `query`: filter, sort and window.
    ///
    /// Fails with `NotImplemented` before anything is sent if the filter
    /// contains an operator the engine binding cannot express.
    pub fn build(&self, query: &Query) -> StorageResult<EsQuery> {
        let mut body = json!({ "track_total_hits": true });

        if let Some(filter) = build_query(&query.predicate)? {
            body["query"] = filter;
        }

        if let Some(sort) = build_sort(&query.sort) {
            body["sort"] = sort;
        }

        if let Some(window) = query.window {
            if window.offset > 0 {
                body["from"] = json!(window.offset);
            }
            if let Some(limit) = window.limit {
                body["size"] = json!(limit);
            }
        }

        Ok(EsQuery {
            body,
            index: self.index.to_string(),
        })
    }
}

/// Compiles a filter list into a single query clause.
///
/// No clause yields `None` (match everything); a single clause is returned
/// unwrapped; several are combined in a `bool.must`.
pub fn build_query(predicate: &[Predicate]) -> StorageResult<Option<Value>> {
    let mut clauses = translate_predicate(predicate)?;
    Ok(match clauses.len() {
        0 => None,
        1 => clauses.pop(),
        _ => Some(json!({ "bool": { "must": clauses } })),
    })
}

/// Compiles sort directives into sort clauses; `None` keeps the engine order.
pub fn build_sort(sort: &[SortDirective]) -> Option<Value> {
    if sort.is_empty() {
        return None;
    }
    let clauses = sort
        .iter()
        .map(|directive| {
            let order = if directive.is_descending() {
                "desc"
            } else {
                "asc"
            };
            json!({ map_field(&directive.field, true): { "order": order } })
        })
        .collect();
    Some(Value::Array(clauses))
}

/// Translates each node into one clause, aborting on the first unsupported node.
fn translate_predicate(predicate: &[Predicate]) -> StorageResult<Vec<Value>> {
    predicate.iter().map(translate_node).collect()
}

fn translate_node(node: &Predicate) -> StorageResult<Value> {
    let clause = match node {
        Predicate::And(children) => json!({ "bool": { "must": translate_predicate(children)? } }),
        Predicate::Or(children) => {
            json!({ "bool": { "should": translate_predicate(children)? } })
        }
        Predicate::Equal { field, value } => term(field, value),
        Predicate::NotEqual { field, value } => must_not(term(field, value)),
        Predicate::In { field, values } => terms(field, values),
        Predicate::NotIn { field, values } => must_not(terms(field, values)),
        Predicate::GreaterThan { field, value } => range(field, "gt", value),
        Predicate::GreaterOrEqual { field, value } => range(field, "gte", value),
        Predicate::LowerThan { field, value } => range(field, "lt", value),
        Predicate::LowerOrEqual { field, value } => range(field, "lte", value),
        Predicate::Regex { field, .. } => {
            tracing::debug!("Regex predicate on '{}' cannot be translated", field);
            return Err(StorageError::NotImplemented);
        }
    };
    Ok(clause)
}

fn term(field: &str, value: &Value) -> Value {
    json!({ "term": { map_field(field, true): value } })
}

fn terms(field: &str, values: &[Value]) -> Value {
    json!({ "terms": { map_field(field, true): values } })
}

fn range(field: &str, bound: &str, value: &Value) -> Value {
    json!({ "range": { map_field(field, false): { bound: value } } })
}

fn must_not(clause: Value) -> Value {
    json!({ "bool": { "must_not": [clause] } })
}
