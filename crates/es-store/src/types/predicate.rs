//! Engine-agnostic filter predicates.
//!
//! A filter is a list of [`Predicate`] nodes that must all hold. Nodes are
//! either leaf comparisons on a logical field or `And`/`Or` composites. The
//! caller-facing JSON grammar is parsed by [`parse_predicate`]:
//!
//! ```text
//! {"name": "c"}                              equality
//! {"age": {"$gte": 18, "$lt": 65}}           one leaf per operator
//! {"tag": {"$in": ["a", "b"]}}               set membership ($nin negates)
//! {"$or": [{"name": "a"}, {"name": "b"}]}    composites ($and, $or)
//! ```

use serde_json::{Map, Value};

use crate::error::{StorageError, StorageResult};

/// A node of a filter tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// `field == value`
    Equal { field: String, value: Value },
    /// `field != value`
    NotEqual { field: String, value: Value },
    /// `field > value`
    GreaterThan { field: String, value: Value },
    /// `field >= value`
    GreaterOrEqual { field: String, value: Value },
    /// `field < value`
    LowerThan { field: String, value: Value },
    /// `field <= value`
    LowerOrEqual { field: String, value: Value },
    /// `field` is one of `values`
    In { field: String, values: Vec<Value> },
    /// `field` is none of `values`
    NotIn { field: String, values: Vec<Value> },
    /// `field` matches a regular expression. Part of the host grammar but not
    /// translatable to the engine.
    Regex { field: String, pattern: String },
    /// All children hold.
    And(Vec<Predicate>),
    /// At least one child holds.
    Or(Vec<Predicate>),
}

impl Predicate {
    /// Equality leaf.
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Predicate::Equal {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Inequality leaf.
    pub fn ne(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Predicate::NotEqual {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Strict lower bound leaf.
    pub fn gt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Predicate::GreaterThan {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Inclusive lower bound leaf.
    pub fn gte(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Predicate::GreaterOrEqual {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Strict upper bound leaf.
    pub fn lt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Predicate::LowerThan {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Inclusive upper bound leaf.
    pub fn lte(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Predicate::LowerOrEqual {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Set membership leaf.
    pub fn in_values(field: impl Into<String>, values: Vec<Value>) -> Self {
        Predicate::In {
            field: field.into(),
            values,
        }
    }

    /// Negated set membership leaf.
    pub fn not_in_values(field: impl Into<String>, values: Vec<Value>) -> Self {
        Predicate::NotIn {
            field: field.into(),
            values,
        }
    }
}

/// Parses the JSON predicate grammar into a filter list.
///
/// An empty object yields an empty filter (match everything).
pub fn parse_predicate(value: &Value) -> StorageResult<Vec<Predicate>> {
    let obj = value
        .as_object()
        .ok_or_else(|| StorageError::invalid_query("predicate must be an object"))?;
    parse_object(obj)
}

/// Parses a predicate given as JSON text. Blank input yields an empty filter.
pub fn parse_predicate_str(input: &str) -> StorageResult<Vec<Predicate>> {
    if input.trim().is_empty() {
        return Ok(Vec::new());
    }
    let value: Value = serde_json::from_str(input)
        .map_err(|e| StorageError::invalid_query(format!("char {}: {}", e.column(), e)))?;
    parse_predicate(&value)
}

fn parse_object(obj: &Map<String, Value>) -> StorageResult<Vec<Predicate>> {
    let mut predicates = Vec::with_capacity(obj.len());
    for (key, value) in obj {
        match key.as_str() {
            "$and" => predicates.push(Predicate::And(parse_composite(key, value)?)),
            "$or" => predicates.push(Predicate::Or(parse_composite(key, value)?)),
            op if op.starts_with('$') => {
                return Err(StorageError::invalid_query(format!(
                    "{op}: invalid operator"
                )));
            }
            field => parse_field(field, value, &mut predicates)?,
        }
    }
    Ok(predicates)
}

fn parse_composite(op: &str, value: &Value) -> StorageResult<Vec<Predicate>> {
    let subs = value
        .as_array()
        .ok_or_else(|| StorageError::invalid_query(format!("{op}: value must be an array")))?;
    if subs.is_empty() {
        return Err(StorageError::invalid_query(format!(
            "{op}: value must have at least one element"
        )));
    }
    let mut children = Vec::with_capacity(subs.len());
    for sub in subs {
        let obj = sub.as_object().ok_or_else(|| {
            StorageError::invalid_query(format!("{op}: elements must be objects"))
        })?;
        let mut parsed = parse_object(obj)?;
        match parsed.len() {
            0 => {
                return Err(StorageError::invalid_query(format!(
                    "{op}: elements must not be empty"
                )));
            }
            1 => children.extend(parsed.pop()),
            _ => children.push(Predicate::And(parsed)),
        }
    }
    Ok(children)
}

fn parse_field(field: &str, value: &Value, out: &mut Vec<Predicate>) -> StorageResult<()> {
    let ops = match value.as_object() {
        Some(obj) if !obj.is_empty() && obj.keys().all(|k| k.starts_with('$')) => obj,
        Some(obj) if obj.keys().any(|k| k.starts_with('$')) => {
            return Err(StorageError::invalid_query(format!(
                "{field}: cannot mix operators and fields"
            )));
        }
        _ => {
            out.push(Predicate::eq(field, value.clone()));
            return Ok(());
        }
    };

    for (op, arg) in ops {
        let predicate = match op.as_str() {
            "$ne" => Predicate::ne(field, arg.clone()),
            "$gt" => Predicate::gt(field, comparable(field, op, arg)?),
            "$gte" => Predicate::gte(field, comparable(field, op, arg)?),
            "$lt" => Predicate::lt(field, comparable(field, op, arg)?),
            "$lte" => Predicate::lte(field, comparable(field, op, arg)?),
            "$in" => Predicate::in_values(field, values(field, op, arg)?),
            "$nin" => Predicate::not_in_values(field, values(field, op, arg)?),
            "$regex" => Predicate::Regex {
                field: field.to_string(),
                pattern: arg
                    .as_str()
                    .ok_or_else(|| {
                        StorageError::invalid_query(format!(
                            "{field}: $regex: value must be a string"
                        ))
                    })?
                    .to_string(),
            },
            _ => {
                return Err(StorageError::invalid_query(format!(
                    "{field}: {op}: invalid operator"
                )));
            }
        };
        out.push(predicate);
    }
    Ok(())
}

fn comparable(field: &str, op: &str, arg: &Value) -> StorageResult<Value> {
    match arg {
        Value::Number(_) | Value::String(_) => Ok(arg.clone()),
        _ => Err(StorageError::invalid_query(format!(
            "{field}: {op}: value must be a number or a string"
        ))),
    }
}

fn values(field: &str, op: &str, arg: &Value) -> StorageResult<Vec<Value>> {
    arg.as_array()
        .cloned()
        .ok_or_else(|| {
            StorageError::invalid_query(format!("{field}: {op}: value must be an array"))
        })
}
