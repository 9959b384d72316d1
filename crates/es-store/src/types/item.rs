//! Items and item lists exchanged with the resource layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{StorageError, StorageResult};

/// Logical name of the identifier field in item payloads.
pub const ID_FIELD: &str = "id";

/// A stored item as seen by the resource layer.
///
/// `etag` is the caller-visible concurrency token. It is unrelated to the
/// engine's internal document version. An empty etag and a `None` update time
/// are not persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    /// Item identifier. Only string identifiers can be stored.
    pub id: Value,
    /// Opaque optimistic-concurrency token.
    #[serde(default)]
    pub etag: String,
    /// Last modification time.
    #[serde(default)]
    pub updated: Option<DateTime<Utc>>,
    /// Item fields, usually including the `id` field.
    #[serde(default)]
    pub payload: Map<String, Value>,
}

impl Item {
    /// Creates an item with the given id and payload.
    pub fn new(id: impl Into<Value>, payload: Map<String, Value>) -> Self {
        Self {
            id: id.into(),
            etag: String::new(),
            updated: None,
            payload,
        }
    }

    /// Sets the etag.
    pub fn with_etag(mut self, etag: impl Into<String>) -> Self {
        self.etag = etag.into();
        self
    }

    /// Sets the last modification time.
    pub fn with_updated(mut self, updated: DateTime<Utc>) -> Self {
        self.updated = Some(updated);
        self
    }

    /// Returns the identifier as a string, rejecting any other representation.
    pub fn string_id(&self) -> StorageResult<&str> {
        string_id(&self.id)
    }
}

/// Returns `id` as a string, rejecting non-string identifiers.
pub fn string_id(id: &Value) -> StorageResult<&str> {
    id.as_str()
        .ok_or_else(|| StorageError::UnsupportedIdentifier { id: id.to_string() })
}

/// A window of matching items plus the total match count.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ItemList {
    /// Number of matches before windowing.
    pub total: u64,
    /// The items in the requested window.
    pub items: Vec<Item>,
}

impl ItemList {
    /// An empty list with a zero total.
    pub fn empty() -> Self {
        Self::default()
    }
}
