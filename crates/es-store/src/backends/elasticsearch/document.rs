//! Conversion between items and stored Elasticsearch documents.
//!
//! A stored document is the item payload (minus `id`, which lives in the
//! engine's `_id`) plus two reserved metadata fields: `_etag` and `_updated`.

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Map, Value};

use crate::error::{StorageError, StorageResult};
use crate::types::{ID_FIELD, Item};

/// Reserved field holding the item etag.
pub const ETAG_FIELD: &str = "_etag";

/// Reserved field holding the item modification time.
pub const UPDATED_FIELD: &str = "_updated";

fn is_reserved(key: &str) -> bool {
    key == ETAG_FIELD || key == UPDATED_FIELD
}

/// The engine-side representation of an item.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    fields: Map<String, Value>,
    etag: Option<String>,
    updated: Option<DateTime<Utc>>,
}

impl StoredDocument {
    /// Creates a document, rejecting payload fields that use reserved names.
    pub fn new(
        fields: Map<String, Value>,
        etag: Option<String>,
        updated: Option<DateTime<Utc>>,
    ) -> StorageResult<Self> {
        if let Some(key) = fields.keys().find(|k| is_reserved(k)) {
            return Err(StorageError::InvalidItem {
                message: format!("payload field '{key}' is reserved"),
            });
        }
        Ok(Self {
            fields,
            etag: etag.filter(|e| !e.is_empty()),
            updated,
        })
    }

    /// Builds the document for `item`. The `id` payload field is not stored.
    pub fn from_item(item: &Item) -> StorageResult<Self> {
        let fields = item
            .payload
            .iter()
            .filter(|(k, _)| k.as_str() != ID_FIELD)
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        Self::new(fields, Some(item.etag.clone()), item.updated)
    }

    /// Decodes an engine `_source`.
    ///
    /// Reserved fields are lifted out of the payload; missing or wrongly typed
    /// metadata decodes as an empty etag or no update time.
    pub fn from_source(mut source: Map<String, Value>) -> Self {
        let etag = match source.remove(ETAG_FIELD) {
            Some(Value::String(etag)) if !etag.is_empty() => Some(etag),
            _ => None,
        };
        let updated = source
            .remove(UPDATED_FIELD)
            .as_ref()
            .and_then(Value::as_str)
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc));
        Self {
            fields: source,
            etag,
            updated,
        }
    }

    /// Renders the `_source` object sent to the engine.
    pub fn to_source(&self) -> Value {
        let mut source = self.fields.clone();
        if let Some(etag) = &self.etag {
            source.insert(ETAG_FIELD.to_string(), Value::String(etag.clone()));
        }
        if let Some(updated) = &self.updated {
            source.insert(
                UPDATED_FIELD.to_string(),
                Value::String(updated.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
            );
        }
        Value::Object(source)
    }

    /// Rebuilds the item stored under `id`, re-inserting `id` into the payload.
    pub fn into_item(self, id: &str) -> Item {
        let mut payload = Map::with_capacity(self.fields.len() + 1);
        payload.insert(ID_FIELD.to_string(), Value::String(id.to_string()));
        payload.extend(self.fields);
        Item {
            id: Value::String(id.to_string()),
            etag: self.etag.unwrap_or_default(),
            updated: self.updated,
            payload,
        }
    }

    /// The stored etag, empty if none.
    pub fn etag(&self) -> &str {
        self.etag.as_deref().unwrap_or_default()
    }

    /// The stored modification time.
    pub fn updated(&self) -> Option<DateTime<Utc>> {
        self.updated
    }

    /// The payload fields.
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }
}

/// Builds the `_source` to store for `item`.
pub fn to_document(item: &Item) -> StorageResult<Value> {
    Ok(StoredDocument::from_item(item)?.to_source())
}

/// Rebuilds an item from a stored `_source`.
pub fn from_document(id: &str, source: Map<String, Value>) -> Item {
    StoredDocument::from_source(source).into_item(id)
}
