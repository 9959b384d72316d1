//! Item fixtures and storage constructors.

use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use serde_json::{Map, Value, json};

use helios_es_store::Item;
use helios_es_store::backends::elasticsearch::{ElasticsearchConfig, ElasticsearchStorage};

use super::MemoryEngine;

/// Index used by the in-memory storage.
pub const TEST_INDEX: &str = "items";

/// A fixed modification time with nanosecond precision.
pub fn fixed_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 45).unwrap()
        + chrono::Duration::nanoseconds(123_456_789)
}

/// Builds an item whose payload is `fields` plus the `id` key.
pub fn item(id: &str, etag: &str, fields: Value) -> Item {
    let mut payload = Map::new();
    payload.insert("id".to_string(), json!(id));
    if let Value::Object(fields) = fields {
        payload.extend(fields);
    }
    Item::new(id, payload)
        .with_etag(etag)
        .with_updated(fixed_time())
}

/// The two users most find tests run against.
pub fn users() -> Vec<Item> {
    vec![
        item("1", "a", json!({"name": "ada", "age": 36})),
        item("2", "b", json!({"name": "bob", "age": 25})),
    ]
}

/// A storage over a fresh in-memory engine.
pub fn memory_storage() -> ElasticsearchStorage<MemoryEngine> {
    let config = ElasticsearchConfig {
        index: TEST_INDEX.to_string(),
        request_timeout: Duration::from_secs(5),
        ..Default::default()
    };
    ElasticsearchStorage::with_client(MemoryEngine::new(), config)
}
