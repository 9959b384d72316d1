//! Index mapping for stored items.
//!
//! Item payloads are schemaless, so the mapping is made of dynamic templates:
//! every string is analyzed text with an exact `keyword` sub-field, and every
//! number or boolean gets a `keyword` sub-field too. Equality, set and sort
//! clauses all target `<field>.keyword`, so they behave the same for every
//! scalar. Date detection is off: a date-like string stays a string.

use elasticsearch::Elasticsearch;
use elasticsearch::indices::IndicesCreateParts;
use serde_json::{Value, json};

use crate::error::{StorageError, StorageResult};

use super::backend::ElasticsearchConfig;
use super::client::EngineError;
use super::document::{ETAG_FIELD, UPDATED_FIELD};

const ALREADY_EXISTS: &str = "resource_already_exists_exception";

/// Creates the index settings and mapping.
pub fn create_index_mapping(config: &ElasticsearchConfig) -> Value {
    json!({
        "settings": {
            "number_of_shards": config.number_of_shards,
            "number_of_replicas": config.number_of_replicas
        },
        "mappings": {
            "date_detection": false,
            "dynamic_templates": [
                {
                    "strings": {
                        "match_mapping_type": "string",
                        "mapping": {
                            "type": "text",
                            "fields": {
                                "keyword": { "type": "keyword", "ignore_above": 256 }
                            }
                        }
                    }
                },
                {
                    "longs": {
                        "match_mapping_type": "long",
                        "mapping": {
                            "type": "long",
                            "fields": {
                                "keyword": { "type": "keyword" }
                            }
                        }
                    }
                },
                {
                    "doubles": {
                        "match_mapping_type": "double",
                        "mapping": {
                            "type": "double",
                            "fields": {
                                "keyword": { "type": "keyword" }
                            }
                        }
                    }
                },
                {
                    "booleans": {
                        "match_mapping_type": "boolean",
                        "mapping": {
                            "type": "boolean",
                            "fields": {
                                "keyword": { "type": "keyword" }
                            }
                        }
                    }
                }
            ],
            "properties": {
                ETAG_FIELD: { "type": "keyword" },
                UPDATED_FIELD: { "type": "date_nanos" }
            }
        }
    })
}

/// Creates the configured index unless it already exists.
pub async fn ensure_index(
    client: &Elasticsearch,
    config: &ElasticsearchConfig,
) -> StorageResult<()> {
    let index = config.index.as_str();
    let response = client
        .indices()
        .create(IndicesCreateParts::Index(index))
        .body(create_index_mapping(config))
        .send()
        .await
        .map_err(|e| StorageError::Operation {
            operation: "create index",
            index: index.to_string(),
            message: e.to_string(),
            source: Some(Box::new(e)),
        })?;

    let status = response.status_code();
    if status.is_success() {
        tracing::info!("Created Elasticsearch index '{}'", index);
        return Ok(());
    }

    let body = response.text().await.unwrap_or_default();
    let err = EngineError::from_status(status.as_u16(), body);
    if err.details().is_some_and(|d| d.kind == ALREADY_EXISTS) {
        tracing::debug!("Elasticsearch index '{}' already exists", index);
        return Ok(());
    }
    Err(StorageError::Operation {
        operation: "create index",
        index: index.to_string(),
        message: err.to_string(),
        source: Some(Box::new(err)),
    })
}
