//! Elasticsearch backend implementation.
//!
//! Items are stored one document per item in a single index. The item `id`
//! becomes the document `_id`; the payload is the document `_source` together
//! with two reserved metadata fields, `_etag` and `_updated`.
//!
//! # Concurrency
//!
//! Inserts use create semantics: an existing `_id` is a conflict. Updates and
//! deletes compare the caller's etag with the stored one, then write
//! conditioned on the document's `_seq_no`/`_primary_term` (see
//! [`concurrency`]).
//!
//! # Index Structure
//!
//! String and numeric fields carry a `keyword` sub-field so equality, set
//! membership and sorting use exact values; range clauses use the field itself.
//! [`ElasticsearchStorage::ensure_index`] creates the index with that mapping.
//!
//! # Example
//!
//! ```ignore
//! use helios_es_store::backends::elasticsearch::{ElasticsearchConfig, ElasticsearchStorage};
//! use helios_es_store::{ItemStorage, OperationContext, Query};
//!
//! let config = ElasticsearchConfig {
//!     nodes: vec!["http://localhost:9200".to_string()],
//!     index: "users".to_string(),
//!     ..Default::default()
//! };
//! let storage = ElasticsearchStorage::new(config)?;
//! storage.ensure_index().await?;
//!
//! let query = Query::parse(r#"{"age": {"$gte": 18}}"#, "-age", None)?;
//! let adults = storage.find(&OperationContext::background(), &query).await?;
//! ```

mod backend;
pub mod bulk;
pub mod client;
pub mod concurrency;
pub mod document;
pub mod errors;
mod schema;
pub mod search;
mod storage;

pub use backend::{ElasticsearchAuth, ElasticsearchConfig, ElasticsearchStorage};
pub use client::{
    BulkItemResult, BulkResponse, DocumentVersion, EngineError, ErrorDetails, GetResponse, Hit,
    Hits, MultiGetDoc, MultiGetResponse, RefreshPolicy, RequestOptions, SearchEngine,
    SearchResponse, TotalHits,
};
pub use document::{ETAG_FIELD, StoredDocument, UPDATED_FIELD, from_document, to_document};
pub use errors::{classify, translate_error};
pub use schema::create_index_mapping;
