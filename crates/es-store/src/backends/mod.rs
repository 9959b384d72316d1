//! Storage backend implementations.
//!
//! | Backend | Description |
//! |---------|-------------|
//! | Elasticsearch | Item documents with etag-based optimistic concurrency |

pub mod elasticsearch;
