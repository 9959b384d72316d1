//! Helios Elasticsearch Item Storage
//!
//! This crate stores schemaless items in an Elasticsearch index and queries
//! them with an engine-agnostic filter grammar.
//!
//! # Features
//!
//! - **Predicate translation**: `$ne`, `$gt`, `$gte`, `$lt`, `$lte`, `$in`, `$nin`,
//!   `$and`, `$or` and bare equality compile to Elasticsearch Query DSL
//! - **Optimistic concurrency**: caller etags are checked against the stored
//!   document, and the write is conditioned on the engine's document version
//! - **Bulk insert**: one batch per call, with partial failures reported
//! - **Deadlines**: every engine call honours the caller's [`OperationContext`]
//!
//! # Architecture
//!
//! - [`types`] - Items, predicates, sort keys and windows
//! - [`error`] - Error taxonomy for all operations
//! - [`context`] - Per-operation deadline
//! - [`core`] - Storage traits
//! - [`backends`] - Backend implementations (Elasticsearch)
//!
//! # Quick Start
//!
//! ```
//! use helios_es_store::types::{Predicate, Query, Window};
//! use serde_json::json;
//!
//! let query = Query::from_value(&json!({
//!     "$or": [{"name": "ada"}, {"age": {"$gt": 30}}]
//! }))
//! .unwrap()
//! .with_window(Window::new(0, 10));
//!
//! assert_eq!(query.predicate.len(), 1);
//! assert!(matches!(query.predicate[0], Predicate::Or(_)));
//! ```
//!
//! # Errors
//!
//! Engine failures are classified into [`StorageError::NotFound`],
//! [`StorageError::Conflict`] and [`StorageError::DeadlineExceeded`]; anything
//! else is reported as [`StorageError::Operation`] with the operation name and
//! index attached.

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod backends;
pub mod context;
pub mod core;
pub mod error;
pub mod types;

// Re-export commonly used types at crate root
pub use context::OperationContext;
pub use error::{ErrorKind, StorageError, StorageResult};
pub use types::{Item, ItemList, Predicate, Query, SortDirective, Window};

// Re-export core traits
pub use core::{ItemStorage, MultiGetStorage};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name.
pub const NAME: &str = env!("CARGO_PKG_NAME");
