//! Elasticsearch search query translation.
//!
//! Translates engine-agnostic predicates and sort keys into Elasticsearch
//! Query DSL.

pub mod fields;
pub mod query_builder;

pub use fields::map_field;
pub use query_builder::{EsQuery, EsQueryBuilder, build_query, build_sort};
