//! Core types exchanged with the resource layer.
//!
//! - [`Item`] / [`ItemList`] - items and windowed result lists
//! - [`Predicate`] - filter trees and the JSON predicate grammar
//! - [`Query`], [`SortDirective`], [`Window`] - find requests

pub mod item;
pub mod predicate;
pub mod query;

pub use item::{ID_FIELD, Item, ItemList, string_id};
pub use predicate::{Predicate, parse_predicate, parse_predicate_str};
pub use query::{Query, SortDirection, SortDirective, Window, parse_sort};
