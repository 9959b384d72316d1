//! Queries: filter, sort and window.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{StorageError, StorageResult};

use super::predicate::{Predicate, parse_predicate, parse_predicate_str};

/// Sort direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortDirection {
    /// Smallest first.
    #[default]
    Ascending,
    /// Largest first.
    Descending,
}

/// A single sort key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortDirective {
    /// Logical field name.
    pub field: String,
    /// Direction.
    pub direction: SortDirection,
}

impl SortDirective {
    /// Ascending sort on `field`.
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Ascending,
        }
    }

    /// Descending sort on `field`.
    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Descending,
        }
    }

    /// Parses `"field"` or `"-field"`.
    pub fn parse(s: &str) -> StorageResult<Self> {
        let s = s.trim();
        let directive = match s.strip_prefix('-') {
            Some(field) => Self::desc(field),
            None => Self::asc(s),
        };
        if directive.field.is_empty() {
            return Err(StorageError::invalid_query("empty sort field"));
        }
        Ok(directive)
    }

    /// Whether this directive sorts descending.
    pub fn is_descending(&self) -> bool {
        self.direction == SortDirection::Descending
    }
}

/// Parses a comma separated sort list such as `"-age,name"`.
pub fn parse_sort(s: &str) -> StorageResult<Vec<SortDirective>> {
    if s.trim().is_empty() {
        return Ok(Vec::new());
    }
    s.split(',').map(SortDirective::parse).collect()
}

/// Offset/limit pagination.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Window {
    /// Number of matches to skip.
    pub offset: usize,
    /// Maximum number of items to return; `None` leaves the cap to the engine.
    pub limit: Option<usize>,
}

impl Window {
    /// Builds a window from raw values; a negative `limit` means unbounded.
    pub fn new(offset: usize, limit: i64) -> Self {
        Self {
            offset,
            limit: usize::try_from(limit).ok(),
        }
    }

    /// Window for 1-based `page` of `per_page` items.
    pub fn page(page: usize, per_page: usize) -> Self {
        Self {
            offset: page.saturating_sub(1).saturating_mul(per_page),
            limit: Some(per_page),
        }
    }

    /// A window returning every match.
    pub fn unbounded() -> Self {
        Self::default()
    }
}

/// A find request: filter, sort and optional window.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    /// Filter nodes, all of which must hold. Empty matches everything.
    pub predicate: Vec<Predicate>,
    /// Sort keys in priority order. Empty leaves ordering to the engine.
    pub sort: Vec<SortDirective>,
    /// Pagination.
    pub window: Option<Window>,
}

impl Query {
    /// Creates a query from its parts.
    pub fn new(
        predicate: Vec<Predicate>,
        sort: Vec<SortDirective>,
        window: Option<Window>,
    ) -> Self {
        Self {
            predicate,
            sort,
            window,
        }
    }

    /// Parses predicate JSON text and a sort list.
    pub fn parse(predicate: &str, sort: &str, window: Option<Window>) -> StorageResult<Self> {
        Ok(Self::new(
            parse_predicate_str(predicate)?,
            parse_sort(sort)?,
            window,
        ))
    }

    /// Builds a query from an already decoded predicate value.
    pub fn from_value(predicate: &Value) -> StorageResult<Self> {
        Ok(Self::new(parse_predicate(predicate)?, Vec::new(), None))
    }

    /// Sets the sort.
    pub fn with_sort(mut self, sort: Vec<SortDirective>) -> Self {
        self.sort = sort;
        self
    }

    /// Sets the window.
    pub fn with_window(mut self, window: Window) -> Self {
        self.window = Some(window);
        self
    }
}
