//! Multi-item insert and bulk response reconciliation.

use serde_json::Value;

use crate::error::{StorageError, StorageResult};
use crate::types::Item;

use super::client::{BulkResponse, ErrorDetails};
use super::document::to_document;
use super::errors::VERSION_CONFLICT;

/// Builds one create operation per item as `(id, _source)` pairs.
///
/// All identifiers and payloads are checked before anything is returned, so a
/// batch containing one bad item is never sent.
pub fn create_operations(items: &[Item]) -> StorageResult<Vec<(String, Value)>> {
    items
        .iter()
        .map(|item| Ok((item.string_id()?.to_string(), to_document(item)?)))
        .collect()
}

fn is_already_exists(status: u16, error: Option<&ErrorDetails>) -> bool {
    status == 409 || error.is_some_and(|e| e.kind == VERSION_CONFLICT)
}

/// Interprets a bulk response.
///
/// Only the first failed entry is examined: a duplicate create turns the whole
/// call into `Conflict`, any other failure into an operation error naming its
/// 1-based position in the batch.
pub fn reconcile(response: &BulkResponse, index: &str) -> StorageResult<()> {
    let Some((position, failed)) = response
        .results()
        .enumerate()
        .find(|(_, result)| result.is_failure())
    else {
        return Ok(());
    };

    let failures = response.results().filter(|r| r.is_failure()).count();
    if failures > 1 {
        tracing::warn!(
            "bulk insert into '{}': {} entries failed, reporting the first",
            index,
            failures
        );
    }

    if is_already_exists(failed.status, failed.error.as_ref()) {
        tracing::debug!(
            "bulk insert into '{}': item {:?} already exists",
            index,
            failed.id
        );
        return Err(StorageError::Conflict);
    }

    let reason = failed
        .error
        .as_ref()
        .map(ToString::to_string)
        .unwrap_or_else(|| format!("status {}", failed.status));
    Err(StorageError::operation(
        "insert",
        index,
        format!("item #{}: {}", position + 1, reason),
    ))
}
