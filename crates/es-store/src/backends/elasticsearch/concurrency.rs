//! Optimistic concurrency for update and delete.
//!
//! Items carry an opaque etag issued by the caller; the engine tracks its own
//! per-document version. The two never meet, so every conditional write is a
//! two step exchange:
//!
//! 1. fetch the stored `_etag` together with the engine version
//! 2. compare the etag, then write conditioned on the fetched version
//!
//! A concurrent writer that lands between the two steps bumps the engine
//! version and the conditioned write fails with a version conflict.

use serde_json::Value;

use crate::context::OperationContext;
use crate::error::{StorageError, StorageResult};

use super::client::{DocumentVersion, RefreshPolicy, RequestOptions, SearchEngine};
use super::document::ETAG_FIELD;
use super::errors::engine_call;

/// The write issued once the etag check passed.
#[derive(Debug, Clone, PartialEq)]
pub enum ConditionalWrite {
    /// Replace the whole stored document with this `_source`.
    Replace(Value),
    /// Delete the stored document.
    Delete,
}

impl ConditionalWrite {
    fn operation(&self) -> &'static str {
        match self {
            ConditionalWrite::Replace(_) => "update",
            ConditionalWrite::Delete => "delete",
        }
    }
}

/// Applies `write` to document `id` if its stored etag equals `expected_etag`.
///
/// Fails with `NotFound` if the document is missing, `Conflict` if the etag
/// differs or the document changed after the fetch, and `DeadlineExceeded`
/// if the deadline passed before the write was sent.
pub async fn compare_and_swap<E>(
    engine: &E,
    ctx: &OperationContext,
    index: &str,
    id: &str,
    expected_etag: &str,
    write: ConditionalWrite,
    refresh: RefreshPolicy,
) -> StorageResult<()>
where
    E: SearchEngine + ?Sized,
{
    let operation = write.operation();
    let version = fetch_version(engine, ctx, index, id, expected_etag, operation).await?;

    ctx.check()?;

    let options = RequestOptions {
        timeout: ctx.timeout_param(),
        refresh: Some(refresh),
        realtime: None,
    };
    let result = match write {
        ConditionalWrite::Replace(document) => {
            engine_call(
                ctx,
                operation,
                index,
                engine.replace(index, id, document, version, &options),
            )
            .await
        }
        ConditionalWrite::Delete => {
            engine_call(ctx, operation, index, engine.delete(index, id, version, &options)).await
        }
    };
    if let Err(StorageError::Conflict) = &result {
        tracing::debug!(
            "{} of '{}' lost the race at version {}",
            operation,
            id,
            version
        );
    }
    result
}

/// Fetches the engine version of `id`, checking its etag on the way.
async fn fetch_version<E>(
    engine: &E,
    ctx: &OperationContext,
    index: &str,
    id: &str,
    expected_etag: &str,
    operation: &'static str,
) -> StorageResult<DocumentVersion>
where
    E: SearchEngine + ?Sized,
{
    // The etag check must see the latest write, refreshed or not.
    let options = RequestOptions {
        timeout: ctx.timeout_param(),
        refresh: None,
        realtime: Some(true),
    };
    let current = engine_call(
        ctx,
        operation,
        index,
        engine.get(index, id, &[ETAG_FIELD], &options),
    )
    .await?;

    if !current.found {
        tracing::debug!("{} of '{}': document not found", operation, id);
        return Err(StorageError::NotFound);
    }

    let stored_etag = current
        .source
        .as_ref()
        .and_then(|source| source.get(ETAG_FIELD))
        .and_then(Value::as_str)
        .unwrap_or_default();
    if stored_etag != expected_etag {
        tracing::debug!(
            "{} of '{}': etag mismatch (stored={}, expected={})",
            operation,
            id,
            stored_etag,
            expected_etag
        );
        return Err(StorageError::Conflict);
    }

    let version = current.document_version().ok_or_else(|| {
        StorageError::operation(operation, index, "response carries no document version")
    })?;
    tracing::debug!(
        "{} of '{}': etag matched at version {} (_version={:?})",
        operation,
        id,
        version,
        current.version
    );
    Ok(version)
}
