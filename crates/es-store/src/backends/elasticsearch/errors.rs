//! Mapping of engine failures onto [`StorageError`].

use std::future::Future;

use crate::context::OperationContext;
use crate::error::{ErrorKind, StorageError, StorageResult};

use super::client::EngineError;

/// Engine error type raised on a lost optimistic lock or duplicate create.
pub const VERSION_CONFLICT: &str = "version_conflict_engine_exception";

/// Classifies an engine error into one of the sentinel kinds.
///
/// Checked in order: timeout, conflict (status 409 or a version conflict
/// error type), not found (status 404). Anything else is unclassified.
pub fn classify(err: &EngineError) -> Option<ErrorKind> {
    if matches!(err, EngineError::Timeout) || err.status() == Some(408) {
        return Some(ErrorKind::DeadlineExceeded);
    }
    if err.status() == Some(409) || err.details().is_some_and(|d| d.kind == VERSION_CONFLICT) {
        return Some(ErrorKind::Conflict);
    }
    if err.status() == Some(404) {
        return Some(ErrorKind::NotFound);
    }
    None
}

/// Translates an engine error raised by `operation` on `index`.
pub fn translate_error(err: EngineError, operation: &'static str, index: &str) -> StorageError {
    match classify(&err) {
        Some(ErrorKind::DeadlineExceeded) => StorageError::DeadlineExceeded,
        Some(ErrorKind::Conflict) => StorageError::Conflict,
        Some(ErrorKind::NotFound) => StorageError::NotFound,
        _ => StorageError::Operation {
            operation,
            index: index.to_string(),
            message: err.to_string(),
            source: Some(Box::new(err)),
        },
    }
}

/// Awaits an engine call within the caller's deadline and translates its error.
pub(crate) async fn engine_call<T, F>(
    ctx: &OperationContext,
    operation: &'static str,
    index: &str,
    call: F,
) -> StorageResult<T>
where
    F: Future<Output = Result<T, EngineError>>,
{
    ctx.check()?;
    let result = ctx.bound(call).await.unwrap_or(Err(EngineError::Timeout));
    result.map_err(|err| translate_error(err, operation, index))
}
