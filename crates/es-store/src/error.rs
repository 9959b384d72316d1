//! Error types for the storage adapter.
//!
//! Every operation returns a [`StorageError`]. Engine failures are classified
//! into the small stable taxonomy below at the boundary between an engine call
//! and the caller; anything the classifier does not recognise is wrapped as an
//! opaque [`StorageError::Operation`] carrying operation and index context.

// Error enum variant fields are self-documenting via their #[error(...)] messages
#![allow(missing_docs)]

use std::fmt;

use thiserror::Error;

/// The primary error type for all storage operations.
#[derive(Error, Debug)]
pub enum StorageError {
    /// The operation targets a document that does not exist.
    #[error("not found")]
    NotFound,

    /// Etag mismatch, lost optimistic lock, or duplicate create.
    #[error("conflict")]
    Conflict,

    /// Unsupported predicate operator or unsupported operation.
    #[error("not implemented")]
    NotImplemented,

    /// The caller's deadline elapsed.
    #[error("context deadline exceeded")]
    DeadlineExceeded,

    /// The item identifier cannot be represented by this engine binding.
    #[error("non string IDs are not supported with Elasticsearch (id={id})")]
    UnsupportedIdentifier { id: String },

    /// The caller-supplied predicate or sort could not be parsed.
    #[error("invalid query: {message}")]
    InvalidQuery { message: String },

    /// The item cannot be stored as given.
    #[error("invalid item: {message}")]
    InvalidItem { message: String },

    /// Unclassified low-level failure.
    #[error("{operation} error (index={index}): {message}")]
    Operation {
        operation: &'static str,
        index: String,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

/// Coarse classification of a [`StorageError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    Conflict,
    NotImplemented,
    DeadlineExceeded,
    UnsupportedIdentifier,
    InvalidQuery,
    InvalidItem,
    Operation,
}

impl StorageError {
    /// Returns the taxonomy entry for this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            StorageError::NotFound => ErrorKind::NotFound,
            StorageError::Conflict => ErrorKind::Conflict,
            StorageError::NotImplemented => ErrorKind::NotImplemented,
            StorageError::DeadlineExceeded => ErrorKind::DeadlineExceeded,
            StorageError::UnsupportedIdentifier { .. } => ErrorKind::UnsupportedIdentifier,
            StorageError::InvalidQuery { .. } => ErrorKind::InvalidQuery,
            StorageError::InvalidItem { .. } => ErrorKind::InvalidItem,
            StorageError::Operation { .. } => ErrorKind::Operation,
        }
    }

    /// Builds an opaque operation error without an underlying source.
    pub fn operation(
        operation: &'static str,
        index: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        StorageError::Operation {
            operation,
            index: index.into(),
            message: message.into(),
            source: None,
        }
    }

    pub(crate) fn invalid_query(message: impl Into<String>) -> Self {
        StorageError::InvalidQuery {
            message: message.into(),
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::NotFound => "not-found",
            ErrorKind::Conflict => "conflict",
            ErrorKind::NotImplemented => "not-implemented",
            ErrorKind::DeadlineExceeded => "deadline-exceeded",
            ErrorKind::UnsupportedIdentifier => "unsupported-identifier",
            ErrorKind::InvalidQuery => "invalid-query",
            ErrorKind::InvalidItem => "invalid-item",
            ErrorKind::Operation => "operation",
        };
        f.write_str(name)
    }
}

/// Result type alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;
