//! Caller-supplied operation context.
//!
//! An [`OperationContext`] carries the caller's optional deadline through every
//! engine round-trip. The deadline is forwarded to the engine as a request
//! timeout argument and bounds each call on the client side. Cancellation is
//! expressed by dropping the operation future.

use std::future::Future;
use std::time::{Duration, Instant};

use crate::error::{StorageError, StorageResult};

/// Per-operation context carrying an optional deadline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OperationContext {
    deadline: Option<Instant>,
}

impl OperationContext {
    /// A context without deadline.
    pub fn background() -> Self {
        Self::default()
    }

    /// A context expiring `timeout` from now. A timeout too large to
    /// represent as an instant means no deadline.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            deadline: Instant::now().checked_add(timeout),
        }
    }

    /// A context expiring at `deadline`.
    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            deadline: Some(deadline),
        }
    }

    /// Returns the deadline, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time left before the deadline, zero once it has passed.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    /// Whether the deadline has already passed.
    pub fn is_expired(&self) -> bool {
        self.deadline
            .is_some_and(|deadline| Instant::now() >= deadline)
    }

    /// Fails with [`StorageError::DeadlineExceeded`] once the deadline has passed.
    pub fn check(&self) -> StorageResult<()> {
        if self.is_expired() {
            return Err(StorageError::DeadlineExceeded);
        }
        Ok(())
    }

    /// Renders the remaining time as an engine timeout argument (`"250ms"`).
    pub fn timeout_param(&self) -> Option<String> {
        self.remaining()
            .map(|remaining| format!("{}ms", remaining.as_millis()))
    }

    /// Runs `fut`, giving up with `None` if the deadline elapses first.
    pub(crate) async fn bound<F: Future>(&self, fut: F) -> Option<F::Output> {
        match self.remaining() {
            Some(remaining) => tokio::time::timeout(remaining, fut).await.ok(),
            None => Some(fut.await),
        }
    }
}
