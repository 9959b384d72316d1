//! Core item storage traits.
//!
//! This module defines the [`ItemStorage`] trait, the contract the resource
//! layer uses to persist and query items, and the optional
//! [`MultiGetStorage`] extension for batched lookups by identifier.

use async_trait::async_trait;
use serde_json::Value;

use crate::context::OperationContext;
use crate::error::StorageResult;
use crate::types::{Item, ItemList, Query};

/// Storage contract for items.
///
/// Every operation takes an [`OperationContext`] carrying the caller's
/// deadline. Writes are protected by the items' etags: `update` and `delete`
/// only proceed when the stored etag matches the one the caller last read.
///
/// # Example
///
/// ```ignore
/// use helios_es_store::core::ItemStorage;
/// use helios_es_store::{OperationContext, Item, Query};
///
/// async fn rename<S: ItemStorage>(storage: &S, original: &Item) -> StorageResult<()> {
///     let ctx = OperationContext::with_timeout(Duration::from_secs(2));
///     let mut updated = original.clone().with_etag("etag-2");
///     updated.payload.insert("name".into(), "new name".into());
///     storage.update(&ctx, &updated, original).await
/// }
/// ```
#[async_trait]
pub trait ItemStorage: Send + Sync {
    /// Returns a human-readable name for this storage backend.
    fn backend_name(&self) -> &'static str;

    /// Inserts new items.
    ///
    /// # Errors
    ///
    /// * `StorageError::UnsupportedIdentifier` - If any identifier is not a string
    /// * `StorageError::Conflict` - If an item with the same identifier exists
    /// * `StorageError::Operation` - For the first failed item of a partially failed batch
    async fn insert(&self, ctx: &OperationContext, items: &[Item]) -> StorageResult<()>;

    /// Replaces `original` by `item`.
    ///
    /// # Errors
    ///
    /// * `StorageError::NotFound` - If the item doesn't exist
    /// * `StorageError::Conflict` - If the stored etag differs from `original.etag`
    ///   or the document changed concurrently
    /// * `StorageError::DeadlineExceeded` - If the deadline elapsed
    async fn update(
        &self,
        ctx: &OperationContext,
        item: &Item,
        original: &Item,
    ) -> StorageResult<()>;

    /// Deletes an item.
    ///
    /// # Errors
    ///
    /// * `StorageError::NotFound` - If the item doesn't exist
    /// * `StorageError::Conflict` - If the stored etag differs from `item.etag`
    async fn delete(&self, ctx: &OperationContext, item: &Item) -> StorageResult<()>;

    /// Finds items matching `query`.
    ///
    /// `ItemList::total` is the match count before windowing.
    ///
    /// # Errors
    ///
    /// * `StorageError::NotImplemented` - If the predicate uses an operator the
    ///   backend cannot translate; nothing is sent in that case
    async fn find(&self, ctx: &OperationContext, query: &Query) -> StorageResult<ItemList>;

    /// Deletes every item matching `query`, returning how many were removed.
    async fn clear(&self, ctx: &OperationContext, query: &Query) -> StorageResult<u64>;
}

/// Batched lookup by identifier.
#[async_trait]
pub trait MultiGetStorage: ItemStorage {
    /// Returns the items found among `ids`; missing identifiers are omitted.
    ///
    /// # Errors
    ///
    /// * `StorageError::UnsupportedIdentifier` - If any identifier is not a string
    async fn multi_get(&self, ctx: &OperationContext, ids: &[Value]) -> StorageResult<Vec<Item>>;
}
