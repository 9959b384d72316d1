//! ItemStorage implementation for Elasticsearch.

use async_trait::async_trait;
use serde_json::Value;

use crate::context::OperationContext;
use crate::core::{ItemStorage, MultiGetStorage};
use crate::error::{StorageError, StorageResult};
use crate::types::{ID_FIELD, Item, ItemList, Predicate, Query, string_id};

use super::backend::ElasticsearchStorage;
use super::bulk::{create_operations, reconcile};
use super::client::{RequestOptions, SearchEngine};
use super::concurrency::{ConditionalWrite, compare_and_swap};
use super::document::{from_document, to_document};
use super::errors::engine_call;
use super::search::EsQueryBuilder;

impl<C: SearchEngine> ElasticsearchStorage<C> {
    fn write_options(&self, ctx: &OperationContext) -> RequestOptions {
        RequestOptions {
            timeout: ctx.timeout_param(),
            refresh: Some(self.config().refresh),
            realtime: None,
        }
    }

    fn read_options(ctx: &OperationContext) -> RequestOptions {
        RequestOptions {
            timeout: ctx.timeout_param(),
            refresh: None,
            realtime: None,
        }
    }

    /// Looks a single item up by id, with the same outcome as searching for it.
    ///
    /// The get is not realtime, so an unrefreshed write stays invisible here
    /// exactly as it does to search.
    async fn find_by_id(&self, ctx: &OperationContext, id: &str) -> StorageResult<ItemList> {
        tracing::debug!("find: direct lookup of '{}'", id);
        let index = self.index();
        let options = RequestOptions {
            realtime: Some(false),
            ..Self::read_options(ctx)
        };
        let response = match engine_call(
            ctx,
            "find",
            index,
            self.client().get(index, id, &[], &options),
        )
        .await
        {
            Ok(response) => response,
            Err(StorageError::NotFound) => return Ok(ItemList::empty()),
            Err(e) => return Err(e),
        };

        if !response.found {
            return Ok(ItemList::empty());
        }
        let item = from_document(&response.id, response.source.unwrap_or_default());
        Ok(ItemList {
            total: 1,
            items: vec![item],
        })
    }
}

/// Returns the id when `query` selects exactly one item by string id.
fn single_id_lookup(query: &Query) -> Option<&str> {
    let window = query.window?;
    if window.offset != 0 || window.limit != Some(1) {
        return None;
    }
    match query.predicate.as_slice() {
        [Predicate::Equal { field, value }] if field == ID_FIELD => value.as_str(),
        _ => None,
    }
}

#[async_trait]
impl<C: SearchEngine> ItemStorage for ElasticsearchStorage<C> {
    fn backend_name(&self) -> &'static str {
        "elasticsearch"
    }

    async fn insert(&self, ctx: &OperationContext, items: &[Item]) -> StorageResult<()> {
        if items.is_empty() {
            return Ok(());
        }
        let index = self.index();
        let documents = create_operations(items)?;
        let options = self.write_options(ctx);

        let response = engine_call(
            ctx,
            "insert",
            index,
            self.client().bulk_create(index, documents, &options),
        )
        .await?;
        reconcile(&response, index)?;

        tracing::debug!("Inserted {} items into '{}'", items.len(), index);
        Ok(())
    }

    async fn update(
        &self,
        ctx: &OperationContext,
        item: &Item,
        original: &Item,
    ) -> StorageResult<()> {
        let id = original.string_id()?;
        let document = to_document(item)?;
        compare_and_swap(
            self.client(),
            ctx,
            self.index(),
            id,
            &original.etag,
            ConditionalWrite::Replace(document),
            self.config().refresh,
        )
        .await
    }

    async fn delete(&self, ctx: &OperationContext, item: &Item) -> StorageResult<()> {
        let id = item.string_id()?;
        compare_and_swap(
            self.client(),
            ctx,
            self.index(),
            id,
            &item.etag,
            ConditionalWrite::Delete,
            self.config().refresh,
        )
        .await
    }

    async fn find(&self, ctx: &OperationContext, query: &Query) -> StorageResult<ItemList> {
        if let Some(id) = single_id_lookup(query) {
            return self.find_by_id(ctx, id).await;
        }

        let index = self.index();
        let es_query = EsQueryBuilder::new(index).build(query)?;
        let options = Self::read_options(ctx);

        let response = engine_call(
            ctx,
            "find",
            index,
            self.client().search(index, es_query.body, &options),
        )
        .await?;

        let total = response.total();
        let items = response
            .hits
            .hits
            .into_iter()
            .map(|hit| from_document(&hit.id, hit.source.unwrap_or_default()))
            .collect();
        Ok(ItemList { total, items })
    }

    async fn clear(&self, _ctx: &OperationContext, _query: &Query) -> StorageResult<u64> {
        tracing::debug!("clear is not supported on index '{}'", self.index());
        Err(StorageError::NotImplemented)
    }
}

#[async_trait]
impl<C: SearchEngine> MultiGetStorage for ElasticsearchStorage<C> {
    async fn multi_get(&self, ctx: &OperationContext, ids: &[Value]) -> StorageResult<Vec<Item>> {
        let ids = ids
            .iter()
            .map(string_id)
            .collect::<StorageResult<Vec<&str>>>()?;
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let index = self.index();
        let options = Self::read_options(ctx);
        let response = engine_call(
            ctx,
            "multi get",
            index,
            self.client().multi_get(index, &ids, &options),
        )
        .await?;

        Ok(response
            .docs
            .into_iter()
            .filter(|doc| doc.found)
            .map(|doc| from_document(&doc.id, doc.source.unwrap_or_default()))
            .collect())
    }
}
