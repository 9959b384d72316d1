//! The engine calls the adapter needs, and their typed responses.
//!
//! [`SearchEngine`] is implemented for the official [`Elasticsearch`] client.
//! Writes that replace or delete a document always carry the
//! [`DocumentVersion`] they are conditioned on; there is no unconditional
//! variant.

// Response fields mirror the engine's JSON field names
#![allow(missing_docs)]

use std::collections::BTreeMap;
use std::fmt;

use async_trait::async_trait;
use elasticsearch::http::response::Response;
use elasticsearch::params::Refresh;
use elasticsearch::{
    BulkOperation, BulkParts, DeleteParts, Elasticsearch, GetParts, IndexParts, MgetParts,
    SearchParts,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use thiserror::Error;

/// Engine-internal compare-and-swap token of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentVersion {
    /// Sequence number of the last write.
    pub seq_no: i64,
    /// Primary term of the last write.
    pub primary_term: i64,
}

impl fmt::Display for DocumentVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.primary_term, self.seq_no)
    }
}

/// When writes become visible to search.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefreshPolicy {
    /// Refresh the affected shards immediately.
    True,
    /// Leave it to the periodic refresh.
    #[default]
    False,
    /// Wait for the next periodic refresh before returning.
    WaitFor,
}

impl From<RefreshPolicy> for Refresh {
    fn from(policy: RefreshPolicy) -> Self {
        match policy {
            RefreshPolicy::True => Refresh::True,
            RefreshPolicy::False => Refresh::False,
            RefreshPolicy::WaitFor => Refresh::WaitFor,
        }
    }
}

/// Options applied to a single engine call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestOptions {
    /// Server-side timeout argument, e.g. `"250ms"`.
    pub timeout: Option<String>,
    /// Refresh policy for writes.
    pub refresh: Option<RefreshPolicy>,
    /// Whether a get reads the latest write (`true`, the engine default) or
    /// only what search can already see (`false`).
    pub realtime: Option<bool>,
}

/// Structured error reported by the engine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDetails {
    /// Error type, e.g. `version_conflict_engine_exception`.
    #[serde(rename = "type", default)]
    pub kind: String,
    /// Human readable reason.
    #[serde(default)]
    pub reason: Option<String>,
    /// Index the error relates to.
    #[serde(default)]
    pub index: Option<String>,
}

impl fmt::Display for ErrorDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.reason {
            Some(reason) => write!(f, "{}: {}", self.kind, reason),
            None => f.write_str(&self.kind),
        }
    }
}

/// Errors returned by engine calls, before classification.
#[derive(Error, Debug)]
pub enum EngineError {
    /// The request did not complete in time.
    #[error("request timed out")]
    Timeout,

    /// The engine answered with a non-success status.
    #[error("status {status}: {}", error.as_ref().map(ToString::to_string).unwrap_or_else(|| body.clone()))]
    Status {
        status: u16,
        error: Option<ErrorDetails>,
        body: String,
    },

    /// The request could not be sent or the response could not be read.
    #[error("transport error: {message}")]
    Transport {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The response body did not have the expected shape.
    #[error("malformed response: {message}")]
    Decode { message: String },
}

impl EngineError {
    /// Builds a status error from a response body, decoding `{"error": {...}}`.
    pub fn from_status(status: u16, body: String) -> Self {
        let error = serde_json::from_str::<Value>(&body)
            .ok()
            .and_then(|v| v.get("error").cloned())
            .and_then(|e| match e {
                Value::String(reason) => Some(ErrorDetails {
                    kind: String::new(),
                    reason: Some(reason),
                    index: None,
                }),
                other => serde_json::from_value(other).ok(),
            });
        EngineError::Status {
            status,
            error,
            body,
        }
    }

    /// HTTP status reported by the engine, if it answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            EngineError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Structured error details, if the engine sent any.
    pub fn details(&self) -> Option<&ErrorDetails> {
        match self {
            EngineError::Status { error, .. } => error.as_ref(),
            _ => None,
        }
    }
}

impl From<elasticsearch::Error> for EngineError {
    fn from(err: elasticsearch::Error) -> Self {
        if err.is_timeout() {
            return EngineError::Timeout;
        }
        if let Some(status) = err.status_code() {
            return EngineError::Status {
                status: status.as_u16(),
                error: None,
                body: err.to_string(),
            };
        }
        EngineError::Transport {
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        EngineError::Decode {
            message: err.to_string(),
        }
    }
}

/// Response of a single-document get.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct GetResponse {
    #[serde(rename = "_id", default)]
    pub id: String,
    #[serde(default)]
    pub found: bool,
    #[serde(rename = "_version", default)]
    pub version: Option<i64>,
    #[serde(rename = "_seq_no", default)]
    pub seq_no: Option<i64>,
    #[serde(rename = "_primary_term", default)]
    pub primary_term: Option<i64>,
    #[serde(rename = "_source", default)]
    pub source: Option<Map<String, Value>>,
}

impl GetResponse {
    /// The compare-and-swap token of the fetched document.
    pub fn document_version(&self) -> Option<DocumentVersion> {
        Some(DocumentVersion {
            seq_no: self.seq_no?,
            primary_term: self.primary_term?,
        })
    }
}

/// Outcome of one entry of a bulk request.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct BulkItemResult {
    #[serde(rename = "_id", default)]
    pub id: Option<String>,
    #[serde(default)]
    pub status: u16,
    #[serde(default)]
    pub error: Option<ErrorDetails>,
}

impl BulkItemResult {
    /// Whether this entry failed.
    pub fn is_failure(&self) -> bool {
        self.error.is_some() || self.status >= 300
    }
}

/// Response of a bulk request.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct BulkResponse {
    /// Whether any entry failed.
    #[serde(default)]
    pub errors: bool,
    /// One entry per operation, keyed by operation type (`create`, `index`, ...).
    #[serde(default)]
    pub items: Vec<BTreeMap<String, BulkItemResult>>,
}

impl BulkResponse {
    /// Entry results in request order.
    pub fn results(&self) -> impl Iterator<Item = &BulkItemResult> {
        self.items.iter().flat_map(|entry| entry.values())
    }
}

/// Total hit count, reported as a number or as `{"value": n, "relation": ...}`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum TotalHits {
    Count(u64),
    Object {
        value: u64,
        #[serde(default)]
        relation: Option<String>,
    },
}

impl TotalHits {
    /// The hit count.
    pub fn value(&self) -> u64 {
        match self {
            TotalHits::Count(n) => *n,
            TotalHits::Object { value, .. } => *value,
        }
    }
}

/// One search hit.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Hit {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_source", default)]
    pub source: Option<Map<String, Value>>,
}

/// The hits section of a search response.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Hits {
    #[serde(default)]
    pub total: Option<TotalHits>,
    #[serde(default)]
    pub hits: Vec<Hit>,
}

/// Response of a search request.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub hits: Hits,
}

impl SearchResponse {
    /// Number of matching documents before windowing.
    pub fn total(&self) -> u64 {
        self.hits.total.as_ref().map(TotalHits::value).unwrap_or(0)
    }
}

/// One document of a multi-get response.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct MultiGetDoc {
    #[serde(rename = "_id", default)]
    pub id: String,
    #[serde(default)]
    pub found: bool,
    #[serde(rename = "_source", default)]
    pub source: Option<Map<String, Value>>,
}

/// Response of a multi-get request.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct MultiGetResponse {
    #[serde(default)]
    pub docs: Vec<MultiGetDoc>,
}

/// The document engine operations used by the storage adapter.
#[async_trait]
pub trait SearchEngine: Send + Sync {
    /// Fetches one document, restricted to `source_includes` when non-empty.
    async fn get(
        &self,
        index: &str,
        id: &str,
        source_includes: &[&str],
        options: &RequestOptions,
    ) -> Result<GetResponse, EngineError>;

    /// Replaces a document, provided it is still at `version`.
    async fn replace(
        &self,
        index: &str,
        id: &str,
        document: Value,
        version: DocumentVersion,
        options: &RequestOptions,
    ) -> Result<(), EngineError>;

    /// Deletes a document, provided it is still at `version`.
    async fn delete(
        &self,
        index: &str,
        id: &str,
        version: DocumentVersion,
        options: &RequestOptions,
    ) -> Result<(), EngineError>;

    /// Creates documents in one batch; existing ids fail individually.
    async fn bulk_create(
        &self,
        index: &str,
        documents: Vec<(String, Value)>,
        options: &RequestOptions,
    ) -> Result<BulkResponse, EngineError>;

    /// Runs a search request.
    async fn search(
        &self,
        index: &str,
        body: Value,
        options: &RequestOptions,
    ) -> Result<SearchResponse, EngineError>;

    /// Fetches several documents by id.
    async fn multi_get(
        &self,
        index: &str,
        ids: &[&str],
        options: &RequestOptions,
    ) -> Result<MultiGetResponse, EngineError>;
}

/// Reads a successful response as `T`, or turns the status into an error.
async fn read_response<T: DeserializeOwned>(response: Response) -> Result<T, EngineError> {
    let status = response.status_code();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(EngineError::from_status(status.as_u16(), body));
    }
    let text = response.text().await?;
    Ok(serde_json::from_str(&text)?)
}

/// Like [`read_response`] for calls whose success body is not needed.
async fn check_response(response: Response) -> Result<(), EngineError> {
    let status = response.status_code();
    if status.is_success() {
        return Ok(());
    }
    let body = response.text().await.unwrap_or_default();
    Err(EngineError::from_status(status.as_u16(), body))
}

#[async_trait]
impl SearchEngine for Elasticsearch {
    async fn get(
        &self,
        index: &str,
        id: &str,
        source_includes: &[&str],
        options: &RequestOptions,
    ) -> Result<GetResponse, EngineError> {
        let mut request = self.get(GetParts::IndexId(index, id));
        if !source_includes.is_empty() {
            request = request._source_includes(source_includes);
        }
        if let Some(realtime) = options.realtime {
            request = request.realtime(realtime);
        }
        read_response(request.send().await?).await
    }

    async fn replace(
        &self,
        index: &str,
        id: &str,
        document: Value,
        version: DocumentVersion,
        options: &RequestOptions,
    ) -> Result<(), EngineError> {
        let mut request = self
            .index(IndexParts::IndexId(index, id))
            .if_seq_no(version.seq_no)
            .if_primary_term(version.primary_term);
        if let Some(refresh) = options.refresh {
            request = request.refresh(refresh.into());
        }
        if let Some(timeout) = options.timeout.as_deref() {
            request = request.timeout(timeout);
        }
        check_response(request.body(document).send().await?).await
    }

    async fn delete(
        &self,
        index: &str,
        id: &str,
        version: DocumentVersion,
        options: &RequestOptions,
    ) -> Result<(), EngineError> {
        let mut request = self
            .delete(DeleteParts::IndexId(index, id))
            .if_seq_no(version.seq_no)
            .if_primary_term(version.primary_term);
        if let Some(refresh) = options.refresh {
            request = request.refresh(refresh.into());
        }
        if let Some(timeout) = options.timeout.as_deref() {
            request = request.timeout(timeout);
        }
        check_response(request.send().await?).await
    }

    async fn bulk_create(
        &self,
        index: &str,
        documents: Vec<(String, Value)>,
        options: &RequestOptions,
    ) -> Result<BulkResponse, EngineError> {
        let body: Vec<BulkOperation<Value>> = documents
            .into_iter()
            .map(|(id, document)| BulkOperation::create(document).id(id).into())
            .collect();
        let mut request = self.bulk(BulkParts::Index(index));
        if let Some(refresh) = options.refresh {
            request = request.refresh(refresh.into());
        }
        if let Some(timeout) = options.timeout.as_deref() {
            request = request.timeout(timeout);
        }
        read_response(request.body(body).send().await?).await
    }

    async fn search(
        &self,
        index: &str,
        body: Value,
        options: &RequestOptions,
    ) -> Result<SearchResponse, EngineError> {
        let indices = [index];
        let mut request = self.search(SearchParts::Index(&indices));
        if let Some(timeout) = options.timeout.as_deref() {
            request = request.timeout(timeout);
        }
        read_response(request.body(body).send().await?).await
    }

    async fn multi_get(
        &self,
        index: &str,
        ids: &[&str],
        _options: &RequestOptions,
    ) -> Result<MultiGetResponse, EngineError> {
        let response = self
            .mget(MgetParts::Index(index))
            .body(json!({ "ids": ids }))
            .send()
            .await?;
        read_response(response).await
    }
}
