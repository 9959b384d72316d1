//! In-memory [`SearchEngine`] for tests that do not need a running cluster.
//!
//! Implements the engine behaviour the storage relies on: create-only bulk
//! writes, writes conditioned on `_seq_no`/`_primary_term`, 404 on missing
//! documents, multi-get, optional near-realtime search visibility, and a
//! small evaluator for the Query DSL subset the
//! query builder emits (`bool`, `term`, `terms`, `range`, `sort`, `from`, `size`).

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Map, Value, json};

use helios_es_store::backends::elasticsearch::{
    BulkItemResult, BulkResponse, DocumentVersion, EngineError, ErrorDetails, GetResponse, Hit,
    Hits, MultiGetDoc, MultiGetResponse, RefreshPolicy, RequestOptions, SearchEngine,
    SearchResponse, TotalHits,
};

/// Engine default page size when a search carries no `size`.
const DEFAULT_SIZE: usize = 10;
const PRIMARY_TERM: i64 = 1;

#[derive(Debug, Clone)]
struct StoredDoc {
    source: Map<String, Value>,
    seq_no: i64,
}

#[derive(Debug, Default)]
struct State {
    indices: HashMap<String, BTreeMap<String, StoredDoc>>,
    next_seq_no: i64,
    calls: Vec<String>,
    bulk_failures: HashMap<String, (u16, ErrorDetails)>,
    interfere_after_get: Option<String>,
    stall_after_get: Option<Duration>,
    delay: Option<Duration>,
    near_realtime: bool,
    searchable: HashMap<String, BTreeMap<String, StoredDoc>>,
}

impl State {
    fn bump_seq_no(&mut self) -> i64 {
        let seq_no = self.next_seq_no;
        self.next_seq_no += 1;
        seq_no
    }

    fn docs(&mut self, index: &str) -> &mut BTreeMap<String, StoredDoc> {
        self.indices.entry(index.to_string()).or_default()
    }

    /// Documents a read sees: the latest writes, or the last refresh for
    /// non-realtime reads in near-realtime mode.
    fn visible(&mut self, index: &str, realtime: bool) -> &mut BTreeMap<String, StoredDoc> {
        if self.near_realtime && !realtime {
            self.searchable.entry(index.to_string()).or_default()
        } else {
            self.docs(index)
        }
    }

    fn refresh(&mut self) {
        self.searchable = self.indices.clone();
    }

    fn after_write(&mut self, options: &RequestOptions) {
        if matches!(
            options.refresh,
            Some(RefreshPolicy::True | RefreshPolicy::WaitFor)
        ) {
            self.refresh();
        }
    }
}

/// An in-memory document engine.
#[derive(Debug, Default)]
pub struct MemoryEngine {
    state: Mutex<State>,
}

impl MemoryEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Names of the engine calls issued so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.state.lock().calls.clone()
    }

    /// Number of documents stored in `index`.
    pub fn len(&self, index: &str) -> usize {
        self.state.lock().indices.get(index).map_or(0, BTreeMap::len)
    }

    /// Raw `_source` of a stored document.
    pub fn source(&self, index: &str, id: &str) -> Option<Map<String, Value>> {
        let state = self.state.lock();
        state
            .indices
            .get(index)
            .and_then(|docs| docs.get(id))
            .map(|doc| doc.source.clone())
    }

    /// Makes the next bulk create of `id` fail with the given status and error type.
    pub fn fail_bulk_create(&self, id: &str, status: u16, kind: &str) {
        let details = ErrorDetails {
            kind: kind.to_string(),
            reason: Some(format!("injected failure for [{id}]")),
            index: None,
        };
        self.state
            .lock()
            .bulk_failures
            .insert(id.to_string(), (status, details));
    }

    /// Simulates a concurrent writer touching `id` right after the next get of it.
    pub fn interfere_after_get(&self, id: &str) {
        self.state.lock().interfere_after_get = Some(id.to_string());
    }

    /// Blocks the thread for `stall` right after the next successful get,
    /// so the get completes but the caller's deadline may pass meanwhile.
    pub fn stall_after_get(&self, stall: Duration) {
        self.state.lock().stall_after_get = Some(stall);
    }

    /// Makes search and non-realtime gets see only refreshed writes.
    pub fn set_near_realtime(&self) {
        let mut state = self.state.lock();
        state.near_realtime = true;
        state.refresh();
    }

    /// Makes all writes so far visible to search.
    pub fn refresh(&self) {
        self.state.lock().refresh();
    }

    /// Delays every call by `delay`.
    pub fn set_delay(&self, delay: Duration) {
        self.state.lock().delay = Some(delay);
    }

    async fn enter(&self, call: &str) {
        let delay = {
            let mut state = self.state.lock();
            state.calls.push(call.to_string());
            state.delay
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }
}

fn status_error(status: u16, kind: &str, reason: String) -> EngineError {
    let body = json!({ "error": { "type": kind, "reason": reason }, "status": status });
    EngineError::from_status(status, body.to_string())
}

fn not_found(index: &str, id: &str) -> EngineError {
    let body = json!({ "_index": index, "_id": id, "found": false });
    EngineError::from_status(404, body.to_string())
}

fn version_conflict(id: &str, reason: &str) -> EngineError {
    status_error(
        409,
        "version_conflict_engine_exception",
        format!("[{id}]: version conflict, {reason}"),
    )
}

fn check_version(
    doc: Option<&StoredDoc>,
    id: &str,
    version: DocumentVersion,
) -> Result<(), EngineError> {
    match doc {
        None => Err(version_conflict(id, "document missing")),
        Some(doc) if doc.seq_no != version.seq_no || version.primary_term != PRIMARY_TERM => {
            Err(version_conflict(
                id,
                &format!(
                    "required seqNo [{}], primary term [{}]. current document has seqNo [{}] and primary term [{}]",
                    version.seq_no, version.primary_term, doc.seq_no, PRIMARY_TERM
                ),
            ))
        }
        Some(_) => Ok(()),
    }
}

#[async_trait]
impl SearchEngine for MemoryEngine {
    async fn get(
        &self,
        index: &str,
        id: &str,
        source_includes: &[&str],
        options: &RequestOptions,
    ) -> Result<GetResponse, EngineError> {
        self.enter("get").await;
        let mut state = self.state.lock();
        let realtime = options.realtime.unwrap_or(true);
        let Some(doc) = state.visible(index, realtime).get(id).cloned() else {
            return Err(not_found(index, id));
        };

        let source = if source_includes.is_empty() {
            doc.source.clone()
        } else {
            doc.source
                .iter()
                .filter(|(k, _)| source_includes.contains(&k.as_str()))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect()
        };

        if state.interfere_after_get.as_deref() == Some(id) {
            state.interfere_after_get = None;
            let seq_no = state.bump_seq_no();
            if let Some(stored) = state.docs(index).get_mut(id) {
                stored.seq_no = seq_no;
            }
        }

        let stall = state.stall_after_get.take();
        drop(state);
        if let Some(stall) = stall {
            std::thread::sleep(stall);
        }

        Ok(GetResponse {
            id: id.to_string(),
            found: true,
            version: Some(doc.seq_no + 1),
            seq_no: Some(doc.seq_no),
            primary_term: Some(PRIMARY_TERM),
            source: Some(source),
        })
    }

    async fn replace(
        &self,
        index: &str,
        id: &str,
        document: Value,
        version: DocumentVersion,
        options: &RequestOptions,
    ) -> Result<(), EngineError> {
        self.enter("replace").await;
        let Value::Object(source) = document else {
            return Err(status_error(400, "mapper_parsing_exception", "not an object".into()));
        };
        let mut state = self.state.lock();
        check_version(state.docs(index).get(id), id, version)?;
        let seq_no = state.bump_seq_no();
        state
            .docs(index)
            .insert(id.to_string(), StoredDoc { source, seq_no });
        state.after_write(options);
        Ok(())
    }

    async fn delete(
        &self,
        index: &str,
        id: &str,
        version: DocumentVersion,
        options: &RequestOptions,
    ) -> Result<(), EngineError> {
        self.enter("delete").await;
        let mut state = self.state.lock();
        check_version(state.docs(index).get(id), id, version)?;
        state.docs(index).remove(id);
        state.bump_seq_no();
        state.after_write(options);
        Ok(())
    }

    async fn bulk_create(
        &self,
        index: &str,
        documents: Vec<(String, Value)>,
        options: &RequestOptions,
    ) -> Result<BulkResponse, EngineError> {
        self.enter("bulk_create").await;
        let mut state = self.state.lock();
        let mut items = Vec::with_capacity(documents.len());

        for (id, document) in documents {
            let result = if let Some((status, error)) = state.bulk_failures.remove(&id) {
                BulkItemResult {
                    id: Some(id),
                    status,
                    error: Some(error),
                }
            } else if state.docs(index).contains_key(&id) {
                BulkItemResult {
                    id: Some(id.clone()),
                    status: 409,
                    error: Some(ErrorDetails {
                        kind: "version_conflict_engine_exception".to_string(),
                        reason: Some(format!(
                            "[{id}]: version conflict, document already exists"
                        )),
                        index: Some(index.to_string()),
                    }),
                }
            } else {
                let source = match document {
                    Value::Object(source) => source,
                    _ => Map::new(),
                };
                let seq_no = state.bump_seq_no();
                state
                    .docs(index)
                    .insert(id.clone(), StoredDoc { source, seq_no });
                BulkItemResult {
                    id: Some(id),
                    status: 201,
                    error: None,
                }
            };
            items.push(BTreeMap::from([("create".to_string(), result)]));
        }

        let errors = items
            .iter()
            .flat_map(|entry| entry.values())
            .any(BulkItemResult::is_failure);
        state.after_write(options);
        Ok(BulkResponse { errors, items })
    }

    async fn search(
        &self,
        index: &str,
        body: Value,
        _options: &RequestOptions,
    ) -> Result<SearchResponse, EngineError> {
        self.enter("search").await;
        let mut state = self.state.lock();
        let docs = state.visible(index, false);

        let mut matched = Vec::new();
        for (id, doc) in docs.iter() {
            let hit = match body.get("query") {
                Some(query) => matches(query, id, &doc.source)?,
                None => true,
            };
            if hit {
                matched.push((id.clone(), doc.source.clone()));
            }
        }

        if let Some(sort) = body.get("sort").and_then(Value::as_array) {
            matched.sort_by(|a, b| compare_by(sort, a, b));
        }

        let total = matched.len() as u64;
        let from = body.get("from").and_then(Value::as_u64).unwrap_or(0) as usize;
        let size = body
            .get("size")
            .and_then(Value::as_u64)
            .map_or(DEFAULT_SIZE, |s| s as usize);

        let hits = matched
            .into_iter()
            .skip(from)
            .take(size)
            .map(|(id, source)| Hit {
                id,
                source: Some(source),
            })
            .collect();

        Ok(SearchResponse {
            hits: Hits {
                total: Some(TotalHits::Object {
                    value: total,
                    relation: Some("eq".to_string()),
                }),
                hits,
            },
        })
    }

    async fn multi_get(
        &self,
        index: &str,
        ids: &[&str],
        _options: &RequestOptions,
    ) -> Result<MultiGetResponse, EngineError> {
        self.enter("multi_get").await;
        let mut state = self.state.lock();
        let docs = state.docs(index);
        let docs = ids
            .iter()
            .map(|id| match docs.get(*id) {
                Some(doc) => MultiGetDoc {
                    id: id.to_string(),
                    found: true,
                    source: Some(doc.source.clone()),
                },
                None => MultiGetDoc {
                    id: id.to_string(),
                    found: false,
                    source: None,
                },
            })
            .collect();
        Ok(MultiGetResponse { docs })
    }
}

/// Resolves an engine field name (`_id`, `a.b`, `a.b.keyword`) against a document.
fn field_value(id: &str, source: &Map<String, Value>, field: &str) -> Option<Value> {
    if field == "_id" {
        return Some(Value::String(id.to_string()));
    }
    let path = field.strip_suffix(".keyword").unwrap_or(field);
    let mut parts = path.split('.');
    let mut current = source.get(parts.next()?)?;
    for part in parts {
        current = current.get(part)?;
    }
    Some(current.clone())
}

fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(a), Value::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

/// Compares a stored value with a query value the way a keyword field would.
fn same_term(stored: &Value, wanted: &Value) -> bool {
    match stored {
        Value::Array(values) => values.iter().any(|v| same_term(v, wanted)),
        _ => compare_values(stored, wanted) == Some(Ordering::Equal),
    }
}

fn single_entry(clause: &Value) -> Result<(&String, &Value), EngineError> {
    clause
        .as_object()
        .and_then(|obj| obj.iter().next())
        .ok_or_else(|| status_error(400, "parsing_exception", format!("bad clause {clause}")))
}

fn matches(clause: &Value, id: &str, source: &Map<String, Value>) -> Result<bool, EngineError> {
    let (kind, body) = single_entry(clause)?;
    match kind.as_str() {
        "bool" => {
            let list = |key: &str| {
                body.get(key)
                    .and_then(Value::as_array)
                    .cloned()
                    .unwrap_or_default()
            };
            for sub in list("must") {
                if !matches(&sub, id, source)? {
                    return Ok(false);
                }
            }
            for sub in list("must_not") {
                if matches(&sub, id, source)? {
                    return Ok(false);
                }
            }
            let should = list("should");
            if should.is_empty() {
                return Ok(true);
            }
            for sub in should {
                if matches(&sub, id, source)? {
                    return Ok(true);
                }
            }
            Ok(false)
        }
        "term" => {
            let (field, wanted) = single_entry(body)?;
            Ok(field_value(id, source, field).is_some_and(|v| same_term(&v, wanted)))
        }
        "terms" => {
            let (field, wanted) = single_entry(body)?;
            let wanted = wanted.as_array().cloned().unwrap_or_default();
            Ok(field_value(id, source, field)
                .is_some_and(|v| wanted.iter().any(|w| same_term(&v, w))))
        }
        "range" => {
            let (field, bounds) = single_entry(body)?;
            let Some(stored) = field_value(id, source, field) else {
                return Ok(false);
            };
            let bounds = bounds.as_object().cloned().unwrap_or_default();
            for (op, bound) in &bounds {
                let ok = match (op.as_str(), compare_values(&stored, bound)) {
                    ("gt", Some(ord)) => ord == Ordering::Greater,
                    ("gte", Some(ord)) => ord != Ordering::Less,
                    ("lt", Some(ord)) => ord == Ordering::Less,
                    ("lte", Some(ord)) => ord != Ordering::Greater,
                    _ => false,
                };
                if !ok {
                    return Ok(false);
                }
            }
            Ok(true)
        }
        other => Err(status_error(
            400,
            "parsing_exception",
            format!("unknown query [{other}]"),
        )),
    }
}

fn compare_by(
    sort: &[Value],
    a: &(String, Map<String, Value>),
    b: &(String, Map<String, Value>),
) -> Ordering {
    for clause in sort {
        let Ok((field, spec)) = single_entry(clause) else {
            continue;
        };
        let descending = spec.get("order").and_then(Value::as_str) == Some("desc");
        let ord = match (field_value(&a.0, &a.1, field), field_value(&b.0, &b.1, field)) {
            (Some(x), Some(y)) => {
                let ord = compare_values(&x, &y).unwrap_or(Ordering::Equal);
                if descending { ord.reverse() } else { ord }
            }
            // Missing values sort last in both directions.
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}
