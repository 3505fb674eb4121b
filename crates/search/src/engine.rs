//! Search Engine facade
//!
//! The only entry points collaborators use: `search` for reads,
//! `index_document` / `remove_document` for writes, `stats` for
//! observability.
//!
//! # Search flow
//!
//! ```text
//! raw query ──normalise/validate──► cache lookup ──hit──► response
//!                                       │ miss
//!                     ┌─────────────────┴─────────────────┐
//!                     ▼                                   ▼
//!              lexical worker                 semantic worker (embed + query)
//!                     └──────────── bounded wait ─────────┘
//!                                       │
//!                                     merge ──► cache (if version unchanged) ──► response
//! ```
//!
//! # Write ordering
//!
//! Writers are serialised by a mutex readers never take. Tokens and the
//! embedding are computed before it is taken. Under it: semantic index
//! (the only step that can reject the vector), lexical index, then the
//! store publishes the document and bumps the index version. A search that
//! overlaps a write either caches under the old version, which is stale as
//! soon as the write completes, or sees the version change and skips the
//! cache.
//!
//! # Embedding workers
//!
//! Embedding runs on its own thread so a slow provider is bounded by the
//! timeout. A worker that outlives its caller keeps one of
//! `max_pending_embeddings` slots until the provider returns; with every
//! slot taken, embedding fails fast as a timeout.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use patternsearch_core::limits::{validate_document_id, validate_options, validate_text};
use patternsearch_core::{
    Degradation, Document, DocumentId, Error, IndexVersion, Metadata, Result, ScoredResult,
    SearchConfig, SearchMethod, SearchOptions, SearchResponse, SearchStats, Weighting,
};
use patternsearch_engine::{DocumentStore, Embedder, EngineSnapshot, HashEmbedder};

use crate::cache::{CacheKey, CacheStats, QueryCache};
use crate::index::LexicalIndex;
use crate::merger::merge;
use crate::metrics::QueryMetrics;
use crate::semantic::{SemanticIndex, SemanticMode};
use crate::tokenizer::{normalize_query, tokenize, tokenize_unique};

/// Semantic candidates fetched per requested result
const SEMANTIC_CANDIDATE_FACTOR: usize = 4;

/// Observability snapshot
#[derive(Debug, Clone, PartialEq)]
pub struct EngineStats {
    /// Live documents
    pub document_count: usize,
    /// Fraction of successful searches answered from the cache
    pub cache_hit_rate: f64,
    /// Mean latency of successful searches
    pub average_query_latency: Duration,
    /// Entries currently cached
    pub cache_entries: usize,
    /// Successful searches
    pub queries: u64,
    /// Hybrid searches that fell back to keyword-only
    pub degraded_queries: u64,
    /// Current global index version
    pub index_version: IndexVersion,
}

enum Wait<T> {
    Done(T),
    TimedOut(u64),
    Aborted,
}

enum Branch<T> {
    Running(Receiver<T>),
    Saturated,
}

impl<T> Branch<T> {
    fn wait(&self, start: Instant, deadline: Instant) -> Wait<T> {
        match self {
            Branch::Running(rx) => wait_for(rx, start, deadline),
            Branch::Saturated => Wait::TimedOut(start.elapsed().as_millis() as u64),
        }
    }
}

/// Count of embedding workers still running
struct EmbedSlots {
    in_flight: AtomicUsize,
    limit: usize,
}

/// Held by a worker until its embedding call returns
struct EmbedSlot(Arc<EmbedSlots>);

impl EmbedSlots {
    fn new(limit: usize) -> Arc<Self> {
        Arc::new(EmbedSlots {
            in_flight: AtomicUsize::new(0),
            limit: limit.max(1),
        })
    }

    fn try_acquire(self: &Arc<Self>) -> Option<EmbedSlot> {
        self.in_flight
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                (n < self.limit).then_some(n + 1)
            })
            .ok()
            .map(|_| EmbedSlot(Arc::clone(self)))
    }

    fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Acquire)
    }
}

impl Drop for EmbedSlot {
    fn drop(&mut self) {
        self.0.in_flight.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Hybrid lexical + semantic search engine
///
/// # Example
///
/// ```
/// use patternsearch_core::{Metadata, SearchConfig, SearchMethod, SearchOptions};
/// use patternsearch_search::SearchEngine;
///
/// let engine = SearchEngine::with_hash_embedder(SearchConfig::default()).unwrap();
/// engine.index_document("A", "rust ownership model", Metadata::new()).unwrap();
/// engine.index_document("B", "garbage collected heap", Metadata::new()).unwrap();
///
/// let opts = SearchOptions::new(5).with_method(SearchMethod::Keyword);
/// let response = engine.search("Rust", opts).unwrap();
/// assert_eq!(response.ids(), vec!["A"]);
/// ```
pub struct SearchEngine {
    config: SearchConfig,
    store: Arc<DocumentStore>,
    lexical: Arc<LexicalIndex>,
    semantic: Arc<SemanticIndex>,
    embedder: Arc<dyn Embedder>,
    cache: QueryCache,
    metrics: QueryMetrics,
    embed_slots: Arc<EmbedSlots>,
    writer: Mutex<()>,
}

impl SearchEngine {
    /// Create an empty engine
    pub fn new(config: SearchConfig, embedder: Arc<dyn Embedder>) -> Result<Self> {
        config.validate()?;
        Ok(Self::assemble(config, embedder, DocumentStore::new()))
    }

    /// Create an empty engine with the built-in hashing embedder
    pub fn with_hash_embedder(config: SearchConfig) -> Result<Self> {
        Self::new(config, Arc::new(HashEmbedder::default()))
    }

    fn assemble(config: SearchConfig, embedder: Arc<dyn Embedder>, store: DocumentStore) -> Self {
        let query_depth = config
            .query
            .default_max_results
            .saturating_mul(SEMANTIC_CANDIDATE_FACTOR);
        let semantic = SemanticIndex::with_dimension(config.semantic.clone(), embedder.dimension())
            .with_query_depth(query_depth);
        SearchEngine {
            cache: QueryCache::new(config.cache.capacity),
            store: Arc::new(store),
            lexical: Arc::new(LexicalIndex::new()),
            semantic: Arc::new(semantic),
            embedder,
            metrics: QueryMetrics::new(),
            embed_slots: EmbedSlots::new(config.query.max_pending_embeddings),
            writer: Mutex::new(()),
            config,
        }
    }

    /// Engine configuration
    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    // ========================================================================
    // Writes
    // ========================================================================

    /// Create or update a document, returning its new version
    pub fn index_document(
        &self,
        id: impl Into<DocumentId>,
        text: &str,
        metadata: Metadata,
    ) -> Result<u64> {
        const OP: &str = "index_document";
        let id = id.into();
        validate_document_id(OP, &id)?;
        validate_text(OP, &id, text)?;
        self.reject_tombstoned(OP, &id)?;

        let tokens = tokenize(text);
        let vector = self.embed_bounded(OP, text)?;

        let _writer = self.writer.lock();
        self.reject_tombstoned(OP, &id)?;

        let mut document = Document::new(id, text)
            .with_metadata(metadata)
            .with_tokens(tokens)
            .with_vector(vector);
        document.version = self.store.peek_next_version(&document.id);

        self.semantic.index(&document)?;
        self.lexical.index(&document);
        let id = document.id.clone();
        let version = self.store.put(document)?;

        debug!(
            target: "patternsearch::engine",
            id = %id,
            version,
            index_version = self.store.current_index_version(),
            "Document indexed"
        );
        Ok(version)
    }

    /// Remove a document; its id can never be indexed again
    pub fn remove_document(&self, id: impl Into<DocumentId>) -> Result<()> {
        const OP: &str = "remove_document";
        let id = id.into();
        validate_document_id(OP, &id)?;

        let _writer = self.writer.lock();
        if !self.store.contains(&id) {
            return Err(Error::not_found(OP, id.as_str()));
        }
        self.lexical.remove(&id);
        self.semantic.remove(&id);
        self.store.delete(&id);

        debug!(
            target: "patternsearch::engine",
            id = %id,
            index_version = self.store.current_index_version(),
            "Document removed"
        );
        Ok(())
    }

    fn reject_tombstoned(&self, operation: &'static str, id: &DocumentId) -> Result<()> {
        if self.store.is_tombstoned(id) {
            return Err(Error::validation(
                operation,
                format!("document id '{}' was removed and cannot be reused", id),
            ));
        }
        Ok(())
    }

    fn embed_bounded(&self, operation: &'static str, text: &str) -> Result<Vec<f32>> {
        let embedder = Arc::clone(&self.embedder);
        let owned = text.to_string();
        let start = Instant::now();
        let branch = self.spawn_embedding("embed", move || {
            checked_embed(embedder.as_ref(), &owned)
        })?;
        match branch.wait(start, start + self.config.timeout()) {
            Wait::Done(result) => result,
            Wait::TimedOut(elapsed_ms) => Err(Error::timeout(operation, elapsed_ms)),
            Wait::Aborted => Err(Error::embedding_unavailable(operation, "embedder aborted")),
        }
    }

    /// Run an embedding call on a worker, unless every slot is taken
    fn spawn_embedding<T, F>(&self, name: &str, work: F) -> Result<Branch<T>>
    where
        T: Send + 'static,
        F: FnOnce() -> T + Send + 'static,
    {
        let Some(slot) = self.embed_slots.try_acquire() else {
            warn!(
                target: "patternsearch::engine",
                worker = name,
                limit = self.embed_slots.limit,
                "Embedding workers saturated"
            );
            return Ok(Branch::Saturated);
        };
        let rx = spawn_worker(name, move || {
            let _slot = slot;
            work()
        })?;
        Ok(Branch::Running(rx))
    }

    /// Embedding calls currently in flight
    pub fn pending_embeddings(&self) -> usize {
        self.embed_slots.in_flight()
    }

    // ========================================================================
    // Reads
    // ========================================================================

    /// Ranked search over the corpus
    pub fn search(&self, raw_query: &str, options: SearchOptions) -> Result<SearchResponse> {
        let start = Instant::now();
        let result = self.run_search(raw_query, options, start);
        match &result {
            Ok(response) => self.metrics.record_query(
                start.elapsed(),
                response.from_cache,
                response.degraded.is_some(),
            ),
            Err(_) => self.metrics.record_failure(),
        }
        result
    }

    fn run_search(
        &self,
        raw_query: &str,
        options: SearchOptions,
        start: Instant,
    ) -> Result<SearchResponse> {
        const OP: &str = "search";
        let query = normalize_query(raw_query);
        if query.is_empty() {
            return Err(Error::validation(OP, "query is empty"));
        }
        validate_options(OP, &options)?;

        let method = options.method;
        let weighting = options.weighting.effective_for(method);
        let key = CacheKey::new(&query, method, weighting);
        let (version, cached) = self
            .cache
            .get_current(&key, options.max_results, || {
                self.store.current_index_version()
            });

        if let Some(entry) = cached {
            return Ok(respond(
                entry.results,
                entry.truncated,
                options.max_results,
                true,
                None,
                SearchStats::new(start.elapsed().as_micros() as u64, 0, 0),
            ));
        }

        let depth = options.max_results.max(self.config.query.default_max_results);
        let deadline = start + self.config.timeout();

        let lexical_rx = if method.uses_lexical() {
            let lexical = Arc::clone(&self.lexical);
            let tokens = tokenize_unique(&query);
            Some(spawn_worker("lexical", move || lexical.query(&tokens, usize::MAX))?)
        } else {
            None
        };

        let semantic_branch = if method.uses_semantic() {
            let semantic = Arc::clone(&self.semantic);
            let embedder = Arc::clone(&self.embedder);
            let text = query.clone();
            let limit = depth.saturating_mul(SEMANTIC_CANDIDATE_FACTOR);
            Some(self.spawn_embedding("semantic", move || {
                let vector = checked_embed(embedder.as_ref(), &text)?;
                semantic.query(&vector, limit)
            })?)
        } else {
            None
        };

        let lexical = match lexical_rx {
            Some(rx) => match wait_for(&rx, start, deadline) {
                Wait::Done(results) => results,
                Wait::TimedOut(elapsed_ms) => {
                    return Err(Error::timeout("search.lexical", elapsed_ms))
                }
                Wait::Aborted => return Err(Error::internal("lexical branch aborted")),
            },
            None => Vec::new(),
        };

        let mut degraded = None;
        let semantic = match semantic_branch {
            Some(branch) => {
                let outcome = branch.wait(start, deadline);
                match (method, outcome) {
                    (_, Wait::Done(Ok(results))) => results,
                    (SearchMethod::Hybrid, Wait::Done(Err(e))) if e.is_recoverable() => {
                        degraded = Some(Degradation::EmbeddingUnavailable(e.to_string()));
                        Vec::new()
                    }
                    (SearchMethod::Hybrid, Wait::TimedOut(elapsed_ms)) => {
                        degraded = Some(Degradation::SemanticTimeout { elapsed_ms });
                        Vec::new()
                    }
                    (SearchMethod::Hybrid, Wait::Aborted) => {
                        degraded = Some(Degradation::EmbeddingUnavailable(
                            "semantic branch aborted".to_string(),
                        ));
                        Vec::new()
                    }
                    (_, Wait::Done(Err(e))) => return Err(e),
                    (_, Wait::TimedOut(elapsed_ms)) => {
                        return Err(Error::timeout("search.semantic", elapsed_ms))
                    }
                    (_, Wait::Aborted) => return Err(Error::internal("semantic branch aborted")),
                }
            }
            None => Vec::new(),
        };

        if let Some(reason) = &degraded {
            warn!(
                target: "patternsearch::engine",
                query = %query,
                reason = %reason,
                "Hybrid search degraded to keyword-only"
            );
        }

        let applied = if degraded.is_some() {
            Weighting::lexical_only()
        } else {
            weighting
        };
        let mut merged = merge(&lexical, &semantic, applied);
        let truncated = merged.len() > depth;
        merged.truncate(depth);

        if degraded.is_none() && self.store.current_index_version() == version {
            self.cache.put(key, merged.clone(), truncated, version);
        }

        let stats = SearchStats::new(
            start.elapsed().as_micros() as u64,
            lexical.len(),
            semantic.len(),
        );
        Ok(respond(
            merged,
            truncated,
            options.max_results,
            false,
            degraded,
            stats,
        ))
    }

    /// Get a stored document
    pub fn get_document(&self, id: impl Into<DocumentId>) -> Result<Document> {
        let id = id.into();
        self.store.get(&id).map_err(|e| match e {
            Error::NotFound { id, .. } => Error::not_found("get_document", id),
            other => other,
        })
    }

    /// Whether a live document exists
    pub fn contains(&self, id: &DocumentId) -> bool {
        self.store.contains(id)
    }

    /// Current global index version
    pub fn index_version(&self) -> IndexVersion {
        self.store.current_index_version()
    }

    /// Search strategy of the semantic index
    pub fn semantic_mode(&self) -> SemanticMode {
        self.semantic.mode()
    }

    /// Drop every cached query
    pub fn invalidate_cache(&self) {
        self.cache.invalidate_all();
    }

    /// Cache counters
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Observability snapshot
    pub fn stats(&self) -> EngineStats {
        let metrics = self.metrics.snapshot();
        EngineStats {
            document_count: self.store.len(),
            cache_hit_rate: metrics.cache_hit_rate(),
            average_query_latency: metrics.average_latency(),
            cache_entries: self.cache.len(),
            queries: metrics.queries,
            degraded_queries: metrics.degraded_queries,
            index_version: self.store.current_index_version(),
        }
    }

    // ========================================================================
    // Snapshot / restore
    // ========================================================================

    /// Capture documents, tombstones and index version
    pub fn snapshot(&self) -> EngineSnapshot {
        let _writer = self.writer.lock();
        EngineSnapshot::capture(&self.store, self.embedder.name(), self.embedder.dimension())
    }

    /// Rebuild an engine from a snapshot without re-embedding
    ///
    /// The index version continues from the snapshotted value; the cache
    /// starts empty.
    pub fn restore(
        snapshot: &EngineSnapshot,
        config: SearchConfig,
        embedder: Arc<dyn Embedder>,
    ) -> Result<Self> {
        config.validate()?;
        if snapshot.dimension != embedder.dimension() {
            return Err(Error::validation(
                "restore",
                format!(
                    "snapshot vectors have dimension {}, embedder produces {}",
                    snapshot.dimension,
                    embedder.dimension()
                ),
            ));
        }
        if snapshot.embedder != embedder.name() {
            warn!(
                target: "patternsearch::engine",
                snapshot = %snapshot.embedder,
                embedder = embedder.name(),
                "Restoring vectors produced by a different embedder"
            );
        }

        let engine = Self::assemble(config, embedder, snapshot.to_store()?);
        for id in engine.store.ids() {
            let mut document = engine.store.get(&id)?;
            if document.tokens.is_empty() {
                document.tokens = tokenize(&document.text);
            }
            engine.semantic.index(&document)?;
            engine.lexical.index(&document);
        }

        info!(
            target: "patternsearch::engine",
            documents = engine.store.len(),
            index_version = engine.store.current_index_version(),
            "Engine restored from snapshot"
        );
        Ok(engine)
    }
}

/// Embed and check the provider's output shape
///
/// Every provider failure is reported as `EmbeddingUnavailable`.
fn checked_embed(embedder: &dyn Embedder, text: &str) -> Result<Vec<f32>> {
    let vector = embedder.embed(text).map_err(|e| match e {
        Error::EmbeddingUnavailable { .. } => e,
        other => Error::embedding_unavailable("embed", other.to_string()),
    })?;
    if vector.len() != embedder.dimension() {
        return Err(Error::embedding_unavailable(
            "embed",
            format!(
                "embedder '{}' returned {} components, expected {}",
                embedder.name(),
                vector.len(),
                embedder.dimension()
            ),
        ));
    }
    Ok(vector)
}

fn spawn_worker<T, F>(name: &str, work: F) -> Result<Receiver<T>>
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    let (tx, rx) = mpsc::channel();
    thread::Builder::new()
        .name(format!("patternsearch-{}", name))
        .spawn(move || {
            // Receiver is gone if the caller already timed out
            let _ = tx.send(work());
        })
        .map_err(|e| Error::internal(format!("failed to spawn {} worker: {}", name, e)))?;
    Ok(rx)
}

fn wait_for<T>(rx: &Receiver<T>, start: Instant, deadline: Instant) -> Wait<T> {
    let remaining = deadline.saturating_duration_since(Instant::now());
    match rx.recv_timeout(remaining) {
        Ok(value) => Wait::Done(value),
        Err(RecvTimeoutError::Timeout) => Wait::TimedOut(start.elapsed().as_millis() as u64),
        Err(RecvTimeoutError::Disconnected) => Wait::Aborted,
    }
}

fn respond(
    mut results: Vec<ScoredResult>,
    truncated: bool,
    max_results: usize,
    from_cache: bool,
    degraded: Option<Degradation>,
    stats: SearchStats,
) -> SearchResponse {
    let truncated = truncated || results.len() > max_results;
    results.truncate(max_results);
    SearchResponse {
        results,
        truncated,
        from_cache,
        degraded,
        stats,
    }
}
