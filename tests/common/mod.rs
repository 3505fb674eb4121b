//! Shared test utilities for all integration test suites.
//!
//! Import via `#[path = "../common/mod.rs"] mod common;` from a suite's main.rs.

#![allow(dead_code)]
#![allow(unused_imports)]

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Once};
use std::thread;
use std::time::Duration;

pub use patternsearch::{
    Degradation, Embedder, Error, HashEmbedder, Metadata, Result, SearchConfig, SearchEngine,
    SearchMethod, SearchOptions, SearchResponse,
};

// ============================================================================
// Initialization
// ============================================================================

static INIT_TRACING: Once = Once::new();

/// Route `tracing` output through the test harness (RUST_LOG to enable)
pub fn init_tracing() {
    INIT_TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

// ============================================================================
// Engines
// ============================================================================

/// Engine with default config and the hashing embedder
pub fn create_test_engine() -> SearchEngine {
    init_tracing();
    SearchEngine::with_hash_embedder(SearchConfig::default()).unwrap()
}

/// Engine with custom config and the hashing embedder
pub fn create_engine_with(config: SearchConfig) -> SearchEngine {
    init_tracing();
    SearchEngine::with_hash_embedder(config).unwrap()
}

/// Engine driven by a [`FlakyEmbedder`]
pub fn create_flaky_engine(config: SearchConfig) -> (SearchEngine, Arc<FlakyEmbedder>) {
    init_tracing();
    let embedder = Arc::new(FlakyEmbedder::new());
    let engine = SearchEngine::new(config, embedder.clone()).unwrap();
    (engine, embedder)
}

/// Index `(id, text)` pairs with empty metadata
pub fn index_all(engine: &SearchEngine, docs: &[(&str, &str)]) {
    for (id, text) in docs {
        engine.index_document(*id, text, Metadata::new()).unwrap();
    }
}

/// A small catalogue of resilience and data patterns
pub const PATTERN_CATALOGUE: &[(&str, &str)] = &[
    ("circuit-breaker", "circuit breaker stops calls to a failing downstream service"),
    ("retry", "retry transient failures with exponential backoff and jitter"),
    ("bulkhead", "bulkhead isolates thread pools per downstream service"),
    ("timeout", "timeout bounds every remote call"),
    ("cache-aside", "cache aside loads data into the cache on a miss"),
    ("write-through", "write through cache updates the store and the cache together"),
    ("saga", "saga coordinates distributed transactions with compensating steps"),
    ("outbox", "transactional outbox publishes events after the database commit"),
];

/// Populate an engine with [`PATTERN_CATALOGUE`]
pub fn populate_catalogue(engine: &SearchEngine) {
    index_all(engine, PATTERN_CATALOGUE);
}

/// Generate `count` synthetic documents over a small vocabulary
pub fn populate_synthetic(engine: &SearchEngine, count: usize) {
    let topics = ["queue", "stream", "lock", "shard", "replica", "index", "cache"];
    for i in 0..count {
        let text = format!(
            "{} pattern number {} for {} workloads",
            topics[i % topics.len()],
            i,
            topics[(i * 3 + 1) % topics.len()]
        );
        engine
            .index_document(format!("syn_{:04}", i), &text, Metadata::new())
            .unwrap();
    }
}

/// Vocabulary for `populate_varied`
pub const VOCABULARY: [&str; 40] = [
    "queue", "stream", "lock", "shard", "replica", "index", "cache", "saga",
    "retry", "timeout", "leader", "follower", "quorum", "snapshot", "journal", "ledger",
    "broker", "topic", "partition", "offset", "consumer", "producer", "batch", "window",
    "gateway", "proxy", "router", "balancer", "token", "session", "tenant", "schema",
    "migration", "rollback", "checkpoint", "compaction", "bloom", "filter", "merge", "split",
];

/// Deterministic word sequence drawn from `VOCABULARY`
pub fn varied_text(seed: u64, words: usize) -> String {
    let mut state = seed.wrapping_mul(0x9e37_79b9_7f4a_7c15).wrapping_add(1);
    (0..words)
        .map(|_| {
            state = state
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            VOCABULARY[((state >> 33) % VOCABULARY.len() as u64) as usize]
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Index `count` documents of six vocabulary words each
pub fn populate_varied(engine: &SearchEngine, count: usize) {
    for i in 0..count {
        engine
            .index_document(
                format!("var_{:04}", i),
                &varied_text(i as u64, 6),
                Metadata::new(),
            )
            .unwrap();
    }
}

// ============================================================================
// Options
// ============================================================================

/// Keyword-only options
pub fn keyword(max_results: usize) -> SearchOptions {
    SearchOptions::new(max_results).with_method(SearchMethod::Keyword)
}

/// Semantic-only options
pub fn semantic(max_results: usize) -> SearchOptions {
    SearchOptions::new(max_results).with_method(SearchMethod::Semantic)
}

/// Hybrid options with explicit weights
pub fn hybrid(max_results: usize, lexical: f32, semantic: f32) -> SearchOptions {
    SearchOptions::new(max_results)
        .with_method(SearchMethod::Hybrid)
        .with_weights(lexical, semantic)
}

// ============================================================================
// Embedders
// ============================================================================

/// Hashing embedder whose failures and latency can be switched at runtime
pub struct FlakyEmbedder {
    inner: HashEmbedder,
    failing: AtomicBool,
    delay_ms: AtomicU64,
    calls: AtomicUsize,
}

impl FlakyEmbedder {
    /// Healthy embedder
    pub fn new() -> Self {
        FlakyEmbedder {
            inner: HashEmbedder::default(),
            failing: AtomicBool::new(false),
            delay_ms: AtomicU64::new(0),
            calls: AtomicUsize::new(0),
        }
    }

    /// Make every subsequent call fail (or succeed again)
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Delay every subsequent call
    pub fn set_delay(&self, delay: Duration) {
        self.delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    /// Number of embed calls so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Embedder for FlakyEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let delay = self.delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            thread::sleep(Duration::from_millis(delay));
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(Error::embedding_unavailable("embed", "provider unreachable"));
        }
        self.inner.embed(text)
    }

    fn dimension(&self) -> usize {
        self.inner.dimension()
    }

    fn name(&self) -> &str {
        "flaky"
    }
}

// ============================================================================
// Assertions
// ============================================================================

/// Ids of a response, sorted
pub fn sorted_ids(response: &SearchResponse) -> Vec<String> {
    let mut ids: Vec<String> = response.ids().into_iter().map(String::from).collect();
    ids.sort();
    ids
}

/// Assert a response has no duplicate ids and is ordered by blended score
pub fn assert_well_formed(response: &SearchResponse) {
    let mut seen = std::collections::BTreeSet::new();
    for r in &response.results {
        assert!(
            seen.insert(r.document_id.clone()),
            "duplicate id {}",
            r.document_id
        );
        assert!(r.blended_score > 0.0);
    }
    for pair in response.results.windows(2) {
        assert!(pair[0].blended_score >= pair[1].blended_score);
    }
}
