//! Semantic Index: nearest-neighbor retrieval over document embeddings
//!
//! Scores are cosine similarity mapped to [0, 1] via `(s + 1) / 2`.
//!
//! Below `ann_threshold` documents, search is exhaustive (exact and
//! deterministic). At or above it the index builds an HNSW graph and
//! calibrates it: sample queries that are not themselves indexed are
//! answered by both the graph and exhaustive search, and the graph is only
//! used if mean recall reaches `min_recall` at every depth up to the query
//! depth. The search width doubles until it does; if the width cap is
//! reached first the index stays exhaustive and waits for the corpus to
//! grow by half before trying again. Calibration repeats every
//! `calibration_interval` mutations.
//!
//! Queries deeper than the calibrated depth are always answered exactly.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use parking_lot::RwLock;
use tracing::{debug, info, warn};

use patternsearch_core::{Document, DocumentId, Error, Result, SemanticConfig};
use patternsearch_engine::vector::{
    cosine_to_unit, exhaustive_search, l2_norm, normalize_in_place, HnswConfig,
    IndexBackendFactory, VectorConfig, VectorHeap, VectorId, VectorIndexBackend,
};

/// Shallowest depth at which calibration checks recall
const CALIBRATION_K: usize = 10;

/// Default deepest result count approximate search must serve
const DEFAULT_QUERY_DEPTH: usize = 10;

/// Headroom over `min_recall` for the sampling error of the sample queries
const CALIBRATION_MARGIN: f64 = 0.01;

/// Default upper bound on the HNSW search width during calibration
const DEFAULT_MAX_EF_SEARCH: usize = 1024;

/// One embedding per live document
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingEntry {
    /// Owning document
    pub document_id: DocumentId,
    /// Embedding
    pub vector: Vec<f32>,
    /// Version of the document the vector was computed from
    pub document_version: u64,
}

/// Search strategy currently in effect
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SemanticMode {
    /// Exact scoring of every vector
    Exhaustive,
    /// HNSW graph search with the calibrated width
    Approximate {
        /// Calibrated search width
        ef_search: usize,
        /// Lowest mean recall across the calibrated depths
        recall: f64,
    },
}

#[derive(Debug, Clone, Copy)]
struct Slot {
    vector_id: VectorId,
    document_version: u64,
}

struct SemanticInner {
    backend: Option<Box<dyn VectorIndexBackend>>,
    dimension: Option<usize>,
    slots: BTreeMap<DocumentId, Slot>,
    owners: BTreeMap<VectorId, DocumentId>,
    /// VectorIds are never reused
    next_vector_id: u64,
    mode: SemanticMode,
    mutations: u64,
    last_calibration: Option<u64>,
    /// Corpus size a failed calibration waits for
    retry_at_len: Option<usize>,
    calibrations: u64,
}

/// Thread-safe semantic index
pub struct SemanticIndex {
    inner: RwLock<SemanticInner>,
    config: SemanticConfig,
    max_ef_search: usize,
    query_depth: usize,
}

impl SemanticIndex {
    /// Create an index whose dimension is fixed by the first vector
    pub fn new(config: SemanticConfig) -> Self {
        SemanticIndex {
            inner: RwLock::new(SemanticInner {
                backend: None,
                dimension: None,
                slots: BTreeMap::new(),
                owners: BTreeMap::new(),
                next_vector_id: 0,
                mode: SemanticMode::Exhaustive,
                mutations: 0,
                last_calibration: None,
                retry_at_len: None,
                calibrations: 0,
            }),
            config,
            max_ef_search: DEFAULT_MAX_EF_SEARCH,
            query_depth: DEFAULT_QUERY_DEPTH,
        }
    }

    /// Create an index with a fixed dimension
    pub fn with_dimension(config: SemanticConfig, dimension: usize) -> Self {
        let index = Self::new(config);
        index.inner.write().dimension = Some(dimension);
        index
    }

    /// Builder: cap the search width calibration may reach
    pub fn with_max_ef_search(mut self, max_ef_search: usize) -> Self {
        self.max_ef_search = max_ef_search.max(1);
        self
    }

    /// Builder: deepest `limit` approximate search is calibrated for
    ///
    /// Queries with a larger limit are scored exhaustively.
    pub fn with_query_depth(mut self, depth: usize) -> Self {
        self.query_depth = depth.max(1);
        self
    }

    /// Index (or re-index) a document's `vector` at its `version`
    pub fn index(&self, document: &Document) -> Result<()> {
        let vector = &document.vector;
        if vector.is_empty() {
            return Err(Error::validation(
                "semantic.index",
                format!("document '{}' has no vector", document.id),
            ));
        }
        if vector.iter().any(|v| !v.is_finite()) {
            return Err(Error::validation(
                "semantic.index",
                format!("document '{}' has a non-finite vector component", document.id),
            ));
        }

        let mut inner = self.inner.write();
        let dimension = *inner.dimension.get_or_insert(vector.len());
        if vector.len() != dimension {
            return Err(Error::validation(
                "semantic.index",
                format!(
                    "document '{}': dimension mismatch, expected {}, got {}",
                    document.id,
                    dimension,
                    vector.len()
                ),
            ));
        }

        let vector_id = VectorId::new(inner.next_vector_id);
        inner.next_vector_id += 1;
        let backend = inner.backend.get_or_insert_with(|| {
            IndexBackendFactory::BruteForce.create(&VectorConfig::cosine(dimension))
        });
        backend.insert(vector_id, vector)?;

        let previous = inner.slots.insert(
            document.id.clone(),
            Slot {
                vector_id,
                document_version: document.version,
            },
        );
        if let Some(old) = previous {
            if let Some(backend) = inner.backend.as_mut() {
                backend.delete(old.vector_id);
            }
            inner.owners.remove(&old.vector_id);
        }
        inner.owners.insert(vector_id, document.id.clone());

        debug!(
            target: "patternsearch::semantic",
            id = %document.id,
            version = document.version,
            vector_id = %vector_id,
            "Vector indexed"
        );
        self.after_mutation(&mut inner);
        Ok(())
    }

    /// Remove a document's vector
    ///
    /// Returns false if the document was not indexed.
    pub fn remove(&self, id: &DocumentId) -> bool {
        let mut inner = self.inner.write();
        let Some(slot) = inner.slots.remove(id) else {
            return false;
        };
        inner.owners.remove(&slot.vector_id);
        if let Some(backend) = inner.backend.as_mut() {
            backend.delete(slot.vector_id);
        }
        debug!(target: "patternsearch::semantic", id = %id, "Vector removed");
        self.after_mutation(&mut inner);
        true
    }

    /// Rank documents by similarity to `vector`
    ///
    /// Returns at most `limit` `(document_id, score)` pairs with score in
    /// [0, 1], descending, id ascending on ties. A zero query vector
    /// matches nothing.
    pub fn query(&self, vector: &[f32], limit: usize) -> Result<Vec<(DocumentId, f32)>> {
        let inner = self.inner.read();
        if let Some(dimension) = inner.dimension {
            if vector.len() != dimension {
                return Err(Error::validation(
                    "semantic.query",
                    format!(
                        "query dimension mismatch: expected {}, got {}",
                        dimension,
                        vector.len()
                    ),
                ));
            }
        }
        let Some(backend) = inner.backend.as_ref() else {
            return Ok(Vec::new());
        };
        if limit == 0 || backend.is_empty() || l2_norm(vector) == 0.0 {
            return Ok(Vec::new());
        }

        // Exact scoring covers everything so that ties at the cut are
        // resolved by document id rather than vector id
        let candidates = match inner.mode {
            SemanticMode::Approximate { .. } if limit <= self.query_depth => {
                backend.search(vector, limit)
            }
            SemanticMode::Approximate { .. } => {
                exhaustive_search(backend.heap(), vector, backend.len())
            }
            SemanticMode::Exhaustive => backend.search(vector, backend.len()),
        };

        let mut results: Vec<(DocumentId, f32)> = candidates
            .into_iter()
            .filter_map(|(vid, similarity)| {
                inner
                    .owners
                    .get(&vid)
                    .map(|id| (id.clone(), cosine_to_unit(similarity)))
            })
            .collect();
        results.sort_by(|(id_a, a), (id_b, b)| {
            b.partial_cmp(a)
                .unwrap_or(Ordering::Equal)
                .then_with(|| id_a.cmp(id_b))
        });
        results.truncate(limit);
        Ok(results)
    }

    /// Embedding entry of a document
    pub fn entry(&self, id: &DocumentId) -> Option<EmbeddingEntry> {
        let inner = self.inner.read();
        let slot = inner.slots.get(id)?;
        let vector = inner.backend.as_ref()?.get(slot.vector_id)?.to_vec();
        Some(EmbeddingEntry {
            document_id: id.clone(),
            vector,
            document_version: slot.document_version,
        })
    }

    /// Search strategy currently in effect
    pub fn mode(&self) -> SemanticMode {
        self.inner.read().mode
    }

    /// Fixed embedding dimension, once known
    pub fn dimension(&self) -> Option<usize> {
        self.inner.read().dimension
    }

    /// Recall calibrations run so far
    pub fn calibrations(&self) -> u64 {
        self.inner.read().calibrations
    }

    /// Number of indexed vectors
    pub fn len(&self) -> usize {
        self.inner.read().slots.len()
    }

    /// Whether no vectors are indexed
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // ========================================================================
    // Strategy selection
    // ========================================================================

    fn after_mutation(&self, inner: &mut SemanticInner) {
        inner.mutations += 1;
        let len = inner.slots.len();

        if len < self.config.ann_threshold {
            if matches!(inner.mode, SemanticMode::Approximate { .. }) {
                self.switch_backend(inner, IndexBackendFactory::BruteForce);
                inner.mode = SemanticMode::Exhaustive;
                inner.last_calibration = None;
                info!(
                    target: "patternsearch::semantic",
                    len,
                    threshold = self.config.ann_threshold,
                    "Corpus below threshold, exhaustive search restored"
                );
            }
            return;
        }

        let due = match inner.last_calibration {
            None => true,
            Some(at) => inner.mutations - at >= self.config.calibration_interval.max(1) as u64,
        };
        let grown = inner.retry_at_len.map_or(true, |at| len >= at);
        if due && grown {
            self.calibrate(inner);
        }
    }

    fn switch_backend(&self, inner: &mut SemanticInner, factory: IndexBackendFactory) {
        if let Some(backend) = inner.backend.take() {
            inner.backend = Some(factory.from_heap(backend.into_heap()));
        }
    }

    fn hnsw_config(&self) -> HnswConfig {
        HnswConfig::new(
            self.config.hnsw_m,
            self.config.ef_construction,
            self.config.ef_search,
        )
    }

    /// Measure HNSW recall and pick the strategy
    fn calibrate(&self, inner: &mut SemanticInner) {
        inner.last_calibration = Some(inner.mutations);
        inner.calibrations += 1;

        if matches!(inner.mode, SemanticMode::Exhaustive) {
            self.switch_backend(inner, IndexBackendFactory::Hnsw(self.hnsw_config()));
        }
        let Some(backend) = inner.backend.as_mut() else {
            return;
        };

        let len = backend.len();
        let depth = self.query_depth.min(len);
        let depths: BTreeSet<usize> = [CALIBRATION_K.min(depth), depth].into_iter().collect();
        let cap = self.max_ef_search.max(1);
        let mut ef = self.config.ef_search.max(1).min(cap);
        let target = (self.config.min_recall + CALIBRATION_MARGIN).min(1.0);

        let samples = calibration_queries(backend.heap(), self.config.calibration_queries.max(1));
        let truth: Vec<Vec<VectorId>> = samples
            .iter()
            .map(|q| {
                exhaustive_search(backend.heap(), q, depth)
                    .into_iter()
                    .map(|(id, _)| id)
                    .collect()
            })
            .collect();

        loop {
            backend.set_search_width(ef);
            let recall = depths
                .iter()
                .map(|&k| mean_recall(&**backend, &samples, &truth, k))
                .fold(1.0, f64::min);

            if recall >= target {
                debug!(
                    target: "patternsearch::semantic",
                    len,
                    depth,
                    ef_search = ef,
                    recall,
                    "Approximate search calibrated"
                );
                if !matches!(inner.mode, SemanticMode::Approximate { .. }) {
                    info!(
                        target: "patternsearch::semantic",
                        len,
                        ef_search = ef,
                        recall,
                        "Switched to approximate search"
                    );
                }
                inner.mode = SemanticMode::Approximate {
                    ef_search: ef,
                    recall,
                };
                inner.retry_at_len = None;
                return;
            }

            if ef >= cap {
                let retry_at = len + (len / 2).max(1);
                warn!(
                    target: "patternsearch::semantic",
                    len,
                    depth,
                    ef_search = ef,
                    recall,
                    min_recall = self.config.min_recall,
                    retry_at,
                    "Approximate search below recall bound, staying exhaustive"
                );
                inner.retry_at_len = Some(retry_at);
                self.switch_backend(inner, IndexBackendFactory::BruteForce);
                inner.mode = SemanticMode::Exhaustive;
                return;
            }
            ef = (ef * 2).min(cap);
        }
    }
}

/// Queries for recall measurement that are not themselves indexed
///
/// Each query blends two stored vectors with a pseudo-random direction.
fn calibration_queries(heap: &VectorHeap, count: usize) -> Vec<Vec<f32>> {
    let stored: Vec<&[f32]> = heap.iter().map(|(_, v)| v).collect();
    if stored.is_empty() {
        return Vec::new();
    }
    let n = stored.len();
    let step = (n / count).max(1);

    (0..count)
        .map(|i| {
            let mut sample = random_direction(i as u64, heap.dimension());
            for v in [stored[(i * step) % n], stored[(i * step + n / 2 + 1) % n]] {
                let norm = l2_norm(v);
                if norm > 0.0 {
                    for (p, x) in sample.iter_mut().zip(v) {
                        *p += x / norm;
                    }
                }
            }
            sample
        })
        .collect()
}

fn splitmix(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9e3779b97f4a7c15);
    x = (x ^ (x >> 30)).wrapping_mul(0xbf58476d1ce4e5b9);
    x = (x ^ (x >> 27)).wrapping_mul(0x94d049bb133111eb);
    x ^ (x >> 31)
}

fn random_direction(seed: u64, dimension: usize) -> Vec<f32> {
    let mut v: Vec<f32> = (0..dimension)
        .map(|j| {
            let h = splitmix(seed.wrapping_mul(0x2545_f491).wrapping_add(j as u64));
            (h as f64 / u64::MAX as f64 * 2.0 - 1.0) as f32
        })
        .collect();
    normalize_in_place(&mut v);
    v
}

fn mean_recall(
    backend: &dyn VectorIndexBackend,
    samples: &[Vec<f32>],
    truth: &[Vec<VectorId>],
    k: usize,
) -> f64 {
    if samples.is_empty() || k == 0 {
        return 1.0;
    }
    let total: f64 = samples
        .iter()
        .zip(truth)
        .map(|(sample, exact)| {
            let expected: BTreeSet<VectorId> = exact.iter().take(k).copied().collect();
            if expected.is_empty() {
                return 1.0;
            }
            let hits = backend
                .search(sample, k)
                .into_iter()
                .filter(|(id, _)| expected.contains(id))
                .count();
            hits as f64 / expected.len() as f64
        })
        .sum();
    total / samples.len() as f64
}
