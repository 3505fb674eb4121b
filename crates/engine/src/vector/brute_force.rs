//! Brute-Force Vector Search Backend
//!
//! Exact O(n) search. Used below the approximate-search cutoff, and as the
//! recall baseline when HNSW is calibrated.

use std::cmp::Ordering;

use patternsearch_core::Result;

use super::backend::VectorIndexBackend;
use super::distance::compute_similarity;
use super::heap::VectorHeap;
use super::types::{VectorConfig, VectorId};

/// Brute-force vector search backend
pub struct BruteForceBackend {
    heap: VectorHeap,
}

impl BruteForceBackend {
    /// Create a new brute-force backend
    pub fn new(config: &VectorConfig) -> Self {
        BruteForceBackend {
            heap: VectorHeap::new(config.clone()),
        }
    }

    /// Create from an existing heap
    pub fn from_heap(heap: VectorHeap) -> Self {
        BruteForceBackend { heap }
    }
}

/// Exhaustive top-k over a heap
///
/// 1. Iterate vectors in VectorId order
/// 2. Score each one (single-threaded)
/// 3. Sort by (score desc, VectorId asc)
/// 4. Truncate to k
pub fn exhaustive_search(heap: &VectorHeap, query: &[f32], k: usize) -> Vec<(VectorId, f32)> {
    if k == 0 || heap.is_empty() || query.len() != heap.dimension() {
        return Vec::new();
    }

    let metric = heap.metric();
    let mut results: Vec<(VectorId, f32)> = heap
        .iter()
        .map(|(id, embedding)| (id, compute_similarity(query, embedding, metric)))
        .collect();

    results.sort_by(|(id_a, score_a), (id_b, score_b)| {
        score_b
            .partial_cmp(score_a)
            .unwrap_or(Ordering::Equal)
            .then_with(|| id_a.cmp(id_b))
    });

    results.truncate(k);
    results
}

impl VectorIndexBackend for BruteForceBackend {
    fn insert(&mut self, id: VectorId, embedding: &[f32]) -> Result<()> {
        self.heap.upsert(id, embedding)
    }

    fn delete(&mut self, id: VectorId) -> bool {
        self.heap.delete(id)
    }

    fn search(&self, query: &[f32], k: usize) -> Vec<(VectorId, f32)> {
        exhaustive_search(&self.heap, query, k)
    }

    fn len(&self) -> usize {
        self.heap.len()
    }

    fn dimension(&self) -> usize {
        self.heap.dimension()
    }

    fn get(&self, id: VectorId) -> Option<&[f32]> {
        self.heap.get(id)
    }

    fn contains(&self, id: VectorId) -> bool {
        self.heap.contains(id)
    }

    fn heap(&self) -> &VectorHeap {
        &self.heap
    }

    fn index_type_name(&self) -> &'static str {
        "brute_force"
    }

    fn into_heap(self: Box<Self>) -> VectorHeap {
        self.heap
    }
}
