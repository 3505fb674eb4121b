//! Vector Index Backend trait
//!
//! Defines the interface for swappable vector index implementations:
//! - BruteForceBackend (exact, O(n) search)
//! - HnswBackend (approximate, O(log n) search)

use patternsearch_core::Result;

use super::heap::VectorHeap;
use super::types::{VectorConfig, VectorId};

/// Trait for swappable vector index implementations
///
/// Do NOT add methods that assume brute-force semantics; both exhaustive
/// and graph backends implement this trait.
pub trait VectorIndexBackend: Send + Sync {
    /// Insert a vector (upsert semantics)
    fn insert(&mut self, id: VectorId, embedding: &[f32]) -> Result<()>;

    /// Delete a vector
    ///
    /// Returns true if the vector existed and was deleted.
    fn delete(&mut self, id: VectorId) -> bool;

    /// Search for k nearest neighbors
    ///
    /// Returns (VectorId, score) pairs, higher = more similar, sorted by
    /// (score desc, VectorId asc).
    fn search(&self, query: &[f32], k: usize) -> Vec<(VectorId, f32)>;

    /// Number of indexed vectors
    fn len(&self) -> usize;

    /// Check if empty
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Embedding dimension
    fn dimension(&self) -> usize;

    /// Get a vector by ID
    fn get(&self, id: VectorId) -> Option<&[f32]>;

    /// Check if a vector exists
    fn contains(&self, id: VectorId) -> bool;

    /// Embedding storage behind the index
    fn heap(&self) -> &VectorHeap;

    /// Adjust the search-time candidate width (no-op for exact backends)
    fn set_search_width(&mut self, _width: usize) {}

    /// Short name for logging
    fn index_type_name(&self) -> &'static str;

    /// Give up the embedding storage (used when switching backends)
    fn into_heap(self: Box<Self>) -> VectorHeap;
}

/// Factory for creating index backends
///
/// Lets the semantic index switch between exhaustive and HNSW search
/// without knowing either concrete type.
#[derive(Clone, Debug)]
pub enum IndexBackendFactory {
    /// Brute-force O(n) search
    BruteForce,
    /// HNSW approximate search
    Hnsw(super::hnsw::HnswConfig),
}

impl Default for IndexBackendFactory {
    fn default() -> Self {
        IndexBackendFactory::BruteForce
    }
}

impl IndexBackendFactory {
    /// Create an empty backend
    pub fn create(&self, config: &VectorConfig) -> Box<dyn VectorIndexBackend> {
        self.from_heap(VectorHeap::new(config.clone()))
    }

    /// Create a backend over existing embeddings
    pub fn from_heap(&self, heap: VectorHeap) -> Box<dyn VectorIndexBackend> {
        match self {
            IndexBackendFactory::BruteForce => {
                Box::new(super::brute_force::BruteForceBackend::from_heap(heap))
            }
            IndexBackendFactory::Hnsw(config) => Box::new(
                super::hnsw::HnswBackend::from_heap(heap, config.clone()),
            ),
        }
    }
}
