//! Vector storage and similarity search
//!
//! - **VectorHeap**: Contiguous embedding storage with slot reuse
//! - **VectorIndexBackend**: Trait for swappable index implementations
//! - **BruteForceBackend**: Exact O(n) search
//! - **HnswBackend**: Approximate O(log n) search
//! - **DistanceMetric**: Similarity metrics (Cosine, Euclidean, DotProduct)

pub mod backend;
pub mod brute_force;
pub mod distance;
pub mod heap;
pub mod hnsw;
pub mod types;

pub use backend::{IndexBackendFactory, VectorIndexBackend};
pub use brute_force::{exhaustive_search, BruteForceBackend};
pub use distance::{compute_similarity, cosine_similarity, cosine_to_unit, l2_norm, normalize_in_place};
pub use heap::VectorHeap;
pub use hnsw::{HnswBackend, HnswConfig};
pub use types::{DistanceMetric, VectorConfig, VectorId};
