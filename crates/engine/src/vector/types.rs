//! Vector identifiers and configuration

use serde::{Deserialize, Serialize};
use std::fmt;

/// Internal identifier of a stored vector
///
/// Allocated monotonically by the semantic index and never reused, so a
/// stale id can never alias a newer document's embedding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct VectorId(u64);

impl VectorId {
    /// Create a VectorId from its raw value
    pub fn new(id: u64) -> Self {
        VectorId(id)
    }

    /// Raw value
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for VectorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// Similarity metric
///
/// All metrics are normalised to "higher = more similar".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DistanceMetric {
    /// Cosine similarity, range [-1, 1]
    #[default]
    Cosine,
    /// 1 / (1 + l2 distance), range (0, 1]
    Euclidean,
    /// Inner product, unbounded
    DotProduct,
}

/// Configuration of a vector heap / backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorConfig {
    /// Embedding dimension
    pub dimension: usize,
    /// Similarity metric
    pub metric: DistanceMetric,
}

impl VectorConfig {
    /// Create a cosine-metric config of the given dimension
    pub fn cosine(dimension: usize) -> Self {
        VectorConfig {
            dimension,
            metric: DistanceMetric::Cosine,
        }
    }
}
