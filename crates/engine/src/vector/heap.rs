//! Vector Heap - Contiguous embedding storage
//!
//! VectorHeap stores embeddings in a contiguous Vec<f32> for cache-friendly
//! similarity computation. Uses BTreeMap for deterministic iteration order.
//!
//! # Invariants
//!
//! - `id_to_offset` is the sole source of truth for active vectors
//! - Storage slots are reused after deletion; VectorIds are not
//! - Iteration is in VectorId order, so exhaustive scoring is deterministic

use std::collections::BTreeMap;

use patternsearch_core::{Error, Result};

use super::types::{DistanceMetric, VectorConfig, VectorId};

/// Contiguous embedding storage
pub struct VectorHeap {
    config: VectorConfig,

    /// Layout: [v0_dim0, ..., v0_dimN, v1_dim0, ...]
    data: Vec<f32>,

    /// VectorId -> offset in data (in floats, not bytes)
    id_to_offset: BTreeMap<VectorId, usize>,

    /// Offsets of deleted slots available for reuse
    free_slots: Vec<usize>,
}

impl VectorHeap {
    /// Create an empty heap
    pub fn new(config: VectorConfig) -> Self {
        VectorHeap {
            config,
            data: Vec::new(),
            id_to_offset: BTreeMap::new(),
            free_slots: Vec::new(),
        }
    }

    /// Embedding dimension
    pub fn dimension(&self) -> usize {
        self.config.dimension
    }

    /// Similarity metric
    pub fn metric(&self) -> DistanceMetric {
        self.config.metric
    }

    /// Heap configuration
    pub fn config(&self) -> &VectorConfig {
        &self.config
    }

    /// Number of active vectors
    pub fn len(&self) -> usize {
        self.id_to_offset.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.id_to_offset.is_empty()
    }

    /// Insert or update a vector (upsert semantics)
    ///
    /// If the VectorId already exists, updates in place. New vectors reuse a
    /// freed slot when one is available.
    pub fn upsert(&mut self, id: VectorId, embedding: &[f32]) -> Result<()> {
        if embedding.len() != self.config.dimension {
            return Err(Error::validation(
                "vector.upsert",
                format!(
                    "dimension mismatch: expected {}, got {}",
                    self.config.dimension,
                    embedding.len()
                ),
            ));
        }

        if let Some(&offset) = self.id_to_offset.get(&id) {
            self.data[offset..offset + self.config.dimension].copy_from_slice(embedding);
        } else {
            let offset = if let Some(slot) = self.free_slots.pop() {
                self.data[slot..slot + self.config.dimension].copy_from_slice(embedding);
                slot
            } else {
                let offset = self.data.len();
                self.data.extend_from_slice(embedding);
                offset
            };
            self.id_to_offset.insert(id, offset);
        }
        Ok(())
    }

    /// Delete a vector by ID
    ///
    /// Returns true if the vector existed. The slot is zeroed and queued
    /// for reuse.
    pub fn delete(&mut self, id: VectorId) -> bool {
        if let Some(offset) = self.id_to_offset.remove(&id) {
            self.free_slots.push(offset);
            self.data[offset..offset + self.config.dimension].fill(0.0);
            true
        } else {
            false
        }
    }

    /// Get embedding by VectorId
    pub fn get(&self, id: VectorId) -> Option<&[f32]> {
        let offset = *self.id_to_offset.get(&id)?;
        Some(&self.data[offset..offset + self.config.dimension])
    }

    /// Check if a vector exists
    pub fn contains(&self, id: VectorId) -> bool {
        self.id_to_offset.contains_key(&id)
    }

    /// Iterate all vectors sorted by VectorId
    pub fn iter(&self) -> impl Iterator<Item = (VectorId, &[f32])> {
        let dim = self.config.dimension;
        self.id_to_offset
            .iter()
            .map(move |(&id, &offset)| (id, &self.data[offset..offset + dim]))
    }

    /// All VectorIds in ascending order
    pub fn ids(&self) -> impl Iterator<Item = VectorId> + '_ {
        self.id_to_offset.keys().copied()
    }
}
