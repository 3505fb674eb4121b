//! HNSW (Hierarchical Navigable Small World) Index Backend
//!
//! O(log n) approximate nearest neighbor search built from scratch.
//!
//! ## Design Goals
//! - Incremental inserts (no rebuild required)
//! - Removal with neighbor repair, plus a full rebuild once enough nodes
//!   have been removed
//! - Deterministic results (fixed RNG seed, sorted neighbor lists)
//!
//! ## Algorithm
//!
//! HNSW builds a multi-layer graph where:
//! - Layer 0 contains all nodes with up to 2*M connections each
//! - Higher layers contain a subset of nodes with up to M connections each
//! - Search starts from the top layer and greedily descends to layer 0
//! - At each layer, a beam search finds the ef closest neighbors
//!
//! ## Determinism
//!
//! - Fixed RNG seed + monotonic counter for level assignment
//! - BTreeMap for node storage, BTreeSet for neighbor lists
//! - Tie-breaking: (score desc, VectorId asc)

use std::cmp::{Ordering, Reverse};
use std::collections::{BTreeMap, BTreeSet, BinaryHeap};

use patternsearch_core::Result;

use super::backend::VectorIndexBackend;
use super::brute_force::exhaustive_search;
use super::distance::compute_similarity;
use super::heap::VectorHeap;
use super::types::{VectorConfig, VectorId};

/// HNSW configuration parameters
#[derive(Debug, Clone, PartialEq)]
pub struct HnswConfig {
    /// Max connections per layer (default: 16)
    pub m: usize,
    /// Build-time beam width (default: 200)
    pub ef_construction: usize,
    /// Search-time beam width (default: 50)
    pub ef_search: usize,
    /// Level multiplier: 1/ln(m)
    pub ml: f64,
}

impl Default for HnswConfig {
    fn default() -> Self {
        HnswConfig::new(16, 200, 50)
    }
}

impl HnswConfig {
    /// Create a config; the level multiplier is derived from `m`
    pub fn new(m: usize, ef_construction: usize, ef_search: usize) -> Self {
        let m = m.max(2);
        HnswConfig {
            m,
            ef_construction,
            ef_search,
            ml: 1.0 / (m as f64).ln(),
        }
    }

    fn max_connections_layer0(&self) -> usize {
        self.m * 2
    }

    fn max_connections(&self) -> usize {
        self.m
    }

    fn max_connections_at(&self, layer: usize) -> usize {
        if layer == 0 {
            self.max_connections_layer0()
        } else {
            self.max_connections()
        }
    }
}

/// A node in the HNSW graph
#[derive(Debug, Clone)]
struct HnswNode {
    /// neighbors[layer] = sorted neighbor ids
    neighbors: Vec<BTreeSet<VectorId>>,
    max_layer: usize,
}

impl HnswNode {
    fn new(max_layer: usize) -> Self {
        HnswNode {
            neighbors: (0..=max_layer).map(|_| BTreeSet::new()).collect(),
            max_layer,
        }
    }
}

/// Scored candidate for search (max-heap by score, tie-break by VectorId asc)
#[derive(Debug, Clone, PartialEq)]
struct ScoredId {
    score: f32,
    id: VectorId,
}

impl Eq for ScoredId {}

impl PartialOrd for ScoredId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScoredId {
    fn cmp(&self, other: &Self) -> Ordering {
        // Higher score = Greater; lower VectorId = Greater on ties
        self.score
            .partial_cmp(&other.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| other.id.cmp(&self.id))
    }
}

fn sort_scored(scored: &mut [ScoredId]) {
    scored.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.id.cmp(&b.id))
    });
}

// ============================================================================
// HnswGraph: graph-only structure (embeddings live in a VectorHeap)
// ============================================================================

struct HnswGraph {
    config: HnswConfig,
    nodes: BTreeMap<VectorId, HnswNode>,
    entry_point: Option<VectorId>,
    max_level: usize,
    rng_seed: u64,
    rng_counter: u64,
}

impl HnswGraph {
    fn new(config: HnswConfig) -> Self {
        HnswGraph {
            config,
            nodes: BTreeMap::new(),
            entry_point: None,
            max_level: 0,
            rng_seed: 42,
            rng_counter: 0,
        }
    }

    /// Deterministic exponential level assignment
    fn assign_level(&mut self) -> usize {
        self.rng_counter += 1;
        let hash = splitmix64(self.rng_seed.wrapping_add(self.rng_counter));
        let uniform = ((hash as f64) / (u64::MAX as f64)).max(1e-15);
        (-uniform.ln() * self.config.ml) as usize
    }

    /// Beam search at a single layer
    ///
    /// Candidates use a max-heap (nearest first); results use a min-heap so
    /// the worst result can be evicted in O(log n).
    fn search_layer(
        &self,
        query: &[f32],
        entry_id: VectorId,
        ef: usize,
        layer: usize,
        heap: &VectorHeap,
    ) -> Vec<ScoredId> {
        let metric = heap.metric();
        let entry_embedding = match heap.get(entry_id) {
            Some(e) => e,
            None => return Vec::new(),
        };
        let entry = ScoredId {
            score: compute_similarity(query, entry_embedding, metric),
            id: entry_id,
        };

        let mut visited = BTreeSet::new();
        visited.insert(entry_id);

        let mut candidates = BinaryHeap::new();
        candidates.push(entry.clone());
        let mut results: BinaryHeap<Reverse<ScoredId>> = BinaryHeap::new();
        results.push(Reverse(entry));

        while let Some(nearest) = candidates.pop() {
            let worst = results
                .peek()
                .map(|r| r.0.score)
                .unwrap_or(f32::NEG_INFINITY);
            if nearest.score < worst && results.len() >= ef {
                break;
            }

            let Some(node) = self.nodes.get(&nearest.id) else {
                continue;
            };
            let Some(neighbors) = node.neighbors.get(layer) else {
                continue;
            };

            for &neighbor_id in neighbors {
                if !visited.insert(neighbor_id) {
                    continue;
                }
                let Some(neighbor_embedding) = heap.get(neighbor_id) else {
                    continue;
                };
                let score = compute_similarity(query, neighbor_embedding, metric);
                let worst = results
                    .peek()
                    .map(|r| r.0.score)
                    .unwrap_or(f32::NEG_INFINITY);

                if results.len() < ef || score > worst {
                    let scored = ScoredId {
                        score,
                        id: neighbor_id,
                    };
                    candidates.push(scored.clone());
                    results.push(Reverse(scored));
                    if results.len() > ef {
                        results.pop();
                    }
                }
            }
        }

        let mut out: Vec<ScoredId> = results.into_iter().map(|r| r.0).collect();
        sort_scored(&mut out);
        out
    }

    /// Greedy descent from `from_layer` to `to_layer` (ef = 1)
    fn greedy_search_to_layer(
        &self,
        query: &[f32],
        entry_id: VectorId,
        from_layer: usize,
        to_layer: usize,
        heap: &VectorHeap,
    ) -> VectorId {
        let metric = heap.metric();
        let mut current = entry_id;

        for layer in (to_layer..=from_layer).rev() {
            let mut improved = true;
            while improved {
                improved = false;
                let Some(current_embedding) = heap.get(current) else {
                    break;
                };
                let mut best_score = compute_similarity(query, current_embedding, metric);
                let mut best_id = current;

                if let Some(neighbors) = self
                    .nodes
                    .get(&current)
                    .and_then(|n| n.neighbors.get(layer))
                {
                    for &neighbor_id in neighbors {
                        if let Some(embedding) = heap.get(neighbor_id) {
                            let score = compute_similarity(query, embedding, metric);
                            if score > best_score || (score == best_score && neighbor_id < best_id)
                            {
                                best_score = score;
                                best_id = neighbor_id;
                            }
                        }
                    }
                }

                if best_id != current {
                    current = best_id;
                    improved = true;
                }
            }
        }

        current
    }

    /// Keep only the `max_connections` closest neighbors of `id` at `layer`
    fn prune_neighbors_for(
        &mut self,
        id: VectorId,
        layer: usize,
        max_connections: usize,
        heap: &VectorHeap,
    ) {
        let Some(embedding) = heap.get(id) else {
            return;
        };
        let Some(neighbors) = self.nodes.get(&id).and_then(|n| n.neighbors.get(layer)) else {
            return;
        };

        let metric = heap.metric();
        let mut scored: Vec<ScoredId> = neighbors
            .iter()
            .filter_map(|&nid| {
                heap.get(nid).map(|n_emb| ScoredId {
                    score: compute_similarity(embedding, n_emb, metric),
                    id: nid,
                })
            })
            .collect();
        sort_scored(&mut scored);

        let keep: BTreeSet<VectorId> = scored.iter().take(max_connections).map(|s| s.id).collect();
        if let Some(node) = self.nodes.get_mut(&id) {
            node.neighbors[layer] = keep;
        }
    }

    /// Insert a node (HNSW paper, Algorithm 1)
    fn insert(&mut self, id: VectorId, heap: &VectorHeap) {
        let Some(embedding) = heap.get(id).map(|e| e.to_vec()) else {
            return;
        };
        let level = self.assign_level();
        self.nodes.insert(id, HnswNode::new(level));

        let Some(entry_id) = self.entry_point else {
            self.entry_point = Some(id);
            self.max_level = level;
            return;
        };

        let mut current_entry = entry_id;
        if self.max_level > level {
            current_entry =
                self.greedy_search_to_layer(&embedding, entry_id, self.max_level, level + 1, heap);
        }

        for layer in (0..=level.min(self.max_level)).rev() {
            let candidates = self.search_layer(
                &embedding,
                current_entry,
                self.config.ef_construction,
                layer,
                heap,
            );

            // New node connects to its M closest (not Mmax)
            let selected: Vec<VectorId> = candidates
                .iter()
                .filter(|s| s.id != id)
                .take(self.config.m)
                .map(|s| s.id)
                .collect();

            if let Some(node) = self.nodes.get_mut(&id) {
                node.neighbors[layer].extend(selected.iter().copied());
            }

            let max_conn = self.config.max_connections_at(layer);
            for &neighbor_id in &selected {
                let needs_prune = match self.nodes.get_mut(&neighbor_id) {
                    Some(n) if layer < n.neighbors.len() => {
                        n.neighbors[layer].insert(id);
                        n.neighbors[layer].len() > max_conn
                    }
                    _ => false,
                };
                if needs_prune {
                    self.prune_neighbors_for(neighbor_id, layer, max_conn, heap);
                }
            }

            if let Some(closest) = candidates.first() {
                current_entry = closest.id;
            }
        }

        if level > self.max_level {
            self.entry_point = Some(id);
            self.max_level = level;
        }
    }

    /// Remove a node and repair the neighborhoods it participated in
    ///
    /// Each former neighbor is offered the removed node's other neighbors as
    /// replacement links, then pruned back to its connection limit.
    fn remove(&mut self, id: VectorId, heap: &VectorHeap) {
        let Some(node) = self.nodes.remove(&id) else {
            return;
        };

        for (layer, neighbors) in node.neighbors.iter().enumerate() {
            let max_conn = self.config.max_connections_at(layer);
            for &neighbor_id in neighbors {
                let needs_prune = match self.nodes.get_mut(&neighbor_id) {
                    Some(n) if layer < n.neighbors.len() => {
                        n.neighbors[layer].remove(&id);
                        for &other in neighbors {
                            if other != neighbor_id {
                                n.neighbors[layer].insert(other);
                            }
                        }
                        n.neighbors[layer].len() > max_conn
                    }
                    _ => false,
                };
                if needs_prune {
                    self.prune_neighbors_for(neighbor_id, layer, max_conn, heap);
                }
            }
        }

        if self.entry_point == Some(id) {
            // Highest remaining node, lowest id on ties
            let next = self
                .nodes
                .iter()
                .max_by(|(a_id, a), (b_id, b)| {
                    a.max_layer.cmp(&b.max_layer).then_with(|| b_id.cmp(a_id))
                })
                .map(|(nid, n)| (*nid, n.max_layer));
            self.entry_point = next.map(|(nid, _)| nid);
            self.max_level = next.map(|(_, level)| level).unwrap_or(0);
        }
    }

    /// Rebuild the graph from scratch in VectorId order
    fn rebuild(&mut self, heap: &VectorHeap) {
        self.nodes.clear();
        self.entry_point = None;
        self.max_level = 0;
        self.rng_counter = 0;
        for id in heap.ids() {
            self.insert(id, heap);
        }
    }

    fn search(&self, query: &[f32], k: usize, heap: &VectorHeap) -> Vec<(VectorId, f32)> {
        if k == 0 || heap.is_empty() || query.len() != heap.dimension() {
            return Vec::new();
        }
        let Some(entry_id) = self.entry_point else {
            return Vec::new();
        };

        let mut current_entry = entry_id;
        if self.max_level > 0 {
            current_entry = self.greedy_search_to_layer(query, entry_id, self.max_level, 1, heap);
        }

        let ef = self.config.ef_search.max(k);
        self.search_layer(query, current_entry, ef, 0, heap)
            .into_iter()
            .take(k)
            .map(|s| (s.id, s.score))
            .collect()
    }
}

/// SplitMix64 hash function for deterministic PRNG
fn splitmix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9e3779b97f4a7c15);
    x = (x ^ (x >> 30)).wrapping_mul(0xbf58476d1ce4e5b9);
    x = (x ^ (x >> 27)).wrapping_mul(0x94d049bb133111eb);
    x ^ (x >> 31)
}

// ============================================================================
// HnswBackend
// ============================================================================

/// HNSW backend: owns the embeddings and the graph over them
pub struct HnswBackend {
    heap: VectorHeap,
    graph: HnswGraph,
    /// Removals since the graph was last rebuilt
    removed_since_rebuild: usize,
}

impl HnswBackend {
    /// Create an empty backend
    pub fn new(vector_config: &VectorConfig, hnsw_config: HnswConfig) -> Self {
        Self::from_heap(VectorHeap::new(vector_config.clone()), hnsw_config)
    }

    /// Build a graph over existing embeddings
    pub fn from_heap(heap: VectorHeap, hnsw_config: HnswConfig) -> Self {
        let mut graph = HnswGraph::new(hnsw_config);
        graph.rebuild(&heap);
        HnswBackend {
            heap,
            graph,
            removed_since_rebuild: 0,
        }
    }

    /// Current search-time beam width
    pub fn ef_search(&self) -> usize {
        self.graph.config.ef_search
    }

    /// Change the search-time beam width
    pub fn set_ef_search(&mut self, ef_search: usize) {
        self.graph.config.ef_search = ef_search.max(1);
    }

    /// Exact top-k over the same embeddings (recall baseline)
    pub fn exact_search(&self, query: &[f32], k: usize) -> Vec<(VectorId, f32)> {
        exhaustive_search(&self.heap, query, k)
    }

    /// Rebuild the graph from the current embeddings
    pub fn rebuild_graph(&mut self) {
        self.graph.rebuild(&self.heap);
        self.removed_since_rebuild = 0;
    }
}

impl VectorIndexBackend for HnswBackend {
    fn insert(&mut self, id: VectorId, embedding: &[f32]) -> Result<()> {
        if self.heap.contains(id) {
            self.graph.remove(id, &self.heap);
        }
        self.heap.upsert(id, embedding)?;
        self.graph.insert(id, &self.heap);
        Ok(())
    }

    fn delete(&mut self, id: VectorId) -> bool {
        if !self.heap.contains(id) {
            return false;
        }
        self.graph.remove(id, &self.heap);
        self.heap.delete(id);
        self.removed_since_rebuild += 1;
        // Repaired links degrade over many removals; rebuild past a quarter
        if self.removed_since_rebuild * 4 > self.heap.len().max(1) {
            self.rebuild_graph();
        }
        true
    }

    fn search(&self, query: &[f32], k: usize) -> Vec<(VectorId, f32)> {
        self.graph.search(query, k, &self.heap)
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

    fn set_search_width(&mut self, width: usize) {
        self.set_ef_search(width);
    }

    fn index_type_name(&self) -> &'static str {
        "hnsw"
    }

    fn into_heap(self: Box<Self>) -> VectorHeap {
        self.heap
    }
}
