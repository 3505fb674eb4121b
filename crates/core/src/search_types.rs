//! Core search types
//!
//! This module defines the request/response contract of the search facade:
//! - SearchMethod: Which index(es) a query runs against
//! - Weighting: Lexical/semantic blend weights
//! - SearchOptions: Per-query options
//! - ScoredResult: One ranked document
//! - Degradation: Why a hybrid query fell back to a single branch
//! - SearchStats: Execution statistics for debugging/monitoring
//! - SearchResponse: Results of a search call

use crate::types::DocumentId;
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// SearchMethod
// ============================================================================

/// Search method - determines which indexes are consulted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchMethod {
    /// Lexical index only
    Keyword,
    /// Semantic index only (requires an embedding of the query)
    Semantic,
    /// Both indexes, merged by blended score (default)
    #[default]
    Hybrid,
}

impl SearchMethod {
    /// Stable lowercase name
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchMethod::Keyword => "keyword",
            SearchMethod::Semantic => "semantic",
            SearchMethod::Hybrid => "hybrid",
        }
    }

    /// Whether the lexical index participates
    pub fn uses_lexical(&self) -> bool {
        matches!(self, SearchMethod::Keyword | SearchMethod::Hybrid)
    }

    /// Whether the semantic index participates
    pub fn uses_semantic(&self) -> bool {
        matches!(self, SearchMethod::Semantic | SearchMethod::Hybrid)
    }
}

impl fmt::Display for SearchMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Weighting
// ============================================================================

/// Blend weights for the result merger
///
/// `blended = lexical_weight * lexical + semantic_weight * semantic`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Weighting {
    /// Weight of the normalised lexical score
    pub lexical_weight: f32,
    /// Weight of the normalised semantic score
    pub semantic_weight: f32,
}

impl Default for Weighting {
    fn default() -> Self {
        Weighting {
            lexical_weight: 0.5,
            semantic_weight: 0.5,
        }
    }
}

impl Weighting {
    /// Create a new weighting
    pub fn new(lexical_weight: f32, semantic_weight: f32) -> Self {
        Weighting {
            lexical_weight,
            semantic_weight,
        }
    }

    /// Weighting that ranks by lexical score only
    pub fn lexical_only() -> Self {
        Weighting::new(1.0, 0.0)
    }

    /// Weighting that ranks by semantic score only
    pub fn semantic_only() -> Self {
        Weighting::new(0.0, 1.0)
    }

    /// Weighting actually applied for a method
    ///
    /// Single-branch methods rank by their own branch regardless of the
    /// configured blend.
    pub fn effective_for(&self, method: SearchMethod) -> Self {
        match method {
            SearchMethod::Keyword => Weighting::lexical_only(),
            SearchMethod::Semantic => Weighting::semantic_only(),
            SearchMethod::Hybrid => *self,
        }
    }
}

// ============================================================================
// SearchOptions
// ============================================================================

/// Per-query options
///
/// # Examples
///
/// ```
/// use patternsearch_core::{SearchMethod, SearchOptions};
///
/// let opts = SearchOptions::new(5)
///     .with_method(SearchMethod::Keyword)
///     .with_weights(0.7, 0.3);
///
/// assert_eq!(opts.max_results, 5);
/// assert_eq!(opts.method, SearchMethod::Keyword);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchOptions {
    /// Maximum results to return (must be > 0)
    pub max_results: usize,
    /// Which index(es) to consult
    pub method: SearchMethod,
    /// Blend weights (used by hybrid)
    pub weighting: Weighting,
}

impl Default for SearchOptions {
    fn default() -> Self {
        SearchOptions {
            max_results: 10,
            method: SearchMethod::default(),
            weighting: Weighting::default(),
        }
    }
}

impl SearchOptions {
    /// Create options with the given result limit and default method/weights
    pub fn new(max_results: usize) -> Self {
        SearchOptions {
            max_results,
            ..Default::default()
        }
    }

    /// Builder: set search method
    pub fn with_method(mut self, method: SearchMethod) -> Self {
        self.method = method;
        self
    }

    /// Builder: set result limit
    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }

    /// Builder: set blend weights
    pub fn with_weights(mut self, lexical_weight: f32, semantic_weight: f32) -> Self {
        self.weighting = Weighting::new(lexical_weight, semantic_weight);
        self
    }
}

// ============================================================================
// ScoredResult
// ============================================================================

/// One ranked document
///
/// `lexical_score` and `semantic_score` are the raw branch scores (0 if the
/// document was absent from that branch). `blended_score` is computed from
/// their min-max normalised values and the weighting in effect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredResult {
    /// Matched document
    pub document_id: DocumentId,
    /// TF-IDF score from the lexical index
    pub lexical_score: f32,
    /// Cosine similarity mapped to [0, 1]
    pub semantic_score: f32,
    /// Final ranking score
    pub blended_score: f32,
}

impl ScoredResult {
    /// Create a new ScoredResult with no scores
    pub fn new(document_id: DocumentId) -> Self {
        ScoredResult {
            document_id,
            lexical_score: 0.0,
            semantic_score: 0.0,
            blended_score: 0.0,
        }
    }
}

// ============================================================================
// Degradation
// ============================================================================

/// Why a branch was dropped from a hybrid query
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Degradation {
    /// The embedding provider failed; results are keyword-only
    EmbeddingUnavailable(String),
    /// The semantic branch exceeded the timeout; results are keyword-only
    SemanticTimeout {
        /// Milliseconds waited
        elapsed_ms: u64,
    },
}

impl fmt::Display for Degradation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Degradation::EmbeddingUnavailable(msg) => {
                write!(f, "semantic branch dropped: embedding unavailable ({})", msg)
            }
            Degradation::SemanticTimeout { elapsed_ms } => {
                write!(f, "semantic branch dropped: timed out after {}ms", elapsed_ms)
            }
        }
    }
}

// ============================================================================
// SearchStats
// ============================================================================

/// Execution statistics for a search
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchStats {
    /// Time spent in search (microseconds)
    pub elapsed_micros: u64,
    /// Candidates returned by the lexical index
    pub lexical_candidates: usize,
    /// Candidates returned by the semantic index
    pub semantic_candidates: usize,
}

impl SearchStats {
    /// Create new SearchStats
    pub fn new(elapsed_micros: u64, lexical_candidates: usize, semantic_candidates: usize) -> Self {
        SearchStats {
            elapsed_micros,
            lexical_candidates,
            semantic_candidates,
        }
    }
}

// ============================================================================
// SearchResponse
// ============================================================================

/// Results of a search call
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResponse {
    /// Ranked results, at most `max_results`
    pub results: Vec<ScoredResult>,
    /// Whether more results existed than were returned
    pub truncated: bool,
    /// Whether the results were served from the query cache
    pub from_cache: bool,
    /// Set when hybrid search fell back to keyword-only
    pub degraded: Option<Degradation>,
    /// Execution statistics
    pub stats: SearchStats,
}

impl SearchResponse {
    /// Create an empty response
    pub fn empty(stats: SearchStats) -> Self {
        SearchResponse {
            results: Vec::new(),
            truncated: false,
            from_cache: false,
            degraded: None,
            stats,
        }
    }

    /// Number of results
    pub fn len(&self) -> usize {
        self.results.len()
    }

    /// Whether no results were returned
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Document ids in rank order
    pub fn ids(&self) -> Vec<&str> {
        self.results.iter().map(|r| r.document_id.as_str()).collect()
    }
}
