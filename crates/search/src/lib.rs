//! Search over pattern documents
//!
//! This crate provides:
//! - Tokenizer shared by indexing and querying
//! - LexicalIndex: inverted index with TF-IDF scoring
//! - SemanticIndex: embedding index, exhaustive or HNSW with recall calibration
//! - Result merger: normalised weighted blending of both branches
//! - QueryCache: usage-aware, version-stamped cache of merged rankings
//! - SearchEngine: the facade tying them to the document store
//!
//! # Usage
//!
//! ```
//! use patternsearch_core::{Metadata, SearchConfig, SearchOptions};
//! use patternsearch_search::SearchEngine;
//!
//! let engine = SearchEngine::with_hash_embedder(SearchConfig::default()).unwrap();
//! engine.index_document("retry", "retry with exponential backoff", Metadata::new()).unwrap();
//! let response = engine.search("backoff", SearchOptions::new(3)).unwrap();
//! assert_eq!(response.ids()[0], "retry");
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cache;
pub mod engine;
pub mod index;
pub mod merger;
pub mod metrics;
pub mod semantic;
pub mod tokenizer;

// Re-export commonly used types
pub use cache::{CacheEntry, CacheKey, CacheStats, QueryCache};
pub use engine::{EngineStats, SearchEngine};
pub use index::{LexicalIndex, Posting};
pub use merger::{compare_results, merge, normalize};
pub use metrics::{MetricsSnapshot, QueryMetrics};
pub use semantic::{EmbeddingEntry, SemanticIndex, SemanticMode};
pub use tokenizer::{normalize_query, tokenize, tokenize_unique};
