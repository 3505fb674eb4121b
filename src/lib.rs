//! patternsearch - hybrid keyword + semantic search over pattern documents
//!
//! Documents are indexed twice: into an inverted index scored with TF-IDF and
//! into an embedding index searched by cosine similarity. Queries run either
//! branch or both, blend normalised scores, and are cached until the corpus
//! changes.
//!
//! # Quick Start
//!
//! ```
//! use patternsearch::{Metadata, SearchConfig, SearchEngine, SearchOptions};
//!
//! let engine = SearchEngine::with_hash_embedder(SearchConfig::default()).unwrap();
//! engine.index_document("retry", "retry with exponential backoff", Metadata::new()).unwrap();
//! engine.index_document("breaker", "circuit breaker for failing calls", Metadata::new()).unwrap();
//!
//! let response = engine.search("backoff", SearchOptions::new(5)).unwrap();
//! assert_eq!(response.ids()[0], "retry");
//! ```
//!
//! # Architecture
//!
//! - `patternsearch-core`: data model, options, errors, configuration
//! - `patternsearch-engine`: document store, vector backends, embedders, snapshots
//! - `patternsearch-search`: indexes, merger, query cache and the [`SearchEngine`] facade

pub use patternsearch_core::{
    CacheConfig, Degradation, Document, DocumentId, Error, IndexVersion, Metadata, QueryConfig,
    Result, ScoredResult, SearchConfig, SearchMethod, SearchOptions, SearchResponse, SearchStats,
    SemanticConfig, Weighting,
};
pub use patternsearch_engine::{Embedder, EngineSnapshot, HashEmbedder, DEFAULT_HASH_DIMENSION};
pub use patternsearch_search::{CacheStats, EngineStats, SearchEngine, SemanticMode};
