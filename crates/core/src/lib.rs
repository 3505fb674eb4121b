//! Core types and contracts for patternsearch
//!
//! This crate defines the foundational types used throughout the system:
//! - DocumentId, Document, Metadata: the pattern document data model
//! - IndexVersion: global mutation counter
//! - Search types: SearchMethod, SearchOptions, Weighting, ScoredResult, SearchResponse
//! - Error: Error type hierarchy
//! - SearchConfig: TOML-backed engine configuration
//! - Limits: entry-point input validation

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod limits;
pub mod search_types;
pub mod types;

// Re-export commonly used types
pub use config::{CacheConfig, QueryConfig, SearchConfig, SemanticConfig};
pub use error::{Error, Result};
pub use search_types::{
    Degradation, ScoredResult, SearchMethod, SearchOptions, SearchResponse, SearchStats,
    Weighting,
};
pub use types::{Document, DocumentId, IndexVersion, Metadata};
