//! Storage-side structures for patternsearch
//!
//! - DocumentStore: owner of pattern documents and the global index version
//! - vector: embedding storage, exhaustive and HNSW nearest-neighbor backends
//! - Embedder: text embedding provider trait, plus a hashing implementation
//! - EngineSnapshot: serializable store image for restore across restarts

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod embed;
pub mod snapshot;
pub mod store;
pub mod vector;

pub use embed::{Embedder, HashEmbedder, DEFAULT_HASH_DIMENSION};
pub use snapshot::{EngineSnapshot, SNAPSHOT_FORMAT_VERSION};
pub use store::DocumentStore;
