//! Core types for patternsearch
//!
//! This module defines the foundational types:
//! - DocumentId: Stable, never-reused identifier of a pattern document
//! - Metadata: Ordered string map attached to a document
//! - Document: A pattern document plus its derived artifacts
//! - IndexVersion: Global mutation counter used for cache invalidation

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Global index version
///
/// Incremented on every document mutation. The sole invalidation signal
/// consumed by the query cache.
pub type IndexVersion = u64;

/// Document metadata
///
/// BTreeMap so that snapshots and debug output are deterministic.
pub type Metadata = BTreeMap<String, String>;

/// Identifier of a pattern document
///
/// Ids are assigned by the ingestion collaborator and are immutable.
/// Once a document is removed, its id is tombstoned for the lifetime of
/// the process and cannot be indexed again.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DocumentId(String);

impl DocumentId {
    /// Create a new DocumentId
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the id is empty (or only whitespace)
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DocumentId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for DocumentId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl AsRef<str> for DocumentId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A pattern document owned by the document store
///
/// `tokens` and `vector` are derived artifacts computed by the search
/// facade before the document is published. `version` starts at 1 and is
/// incremented on every content update of the same id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Unique, stable id
    pub id: DocumentId,
    /// Searchable text
    pub text: String,
    /// Free-form metadata
    pub metadata: Metadata,
    /// Tokens of `text` in document order
    pub tokens: Vec<String>,
    /// Embedding of `text`
    pub vector: Vec<f32>,
    /// Per-document content version (1 on create)
    pub version: u64,
}

impl Document {
    /// Create a document with no derived artifacts and version 0
    ///
    /// The store assigns the real version on `put`.
    pub fn new(id: impl Into<DocumentId>, text: impl Into<String>) -> Self {
        Document {
            id: id.into(),
            text: text.into(),
            metadata: Metadata::new(),
            tokens: Vec::new(),
            vector: Vec::new(),
            version: 0,
        }
    }

    /// Builder: set metadata
    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Builder: set tokens
    pub fn with_tokens(mut self, tokens: Vec<String>) -> Self {
        self.tokens = tokens;
        self
    }

    /// Builder: set embedding vector
    pub fn with_vector(mut self, vector: Vec<f32>) -> Self {
        self.vector = vector;
        self
    }
}
