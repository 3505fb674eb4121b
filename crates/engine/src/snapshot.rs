//! Engine snapshots
//!
//! A snapshot is a self-contained image of the document store: live
//! documents with their versions and embeddings, tombstoned ids, and the
//! global index version. Indexes are rebuilt from it on restore, so no
//! re-embedding is needed.
//!
//! Encoded as MessagePack (rmp-serde) with a leading format version.

use std::fs;
use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};

use patternsearch_core::{Document, DocumentId, Error, IndexVersion, Result};

use crate::store::DocumentStore;

/// Current snapshot format version
pub const SNAPSHOT_FORMAT_VERSION: u32 = 1;

/// Serializable image of a document store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineSnapshot {
    /// Snapshot format version
    pub format_version: u32,
    /// Global index version at capture time
    pub index_version: IndexVersion,
    /// Name of the embedder that produced the vectors
    pub embedder: String,
    /// Embedding dimension
    pub dimension: usize,
    /// Live documents in id order
    pub documents: Vec<Document>,
    /// Removed ids
    pub tombstones: Vec<DocumentId>,
}

impl EngineSnapshot {
    /// Capture a consistent image of a store
    pub fn capture(store: &DocumentStore, embedder: &str, dimension: usize) -> Self {
        let (documents, tombstones, index_version) = store.export();
        EngineSnapshot {
            format_version: SNAPSHOT_FORMAT_VERSION,
            index_version,
            embedder: embedder.to_string(),
            dimension,
            documents,
            tombstones,
        }
    }

    /// Rebuild the document store this snapshot describes
    pub fn to_store(&self) -> Result<DocumentStore> {
        DocumentStore::from_parts(
            self.documents.clone(),
            self.tombstones.clone(),
            self.index_version,
        )
    }

    /// Encode to MessagePack bytes
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        rmp_serde::to_vec_named(self).map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Decode from MessagePack bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let snapshot: EngineSnapshot =
            rmp_serde::from_slice(bytes).map_err(|e| Error::Serialization(e.to_string()))?;
        if snapshot.format_version != SNAPSHOT_FORMAT_VERSION {
            return Err(Error::Serialization(format!(
                "unsupported snapshot format version {} (expected {})",
                snapshot.format_version, SNAPSHOT_FORMAT_VERSION
            )));
        }
        Ok(snapshot)
    }

    /// Write the encoded snapshot to a file (temp file + rename)
    pub fn write_to_file(&self, path: &Path) -> Result<()> {
        let bytes = self.to_bytes()?;
        let tmp = path.with_extension("tmp");
        {
            let mut file = fs::File::create(&tmp)?;
            file.write_all(&bytes)?;
            file.sync_all()?;
        }
        fs::rename(&tmp, path)?;
        Ok(())
    }

    /// Read and decode a snapshot file
    pub fn read_from_file(path: &Path) -> Result<Self> {
        let bytes = fs::read(path)?;
        Self::from_bytes(&bytes)
    }
}
