//! Document Store
//!
//! Sole owner of pattern documents. Every `put`/`delete` bumps one
//! process-wide index version, which is the invalidation signal consumed
//! by the query cache.
//!
//! # Invariants
//!
//! - Document versions start at 1 and increase by one per content update
//! - The index version is strictly increasing; each mutation observes a
//!   unique value
//! - A deleted id is tombstoned and can never be `put` again
//! - The index version is bumped while the write lock is still held, so a
//!   reader that observes version `v` also observes every mutation up to `v`

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use tracing::debug;

use patternsearch_core::limits::{validate_document_id, validate_text};
use patternsearch_core::{Document, DocumentId, Error, IndexVersion, Result};

#[derive(Debug, Default)]
struct StoreInner {
    documents: BTreeMap<DocumentId, Document>,
    tombstones: BTreeSet<DocumentId>,
}

/// Thread-safe document store
///
/// Readers proceed in parallel; writers take the store's own lock only.
#[derive(Debug)]
pub struct DocumentStore {
    inner: RwLock<StoreInner>,
    index_version: AtomicU64,
}

impl Default for DocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentStore {
    /// Create an empty store at index version 0
    pub fn new() -> Self {
        DocumentStore {
            inner: RwLock::new(StoreInner::default()),
            index_version: AtomicU64::new(0),
        }
    }

    /// Rebuild a store from snapshotted parts
    ///
    /// Documents keep their versions. Fails if an id is both live and
    /// tombstoned.
    pub fn from_parts(
        documents: Vec<Document>,
        tombstones: Vec<DocumentId>,
        index_version: IndexVersion,
    ) -> Result<Self> {
        let tombstones: BTreeSet<DocumentId> = tombstones.into_iter().collect();
        let mut map = BTreeMap::new();
        for doc in documents {
            if tombstones.contains(&doc.id) {
                return Err(Error::validation(
                    "store.restore",
                    format!("document '{}' is both live and tombstoned", doc.id),
                ));
            }
            map.insert(doc.id.clone(), doc);
        }
        Ok(DocumentStore {
            inner: RwLock::new(StoreInner {
                documents: map,
                tombstones,
            }),
            index_version: AtomicU64::new(index_version),
        })
    }

    /// Insert or replace a document, returning its new version
    ///
    /// The store assigns `version`; any value on the incoming document is
    /// overwritten.
    pub fn put(&self, mut document: Document) -> Result<u64> {
        validate_document_id("store.put", &document.id)?;
        validate_text("store.put", &document.id, &document.text)?;

        let mut inner = self.inner.write();
        if inner.tombstones.contains(&document.id) {
            return Err(Error::validation(
                "store.put",
                format!("document id '{}' was removed and cannot be reused", document.id),
            ));
        }

        let version = inner
            .documents
            .get(&document.id)
            .map(|d| d.version + 1)
            .unwrap_or(1);
        document.version = version;
        let id = document.id.clone();
        inner.documents.insert(id.clone(), document);
        let index_version = self.index_version.fetch_add(1, Ordering::SeqCst) + 1;
        drop(inner);

        debug!(target: "patternsearch::store", id = %id, version, index_version, "Document stored");
        Ok(version)
    }

    /// Get a copy of a document
    pub fn get(&self, id: &DocumentId) -> Result<Document> {
        self.inner
            .read()
            .documents
            .get(id)
            .cloned()
            .ok_or_else(|| Error::not_found("store.get", id.as_str()))
    }

    /// Delete a document and tombstone its id
    ///
    /// Returns false (and changes nothing) if the id is not live.
    pub fn delete(&self, id: &DocumentId) -> bool {
        let mut inner = self.inner.write();
        if inner.documents.remove(id).is_none() {
            return false;
        }
        inner.tombstones.insert(id.clone());
        let index_version = self.index_version.fetch_add(1, Ordering::SeqCst) + 1;
        drop(inner);

        debug!(target: "patternsearch::store", id = %id, index_version, "Document deleted");
        true
    }

    /// Current global index version
    pub fn current_index_version(&self) -> IndexVersion {
        self.index_version.load(Ordering::SeqCst)
    }

    /// Version the document will carry after its next `put`
    pub fn peek_next_version(&self, id: &DocumentId) -> u64 {
        self.inner
            .read()
            .documents
            .get(id)
            .map(|d| d.version + 1)
            .unwrap_or(1)
    }

    /// Whether a live document exists
    pub fn contains(&self, id: &DocumentId) -> bool {
        self.inner.read().documents.contains_key(id)
    }

    /// Whether the id has been removed
    pub fn is_tombstoned(&self, id: &DocumentId) -> bool {
        self.inner.read().tombstones.contains(id)
    }

    /// Number of live documents
    pub fn len(&self) -> usize {
        self.inner.read().documents.len()
    }

    /// Whether the store holds no live documents
    pub fn is_empty(&self) -> bool {
        self.inner.read().documents.is_empty()
    }

    /// Live document ids in ascending order
    pub fn ids(&self) -> Vec<DocumentId> {
        self.inner.read().documents.keys().cloned().collect()
    }

    /// Consistent copy of documents, tombstones and index version
    pub fn export(&self) -> (Vec<Document>, Vec<DocumentId>, IndexVersion) {
        let inner = self.inner.read();
        (
            inner.documents.values().cloned().collect(),
            inner.tombstones.iter().cloned().collect(),
            self.current_index_version(),
        )
    }
}
