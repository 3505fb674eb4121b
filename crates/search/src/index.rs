//! Lexical Index: inverted index with TF-IDF scoring
//!
//! score(doc) = Σ over query tokens present in doc of
//! `tf(token, doc) * ln(1 + N / df(token))`
//!
//! # Invariants
//!
//! - Exactly one posting set per indexed document, stamped with the
//!   document version it was built from
//! - Re-indexing a document swaps its postings under one write lock, so
//!   queries observe the old set or the new set, never a mix
//! - Documents matching no query token are not returned
//! - Ranking ties break by document id ascending

use std::cmp::Ordering;
use std::collections::BTreeMap;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use tracing::debug;

use patternsearch_core::{Document, DocumentId};

use crate::tokenizer::term_frequencies;

// ============================================================================
// Posting
// ============================================================================

/// Per-token, per-document frequency record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Posting {
    /// Document containing the token
    pub document_id: DocumentId,
    /// Occurrences of the token in the document
    pub term_frequency: u32,
    /// Version of the document these postings were built from
    pub document_version: u64,
}

#[derive(Default)]
struct IndexInner {
    /// Token -> postings keyed by document id
    postings: FxHashMap<String, BTreeMap<DocumentId, Posting>>,
    /// Document -> (version, distinct tokens), for removal
    documents: BTreeMap<DocumentId, (u64, Vec<String>)>,
}

impl IndexInner {
    fn remove_postings(&mut self, id: &DocumentId) -> bool {
        let Some((_, terms)) = self.documents.remove(id) else {
            return false;
        };
        for term in terms {
            if let Some(list) = self.postings.get_mut(&term) {
                list.remove(id);
                if list.is_empty() {
                    self.postings.remove(&term);
                }
            }
        }
        true
    }
}

// ============================================================================
// LexicalIndex
// ============================================================================

/// Inverted index over document tokens
///
/// # Thread Safety
///
/// One `RwLock` guards the whole index: queries share it, `index`/`remove`
/// take it exclusively. No other structure is locked.
#[derive(Default)]
pub struct LexicalIndex {
    inner: RwLock<IndexInner>,
}

impl LexicalIndex {
    /// Create an empty index
    pub fn new() -> Self {
        Self::default()
    }

    /// Index (or re-index) a document from its `tokens` and `version`
    pub fn index(&self, document: &Document) {
        let tf = term_frequencies(&document.tokens);
        let terms: Vec<String> = tf.keys().map(|t| t.to_string()).collect();

        let mut inner = self.inner.write();
        inner.remove_postings(&document.id);
        for (term, term_frequency) in tf {
            inner.postings.entry(term.to_string()).or_default().insert(
                document.id.clone(),
                Posting {
                    document_id: document.id.clone(),
                    term_frequency,
                    document_version: document.version,
                },
            );
        }
        let distinct = terms.len();
        inner
            .documents
            .insert(document.id.clone(), (document.version, terms));
        drop(inner);

        debug!(
            target: "patternsearch::lexical",
            id = %document.id,
            version = document.version,
            terms = distinct,
            "Document indexed"
        );
    }

    /// Remove a document's postings
    ///
    /// Returns false if the document was not indexed.
    pub fn remove(&self, id: &DocumentId) -> bool {
        let removed = self.inner.write().remove_postings(id);
        if removed {
            debug!(target: "patternsearch::lexical", id = %id, "Document removed");
        }
        removed
    }

    /// Rank documents against query tokens
    ///
    /// Duplicate query tokens count once. Returns at most `limit`
    /// `(document_id, score)` pairs, score descending, id ascending on ties.
    pub fn query(&self, tokens: &[String], limit: usize) -> Vec<(DocumentId, f32)> {
        if limit == 0 || tokens.is_empty() {
            return Vec::new();
        }

        let inner = self.inner.read();
        let total_docs = inner.documents.len() as f32;
        if total_docs == 0.0 {
            return Vec::new();
        }

        let mut seen: Vec<&str> = Vec::with_capacity(tokens.len());
        let mut scores: BTreeMap<&DocumentId, f32> = BTreeMap::new();
        for token in tokens {
            if seen.contains(&token.as_str()) {
                continue;
            }
            seen.push(token.as_str());

            let Some(list) = inner.postings.get(token) else {
                continue;
            };
            let idf = (1.0 + total_docs / list.len() as f32).ln();
            for (id, posting) in list {
                *scores.entry(id).or_insert(0.0) += posting.term_frequency as f32 * idf;
            }
        }

        let mut results: Vec<(DocumentId, f32)> = scores
            .into_iter()
            .filter(|(_, score)| *score > 0.0)
            .map(|(id, score)| (id.clone(), score))
            .collect();
        results.sort_by(|(id_a, a), (id_b, b)| {
            b.partial_cmp(a)
                .unwrap_or(Ordering::Equal)
                .then_with(|| id_a.cmp(id_b))
        });
        results.truncate(limit);
        results
    }

    /// Postings of one document, ordered by token
    pub fn postings_of(&self, id: &DocumentId) -> Vec<(String, Posting)> {
        let inner = self.inner.read();
        let Some((_, terms)) = inner.documents.get(id) else {
            return Vec::new();
        };
        terms
            .iter()
            .filter_map(|term| {
                inner
                    .postings
                    .get(term)
                    .and_then(|list| list.get(id))
                    .map(|p| (term.clone(), p.clone()))
            })
            .collect()
    }

    /// Version the document's postings were built from
    pub fn document_version(&self, id: &DocumentId) -> Option<u64> {
        self.inner.read().documents.get(id).map(|(v, _)| *v)
    }

    /// Number of documents containing a token
    pub fn doc_freq(&self, token: &str) -> usize {
        self.inner
            .read()
            .postings
            .get(token)
            .map(|l| l.len())
            .unwrap_or(0)
    }

    /// Number of indexed documents
    pub fn len(&self) -> usize {
        self.inner.read().documents.len()
    }

    /// Whether no documents are indexed
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of distinct tokens
    pub fn vocabulary_size(&self) -> usize {
        self.inner.read().postings.len()
    }
}
