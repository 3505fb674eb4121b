//! Embedding providers
//!
//! The search engine treats embedding as an opaque `embed(text) -> vector`
//! call behind the [`Embedder`] trait. Provider failures are recoverable:
//! hybrid search degrades to keyword-only.
//!
//! [`HashEmbedder`] is a deterministic feature-hashing provider. It needs no
//! model files, which makes it the default for tests and small corpora.

use xxhash_rust::xxh3::xxh3_64_with_seed;

use patternsearch_core::{Error, Result};

use crate::vector::normalize_in_place;

/// Default HashEmbedder output dimension
pub const DEFAULT_HASH_DIMENSION: usize = 256;

/// Text embedding provider
pub trait Embedder: Send + Sync {
    /// Embed text into a vector of length `dimension()`
    fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Output vector length
    fn dimension(&self) -> usize;

    /// Provider name for logs and snapshots
    fn name(&self) -> &str;
}

/// Deterministic feature-hashing embedder
///
/// Each lower-cased word (>= 2 chars) and each character trigram of the
/// padded word is hashed with xxh3 into a signed bucket; the result is
/// L2-normalised. Texts that share words or word fragments get a high
/// cosine similarity.
///
/// Text without such words (`"C"`, `"x + y"`) falls back to trigrams of the
/// whole trimmed text, so every non-blank text embeds to a non-zero vector.
#[derive(Debug, Clone)]
pub struct HashEmbedder {
    dimension: usize,
    seed: u64,
}

impl Default for HashEmbedder {
    fn default() -> Self {
        HashEmbedder::new(DEFAULT_HASH_DIMENSION)
    }
}

impl HashEmbedder {
    const WORD_WEIGHT: f32 = 1.0;
    const TRIGRAM_WEIGHT: f32 = 0.5;

    /// Create an embedder producing `dimension`-length vectors
    pub fn new(dimension: usize) -> Self {
        HashEmbedder {
            dimension: dimension.max(1),
            seed: 0x5eed,
        }
    }

    /// Builder: change the hash seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    fn add_feature(&self, vector: &mut [f32], feature: &[u8], weight: f32) {
        let hash = xxh3_64_with_seed(feature, self.seed);
        let bucket = (hash % self.dimension as u64) as usize;
        let sign = if hash >> 63 == 0 { 1.0 } else { -1.0 };
        vector[bucket] += sign * weight;
    }

    fn add_trigrams(&self, vector: &mut [f32], fragment: &str) {
        let padded: Vec<char> = std::iter::once('^')
            .chain(fragment.chars())
            .chain(std::iter::once('$'))
            .collect();
        for window in padded.windows(3) {
            let trigram: String = window.iter().collect();
            self.add_feature(vector, trigram.as_bytes(), Self::TRIGRAM_WEIGHT);
        }
    }
}

impl Embedder for HashEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let lowered = text.to_lowercase();
        let trimmed = lowered.trim();
        if trimmed.is_empty() {
            return Err(Error::embedding_unavailable("embed", "text is blank"));
        }

        let mut vector = vec![0.0f32; self.dimension];

        for word in lowered
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| w.chars().count() >= 2)
        {
            self.add_feature(&mut vector, word.as_bytes(), Self::WORD_WEIGHT);
            self.add_trigrams(&mut vector, word);
        }

        if is_zero(&vector) {
            self.add_trigrams(&mut vector, trimmed);
        }
        // Colliding trigrams can cancel out; one feature never does
        if is_zero(&vector) {
            self.add_feature(&mut vector, trimmed.as_bytes(), Self::WORD_WEIGHT);
        }
        normalize_in_place(&mut vector);
        Ok(vector)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn name(&self) -> &str {
        "hash"
    }
}

fn is_zero(vector: &[f32]) -> bool {
    vector.iter().all(|v| *v == 0.0)
}
