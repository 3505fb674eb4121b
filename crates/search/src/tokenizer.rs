//! Tokenizer shared by the lexical index and query processing
//!
//! - Lowercase
//! - Split on non-alphanumeric characters
//! - Drop tokens shorter than 2 characters
//!
//! No stemming or stopwords: a query term matches a document term only when
//! both tokenize to the same string.

use std::collections::BTreeMap;

use rustc_hash::FxHashSet;

/// Tokenize text into searchable terms, in document order
///
/// # Example
///
/// ```
/// use patternsearch_search::tokenizer::tokenize;
///
/// let tokens = tokenize("Retry-with-Backoff, v2!");
/// assert_eq!(tokens, vec!["retry", "with", "backoff", "v2"]);
/// ```
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|s| s.chars().count() >= 2)
        .map(String::from)
        .collect()
}

/// Tokenize and deduplicate, keeping first-occurrence order
///
/// Used for queries: repeating a word in a query does not boost it.
///
/// ```
/// use patternsearch_search::tokenizer::tokenize_unique;
///
/// assert_eq!(tokenize_unique("rust Rust RUST borrow"), vec!["rust", "borrow"]);
/// ```
pub fn tokenize_unique(text: &str) -> Vec<String> {
    let mut seen = FxHashSet::default();
    tokenize(text)
        .into_iter()
        .filter(|t| seen.insert(t.clone()))
        .collect()
}

/// Count occurrences of each token
pub fn term_frequencies(tokens: &[String]) -> BTreeMap<&str, u32> {
    let mut counts = BTreeMap::new();
    for token in tokens {
        *counts.entry(token.as_str()).or_insert(0) += 1;
    }
    counts
}

/// Normalize a raw query for cache keys and validation: trim and lowercase
pub fn normalize_query(raw: &str) -> String {
    raw.trim().to_lowercase()
}
