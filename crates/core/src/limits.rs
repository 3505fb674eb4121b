//! Input validation
//!
//! Checks applied synchronously at the entry points. Violations are
//! `Error::Validation` and are never retried.

use crate::error::{Error, Result};
use crate::search_types::{SearchOptions, Weighting};
use crate::types::DocumentId;

/// Maximum document id length in bytes
pub const MAX_DOCUMENT_ID_BYTES: usize = 1024;

/// Maximum result limit accepted per query
pub const MAX_RESULTS_LIMIT: usize = 10_000;

/// Validate a document id
pub fn validate_document_id(operation: &'static str, id: &DocumentId) -> Result<()> {
    if id.is_blank() {
        return Err(Error::validation(operation, "document id is empty"));
    }
    if id.as_str().len() > MAX_DOCUMENT_ID_BYTES {
        return Err(Error::validation(
            operation,
            format!(
                "document id is {} bytes, limit is {}",
                id.as_str().len(),
                MAX_DOCUMENT_ID_BYTES
            ),
        ));
    }
    Ok(())
}

/// Validate document text
pub fn validate_text(operation: &'static str, id: &DocumentId, text: &str) -> Result<()> {
    if text.trim().is_empty() {
        return Err(Error::validation(
            operation,
            format!("document '{}' has empty text", id),
        ));
    }
    Ok(())
}

/// Validate blend weights
///
/// Weights must be finite, non-negative, and not both zero.
pub fn validate_weighting(operation: &'static str, weighting: &Weighting) -> Result<()> {
    let Weighting {
        lexical_weight,
        semantic_weight,
    } = *weighting;
    if !lexical_weight.is_finite() || !semantic_weight.is_finite() {
        return Err(Error::validation(operation, "weights must be finite"));
    }
    if lexical_weight < 0.0 || semantic_weight < 0.0 {
        return Err(Error::validation(
            operation,
            format!(
                "weights must be >= 0, got lexical={} semantic={}",
                lexical_weight, semantic_weight
            ),
        ));
    }
    if lexical_weight == 0.0 && semantic_weight == 0.0 {
        return Err(Error::validation(operation, "weights must not both be 0"));
    }
    Ok(())
}

/// Validate per-query options
pub fn validate_options(operation: &'static str, options: &SearchOptions) -> Result<()> {
    if options.max_results == 0 {
        return Err(Error::validation(operation, "max_results must be > 0"));
    }
    if options.max_results > MAX_RESULTS_LIMIT {
        return Err(Error::validation(
            operation,
            format!(
                "max_results {} exceeds limit {}",
                options.max_results, MAX_RESULTS_LIMIT
            ),
        ));
    }
    validate_weighting(operation, &options.weighting)
}
