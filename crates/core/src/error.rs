//! Error types for patternsearch
//!
//! This module defines all error types used throughout the system.
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.
//!
//! Every variant names the operation that failed so that diagnostics can be
//! traced back to the entry point (`index_document`, `search`, `cache.get` ...).

use std::io;
use thiserror::Error;

/// Result type alias for patternsearch operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for patternsearch
#[derive(Debug, Error)]
pub enum Error {
    /// Rejected input: empty id/text, non-positive `max_results`, bad options
    ///
    /// Never retried.
    #[error("{operation}: validation failed: {message}")]
    Validation {
        /// Operation that rejected the input
        operation: &'static str,
        /// What was wrong
        message: String,
    },

    /// Operation referenced an unknown document id
    #[error("{operation}: document not found: {id}")]
    NotFound {
        /// Operation that failed
        operation: &'static str,
        /// Offending document id
        id: String,
    },

    /// Embedding provider failed
    ///
    /// Recoverable: hybrid search degrades to keyword-only.
    #[error("{operation}: embedding unavailable: {message}")]
    EmbeddingUnavailable {
        /// Operation that needed the embedding
        operation: &'static str,
        /// Provider error message
        message: String,
    },

    /// An index lookup or embedding call exceeded the configured bound
    #[error("{operation}: timed out after {elapsed_ms}ms")]
    Timeout {
        /// Operation that timed out
        operation: &'static str,
        /// Time waited before giving up
        elapsed_ms: u64,
    },

    /// Internal cache invariant violation (e.g. a regressing version stamp)
    ///
    /// Handled inside the cache; never surfaced by `search`.
    #[error("{operation}: cache corruption: {message}")]
    CacheCorruption {
        /// Cache operation that detected the violation
        operation: &'static str,
        /// What was violated
        message: String,
    },

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration could not be parsed or failed validation
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O error (snapshot and config files)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Internal failure (worker thread could not start or aborted)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a validation error
    pub fn validation(operation: &'static str, message: impl Into<String>) -> Self {
        Error::Validation {
            operation,
            message: message.into(),
        }
    }

    /// Create a not-found error
    pub fn not_found(operation: &'static str, id: impl Into<String>) -> Self {
        Error::NotFound {
            operation,
            id: id.into(),
        }
    }

    /// Create an embedding-unavailable error
    pub fn embedding_unavailable(operation: &'static str, message: impl Into<String>) -> Self {
        Error::EmbeddingUnavailable {
            operation,
            message: message.into(),
        }
    }

    /// Create a timeout error
    pub fn timeout(operation: &'static str, elapsed_ms: u64) -> Self {
        Error::Timeout {
            operation,
            elapsed_ms,
        }
    }

    /// Create a cache corruption error
    pub fn cache_corruption(operation: &'static str, message: impl Into<String>) -> Self {
        Error::CacheCorruption {
            operation,
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Error::Internal(message.into())
    }

    /// Name of the failing operation, when the variant records one
    pub fn operation(&self) -> Option<&'static str> {
        match self {
            Error::Validation { operation, .. }
            | Error::NotFound { operation, .. }
            | Error::EmbeddingUnavailable { operation, .. }
            | Error::Timeout { operation, .. }
            | Error::CacheCorruption { operation, .. } => Some(*operation),
            Error::Serialization(_) | Error::Config(_) | Error::Io(_) | Error::Internal(_) => None,
        }
    }

    /// Whether a search can continue in degraded form after this error
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::EmbeddingUnavailable { .. } | Error::Timeout { .. }
        )
    }
}

impl From<toml::de::Error> for Error {
    fn from(e: toml::de::Error) -> Self {
        Error::Config(e.to_string())
    }
}
