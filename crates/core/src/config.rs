//! Engine configuration
//!
//! All tunables the search engine consumes: cache capacity, default result
//! limit, blend weights, approximate-search cutoff and recall bound, and the
//! per-operation timeout. Loaded from TOML; every key is optional.

use crate::error::{Error, Result};
use crate::search_types::{SearchOptions, Weighting};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Query cache settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum number of cached queries (default: 500)
    pub capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig { capacity: 500 }
    }
}

/// Query defaults and bounds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    /// Result limit used when callers take `SearchOptions` from config (default: 10)
    pub default_max_results: usize,
    /// Default lexical blend weight (default: 0.5)
    pub lexical_weight: f32,
    /// Default semantic blend weight (default: 0.5)
    pub semantic_weight: f32,
    /// Bound on embedding calls and index lookups in milliseconds (default: 2000)
    pub timeout_ms: u64,
    /// Embedding calls allowed in flight, including ones that outlived their
    /// timeout (default: 16)
    pub max_pending_embeddings: usize,
}

impl Default for QueryConfig {
    fn default() -> Self {
        QueryConfig {
            default_max_results: 10,
            lexical_weight: 0.5,
            semantic_weight: 0.5,
            timeout_ms: 2_000,
            max_pending_embeddings: 16,
        }
    }
}

/// Semantic index settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SemanticConfig {
    /// Corpus size at which HNSW replaces exhaustive scoring (default: 10_000)
    pub ann_threshold: usize,
    /// Minimum recall@k of HNSW against exhaustive search (default: 0.95)
    pub min_recall: f64,
    /// HNSW max connections per layer (default: 16)
    pub hnsw_m: usize,
    /// HNSW build-time beam width (default: 200)
    pub ef_construction: usize,
    /// HNSW initial search-time beam width (default: 50)
    pub ef_search: usize,
    /// Mutations between recall re-checks (default: 256)
    pub calibration_interval: usize,
    /// Sample queries per recall check (default: 32)
    pub calibration_queries: usize,
}

impl Default for SemanticConfig {
    fn default() -> Self {
        SemanticConfig {
            ann_threshold: 10_000,
            min_recall: 0.95,
            hnsw_m: 16,
            ef_construction: 200,
            ef_search: 50,
            calibration_interval: 256,
            calibration_queries: 32,
        }
    }
}

/// Complete engine configuration
///
/// # Example
///
/// ```toml
/// [cache]
/// capacity = 500
///
/// [query]
/// default_max_results = 10
/// lexical_weight = 0.5
/// semantic_weight = 0.5
/// timeout_ms = 2000
///
/// [semantic]
/// ann_threshold = 10000
/// min_recall = 0.95
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Query cache settings
    pub cache: CacheConfig,
    /// Query defaults and bounds
    pub query: QueryConfig,
    /// Semantic index settings
    pub semantic: SemanticConfig,
}

impl SearchConfig {
    /// Returns the default config file content with comments.
    pub fn default_toml() -> &'static str {
        r#"# patternsearch configuration

[cache]
# Maximum number of cached queries
capacity = 500

[query]
# Result limit for SearchOptions built from config
default_max_results = 10
# Blend weights for hybrid search (must not both be 0)
lexical_weight = 0.5
semantic_weight = 0.5
# Bound on embedding calls and index lookups (milliseconds)
timeout_ms = 2000
# Embedding calls allowed in flight; beyond it embedding fails fast
max_pending_embeddings = 16

[semantic]
# Corpus size at which approximate (HNSW) search replaces exhaustive scoring
ann_threshold = 10000
# Minimum recall of approximate search against exhaustive search
min_recall = 0.95
hnsw_m = 16
ef_construction = 200
ef_search = 50
# Mutations between recall re-checks, and sample queries per check
calibration_interval = 256
calibration_queries = 32
"#
    }

    /// Parse and validate config from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: SearchConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate config from a file path.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml_str(&content).map_err(|e| match e {
            Error::Config(msg) => Error::Config(format!("{}: {}", path.display(), msg)),
            other => other,
        })
    }

    /// Serialize this config to TOML and write it to the given path.
    pub fn write_to_file(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Check every value for internal consistency
    pub fn validate(&self) -> Result<()> {
        if self.cache.capacity == 0 {
            return Err(Error::Config("cache.capacity must be > 0".into()));
        }
        if self.query.default_max_results == 0 {
            return Err(Error::Config("query.default_max_results must be > 0".into()));
        }
        crate::limits::validate_weighting("config", &self.default_weighting())
            .map_err(|e| Error::Config(e.to_string()))?;
        if self.query.timeout_ms == 0 {
            return Err(Error::Config("query.timeout_ms must be > 0".into()));
        }
        if self.query.max_pending_embeddings == 0 {
            return Err(Error::Config("query.max_pending_embeddings must be > 0".into()));
        }
        let recall = self.semantic.min_recall;
        if !(recall > 0.0 && recall <= 1.0) {
            return Err(Error::Config(format!(
                "semantic.min_recall must be in (0, 1], got {}",
                recall
            )));
        }
        if self.semantic.hnsw_m < 2 {
            return Err(Error::Config("semantic.hnsw_m must be >= 2".into()));
        }
        if self.semantic.ef_search == 0 || self.semantic.ef_construction == 0 {
            return Err(Error::Config("semantic ef values must be > 0".into()));
        }
        if self.semantic.calibration_queries == 0 {
            return Err(Error::Config("semantic.calibration_queries must be > 0".into()));
        }
        Ok(())
    }

    /// Default blend weights
    pub fn default_weighting(&self) -> Weighting {
        Weighting::new(self.query.lexical_weight, self.query.semantic_weight)
    }

    /// Search options populated from the configured defaults
    pub fn default_options(&self) -> SearchOptions {
        SearchOptions {
            max_results: self.query.default_max_results,
            weighting: self.default_weighting(),
            ..Default::default()
        }
    }

    /// Per-operation timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.query.timeout_ms)
    }

    /// Builder: set cache capacity
    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.cache.capacity = capacity;
        self
    }

    /// Builder: set per-operation timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.query.timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// Builder: set the in-flight embedding cap
    pub fn with_max_pending_embeddings(mut self, max: usize) -> Self {
        self.query.max_pending_embeddings = max;
        self
    }

    /// Builder: set approximate-search cutoff
    pub fn with_ann_threshold(mut self, threshold: usize) -> Self {
        self.semantic.ann_threshold = threshold;
        self
    }
}
