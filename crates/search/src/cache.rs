//! Query Cache: bounded, usage-weighted cache of merged result lists
//!
//! Entries are keyed by (normalised query, hash of method + weights) and
//! stamped with the global index version they were computed at.
//!
//! # Policy
//!
//! - An entry whose stamp is older than the current index version is a miss
//!   and is evicted on the spot
//! - A truncated entry shorter than the requested depth is a miss; it
//!   stays until the deeper recomputation replaces it
//! - On overflow the entry with the lowest `hit_count / (age_ms + 1)` is
//!   evicted, before the new entry is inserted. Ties go to the least
//!   recently accessed, then the smallest key
//! - A stamp newer than the current version means the version went
//!   backwards. The cache logs it, clears itself and keeps serving misses
//!   until it is refilled; the error never reaches callers
//!
//! All state sits behind one mutex, so concurrent `get`/`put` calls see a
//! consistent eviction order.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::time::Instant;

use parking_lot::Mutex;
use tracing::{debug, error, trace};
use xxhash_rust::xxh3::Xxh3;

use patternsearch_core::{Error, IndexVersion, ScoredResult, SearchMethod, Weighting};

// ============================================================================
// CacheKey
// ============================================================================

/// Cache key: normalised query plus a hash of the ranking options
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CacheKey {
    query: String,
    options_hash: u64,
}

impl CacheKey {
    /// Build a key from an already-normalised query
    ///
    /// `weighting` should be the weighting actually applied for `method`,
    /// so equivalent requests share an entry.
    pub fn new(normalized_query: &str, method: SearchMethod, weighting: Weighting) -> Self {
        let mut hasher = Xxh3::new();
        hasher.update(method.as_str().as_bytes());
        hasher.update(&weighting.lexical_weight.to_bits().to_le_bytes());
        hasher.update(&weighting.semantic_weight.to_bits().to_le_bytes());
        CacheKey {
            query: normalized_query.to_string(),
            options_hash: hasher.digest(),
        }
    }

    /// Normalised query text
    pub fn query(&self) -> &str {
        &self.query
    }
}

// ============================================================================
// CacheEntry
// ============================================================================

/// A cached result list and its usage record
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// Ranked results, possibly longer than any single request needed
    pub results: Vec<ScoredResult>,
    /// Whether the ranking had more results than `results` holds
    pub truncated: bool,
    /// Insertion time
    pub created_at: Instant,
    /// Last successful lookup (or insertion)
    pub last_accessed_at: Instant,
    /// Uses so far; the computation that produced the entry counts as one
    pub hit_count: u64,
    /// Index version the results were computed at
    pub index_version_stamp: IndexVersion,
}

impl CacheEntry {
    /// Eviction weight at `now`: higher survives longer
    pub fn weight(&self, now: Instant) -> f64 {
        let age_ms = now.saturating_duration_since(self.created_at).as_millis() as f64;
        self.hit_count as f64 / (age_ms + 1.0)
    }
}

// ============================================================================
// CacheStats
// ============================================================================

/// Counters describing cache behaviour
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Current number of entries
    pub entries: usize,
    /// Configured capacity
    pub capacity: usize,
    /// Lookups answered from the cache
    pub hits: u64,
    /// Lookups that found nothing usable
    pub misses: u64,
    /// Entries dropped because their stamp was stale
    pub stale_evictions: u64,
    /// Entries dropped to make room
    pub capacity_evictions: u64,
    /// Times the cache detected a regressing stamp and cleared itself
    pub corruptions: u64,
}

// ============================================================================
// QueryCache
// ============================================================================

struct CacheInner {
    entries: BTreeMap<CacheKey, CacheEntry>,
    stats: CacheStats,
}

/// Bounded query cache
pub struct QueryCache {
    inner: Mutex<CacheInner>,
    capacity: usize,
}

impl QueryCache {
    /// Create a cache holding at most `capacity` entries (minimum 1)
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        QueryCache {
            inner: Mutex::new(CacheInner {
                entries: BTreeMap::new(),
                stats: CacheStats {
                    capacity,
                    ..Default::default()
                },
            }),
            capacity,
        }
    }

    /// Maximum number of entries
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Current number of entries
    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    /// Whether the cache is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Look up an entry valid at `current_version`
    pub fn get(&self, key: &CacheKey, current_version: IndexVersion) -> Option<CacheEntry> {
        self.get_at(key, current_version, Instant::now())
    }

    /// Look up an entry able to serve `min_results` results, reading the
    /// current version under the cache lock
    ///
    /// Every stamp was read before its `put` took the lock, so a version
    /// read here is never behind a stamp unless the counter regressed.
    /// Returns the version the lookup was checked against.
    pub fn get_current<F>(
        &self,
        key: &CacheKey,
        min_results: usize,
        current_version: F,
    ) -> (IndexVersion, Option<CacheEntry>)
    where
        F: FnOnce() -> IndexVersion,
    {
        let mut inner = self.inner.lock();
        let version = current_version();
        let entry = Self::lookup(&mut inner, key, version, min_results, Instant::now());
        (version, entry)
    }

    /// `get` with an explicit clock
    pub fn get_at(
        &self,
        key: &CacheKey,
        current_version: IndexVersion,
        now: Instant,
    ) -> Option<CacheEntry> {
        let mut inner = self.inner.lock();
        Self::lookup(&mut inner, key, current_version, 0, now)
    }

    fn lookup(
        inner: &mut CacheInner,
        key: &CacheKey,
        current_version: IndexVersion,
        min_results: usize,
        now: Instant,
    ) -> Option<CacheEntry> {
        let (stamp, too_shallow) = match inner.entries.get(key) {
            Some(entry) => (
                entry.index_version_stamp,
                entry.truncated && entry.results.len() < min_results,
            ),
            None => {
                inner.stats.misses += 1;
                return None;
            }
        };

        match stamp.cmp(&current_version) {
            Ordering::Equal if too_shallow => {
                inner.stats.misses += 1;
                None
            }
            Ordering::Equal => {
                inner.stats.hits += 1;
                let entry = inner.entries.get_mut(key)?;
                entry.hit_count += 1;
                entry.last_accessed_at = now;
                Some(entry.clone())
            }
            Ordering::Less => {
                inner.entries.remove(key);
                inner.stats.stale_evictions += 1;
                inner.stats.misses += 1;
                trace!(
                    target: "patternsearch::cache",
                    query = key.query(),
                    stamp,
                    current_version,
                    "Stale entry evicted"
                );
                None
            }
            Ordering::Greater => {
                let err = Error::cache_corruption(
                    "cache.get",
                    format!(
                        "entry for '{}' stamped {} but index is at {}",
                        key.query(),
                        stamp,
                        current_version
                    ),
                );
                Self::rebuild(inner, &err);
                inner.stats.misses += 1;
                None
            }
        }
    }

    /// Store results computed at index version `stamp`
    pub fn put(
        &self,
        key: CacheKey,
        results: Vec<ScoredResult>,
        truncated: bool,
        stamp: IndexVersion,
    ) {
        self.put_at(key, results, truncated, stamp, Instant::now())
    }

    /// `put` with an explicit clock
    ///
    /// A put older than the entry already stored for the key is ignored.
    pub fn put_at(
        &self,
        key: CacheKey,
        results: Vec<ScoredResult>,
        truncated: bool,
        stamp: IndexVersion,
        now: Instant,
    ) {
        let mut inner = self.inner.lock();

        if let Some(existing) = inner.entries.get(&key) {
            if existing.index_version_stamp > stamp {
                return;
            }
        } else if inner.entries.len() >= self.capacity {
            Self::evict_one(&mut inner, now);
        }

        inner.entries.insert(
            key,
            CacheEntry {
                results,
                truncated,
                created_at: now,
                last_accessed_at: now,
                hit_count: 1,
                index_version_stamp: stamp,
            },
        );
        inner.stats.entries = inner.entries.len();
    }

    /// Drop every entry
    pub fn invalidate_all(&self) {
        let mut inner = self.inner.lock();
        let dropped = inner.entries.len();
        inner.entries.clear();
        inner.stats.entries = 0;
        debug!(target: "patternsearch::cache", dropped, "Cache invalidated");
    }

    /// Snapshot of the counters
    pub fn stats(&self) -> CacheStats {
        let inner = self.inner.lock();
        CacheStats {
            entries: inner.entries.len(),
            ..inner.stats.clone()
        }
    }

    fn evict_one(inner: &mut CacheInner, now: Instant) {
        let victim = inner
            .entries
            .iter()
            .min_by(|(ka, a), (kb, b)| {
                a.weight(now)
                    .total_cmp(&b.weight(now))
                    .then_with(|| a.last_accessed_at.cmp(&b.last_accessed_at))
                    .then_with(|| ka.cmp(kb))
            })
            .map(|(k, _)| k.clone());

        if let Some(key) = victim {
            inner.entries.remove(&key);
            inner.stats.capacity_evictions += 1;
            trace!(target: "patternsearch::cache", query = key.query(), "Entry evicted");
        }
    }

    fn rebuild(inner: &mut CacheInner, err: &Error) {
        error!(
            target: "patternsearch::cache",
            error = %err,
            dropped = inner.entries.len(),
            "Cache invariant violated, clearing and rebuilding"
        );
        inner.entries.clear();
        inner.stats.entries = 0;
        inner.stats.corruptions += 1;
    }
}
