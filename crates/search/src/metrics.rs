//! Query accounting for `stats()`
//!
//! Counters are relaxed atomics: they may be momentarily inconsistent with
//! each other under concurrent queries, but each one is exact.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Lock-free query counters
#[derive(Debug, Default)]
pub struct QueryMetrics {
    queries: AtomicU64,
    cache_hits: AtomicU64,
    degraded: AtomicU64,
    failed: AtomicU64,
    total_latency_micros: AtomicU64,
}

impl QueryMetrics {
    /// Create zeroed counters
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a completed query
    pub fn record_query(&self, latency: Duration, from_cache: bool, degraded: bool) {
        self.queries.fetch_add(1, Ordering::Relaxed);
        self.total_latency_micros
            .fetch_add(latency.as_micros() as u64, Ordering::Relaxed);
        if from_cache {
            self.cache_hits.fetch_add(1, Ordering::Relaxed);
        }
        if degraded {
            self.degraded.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Record a query that returned an error
    pub fn record_failure(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Point-in-time copy of the counters
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            queries: self.queries.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            degraded_queries: self.degraded.load(Ordering::Relaxed),
            failed_queries: self.failed.load(Ordering::Relaxed),
            total_latency_micros: self.total_latency_micros.load(Ordering::Relaxed),
        }
    }
}

/// Copy of the query counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    /// Successful queries
    pub queries: u64,
    /// Queries answered from the cache
    pub cache_hits: u64,
    /// Hybrid queries that fell back to keyword-only
    pub degraded_queries: u64,
    /// Queries that returned an error
    pub failed_queries: u64,
    /// Sum of successful query latencies
    pub total_latency_micros: u64,
}

impl MetricsSnapshot {
    /// cache_hits / queries (0 when no queries)
    pub fn cache_hit_rate(&self) -> f64 {
        if self.queries > 0 {
            self.cache_hits as f64 / self.queries as f64
        } else {
            0.0
        }
    }

    /// Mean latency of successful queries
    pub fn average_latency(&self) -> Duration {
        if self.queries > 0 {
            Duration::from_micros(self.total_latency_micros / self.queries)
        } else {
            Duration::ZERO
        }
    }
}
