//! Search Comprehensive Test Suite
//!
//! End-to-end guarantees of the search engine.
//!
//! ## Test Tier Structure
//!
//! - **Tier 1: Keyword Search** (matching, TF-IDF ordering, validation)
//! - **Tier 2: Hybrid Search** (weights, merging, degradation, timeouts)
//! - **Tier 3: Cache Semantics** (reuse, staleness, eviction)
//! - **Tier 4: Concurrency** (readers vs writers, version monotonicity)
//! - **Tier 5: Persistence** (snapshots, config files)
//! - **Tier 6: Scale** (approximate semantic search; use #[ignore] for large runs)
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test --test search_comprehensive
//! cargo test --test search_comprehensive tier3
//! cargo test --test search_comprehensive scale -- --ignored
//! ```

#[path = "../common/mod.rs"]
mod common;

// Tier 1: Keyword Search
mod tier1_keyword;

// Tier 2: Hybrid Search
mod tier2_hybrid;

// Tier 3: Cache Semantics
mod tier3_cache;

// Tier 4: Concurrency
mod tier4_concurrency;

// Tier 5: Persistence
mod tier5_persistence;

// Tier 6: Scale
mod tier6_scale;
