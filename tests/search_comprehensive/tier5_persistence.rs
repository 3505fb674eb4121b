//! Tier 5: Persistence
//!
//! Snapshots restore an engine that answers exactly like the original;
//! configuration loads from TOML files.

use crate::common::*;
use patternsearch::EngineSnapshot;
use std::sync::Arc;
use tempfile::TempDir;

#[test]
fn tier5_snapshot_file_round_trip() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("engine.snapshot");

    let engine = create_test_engine();
    populate_catalogue(&engine);
    engine.remove_document("outbox").unwrap();
    engine
        .index_document("retry", "retry idempotent calls with capped backoff", Metadata::new())
        .unwrap();
    engine.snapshot().write_to_file(&path).unwrap();

    let snapshot = EngineSnapshot::read_from_file(&path).unwrap();
    let restored = SearchEngine::restore(
        &snapshot,
        SearchConfig::default(),
        Arc::new(HashEmbedder::default()),
    )
    .unwrap();

    assert_eq!(restored.index_version(), engine.index_version());
    assert_eq!(restored.get_document("retry").unwrap().version, 2);
    assert!(matches!(
        restored.remove_document("outbox"),
        Err(Error::NotFound { .. })
    ));

    for query in ["backoff", "cache service", "distributed commit"] {
        for opts in [keyword(10), semantic(10), SearchOptions::new(10)] {
            let a = engine.search(query, opts).unwrap();
            let b = restored.search(query, opts).unwrap();
            assert_eq!(a.results, b.results, "query {:?}", query);
        }
    }
}

#[test]
fn tier5_restore_does_not_reembed() {
    let engine = create_test_engine();
    populate_catalogue(&engine);
    let snapshot = engine.snapshot();

    let embedder = Arc::new(FlakyEmbedder::new());
    let restored = SearchEngine::restore(&snapshot, SearchConfig::default(), embedder.clone())
        .unwrap();
    assert_eq!(embedder.calls(), 0);
    assert_eq!(restored.stats().document_count, PATTERN_CATALOGUE.len());
}

#[test]
fn tier5_restored_engine_accepts_writes() {
    let engine = create_test_engine();
    populate_catalogue(&engine);
    let restored = SearchEngine::restore(
        &engine.snapshot(),
        SearchConfig::default(),
        Arc::new(HashEmbedder::default()),
    )
    .unwrap();

    let before = restored.index_version();
    restored
        .index_document("strangler", "strangler fig replaces a legacy system", Metadata::new())
        .unwrap();
    assert_eq!(restored.index_version(), before + 1);
    assert_eq!(
        restored.search("legacy", keyword(5)).unwrap().ids(),
        vec!["strangler"]
    );
}

#[test]
fn tier5_corrupt_snapshot_rejected() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("broken.snapshot");
    std::fs::write(&path, b"not a snapshot").unwrap();
    assert!(EngineSnapshot::read_from_file(&path).is_err());
}

#[test]
fn tier5_config_from_file() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("patternsearch.toml");
    std::fs::write(
        &path,
        "[cache]\ncapacity = 2\n\n[query]\ndefault_max_results = 3\nlexical_weight = 0.7\nsemantic_weight = 0.3\n",
    )
    .unwrap();

    let config = SearchConfig::from_file(&path).unwrap();
    assert_eq!(config.cache.capacity, 2);
    let options = config.default_options();
    assert_eq!(options.max_results, 3);
    assert_eq!(options.weighting.lexical_weight, 0.7);

    let engine = create_engine_with(config);
    populate_catalogue(&engine);
    let response = engine.search("cache", options).unwrap();
    assert!(response.len() <= 3);
}

#[test]
fn tier5_invalid_config_file_rejected() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("bad.toml");
    std::fs::write(&path, "[query]\nlexical_weight = 0.0\nsemantic_weight = 0.0\n").unwrap();
    assert!(matches!(
        SearchConfig::from_file(&path),
        Err(Error::Config(_))
    ));
}
