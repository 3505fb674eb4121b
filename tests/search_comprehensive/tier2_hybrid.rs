//! Tier 2: Hybrid Search
//!
//! Weight semantics, merging guarantees and graceful degradation.

use crate::common::*;
use std::time::Duration;

#[test]
fn tier2_lexical_only_weights_equal_keyword() {
    let engine = create_test_engine();
    populate_catalogue(&engine);

    for query in ["cache", "downstream service", "transactions events"] {
        let k = engine.search(query, keyword(10)).unwrap();
        let h = engine.search(query, hybrid(10, 1.0, 0.0)).unwrap();
        assert_eq!(k.ids(), h.ids(), "query {:?}", query);
    }
}

#[test]
fn tier2_semantic_only_weights_equal_semantic() {
    let engine = create_test_engine();
    populate_catalogue(&engine);

    let s = engine.search("cache miss", semantic(10)).unwrap();
    let h = engine.search("cache miss", hybrid(10, 0.0, 1.0)).unwrap();
    assert_eq!(s.ids(), h.ids());
}

#[test]
fn tier2_results_well_formed() {
    let engine = create_test_engine();
    populate_catalogue(&engine);

    for query in ["cache", "service calls", "distributed database commit"] {
        for opts in [keyword(20), semantic(20), SearchOptions::new(20)] {
            let response = engine.search(query, opts).unwrap();
            assert_well_formed(&response);
        }
    }
}

#[test]
fn tier2_hybrid_carries_both_raw_scores() {
    let engine = create_test_engine();
    populate_catalogue(&engine);

    let response = engine.search("exponential backoff", SearchOptions::new(5)).unwrap();
    let top = &response.results[0];
    assert_eq!(top.document_id.as_str(), "retry");
    assert!(top.lexical_score > 0.0);
    assert!(top.semantic_score > 0.0);
}

#[test]
fn tier2_semantic_recovers_morphological_variants() {
    let engine = create_test_engine();
    populate_catalogue(&engine);

    // No document contains the exact word "compensations"
    assert!(engine.search("compensations", keyword(5)).unwrap().is_empty());
    let response = engine.search("compensations", semantic(3)).unwrap();
    assert!(response.ids().contains(&"saga"));
}

#[test]
fn tier2_embedding_failure_degrades_to_keyword() {
    let (engine, embedder) = create_flaky_engine(SearchConfig::default());
    populate_catalogue(&engine);
    let expected = engine.search("cache", keyword(10)).unwrap();

    embedder.set_failing(true);
    let response = engine.search("cache", SearchOptions::new(10)).unwrap();
    assert!(matches!(
        response.degraded,
        Some(Degradation::EmbeddingUnavailable(_))
    ));
    assert_eq!(response.ids(), expected.ids());
    assert!(!response.from_cache);

    embedder.set_failing(false);
    let healthy = engine.search("cache", SearchOptions::new(10)).unwrap();
    assert!(healthy.degraded.is_none());
    assert!(!healthy.from_cache, "degraded results must not be cached");
    assert_eq!(engine.stats().degraded_queries, 1);
}

#[test]
fn tier2_embedding_failure_on_semantic_is_error() {
    let (engine, embedder) = create_flaky_engine(SearchConfig::default());
    populate_catalogue(&engine);
    embedder.set_failing(true);

    assert!(matches!(
        engine.search("cache", semantic(5)),
        Err(Error::EmbeddingUnavailable { .. })
    ));
    // Keyword search never touches the embedder
    let calls = embedder.calls();
    assert_eq!(engine.search("cache", keyword(5)).unwrap().len(), 2);
    assert_eq!(embedder.calls(), calls);
}

#[test]
fn tier2_slow_embedder_degrades_hybrid() {
    let config = SearchConfig::default().with_timeout(Duration::from_millis(200));
    let (engine, embedder) = create_flaky_engine(config);
    populate_catalogue(&engine);

    embedder.set_delay(Duration::from_millis(1_500));
    let response = engine.search("cache", SearchOptions::new(10)).unwrap();
    match response.degraded {
        Some(Degradation::SemanticTimeout { elapsed_ms }) => assert!(elapsed_ms >= 200),
        other => panic!("expected semantic timeout, got {:?}", other),
    }
    assert_eq!(sorted_ids(&response), vec!["cache-aside", "write-through"]);
}

#[test]
fn tier2_slow_embedder_times_out_indexing() {
    let config = SearchConfig::default().with_timeout(Duration::from_millis(200));
    let (engine, embedder) = create_flaky_engine(config);
    embedder.set_delay(Duration::from_millis(1_500));

    let err = engine
        .index_document("late", "arrives too late", Metadata::new())
        .unwrap_err();
    assert!(matches!(err, Error::Timeout { .. }));
    assert_eq!(engine.index_version(), 0);
}
