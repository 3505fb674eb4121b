//! Tier 6: Scale
//!
//! Approximate semantic search above the configured threshold must keep
//! recall against exhaustive search. Large runs are opt-in.

use crate::common::*;
use patternsearch::SemanticMode;

fn recall(approx: &SearchResponse, exact: &SearchResponse) -> f64 {
    let exact_ids = sorted_ids(exact);
    if exact_ids.is_empty() {
        return 1.0;
    }
    let hits = sorted_ids(approx)
        .iter()
        .filter(|id| exact_ids.contains(id))
        .count();
    hits as f64 / exact_ids.len() as f64
}

#[test]
fn tier6_keyword_results_independent_of_semantic_mode() {
    let small = create_engine_with(SearchConfig::default().with_ann_threshold(50));
    let exhaustive = create_test_engine();
    populate_synthetic(&small, 120);
    populate_synthetic(&exhaustive, 120);

    for query in ["queue workloads", "replica", "shard lock"] {
        let a = small.search(query, keyword(20)).unwrap();
        let b = exhaustive.search(query, keyword(20)).unwrap();
        assert_eq!(a.results, b.results);
    }
}

#[test]
fn tier6_approximate_recall_against_exhaustive() {
    let config = SearchConfig::default().with_ann_threshold(200);
    let min_recall = config.semantic.min_recall;
    let approx = create_engine_with(config);
    let exact = create_test_engine();
    populate_varied(&approx, 400);
    populate_varied(&exact, 400);
    assert!(matches!(
        approx.semantic_mode(),
        SemanticMode::Approximate { .. }
    ));
    assert!(matches!(exact.semantic_mode(), SemanticMode::Exhaustive));

    // Queries are word mixes no document was built from
    let queries: Vec<String> = (0..25u64).map(|q| varied_text(50_000 + q, 3)).collect();
    let mut total = 0.0;
    for query in &queries {
        let a = approx.search(query, semantic(10)).unwrap();
        let e = exact.search(query, semantic(10)).unwrap();
        total += recall(&a, &e);
    }
    let mean = total / queries.len() as f64;
    assert!(mean >= min_recall, "mean recall {} below {}", mean, min_recall);
}

#[test]
#[ignore]
fn tier6_scale_large_corpus() {
    let engine = create_engine_with(SearchConfig::default().with_ann_threshold(2_000));
    populate_synthetic(&engine, 10_000);
    assert!(matches!(
        engine.semantic_mode(),
        SemanticMode::Approximate { .. }
    ));

    for query in ["queue", "stream replica", "index cache workloads"] {
        let response = engine.search(query, SearchOptions::new(25)).unwrap();
        assert_eq!(response.len(), 25);
        assert_well_formed(&response);
    }
}
