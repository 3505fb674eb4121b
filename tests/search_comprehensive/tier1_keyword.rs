//! Tier 1: Keyword Search
//!
//! Lexical matching, TF-IDF ordering and input validation.

use crate::common::*;

#[test]
fn tier1_only_matching_documents_returned() {
    let engine = create_test_engine();
    index_all(
        &engine,
        &[
            ("A", "rust ownership model"),
            ("B", "garbage collected heap"),
            ("C", "rust borrow checker"),
        ],
    );

    let response = engine.search("rust", keyword(2)).unwrap();
    assert_eq!(response.ids(), vec!["A", "C"]);
    assert!(!response.truncated);

    let expected = (1.0f32 + 3.0 / 2.0).ln();
    for r in &response.results {
        assert!((r.lexical_score - expected).abs() < 1e-5);
        assert_eq!(r.semantic_score, 0.0);
    }
}

#[test]
fn tier1_term_frequency_raises_rank() {
    let engine = create_test_engine();
    index_all(
        &engine,
        &[
            ("once", "queue consumer"),
            ("twice", "queue producer queue"),
            ("none", "stream processor"),
        ],
    );

    let response = engine.search("queue", keyword(10)).unwrap();
    assert_eq!(response.ids(), vec!["twice", "once"]);
    assert!(response.results[0].lexical_score > response.results[1].lexical_score);
}

#[test]
fn tier1_rare_terms_outweigh_common_terms() {
    let engine = create_test_engine();
    index_all(
        &engine,
        &[
            ("a", "service mesh sidecar"),
            ("b", "service registry"),
            ("c", "service discovery"),
        ],
    );

    let response = engine.search("service sidecar", keyword(10)).unwrap();
    assert_eq!(response.ids()[0], "a");
    assert_eq!(response.len(), 3);
}

#[test]
fn tier1_query_is_normalised() {
    let engine = create_test_engine();
    populate_catalogue(&engine);

    let plain = engine.search("backoff", keyword(5)).unwrap();
    let noisy = engine.search("  BackOff\n", keyword(5)).unwrap();
    assert_eq!(plain.ids(), vec!["retry"]);
    assert_eq!(plain.results, noisy.results);
}

#[test]
fn tier1_no_match_is_empty_not_error() {
    let engine = create_test_engine();
    populate_catalogue(&engine);
    let response = engine.search("kubernetes", keyword(5)).unwrap();
    assert!(response.is_empty());
    assert!(!response.truncated);
}

#[test]
fn tier1_empty_corpus() {
    let engine = create_test_engine();
    for opts in [keyword(5), semantic(5), SearchOptions::new(5)] {
        assert!(engine.search("anything", opts).unwrap().is_empty());
    }
}

#[test]
fn tier1_empty_query_is_validation_error() {
    let engine = create_test_engine();
    populate_catalogue(&engine);
    for q in ["", " ", "\t\n"] {
        let err = engine.search(q, keyword(5)).unwrap_err();
        assert!(matches!(err, Error::Validation { .. }), "{:?}", err);
    }
}

#[test]
fn tier1_invalid_options_rejected() {
    let engine = create_test_engine();
    assert!(matches!(
        engine.search("cache", keyword(0)),
        Err(Error::Validation { .. })
    ));
    assert!(matches!(
        engine.search("cache", hybrid(5, 0.0, 0.0)),
        Err(Error::Validation { .. })
    ));
    assert!(matches!(
        engine.search("cache", hybrid(5, f32::NAN, 1.0)),
        Err(Error::Validation { .. })
    ));
}

#[test]
fn tier1_removed_document_never_matches() {
    let engine = create_test_engine();
    populate_catalogue(&engine);
    engine.remove_document("bulkhead").unwrap();

    let response = engine.search("downstream service", keyword(10)).unwrap();
    assert_eq!(response.ids(), vec!["circuit-breaker"]);
    assert!(matches!(
        engine.get_document("bulkhead"),
        Err(Error::NotFound { .. })
    ));
}

#[test]
fn tier1_single_character_words_ignored() {
    let engine = create_test_engine();
    index_all(&engine, &[("x", "a b c queue")]);
    assert!(engine.search("a", keyword(5)).unwrap().is_empty());
    assert_eq!(engine.search("queue", keyword(5)).unwrap().ids(), vec!["x"]);
}
