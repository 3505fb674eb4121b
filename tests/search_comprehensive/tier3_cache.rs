//! Tier 3: Cache Semantics
//!
//! Cached rankings are reused only while the corpus is unchanged, and the
//! cache never grows past its capacity.

use crate::common::*;

#[test]
fn tier3_repeat_query_served_from_cache() {
    let engine = create_test_engine();
    populate_catalogue(&engine);

    let first = engine.search("cache", SearchOptions::new(5)).unwrap();
    let second = engine.search("cache", SearchOptions::new(5)).unwrap();
    assert!(!first.from_cache);
    assert!(second.from_cache);
    assert_eq!(first.results, second.results);

    let stats = engine.stats();
    assert_eq!(stats.queries, 2);
    assert_eq!(stats.cache_hit_rate, 0.5);
}

#[test]
fn tier3_every_write_invalidates() {
    let engine = create_test_engine();
    populate_catalogue(&engine);

    engine.search("cache", keyword(10)).unwrap();
    engine
        .index_document("read-through", "read through cache loads on demand", Metadata::new())
        .unwrap();
    let after_insert = engine.search("cache", keyword(10)).unwrap();
    assert!(!after_insert.from_cache);
    assert_eq!(
        sorted_ids(&after_insert),
        vec!["cache-aside", "read-through", "write-through"]
    );

    engine.remove_document("cache-aside").unwrap();
    let after_remove = engine.search("cache", keyword(10)).unwrap();
    assert!(!after_remove.from_cache);
    assert_eq!(sorted_ids(&after_remove), vec!["read-through", "write-through"]);

    engine
        .index_document("write-through", "write through updates storage synchronously", Metadata::new())
        .unwrap();
    let after_update = engine.search("cache", keyword(10)).unwrap();
    assert_eq!(after_update.ids(), vec!["read-through"]);
}

#[test]
fn tier3_stale_entries_evicted_on_access() {
    let engine = create_test_engine();
    populate_catalogue(&engine);

    engine.search("cache", keyword(5)).unwrap();
    engine.remove_document("timeout").unwrap();
    engine.search("cache", keyword(5)).unwrap();
    assert!(engine.cache_stats().stale_evictions >= 1);
}

#[test]
fn tier3_capacity_bounds_entries() {
    let engine = create_engine_with(SearchConfig::default().with_cache_capacity(3));
    populate_catalogue(&engine);

    for query in ["cache", "service", "retry", "saga", "outbox", "timeout", "bulkhead"] {
        engine.search(query, keyword(5)).unwrap();
        assert!(engine.stats().cache_entries <= 3);
    }
    let stats = engine.cache_stats();
    assert_eq!(stats.entries, 3);
    assert_eq!(stats.capacity_evictions, 4);
}

#[test]
fn tier3_frequently_used_query_survives_eviction() {
    let engine = create_engine_with(SearchConfig::default().with_cache_capacity(2));
    populate_catalogue(&engine);

    for _ in 0..50 {
        engine.search("cache", keyword(5)).unwrap();
    }
    for query in ["service", "retry", "saga", "outbox"] {
        engine.search(query, keyword(5)).unwrap();
    }
    assert!(engine.search("cache", keyword(5)).unwrap().from_cache);
}

#[test]
fn tier3_weights_and_methods_are_part_of_key() {
    let engine = create_test_engine();
    populate_catalogue(&engine);

    engine.search("cache", hybrid(5, 0.5, 0.5)).unwrap();
    assert!(!engine.search("cache", hybrid(5, 0.8, 0.2)).unwrap().from_cache);
    assert!(!engine.search("cache", keyword(5)).unwrap().from_cache);
    assert!(engine.search("cache", hybrid(5, 0.5, 0.5)).unwrap().from_cache);
}

#[test]
fn tier3_keyword_weights_ignored_in_key() {
    let engine = create_test_engine();
    populate_catalogue(&engine);

    engine.search("cache", keyword(5).with_weights(0.9, 0.1)).unwrap();
    assert!(engine
        .search("cache", keyword(5).with_weights(0.1, 0.9))
        .unwrap()
        .from_cache);
}

#[test]
fn tier3_result_count_reuses_deeper_entry() {
    let engine = create_test_engine();
    populate_catalogue(&engine);

    let deep = engine.search("service calls", keyword(10)).unwrap();
    let shallow = engine.search("service calls", keyword(1)).unwrap();
    assert!(shallow.from_cache);
    assert_eq!(shallow.results[..], deep.results[..1]);
    assert!(shallow.truncated);
}
