//! Tier 4: Concurrency
//!
//! Readers run in parallel with a writer; responses stay well formed and
//! writes are never lost.

use crate::common::*;
use std::collections::BTreeSet;
use std::sync::{Arc, Barrier};
use std::thread;

#[test]
fn tier4_parallel_readers_agree() {
    let engine = Arc::new(create_test_engine());
    populate_catalogue(&engine);
    let expected = engine.search("service cache", SearchOptions::new(5)).unwrap();
    engine.invalidate_cache();

    let barrier = Arc::new(Barrier::new(8));
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let engine = Arc::clone(&engine);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                engine.search("service cache", SearchOptions::new(5)).unwrap()
            })
        })
        .collect();

    for h in handles {
        let response = h.join().unwrap();
        assert_eq!(response.results, expected.results);
    }
}

#[test]
fn tier4_concurrent_writers_serialise() {
    let engine = Arc::new(create_test_engine());

    let handles: Vec<_> = (0..4)
        .map(|t| {
            let engine = Arc::clone(&engine);
            thread::spawn(move || {
                for i in 0..25 {
                    engine
                        .index_document(
                            format!("t{}_{}", t, i),
                            &format!("worker {} wrote pattern {}", t, i),
                            Metadata::new(),
                        )
                        .unwrap();
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    assert_eq!(engine.stats().document_count, 100);
    assert_eq!(engine.index_version(), 100);
    let response = engine.search("worker pattern", keyword(200)).unwrap();
    assert_eq!(response.len(), 100);
}

#[test]
fn tier4_index_version_monotonic_under_load() {
    let engine = Arc::new(create_test_engine());
    populate_catalogue(&engine);

    let writer = {
        let engine = Arc::clone(&engine);
        thread::spawn(move || {
            for i in 0..40 {
                engine
                    .index_document("churn", &format!("churning document revision {}", i), Metadata::new())
                    .unwrap();
            }
        })
    };

    let observer = {
        let engine = Arc::clone(&engine);
        thread::spawn(move || {
            let mut last = 0;
            for _ in 0..200 {
                let v = engine.index_version();
                assert!(v >= last);
                last = v;
            }
        })
    };

    writer.join().unwrap();
    observer.join().unwrap();
    assert_eq!(engine.get_document("churn").unwrap().version, 40);
}

#[test]
fn tier4_search_after_write_sees_write() {
    let engine = Arc::new(create_test_engine());
    populate_catalogue(&engine);

    let readers: Vec<_> = (0..3)
        .map(|_| {
            let engine = Arc::clone(&engine);
            thread::spawn(move || {
                for _ in 0..30 {
                    let response = engine.search("revision", keyword(50)).unwrap();
                    assert_well_formed(&response);
                }
            })
        })
        .collect();

    let mut written = BTreeSet::new();
    for i in 0..30 {
        let id = format!("rev_{:02}", i);
        engine
            .index_document(id.as_str(), "revision history pattern", Metadata::new())
            .unwrap();
        written.insert(id);
        // Once a write returns, every search must observe it
        let response = engine.search("revision", keyword(50)).unwrap();
        let seen: BTreeSet<String> = response.ids().into_iter().map(String::from).collect();
        assert_eq!(seen, written);
    }

    for r in readers {
        r.join().unwrap();
    }
}
