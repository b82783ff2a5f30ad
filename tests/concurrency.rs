//! Concurrent readers racing a single writer (§5): readers must never
//! observe a partially-constructed node, and results must converge once
//! mutation stops.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use tagdex::{KeyPredicate, QueryExpr, QueryIndex, Tags};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn host_query(host: &str) -> QueryExpr {
    QueryExpr::and([
        QueryExpr::leaf(KeyPredicate::equal("name", "cpu")),
        QueryExpr::leaf(KeyPredicate::equal("host", host)),
    ])
}

#[test]
fn readers_never_see_a_torn_node() {
    init_logging();

    let index = Arc::new(QueryIndex::<u32>::with_default_cache(Default::default()));
    let stop = Arc::new(AtomicBool::new(false));

    let writer = {
        let index = Arc::clone(&index);
        let stop = Arc::clone(&stop);
        thread::spawn(move || {
            for i in 0..500u32 {
                let host = format!("h{}", i % 16);
                index.add(&host_query(&host), i).unwrap();
            }
            stop.store(true, Ordering::Release);
        })
    };

    let mut readers = Vec::new();
    for _ in 0..4 {
        let index = Arc::clone(&index);
        let stop = Arc::clone(&stop);
        readers.push(thread::spawn(move || {
            while !stop.load(Ordering::Acquire) {
                for i in 0..16 {
                    let host = format!("h{i}");
                    let tags = Tags::new([("name", "cpu"), ("host", host.as_str())]);
                    // The only requirement: this must not panic, hang, or
                    // return a value never registered for `host`.
                    for v in index.find_matches(&tags) {
                        assert_eq!(v % 16, i);
                    }
                }
            }
        }));
    }

    writer.join().unwrap();
    for r in readers {
        r.join().unwrap();
    }

    assert_eq!(index.find_matches(&Tags::new([("name", "cpu"), ("host", "h0")])).len(), 32);
}

#[test]
fn concurrent_readers_during_removal_stay_consistent() {
    init_logging();

    let index = Arc::new(QueryIndex::<u32>::with_default_cache(Default::default()));
    for i in 0..200u32 {
        let host = format!("h{}", i % 8);
        index.add(&host_query(&host), i).unwrap();
    }

    let stop = Arc::new(AtomicBool::new(false));
    let mut readers = Vec::new();
    for _ in 0..4 {
        let index = Arc::clone(&index);
        let stop = Arc::clone(&stop);
        readers.push(thread::spawn(move || {
            while !stop.load(Ordering::Acquire) {
                let tags = Tags::new([("name", "cpu"), ("host", "h0")]);
                let _ = index.find_matches(&tags);
            }
        }));
    }

    for i in (0..200u32).step_by(2) {
        let host = format!("h{}", i % 8);
        index.remove(&host_query(&host), &i);
    }
    stop.store(true, Ordering::Release);
    for r in readers {
        r.join().unwrap();
    }

    let remaining = index.find_matches(&Tags::new([("name", "cpu"), ("host", "h0")]));
    assert!(remaining.iter().all(|v| v % 2 == 1));
}
