//! Stress tests for concurrent producers and subscribers
//!
//! These tests verify:
//! - The ring buffer stays bounded under concurrent producers
//! - A stalled subscriber never affects other subscribers
//! - Warnings and errors are preferentially persisted under overload
//! - The rate limiter holds its budget across threads

use diag_log_store::persistence::read_records;
use diag_log_store::prelude::*;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tempfile::TempDir;

#[test]
fn test_concurrent_producers_respect_capacity() {
    let store = Arc::new(LogStore::new(StoreConfig::default().with_capacity(1000)).unwrap());
    let num_threads = 8;
    let per_thread = 2000;

    let handles: Vec<_> = (0..num_threads)
        .map(|t| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for i in 0..per_thread {
                    store.add(
                        LogEntry::new(LogLevel::Info, LogKind::App, format!("producer-{}", t))
                            .with_event_id(i),
                    );
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("Producer thread panicked");
    }

    let total = (num_threads * per_thread) as u64;
    assert_eq!(store.count(), 1000);
    assert_eq!(store.metrics().admitted(), total);
    assert_eq!(store.metrics().capacity_evicted(), total - 1000);

    // Per-producer order survives in the snapshot
    for t in 0..num_threads {
        let category = format!("producer-{}", t);
        let ids: Vec<i32> = store
            .get_all()
            .iter()
            .filter(|e| e.category() == category)
            .map(|e| e.event_id())
            .collect();
        assert!(ids.windows(2).all(|w| w[0] < w[1]), "order broken for {}", category);
    }
}

#[test]
fn test_stalled_subscriber_does_not_affect_others() {
    let store = Arc::new(LogStore::new(StoreConfig::default()).unwrap());
    let total = 10_000;

    // Never drained
    let stalled = store.subscribe();
    let draining = store.subscribe();
    let draining_id = draining.id();

    let reader = thread::spawn(move || {
        let mut received = Vec::with_capacity(total);
        for entry in draining.iter() {
            received.push(entry.event_id());
        }
        received
    });

    for id in 0..total as i32 {
        store.add(LogEntry::new(LogLevel::Debug, LogKind::Http, "stress").with_event_id(id));
    }
    store.unsubscribe(draining_id);

    let received = reader.join().expect("Reader thread panicked");
    assert_eq!(received, (0..total as i32).collect::<Vec<_>>());
    assert_eq!(stalled.pending(), total);
    assert_eq!(store.metrics().subscriber_failures(), 0);
}

#[test]
fn test_bounded_subscriber_counts_gaps() {
    let store = LogStore::new(
        StoreConfig::default().with_subscriber_queue(SubscriberQueue::Bounded { capacity: 16 }),
    )
    .unwrap();

    let stalled = store.subscribe();
    let total = 1000;
    for id in 0..total {
        store.add(LogEntry::new(LogLevel::Info, LogKind::App, "bounded").with_event_id(id));
    }

    assert_eq!(stalled.pending(), 16);
    assert_eq!(stalled.missed(), (total - 16) as u64);
    assert_eq!(store.metrics().subscriber_failures(), (total - 16) as u64);
    // The ring buffer is unaffected by the stalled subscriber
    assert_eq!(store.count(), total as usize);
    assert_eq!(stalled.try_recv().map(|e| e.event_id()), Some(0));
}

#[test]
fn test_dropped_subscriber_is_pruned() {
    let store = LogStore::new(StoreConfig::default()).unwrap();
    let kept = store.subscribe();
    drop(store.subscribe());
    assert_eq!(store.subscriber_count(), 2);

    store.add(LogEntry::new(LogLevel::Info, LogKind::App, "prune"));

    assert_eq!(store.subscriber_count(), 1);
    assert_eq!(kept.pending(), 1);
    assert_eq!(store.metrics().subscriber_failures(), 1);
}

#[test]
fn test_errors_preferred_under_persistence_overload() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let log_file = temp_dir.path().join("overload.log");
    let store = Arc::new(
        LogStore::new(
            StoreConfig::default()
                .with_capacity(50)
                .with_file(&log_file)
                .with_max_queue(100)
                .with_flush_interval_ms(50),
        )
        .unwrap(),
    );

    let num_threads = 4;
    let per_thread = 5000;
    let handles: Vec<_> = (0..num_threads)
        .map(|_| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for i in 0..per_thread {
                    let level = if i % 100 == 0 { LogLevel::Error } else { LogLevel::Debug };
                    store.add(LogEntry::new(level, LogKind::App, "overload").with_event_id(i));
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("Producer thread panicked");
    }
    assert!(store.shutdown(Duration::from_secs(10)));

    let written = read_records(&log_file).unwrap();
    let errors_written = written.iter().filter(|e| e.level() == LogLevel::Error).count();
    let debug_written = written.len() - errors_written;

    let errors_total = num_threads * per_thread / 100;
    let debug_total = num_threads * per_thread - errors_total;

    let error_ratio = errors_written as f64 / errors_total as f64;
    let debug_ratio = debug_written as f64 / debug_total as f64;
    assert!(
        error_ratio >= debug_ratio,
        "errors retained {:.2}, debug retained {:.2}",
        error_ratio,
        debug_ratio
    );

    // Low-severity drops never count as exhausted retries
    let metrics = store.metrics();
    assert!(metrics.retries_exhausted() <= errors_total as u64);
    assert_eq!(metrics.persisted() as usize, written.len());
}

#[test]
fn test_rate_limit_across_threads() {
    let store = Arc::new(LogStore::new(StoreConfig::default().with_rate_limit(100)).unwrap());

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for _ in 0..100 {
                    store.add(LogEntry::new(LogLevel::Info, LogKind::App, "limited"));
                }
                store.add(LogEntry::new(LogLevel::Error, LogKind::App, "limited"));
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("Producer thread panicked");
    }

    let errors = store
        .get_all()
        .iter()
        .filter(|e| e.level() == LogLevel::Error)
        .count();
    assert_eq!(errors, 8);

    // One window's budget, or two if the run straddled a window boundary
    let infos = store.count() - errors;
    assert!((100..=200).contains(&infos), "admitted {} infos", infos);
    assert_eq!(store.metrics().admission_dropped() as usize, 800 - infos);
}

#[test]
fn test_subscribe_churn_while_publishing() {
    let store = Arc::new(LogStore::new(StoreConfig::default()).unwrap());

    let producer = {
        let store = Arc::clone(&store);
        thread::spawn(move || {
            for id in 0..5000 {
                store.add(LogEntry::new(LogLevel::Info, LogKind::App, "churn").with_event_id(id));
            }
        })
    };

    let churner = {
        let store = Arc::clone(&store);
        thread::spawn(move || {
            for _ in 0..200 {
                let sub = store.subscribe();
                let _ = sub.try_recv();
                store.unsubscribe(sub.id());
            }
        })
    };

    producer.join().expect("Producer thread panicked");
    churner.join().expect("Churn thread panicked");

    assert_eq!(store.subscriber_count(), 0);
    assert_eq!(store.count(), 1000);
}
