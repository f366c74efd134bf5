//! Criterion benchmarks for diag_log_store

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use diag_log_store::persistence::{format_record, PersistQueue};
use diag_log_store::prelude::*;
use std::sync::Arc;
use tempfile::TempDir;

fn entry(level: LogLevel) -> LogEntry {
    LogEntry::new(level, LogKind::Http, "Api.Orders")
        .with_event_id(200)
        .with_message("GET /orders/42 completed in 12 ms")
}

// ============================================================================
// Ingestion Benchmarks
// ============================================================================

fn bench_add(c: &mut Criterion) {
    let mut group = c.benchmark_group("add");
    group.throughput(Throughput::Elements(1));

    let memory_only = LogStore::new(StoreConfig::default()).unwrap();
    group.bench_function("memory_only", |b| {
        b.iter(|| memory_only.add(black_box(entry(LogLevel::Info))));
    });

    let limited = LogStore::new(StoreConfig::default().with_rate_limit(1000)).unwrap();
    group.bench_function("rate_limited", |b| {
        b.iter(|| limited.add(black_box(entry(LogLevel::Debug))));
    });

    let with_subscribers = LogStore::new(StoreConfig::default()).unwrap();
    let subscriptions: Vec<_> = (0..4).map(|_| with_subscribers.subscribe()).collect();
    group.bench_function("four_subscribers", |b| {
        b.iter(|| {
            with_subscribers.add(black_box(entry(LogLevel::Info)));
            for sub in &subscriptions {
                while sub.try_recv().is_some() {}
            }
        });
    });

    let temp_dir = TempDir::new().unwrap();
    let persisted = LogStore::new(
        StoreConfig::default()
            .with_file(temp_dir.path().join("bench.log"))
            .with_rolling(1024 * 1024, 2),
    )
    .unwrap();
    group.bench_function("batched_file", |b| {
        b.iter(|| persisted.add(black_box(entry(LogLevel::Info))));
    });

    group.finish();
}

fn bench_concurrent_add(c: &mut Criterion) {
    let mut group = c.benchmark_group("concurrent_add");

    let store = Arc::new(LogStore::new(StoreConfig::default()).unwrap());
    group.bench_function("multi_thread_4", |b| {
        b.iter(|| {
            let handles: Vec<_> = (0..4)
                .map(|_| {
                    let store = Arc::clone(&store);
                    std::thread::spawn(move || {
                        for _ in 0..100 {
                            store.add(black_box(entry(LogLevel::Info)));
                        }
                    })
                })
                .collect();

            for handle in handles {
                handle.join().unwrap();
            }
        });
    });

    group.finish();
}

// ============================================================================
// Component Benchmarks
// ============================================================================

fn bench_queue_overflow(c: &mut Criterion) {
    let mut group = c.benchmark_group("persist_queue");
    group.throughput(Throughput::Elements(1));

    let queue = PersistQueue::new(100, true);
    for _ in 0..100 {
        queue.offer(Arc::new(entry(LogLevel::Debug)));
    }

    group.bench_function("full_drop_debug", |b| {
        let debug = Arc::new(entry(LogLevel::Debug));
        b.iter(|| queue.offer(black_box(Arc::clone(&debug))));
    });

    group.bench_function("full_evict_error", |b| {
        let error = Arc::new(entry(LogLevel::Error));
        b.iter(|| queue.offer(black_box(Arc::clone(&error))));
    });

    group.finish();
}

fn bench_format_record(c: &mut Criterion) {
    let mut group = c.benchmark_group("format_record");
    group.throughput(Throughput::Elements(1));

    let plain = entry(LogLevel::Info);
    group.bench_function("plain", |b| {
        b.iter(|| format_record(black_box(&plain)));
    });

    let escaped = entry(LogLevel::Error)
        .with_exception("System.TimeoutException: no reply\r\n   at Gateway.Send()\r\n   at Api.Post()");
    group.bench_function("with_exception", |b| {
        b.iter(|| format_record(black_box(&escaped)));
    });

    group.finish();
}

// ============================================================================
// Criterion Configuration
// ============================================================================

criterion_group!(
    benches,
    bench_add,
    bench_concurrent_add,
    bench_queue_overflow,
    bench_format_record
);

criterion_main!(benches);
