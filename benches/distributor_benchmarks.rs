//! Criterion benchmarks for log_distributor

use chrono::{Duration as ChronoDuration, Utc};
use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use log_distributor::prelude::*;
use std::sync::Arc;

const PAYLOAD: &[u8] =
    br#"{"level":"info","correlation_id":"req-42","prefix":"api","func":"handler","message":"request served","latency_ms":12}"#;

// ============================================================================
// Payload Decoding Benchmarks
// ============================================================================

fn bench_event_decoding(c: &mut Criterion) {
    let mut group = c.benchmark_group("event_decoding");
    group.throughput(Throughput::Bytes(PAYLOAD.len() as u64));

    group.bench_function("from_payload", |b| {
        b.iter(|| Event::from_payload(black_box(PAYLOAD)).unwrap());
    });

    group.finish();
}

// ============================================================================
// Writer Benchmarks
// ============================================================================

fn bench_async_writer(c: &mut Criterion) {
    let mut group = c.benchmark_group("async_writer");
    group.throughput(Throughput::Elements(1));

    let noop: Arc<dyn Processor> = Arc::new(|_event: &Event| -> Result<()> { Ok(()) });
    let writer = AsyncWriter::spawn(
        WriterConfig::new("bench").with_queue_capacity(10_000),
        Arc::clone(&noop),
    )
    .unwrap();

    group.bench_function("write", |b| {
        b.iter(|| writer.write(black_box(PAYLOAD)).unwrap());
    });

    let filtering = AsyncWriter::spawn(
        WriterConfig::new("filtered").with_min_level(LogLevel::Error),
        noop,
    )
    .unwrap();
    group.bench_function("write_filtered", |b| {
        b.iter(|| filtering.write(black_box(PAYLOAD)).unwrap());
    });

    group.finish();
}

fn bench_batch_buffer(c: &mut Criterion) {
    let mut group = c.benchmark_group("batch_buffer");
    group.throughput(Throughput::Elements(1));

    let (buffer, batches) = BatchBuffer::channel(BatchConfig::default()).unwrap();
    let drain = std::thread::spawn(move || for _batch in batches.iter() {});

    group.bench_function("log", |b| {
        b.iter(|| buffer.log(Event::new(LogLevel::Info, black_box("batched"))));
    });

    group.finish();
    drop(buffer);
    let _ = drain.join();
}

// ============================================================================
// Store Benchmarks
// ============================================================================

fn bench_store(c: &mut Criterion) {
    let mut group = c.benchmark_group("log_store");

    let store = LogStore::new(StoreConfig::default()).unwrap();
    let now = Utc::now();
    for i in 0..10_000i64 {
        store.store(
            Event::new(LogLevel::Info, "seed")
                .with_correlation_id(format!("req-{}", i % 100))
                .at(now - ChronoDuration::milliseconds(i)),
        );
    }

    group.throughput(Throughput::Elements(1));
    group.bench_function("store", |b| {
        b.iter(|| store.store(Event::new(LogLevel::Info, "hot").with_correlation_id("req-1")));
    });

    group.bench_function("get_by_correlation", |b| {
        b.iter(|| black_box(store.get_by_correlation(black_box("req-7"))));
    });

    group.bench_function("get_recent_100", |b| {
        b.iter(|| black_box(store.get_recent(100)));
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_event_decoding,
    bench_async_writer,
    bench_batch_buffer,
    bench_store
);
criterion_main!(benches);
