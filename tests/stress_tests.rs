//! Stress tests for bounded queues and concurrent store access
//!
//! These tests verify:
//! - Overflow drops instead of blocking, and the processed count stays
//!   within queue capacity plus the in-flight event
//! - Many producers on one writer lose nothing when capacity suffices
//! - Store indices stay unique and strictly increasing under contention
//! - Subscribers can join and leave while the distributor is polling

use chrono::Utc;
use crossbeam_channel::bounded;
use log_distributor::broadcast::ChannelSubscriber;
use log_distributor::prelude::*;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Overflow bound: a slow consumer never processes more than capacity + 1
#[test]
fn test_slow_processor_overflow_bound() {
    const CAPACITY: usize = 8;
    const N: usize = 200;

    let (release, gate) = bounded::<()>(0);
    let processed = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&processed);
    let processor: Arc<dyn Processor> = Arc::new(move |_event: &Event| -> Result<()> {
        let _ = gate.recv_timeout(Duration::from_secs(10));
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });

    let alerts = Arc::new(AtomicU64::new(0));
    let alert_counter = Arc::clone(&alerts);
    let writer = AsyncWriter::new(
        WriterConfig::new("slow").with_queue_capacity(CAPACITY),
        processor,
    )
    .with_overflow_callback(Arc::new(move |_total| {
        alert_counter.fetch_add(1, Ordering::SeqCst);
    }));
    writer.start().unwrap();

    let started = Instant::now();
    for i in 0..N {
        writer
            .write(format!(r#"{{"message":"m{}"}}"#, i).as_bytes())
            .unwrap();
    }
    // producers were never blocked by the stalled consumer
    assert!(started.elapsed() < Duration::from_secs(5));

    drop(release);
    writer.stop().unwrap();

    let processed = processed.load(Ordering::SeqCst);
    assert!(processed <= CAPACITY + 1, "processed {}", processed);
    assert!(processed < N);
    assert_eq!(processed as u64 + writer.metrics().dropped_count(), N as u64);
    assert_eq!(alerts.load(Ordering::SeqCst), 1);
}

#[test]
fn test_concurrent_producers_lose_nothing_with_enough_capacity() {
    const THREADS: usize = 8;
    const PER_THREAD: usize = 250;

    let store = Arc::new(LogStore::new(StoreConfig::default()).unwrap());
    let writer = Arc::new(
        AsyncWriter::spawn(
            WriterConfig::new("memory").with_queue_capacity(THREADS * PER_THREAD),
            store.clone(),
        )
        .unwrap(),
    );

    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let writer = Arc::clone(&writer);
            thread::spawn(move || {
                for i in 0..PER_THREAD {
                    let payload = format!(
                        r#"{{"level":"info","correlation_id":"t{}","message":"{}"}}"#,
                        t, i
                    );
                    writer.write(payload.as_bytes()).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
    writer.stop().unwrap();

    assert_eq!(store.len(), THREADS * PER_THREAD);
    assert_eq!(store.get_correlation_ids().len(), THREADS);
    for t in 0..THREADS {
        assert_eq!(store.get_by_correlation(&format!("t{}", t)).len(), PER_THREAD);
    }
}

#[test]
fn test_indices_unique_under_contention() {
    const THREADS: usize = 8;
    const PER_THREAD: usize = 500;

    let store = Arc::new(LogStore::new(StoreConfig::default()).unwrap());
    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                let mut last = 0;
                let mut indices = Vec::with_capacity(PER_THREAD);
                for i in 0..PER_THREAD {
                    let index = store.store(
                        Event::new(LogLevel::Info, format!("{}-{}", t, i))
                            .with_correlation_id(format!("c{}", i % 4)),
                    );
                    assert!(index > last, "indices must increase per caller");
                    last = index;
                    indices.push(index);
                }
                indices
            })
        })
        .collect();

    let mut all = HashSet::new();
    for handle in handles {
        for index in handle.join().unwrap() {
            assert!(all.insert(index), "index {} assigned twice", index);
        }
    }
    assert_eq!(all.len(), THREADS * PER_THREAD);
}

#[test]
fn test_subscribers_churn_while_polling() {
    let store = Arc::new(LogStore::new(StoreConfig::default()).unwrap());
    let distributor = Arc::new(
        BroadcastDistributor::spawn(
            BroadcastConfig::default().with_poll_interval(Duration::from_millis(1)),
            store.clone(),
        )
        .unwrap(),
    );

    let producer = {
        let store = Arc::clone(&store);
        thread::spawn(move || {
            for i in 0..500 {
                store.store(Event::new(LogLevel::Info, format!("p{}", i)).at(Utc::now()));
            }
        })
    };

    let churn = {
        let distributor = Arc::clone(&distributor);
        thread::spawn(move || {
            for _ in 0..200 {
                let (subscriber, _received) = ChannelSubscriber::new(4);
                let id = distributor.add_client(Arc::new(subscriber));
                distributor.remove_client(id);
            }
        })
    };

    producer.join().unwrap();
    churn.join().unwrap();
    distributor.close().unwrap();
    assert_eq!(distributor.client_count(), 0);
}

#[test]
fn test_batch_buffer_under_concurrent_load() {
    const THREADS: usize = 4;
    const PER_THREAD: usize = 1000;

    let (buffer, batches) = BatchBuffer::channel(
        BatchConfig::default()
            .with_batch_size(50)
            .with_output_capacity(THREADS * PER_THREAD)
            .with_flush_interval(Duration::from_millis(5)),
    )
    .unwrap();
    let buffer = Arc::new(buffer);

    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let buffer = Arc::clone(&buffer);
            thread::spawn(move || {
                for i in 0..PER_THREAD {
                    buffer.log(Event::new(LogLevel::Info, format!("{}-{}", t, i)));
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
    buffer.stop();

    let total: usize = batches.try_iter().map(|batch| batch.len()).sum();
    assert_eq!(total, THREADS * PER_THREAD);
    assert_eq!(buffer.metrics().dropped_count(), 0);
}
