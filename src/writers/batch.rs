//! Time/size triggered batching
//!
//! A [`BatchBuffer`] accumulates events and hands snapshots downstream as
//! `Vec<Event>` batches, either when `batch_size` events are buffered or
//! when the flush timer fires, whichever comes first.
//!
//! Delivery to the output channel waits at most `delivery_timeout`; a batch
//! that cannot be delivered in time is dropped (and counted) instead of
//! stalling producers. Stopping the buffer performs one final flush; a
//! stopped buffer ignores further events.
//!
//! Each buffer is an independent value owned by whoever composes the
//! pipeline, so any number of them can coexist.

use crate::core::{
    error::Result,
    overflow::{report_overflow, OverflowCallback},
    shutdown::WorkerHandle,
    BatchConfig, Event, LogLevel, LogWriter, WriterMetrics,
};
use crossbeam_channel::{bounded, select, tick, Receiver, SendTimeoutError, Sender};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

struct BatchShared {
    name: String,
    batch_size: usize,
    delivery_timeout: Duration,
    min_level: AtomicU8,
    buffer: Mutex<Vec<Event>>,
    // only flipped while holding `buffer`, so no push can land after the final flush
    stopped: AtomicBool,
    output: Sender<Vec<Event>>,
    metrics: WriterMetrics,
    on_overflow: Option<OverflowCallback>,
}

impl BatchShared {
    fn min_level(&self) -> LogLevel {
        LogLevel::from_u8(self.min_level.load(Ordering::Acquire))
    }

    fn take_buffer(&self) -> Vec<Event> {
        let mut buffer = self.buffer.lock();
        std::mem::replace(&mut *buffer, Vec::with_capacity(self.batch_size))
    }

    /// Swap the buffer out under the lock, deliver outside of it
    fn flush(&self) -> usize {
        let batch = self.take_buffer();
        if batch.is_empty() {
            return 0;
        }
        let size = batch.len();

        match self.output.send_timeout(batch, self.delivery_timeout) {
            Ok(()) => {
                self.metrics.record_processed_many(size as u64);
                size
            }
            Err(SendTimeoutError::Timeout(_)) => {
                let previous = self.metrics.record_dropped_many(size as u64);
                tracing::warn!(
                    buffer = %self.name,
                    batch_size = size,
                    timeout_ms = self.delivery_timeout.as_millis() as u64,
                    "output channel busy, batch dropped"
                );
                report_overflow(&self.name, previous, size as u64, self.on_overflow.as_ref());
                0
            }
            Err(SendTimeoutError::Disconnected(_)) => {
                self.metrics.record_dropped_many(size as u64);
                tracing::warn!(buffer = %self.name, batch_size = size, "output channel closed, batch dropped");
                0
            }
        }
    }

    fn run_timer(&self, interval: Duration, shutdown: Receiver<()>) {
        let ticker = tick(interval);
        loop {
            select! {
                recv(ticker) -> _ => {
                    self.flush();
                }
                recv(shutdown) -> _ => break,
            }
        }
        self.flush();
    }
}

/// Batching ingestion stage feeding a downstream channel
///
/// # Example
///
/// ```
/// use log_distributor::prelude::*;
///
/// let (buffer, batches) = BatchBuffer::channel(BatchConfig::default().with_batch_size(2)).unwrap();
/// buffer.log(Event::new(LogLevel::Info, "a"));
/// buffer.log(Event::new(LogLevel::Info, "b"));
///
/// let batch = batches.recv().unwrap();
/// assert_eq!(batch.len(), 2);
/// buffer.stop();
/// ```
pub struct BatchBuffer {
    shared: Arc<BatchShared>,
    worker: Mutex<Option<WorkerHandle>>,
}

impl BatchBuffer {
    /// Start a buffer that delivers batches into `output`
    pub fn new(config: BatchConfig, output: Sender<Vec<Event>>) -> Result<Self> {
        Self::build(config, output, None)
    }

    /// Start a buffer together with a fresh bounded output channel
    pub fn channel(config: BatchConfig) -> Result<(Self, Receiver<Vec<Event>>)> {
        let config = config.normalized();
        let (sender, receiver) = bounded(config.output_capacity);
        Ok((Self::build(config, sender, None)?, receiver))
    }

    /// Like [`BatchBuffer::new`], with a callback for dropped batches
    pub fn with_overflow_callback(
        config: BatchConfig,
        output: Sender<Vec<Event>>,
        callback: OverflowCallback,
    ) -> Result<Self> {
        Self::build(config, output, Some(callback))
    }

    fn build(
        config: BatchConfig,
        output: Sender<Vec<Event>>,
        on_overflow: Option<OverflowCallback>,
    ) -> Result<Self> {
        let config = config.normalized();
        let shared = Arc::new(BatchShared {
            name: config.name.clone(),
            batch_size: config.batch_size,
            delivery_timeout: config.delivery_timeout,
            min_level: AtomicU8::new(config.min_level.as_u8()),
            buffer: Mutex::new(Vec::with_capacity(config.batch_size)),
            stopped: AtomicBool::new(false),
            output,
            metrics: WriterMetrics::new(),
            on_overflow,
        });

        let timer_shared = Arc::clone(&shared);
        let interval = config.flush_interval;
        let worker = WorkerHandle::spawn(format!("batch-{}", config.name), move |shutdown| {
            timer_shared.run_timer(interval, shutdown)
        })?;

        Ok(Self {
            shared,
            worker: Mutex::new(Some(worker)),
        })
    }

    /// Buffer one event, flushing inline once the batch size is reached.
    /// No-op once the buffer is stopped.
    pub fn log(&self, event: Event) {
        if self.shared.stopped.load(Ordering::Acquire) {
            return;
        }
        if !event.level.is_enabled(self.shared.min_level()) {
            self.shared.metrics.record_filtered();
            return;
        }

        let full = {
            let mut buffer = self.shared.buffer.lock();
            if self.shared.stopped.load(Ordering::Acquire) {
                return;
            }
            buffer.push(event);
            buffer.len() >= self.shared.batch_size
        };
        self.shared.metrics.record_accepted();

        if full {
            self.shared.flush();
        }
    }

    /// Decode `payload` and buffer it
    pub fn write(&self, payload: &[u8]) -> Result<usize> {
        let event = Event::from_payload(payload)?;
        self.log(event);
        Ok(payload.len())
    }

    /// Deliver whatever is buffered now. Returns the number of events
    /// delivered (0 if the buffer was empty or the batch was dropped).
    pub fn flush(&self) -> usize {
        self.shared.flush()
    }

    /// Stop the timer thread after a final flush. Idempotent.
    pub fn stop(&self) {
        {
            let _buffer = self.shared.buffer.lock();
            self.shared.stopped.store(true, Ordering::Release);
        }
        let worker = self.worker.lock().take();
        if let Some(worker) = worker {
            worker.stop();
        }
    }

    pub fn is_running(&self) -> bool {
        self.worker.lock().is_some()
    }

    /// Number of events waiting for the next flush
    pub fn buffered(&self) -> usize {
        self.shared.buffer.lock().len()
    }

    pub fn set_min_level(&self, level: LogLevel) {
        self.shared.min_level.store(level.as_u8(), Ordering::Release);
    }

    pub fn with_level(&self, level: LogLevel) -> &Self {
        self.set_min_level(level);
        self
    }

    pub fn min_level(&self) -> LogLevel {
        self.shared.min_level()
    }

    pub fn name(&self) -> &str {
        &self.shared.name
    }

    pub fn metrics(&self) -> &WriterMetrics {
        &self.shared.metrics
    }
}

impl LogWriter for BatchBuffer {
    fn write(&self, payload: &[u8]) -> Result<usize> {
        BatchBuffer::write(self, payload)
    }

    fn set_min_level(&self, level: LogLevel) {
        BatchBuffer::set_min_level(self, level)
    }

    fn min_level(&self) -> LogLevel {
        BatchBuffer::min_level(self)
    }

    fn name(&self) -> &str {
        BatchBuffer::name(self)
    }
}

impl Drop for BatchBuffer {
    fn drop(&mut self) {
        self.stop();
    }
}
