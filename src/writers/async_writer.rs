//! Bounded asynchronous writer
//!
//! An [`AsyncWriter`] decouples any number of producer threads from a
//! potentially slow [`Processor`] through one bounded queue and one consumer
//! thread.
//!
//! ```text
//! write(payload) ──parse──► level filter ──try_send──► [bounded queue] ──► consumer ──► processor
//!                                │                         │ full
//!                                └─ discarded              └─ dropped + overflow alert
//! ```
//!
//! Producers never block and never fail for lifecycle reasons: a stopped
//! writer, a filtered level and a full queue all report success. Only a
//! malformed payload is an error.
//!
//! Lifecycle is `Stopped → Running → Stopped`. `stop()` is idempotent; the
//! consumer processes every entry still queued before it exits, so nothing
//! accepted before `stop()` is lost to shutdown timing. Concurrent `stop()`
//! calls all return only after that drain has finished.

use crate::core::{
    error::{LoggerError, Result},
    overflow::{report_overflow, OverflowCallback},
    processor::guard_panic,
    shutdown::WorkerHandle,
    Event, LogLevel, LogWriter, Processor, WriterConfig, WriterMetrics,
};
use crossbeam_channel::{bounded, select, Receiver, Sender, TrySendError};
use parking_lot::{Mutex, RwLock};
use std::io;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

/// State shared between the producer-facing handle and the consumer thread
struct WriterShared {
    name: String,
    min_level: AtomicU8,
    processor: Arc<dyn Processor>,
    metrics: WriterMetrics,
}

impl WriterShared {
    fn min_level(&self) -> LogLevel {
        LogLevel::from_u8(self.min_level.load(Ordering::Acquire))
    }

    /// Run the processor for one dequeued event
    fn handle(&self, event: &Event) {
        // the level may have been raised while the event sat in the queue
        if !event.level.is_enabled(self.min_level()) {
            self.metrics.record_filtered();
            return;
        }

        match guard_panic(self.processor.name(), || self.processor.process(event)) {
            Ok(()) => {
                self.metrics.record_processed();
            }
            Err(e) => {
                self.metrics.record_processor_failure();
                tracing::warn!(writer = %self.name, error = %e, "processor failed, continuing");
            }
        }
    }

    fn flush(&self) {
        if let Err(e) = guard_panic(self.processor.name(), || self.processor.flush()) {
            tracing::warn!(writer = %self.name, error = %e, "processor flush failed");
        }
    }

    fn run_consumer(&self, events: Receiver<Event>, shutdown: Receiver<()>) {
        loop {
            select! {
                recv(events) -> msg => match msg {
                    Ok(event) => {
                        self.handle(&event);
                        if events.is_empty() {
                            self.flush();
                        }
                    }
                    Err(_) => break,
                },
                recv(shutdown) -> _ => {
                    let mut drained = 0usize;
                    for event in events.try_iter() {
                        self.handle(&event);
                        drained += 1;
                    }
                    tracing::debug!(writer = %self.name, drained, "consumer drained queue on shutdown");
                    break;
                }
            }
        }
        self.flush();
    }
}

enum WriterState {
    Stopped,
    Running {
        sender: Sender<Event>,
        worker: WorkerHandle,
    },
}

/// Fire-and-forget writer with a bounded queue and one consumer thread
///
/// # Example
///
/// ```
/// use log_distributor::prelude::*;
/// use std::sync::Arc;
///
/// let store = Arc::new(LogStore::new(StoreConfig::default()).unwrap());
/// let writer = AsyncWriter::new(WriterConfig::new("memory"), store.clone());
/// writer.start().unwrap();
///
/// writer
///     .write(br#"{"level":"warn","correlation_id":"req-1","message":"slow"}"#)
///     .unwrap();
/// writer.stop().unwrap();
///
/// assert_eq!(store.get_by_correlation("req-1").len(), 1);
/// ```
pub struct AsyncWriter {
    shared: Arc<WriterShared>,
    capacity: usize,
    on_overflow: Option<OverflowCallback>,
    state: RwLock<WriterState>,
    // held for the whole of a stop, so concurrent stops wait for the drain
    stopping: Mutex<()>,
}

impl AsyncWriter {
    /// Create a stopped writer; call [`AsyncWriter::start`] to begin consuming
    pub fn new(config: WriterConfig, processor: Arc<dyn Processor>) -> Self {
        let config = config.normalized();
        Self {
            shared: Arc::new(WriterShared {
                name: config.name,
                min_level: AtomicU8::new(config.min_level.as_u8()),
                processor,
                metrics: WriterMetrics::new(),
            }),
            capacity: config.queue_capacity,
            on_overflow: None,
            state: RwLock::new(WriterState::Stopped),
            stopping: Mutex::new(()),
        }
    }

    /// Create and start a writer in one step
    pub fn spawn(config: WriterConfig, processor: Arc<dyn Processor>) -> Result<Self> {
        let writer = Self::new(config, processor);
        writer.start()?;
        Ok(writer)
    }

    /// Set a callback for overflow notifications
    ///
    /// The callback receives the total number of dropped events. It fires on
    /// the first drop and on every 1000th drop after that.
    #[must_use]
    pub fn with_overflow_callback(mut self, callback: OverflowCallback) -> Self {
        self.on_overflow = Some(callback);
        self
    }

    /// Start the consumer thread.
    ///
    /// # Errors
    ///
    /// `AlreadyRunning` if the writer is running, or an IO error if the
    /// thread cannot be spawned.
    pub fn start(&self) -> Result<()> {
        let mut state = self.state.write();
        if matches!(*state, WriterState::Running { .. }) {
            return Err(LoggerError::already_running(format!(
                "AsyncWriter '{}'",
                self.shared.name
            )));
        }

        let (sender, receiver) = bounded(self.capacity);
        let shared = Arc::clone(&self.shared);
        let worker = WorkerHandle::spawn(format!("writer-{}", self.shared.name), move |shutdown| {
            shared.run_consumer(receiver, shutdown)
        })?;

        *state = WriterState::Running { sender, worker };
        tracing::debug!(writer = %self.shared.name, capacity = self.capacity, "writer started");
        Ok(())
    }

    /// Stop the consumer after it has processed everything still queued.
    ///
    /// Idempotent: stopping a stopped writer is a no-op. A call that races
    /// with another `stop()` waits until the first one has drained.
    pub fn stop(&self) -> Result<()> {
        let _stopping = self.stopping.lock();
        let previous = std::mem::replace(&mut *self.state.write(), WriterState::Stopped);
        if let WriterState::Running { sender, worker } = previous {
            // no producer can hold a sender past this point
            drop(sender);
            worker.stop();
            tracing::debug!(writer = %self.shared.name, "writer stopped");
        }
        Ok(())
    }

    /// Alias of [`AsyncWriter::stop`]
    pub fn close(&self) -> Result<()> {
        self.stop()
    }

    pub fn is_running(&self) -> bool {
        matches!(*self.state.read(), WriterState::Running { .. })
    }

    /// Decode `payload` and queue it.
    ///
    /// # Errors
    ///
    /// Only [`LoggerError::Parse`] for a malformed payload. Every other drop
    /// condition reports the full byte count.
    pub fn write(&self, payload: &[u8]) -> Result<usize> {
        let event = Event::from_payload(payload)?;
        self.log(event);
        Ok(payload.len())
    }

    /// Queue an already decoded event. Returns whether it was queued.
    pub fn log(&self, event: Event) -> bool {
        if !event.level.is_enabled(self.shared.min_level()) {
            self.shared.metrics.record_filtered();
            return false;
        }

        let state = self.state.read();
        let WriterState::Running { sender, .. } = &*state else {
            return false;
        };

        match sender.try_send(event) {
            Ok(()) => {
                self.shared.metrics.record_accepted();
                true
            }
            Err(TrySendError::Full(_)) => {
                let previous = self.shared.metrics.record_dropped();
                report_overflow(&self.shared.name, previous, 1, self.on_overflow.as_ref());
                false
            }
            Err(TrySendError::Disconnected(_)) => false,
        }
    }

    /// Replace the minimum level; takes effect for the next write and for
    /// events already waiting in the queue.
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

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of events currently waiting in the queue
    pub fn queued(&self) -> usize {
        match &*self.state.read() {
            WriterState::Running { sender, .. } => sender.len(),
            WriterState::Stopped => 0,
        }
    }

    pub fn metrics(&self) -> &WriterMetrics {
        &self.shared.metrics
    }
}

impl LogWriter for AsyncWriter {
    fn write(&self, payload: &[u8]) -> Result<usize> {
        AsyncWriter::write(self, payload)
    }

    fn set_min_level(&self, level: LogLevel) {
        AsyncWriter::set_min_level(self, level)
    }

    fn min_level(&self) -> LogLevel {
        AsyncWriter::min_level(self)
    }

    fn name(&self) -> &str {
        AsyncWriter::name(self)
    }
}

/// Byte-sink adapter, so a writer can back anything that takes `io::Write`
impl io::Write for &AsyncWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        AsyncWriter::write(*self, buf).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for AsyncWriter {
    fn drop(&mut self) {
        let _ = self.stop();

        let dropped = self.shared.metrics.dropped_count();
        if dropped > 0 {
            tracing::warn!(
                writer = %self.shared.name,
                dropped,
                drop_rate = self.shared.metrics.drop_rate(),
                "writer shut down with dropped events"
            );
        }
    }
}
