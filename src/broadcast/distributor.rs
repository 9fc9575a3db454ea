//! Poll-based fan-out of new store entries to live subscribers
//!
//! Each tick asks the [`EventSource`] for everything newer than the
//! high-watermark `last_sent`, advances the watermark to the newest
//! timestamp returned, filters by level and pushes the batch to every
//! subscriber concurrently. A subscriber whose send fails is removed; it is
//! never retried. Ingestion never waits on subscribers: the distributor
//! only reads from the source.

use super::source::EventSource;
use super::subscriber::{ClientId, Subscriber};
use crate::core::{
    error::{LoggerError, Result},
    processor::guard_panic,
    shutdown::WorkerHandle,
    BroadcastConfig, LogLevel,
};
use chrono::{DateTime, Utc};
use crossbeam_channel::{select, tick, Receiver};
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::thread::{self, ScopedJoinHandle};
use std::time::Duration;

/// Outcome of one poll tick
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PollReport {
    /// Events that passed the level filter
    pub events: usize,
    /// Subscribers that received the whole batch
    pub delivered_to: usize,
    /// Subscribers removed because a send failed
    pub removed: Vec<ClientId>,
}

enum Delivery<'scope> {
    Running(ScopedJoinHandle<'scope, Result<()>>),
    Finished(Result<()>),
}

fn deliver(subscriber: &dyn Subscriber, payloads: &[Value]) -> Result<()> {
    for payload in payloads {
        subscriber.send_json(payload)?;
    }
    Ok(())
}

struct DistributorInner {
    source: Arc<dyn EventSource>,
    clients: RwLock<HashMap<ClientId, Arc<dyn Subscriber>>>,
    next_client: AtomicU64,
    min_level: AtomicU8,
    last_sent: Mutex<DateTime<Utc>>,
    delivered: AtomicU64,
    evicted_clients: AtomicU64,
}

impl DistributorInner {
    fn min_level(&self) -> LogLevel {
        LogLevel::from_u8(self.min_level.load(Ordering::Acquire))
    }

    fn remove_client(&self, id: ClientId) -> bool {
        let removed = self.clients.write().remove(&id);
        match removed {
            Some(subscriber) => {
                if let Err(e) = subscriber.close() {
                    tracing::debug!(client = %id, error = %e, "closing subscriber failed");
                }
                true
            }
            None => false,
        }
    }

    fn poll_once(&self) -> PollReport {
        // held for the whole tick so two ticks never deliver the same window
        let mut last_sent = self.last_sent.lock();
        let events = self.source.events_since(*last_sent);
        if let Some(newest) = events.iter().map(|event| event.timestamp).max() {
            *last_sent = (*last_sent).max(newest);
        }

        let min_level = self.min_level();
        let payloads: Vec<Value> = events
            .iter()
            .filter(|event| event.level.is_enabled(min_level))
            .filter_map(|event| match event.to_json_value() {
                Ok(value) => Some(value),
                Err(e) => {
                    tracing::warn!(index = event.index, error = %e, "skipping unencodable event");
                    None
                }
            })
            .collect();

        let mut report = PollReport {
            events: payloads.len(),
            ..PollReport::default()
        };

        let clients: Vec<(ClientId, Arc<dyn Subscriber>)> = self
            .clients
            .read()
            .iter()
            .map(|(id, subscriber)| (*id, Arc::clone(subscriber)))
            .collect();
        if payloads.is_empty() || clients.is_empty() {
            return report;
        }

        let outcomes = self.deliver_concurrently(&clients, &payloads);
        for (id, outcome) in outcomes {
            match outcome {
                Ok(()) => report.delivered_to += 1,
                Err(e) => {
                    tracing::warn!(client = %id, error = %e, "subscriber send failed, removing client");
                    if self.remove_client(id) {
                        self.evicted_clients.fetch_add(1, Ordering::Relaxed);
                    }
                    report.removed.push(id);
                }
            }
        }
        self.delivered
            .fetch_add((report.delivered_to * report.events) as u64, Ordering::Relaxed);
        report
    }

    /// One short-lived thread per subscriber, all joined before returning
    fn deliver_concurrently(
        &self,
        clients: &[(ClientId, Arc<dyn Subscriber>)],
        payloads: &[Value],
    ) -> Vec<(ClientId, Result<()>)> {
        thread::scope(|scope| {
            let pending: Vec<(ClientId, Delivery<'_>)> = clients
                .iter()
                .map(|(id, subscriber)| {
                    let send_all =
                        move || guard_panic("subscriber", || deliver(subscriber.as_ref(), payloads));
                    let spawned = thread::Builder::new()
                        .name(format!("broadcast-{}", id))
                        .spawn_scoped(scope, send_all);
                    match spawned {
                        Ok(handle) => (*id, Delivery::Running(handle)),
                        Err(e) => {
                            tracing::debug!(client = %id, error = %e, "delivering inline");
                            (*id, Delivery::Finished(send_all()))
                        }
                    }
                })
                .collect();

            pending
                .into_iter()
                .map(|(id, delivery)| {
                    let outcome = match delivery {
                        Delivery::Running(handle) => handle.join().unwrap_or_else(|_| {
                            Err(LoggerError::other("delivery thread panicked"))
                        }),
                        Delivery::Finished(outcome) => outcome,
                    };
                    (id, outcome)
                })
                .collect()
        })
    }

    fn run(&self, interval: Duration, shutdown: Receiver<()>) {
        let ticker = tick(interval);
        loop {
            select! {
                recv(ticker) -> _ => {
                    self.poll_once();
                }
                recv(shutdown) -> _ => break,
            }
        }
    }
}

/// Pushes new events from an [`EventSource`] to live subscribers
///
/// # Example
///
/// ```
/// use log_distributor::prelude::*;
/// use log_distributor::broadcast::ChannelSubscriber;
/// use std::sync::Arc;
///
/// let store = Arc::new(LogStore::new(StoreConfig::default()).unwrap());
/// let distributor = BroadcastDistributor::new(BroadcastConfig::default(), store.clone());
///
/// let (subscriber, events) = ChannelSubscriber::new(16);
/// distributor.add_client(Arc::new(subscriber));
///
/// store.store(Event::new(LogLevel::Warn, "disk almost full"));
/// distributor.poll_once();
///
/// assert_eq!(events.try_recv().unwrap()["message"], "disk almost full");
/// ```
pub struct BroadcastDistributor {
    inner: Arc<DistributorInner>,
    poll_interval: Duration,
    worker: Mutex<Option<WorkerHandle>>,
}

impl BroadcastDistributor {
    /// Create a distributor that is not polling yet. The high-watermark
    /// starts at the current time.
    pub fn new(config: BroadcastConfig, source: Arc<dyn EventSource>) -> Self {
        let config = config.normalized();
        Self {
            inner: Arc::new(DistributorInner {
                source,
                clients: RwLock::new(HashMap::new()),
                next_client: AtomicU64::new(1),
                min_level: AtomicU8::new(config.min_level.as_u8()),
                last_sent: Mutex::new(Utc::now()),
                delivered: AtomicU64::new(0),
                evicted_clients: AtomicU64::new(0),
            }),
            poll_interval: config.poll_interval,
            worker: Mutex::new(None),
        }
    }

    /// Create and start polling in one step
    pub fn spawn(config: BroadcastConfig, source: Arc<dyn EventSource>) -> Result<Self> {
        let distributor = Self::new(config, source);
        distributor.start()?;
        Ok(distributor)
    }

    /// Deliver events newer than `since` instead of newer than construction
    #[must_use]
    pub fn starting_from(self, since: DateTime<Utc>) -> Self {
        *self.inner.last_sent.lock() = since;
        self
    }

    /// Start the poll thread.
    ///
    /// # Errors
    ///
    /// `AlreadyRunning` if the poll thread is running.
    pub fn start(&self) -> Result<()> {
        let mut worker = self.worker.lock();
        if worker.is_some() {
            return Err(LoggerError::already_running("BroadcastDistributor"));
        }

        let inner = Arc::clone(&self.inner);
        let interval = self.poll_interval;
        *worker = Some(WorkerHandle::spawn("broadcast-poll", move |shutdown| {
            inner.run(interval, shutdown)
        })?);
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.worker.lock().is_some()
    }

    /// Run one poll tick synchronously
    pub fn poll_once(&self) -> PollReport {
        self.inner.poll_once()
    }

    /// Register a subscriber; safe to call while polling
    pub fn add_client(&self, subscriber: Arc<dyn Subscriber>) -> ClientId {
        let id = ClientId(self.inner.next_client.fetch_add(1, Ordering::Relaxed));
        self.inner.clients.write().insert(id, subscriber);
        tracing::debug!(client = %id, "subscriber added");
        id
    }

    /// Remove and close a subscriber. Returns whether it was registered.
    pub fn remove_client(&self, id: ClientId) -> bool {
        self.inner.remove_client(id)
    }

    pub fn client_count(&self) -> usize {
        self.inner.clients.read().len()
    }

    pub fn set_min_level(&self, level: LogLevel) {
        self.inner.min_level.store(level.as_u8(), Ordering::Release);
    }

    pub fn with_level(&self, level: LogLevel) -> &Self {
        self.set_min_level(level);
        self
    }

    pub fn min_level(&self) -> LogLevel {
        self.inner.min_level()
    }

    /// Current high-watermark
    pub fn last_sent(&self) -> DateTime<Utc> {
        *self.inner.last_sent.lock()
    }

    /// Event deliveries that succeeded, counted per subscriber
    pub fn delivered(&self) -> u64 {
        self.inner.delivered.load(Ordering::Relaxed)
    }

    /// Subscribers removed after a failed send
    pub fn evicted_clients(&self) -> u64 {
        self.inner.evicted_clients.load(Ordering::Relaxed)
    }

    /// Stop polling and disconnect every subscriber. Idempotent.
    pub fn close(&self) -> Result<()> {
        let worker = self.worker.lock().take();
        if let Some(worker) = worker {
            worker.stop();
        }

        let clients: Vec<(ClientId, Arc<dyn Subscriber>)> =
            self.inner.clients.write().drain().collect();
        for (id, subscriber) in clients {
            if let Err(e) = subscriber.close() {
                tracing::debug!(client = %id, error = %e, "closing subscriber failed");
            }
        }
        Ok(())
    }
}

impl Drop for BroadcastDistributor {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broadcast::ChannelSubscriber;
    use crate::core::Event;
    use chrono::Duration as ChronoDuration;

    /// Source returning a fixed set of events, filtered like a store
    struct FixedSource(Vec<Event>);

    impl EventSource for FixedSource {
        fn events_since(&self, since: DateTime<Utc>) -> Vec<Event> {
            self.0
                .iter()
                .filter(|event| event.timestamp > since)
                .cloned()
                .collect()
        }
    }

    struct FailingSubscriber;

    impl Subscriber for FailingSubscriber {
        fn send_json(&self, _payload: &Value) -> Result<()> {
            Err(LoggerError::other("connection reset"))
        }

        fn close(&self) -> Result<()> {
            Ok(())
        }
    }

    fn events_at(base: DateTime<Utc>, levels: &[LogLevel]) -> Vec<Event> {
        levels
            .iter()
            .enumerate()
            .map(|(i, level)| {
                Event::new(*level, format!("e{}", i)).at(base + ChronoDuration::seconds(i as i64))
            })
            .collect()
    }

    #[test]
    fn test_watermark_advances_without_clients() {
        let base = Utc::now() - ChronoDuration::minutes(1);
        let source = Arc::new(FixedSource(events_at(base, &[LogLevel::Info; 3])));
        let distributor = BroadcastDistributor::new(BroadcastConfig::default(), source)
            .starting_from(base - ChronoDuration::seconds(1));

        let report = distributor.poll_once();
        assert_eq!(report.events, 3);
        assert_eq!(report.delivered_to, 0);
        assert_eq!(distributor.last_sent(), base + ChronoDuration::seconds(2));

        // nothing newer than the watermark: a later subscriber gets no backlog
        let (subscriber, received) = ChannelSubscriber::new(8);
        distributor.add_client(Arc::new(subscriber));
        assert_eq!(distributor.poll_once().events, 0);
        assert!(received.try_recv().is_err());
    }

    #[test]
    fn test_failing_subscriber_is_removed() {
        let base = Utc::now() - ChronoDuration::minutes(1);
        let source = Arc::new(FixedSource(events_at(base, &[LogLevel::Info; 3])));
        let distributor = BroadcastDistributor::new(BroadcastConfig::default(), source)
            .starting_from(base - ChronoDuration::seconds(1));

        let (good, received) = ChannelSubscriber::new(8);
        distributor.add_client(Arc::new(good));
        let bad = distributor.add_client(Arc::new(FailingSubscriber));

        let report = distributor.poll_once();
        assert_eq!(report.removed, vec![bad]);
        assert_eq!(report.delivered_to, 1);
        assert_eq!(distributor.client_count(), 1);
        assert_eq!(received.try_iter().count(), 3);
        assert_eq!(distributor.evicted_clients(), 1);
    }

    #[test]
    fn test_level_filter() {
        let base = Utc::now() - ChronoDuration::minutes(1);
        let source = Arc::new(FixedSource(events_at(
            base,
            &[LogLevel::Debug, LogLevel::Error, LogLevel::Info],
        )));
        let distributor = BroadcastDistributor::new(
            BroadcastConfig::default().with_min_level(LogLevel::Warn),
            source,
        )
        .starting_from(base - ChronoDuration::seconds(1));
        let (subscriber, received) = ChannelSubscriber::new(8);
        distributor.add_client(Arc::new(subscriber));

        distributor.poll_once();
        let messages: Vec<Value> = received.try_iter().map(|v| v["message"].clone()).collect();
        assert_eq!(messages, vec![Value::from("e1")]);
        // filtered events still advance the watermark
        assert_eq!(distributor.last_sent(), base + ChronoDuration::seconds(2));
    }

    #[test]
    fn test_start_twice_and_close() {
        let source = Arc::new(FixedSource(Vec::new()));
        let distributor = BroadcastDistributor::spawn(
            BroadcastConfig::default().with_poll_interval(Duration::from_millis(10)),
            source,
        )
        .unwrap();
        assert!(matches!(
            distributor.start(),
            Err(LoggerError::AlreadyRunning { .. })
        ));

        let (subscriber, received) = ChannelSubscriber::new(1);
        distributor.add_client(Arc::new(subscriber));
        distributor.close().unwrap();
        distributor.close().unwrap();

        assert!(!distributor.is_running());
        assert_eq!(distributor.client_count(), 0);
        assert!(received.recv().is_err());
    }

    #[test]
    fn test_remove_client() {
        let distributor =
            BroadcastDistributor::new(BroadcastConfig::default(), Arc::new(FixedSource(Vec::new())));
        let (subscriber, received) = ChannelSubscriber::new(1);
        let id = distributor.add_client(Arc::new(subscriber));

        assert!(distributor.remove_client(id));
        assert!(!distributor.remove_client(id));
        assert!(received.recv().is_err());
    }
}
