//! One-shot shutdown signalling for background worker threads
//!
//! A worker receives the read side of a zero-capacity channel. Dropping the
//! sender disconnects the channel, which every `recv`/`select!` on it
//! observes immediately. The sender lives in an `Option` behind a mutex so
//! the signal fires at most once no matter how often shutdown is requested.

use super::error::{LoggerError, Result};
use crossbeam_channel::{bounded, Receiver, Sender};
use parking_lot::Mutex;
use std::thread::{self, JoinHandle};

/// Fire-once side of a shutdown signal
#[derive(Debug)]
pub struct ShutdownTrigger {
    sender: Mutex<Option<Sender<()>>>,
}

impl ShutdownTrigger {
    /// Create a trigger and the receiver its worker listens on
    pub fn new() -> (Self, Receiver<()>) {
        let (sender, receiver) = bounded(0);
        (
            Self {
                sender: Mutex::new(Some(sender)),
            },
            receiver,
        )
    }

    /// Fire the signal. Returns `true` only for the call that fired it.
    pub fn fire(&self) -> bool {
        self.sender.lock().take().is_some()
    }

    pub fn is_fired(&self) -> bool {
        self.sender.lock().is_none()
    }
}

/// A named background thread paired with its shutdown trigger
#[derive(Debug)]
pub(crate) struct WorkerHandle {
    name: String,
    trigger: ShutdownTrigger,
    handle: Option<JoinHandle<()>>,
}

impl WorkerHandle {
    /// Spawn `body` on a named thread; it receives the shutdown receiver
    pub(crate) fn spawn<F>(name: impl Into<String>, body: F) -> Result<Self>
    where
        F: FnOnce(Receiver<()>) + Send + 'static,
    {
        let name = name.into();
        let (trigger, shutdown) = ShutdownTrigger::new();
        let handle = thread::Builder::new()
            .name(name.clone())
            .spawn(move || body(shutdown))
            .map_err(|e| LoggerError::io_operation("spawning worker thread", name.clone(), e))?;

        Ok(Self {
            name,
            trigger,
            handle: Some(handle),
        })
    }

    /// Signal the worker and wait for it to exit
    pub(crate) fn stop(mut self) {
        self.shutdown_and_join();
    }

    fn shutdown_and_join(&mut self) {
        self.trigger.fire();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::error!(worker = %self.name, "worker thread panicked");
            }
        }
    }
}

impl Drop for WorkerHandle {
    fn drop(&mut self) {
        self.shutdown_and_join();
    }
}
