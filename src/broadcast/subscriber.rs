//! Live subscribers of a [`BroadcastDistributor`](super::BroadcastDistributor)

use crate::core::error::{LoggerError, Result};
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use parking_lot::Mutex;
use serde_json::Value;
use std::fmt;

/// Handle returned by `add_client`, used to remove that client again
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClientId(pub(crate) u64);

impl ClientId {
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "client-{}", self.0)
    }
}

/// A live connection events are pushed to.
///
/// `send_json` is called from a short-lived delivery thread. An error is
/// final: the distributor removes the subscriber and calls `close`.
pub trait Subscriber: Send + Sync {
    fn send_json(&self, payload: &Value) -> Result<()>;

    fn close(&self) -> Result<()>;
}

/// In-process subscriber backed by a bounded channel
///
/// Sending never blocks: a full channel counts as a failed send, as does a
/// dropped receiver.
///
/// ```
/// use log_distributor::broadcast::{ChannelSubscriber, Subscriber};
/// use serde_json::json;
///
/// let (subscriber, events) = ChannelSubscriber::new(8);
/// subscriber.send_json(&json!({"message": "hello"})).unwrap();
/// assert_eq!(events.recv().unwrap()["message"], "hello");
/// ```
pub struct ChannelSubscriber {
    sender: Mutex<Option<Sender<Value>>>,
}

impl ChannelSubscriber {
    pub fn new(capacity: usize) -> (Self, Receiver<Value>) {
        let (sender, receiver) = bounded(capacity.max(1));
        (
            Self {
                sender: Mutex::new(Some(sender)),
            },
            receiver,
        )
    }

    pub fn is_closed(&self) -> bool {
        self.sender.lock().is_none()
    }
}

impl Subscriber for ChannelSubscriber {
    fn send_json(&self, payload: &Value) -> Result<()> {
        let sender = self.sender.lock();
        let Some(sender) = sender.as_ref() else {
            return Err(LoggerError::other("subscriber is closed"));
        };
        sender.try_send(payload.clone()).map_err(|e| match e {
            TrySendError::Full(_) => LoggerError::other("subscriber channel is full"),
            TrySendError::Disconnected(_) => LoggerError::other("subscriber disconnected"),
        })
    }

    fn close(&self) -> Result<()> {
        self.sender.lock().take();
        Ok(())
    }
}
