//! Read-side capability consumed by the distributor

use crate::core::Event;
use crate::store::LogStore;
use chrono::{DateTime, Utc};

/// Something that can be polled for events newer than a point in time
pub trait EventSource: Send + Sync {
    /// Events with a timestamp strictly after `since`, timestamp ascending
    fn events_since(&self, since: DateTime<Utc>) -> Vec<Event>;
}

impl EventSource for LogStore {
    fn events_since(&self, since: DateTime<Utc>) -> Vec<Event> {
        self.get_since(since)
    }
}
