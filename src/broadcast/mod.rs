//! Live fan-out of stored events
//!
//! The read side of the pipeline: a [`BroadcastDistributor`] polls an
//! [`EventSource`] (normally a [`LogStore`](crate::store::LogStore)) and
//! pushes what is new to [`Subscriber`]s.

pub mod distributor;
pub mod source;
pub mod subscriber;

pub use distributor::{BroadcastDistributor, PollReport};
pub use source::EventSource;
pub use subscriber::{ChannelSubscriber, ClientId, Subscriber};
