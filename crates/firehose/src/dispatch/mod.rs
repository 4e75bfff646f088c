//! Turning decoded messages into events, and events into subscriber channels.
//!
//! - [`Classifier`]: decides the kind of each message and emits its events
//! - [`Dispatcher`]: drives a [`FirehoseStream`](crate::pipeline::FirehoseStream) and
//!   fans its events out to topic subscribers

mod classifier;
mod hub;

pub use classifier::Classifier;
pub use hub::{Dispatcher, EventReceiver};
