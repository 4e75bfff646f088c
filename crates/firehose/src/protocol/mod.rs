//! Core types shared by every stage of the firehose pipeline.
//!
//! - **Kinds** ([`kind`]): [`MessageKind`] classifies a decoded message, [`Topic`] names
//!   the events a subscriber can filter on
//! - **Events** ([`event`]): [`Event`] is the only thing a stream emits, carrying a
//!   shared [`Payload`]
//! - **Subscriptions** ([`subscription`]): [`Subscription`] selects which kinds are
//!   mirrored onto the `data` channel
//! - **Errors** ([`error`]): [`StreamError`] covers every failure a stream can report

mod kind;
pub use kind::MessageKind;
pub use kind::Topic;

mod event;
pub use event::Event;
pub use event::Payload;

mod subscription;
pub use subscription::Subscription;

mod error;
pub use error::BoxError;
pub use error::StreamError;
pub use error::UnknownKind;
