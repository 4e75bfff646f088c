use crate::protocol::{MessageKind, StreamError, Topic};
use serde_json::Value;
use std::sync::Arc;

/// A decoded message, or the part of one an event carries.
///
/// Payloads are shared: the `all` event and the forwarded `data` event for the same
/// message point at the same value.
pub type Payload = Arc<Value>;

/// An event emitted by a firehose stream.
#[derive(Debug, Clone)]
pub enum Event {
    /// `all` or a classified kind, with the payload that kind carries
    Message { kind: MessageKind, payload: Payload },
    /// A payload mirrored from a subscribed kind
    Data(Payload),
    Error(Arc<StreamError>),
}

impl Event {
    #[inline]
    pub fn message(kind: MessageKind, payload: Payload) -> Self {
        Event::Message { kind, payload }
    }

    #[inline]
    pub fn error(error: StreamError) -> Self {
        Event::Error(Arc::new(error))
    }

    pub fn topic(&self) -> Topic {
        match self {
            Event::Message { kind, .. } => Topic::Message(*kind),
            Event::Data(_) => Topic::Data,
            Event::Error(_) => Topic::Error,
        }
    }

    /// The event name as subscribers know it, e.g. `tweet`, `data` or `error`
    #[inline]
    pub fn name(&self) -> &'static str {
        self.topic().as_str()
    }

    /// Returns the payload, or None for error events
    pub fn payload(&self) -> Option<&Payload> {
        match self {
            Event::Message { payload, .. } | Event::Data(payload) => Some(payload),
            Event::Error(_) => None,
        }
    }

    #[inline]
    pub fn is_error(&self) -> bool {
        matches!(self, Event::Error(_))
    }

    pub fn as_error(&self) -> Option<&StreamError> {
        match self {
            Event::Error(error) => Some(error.as_ref()),
            _ => None,
        }
    }
}
