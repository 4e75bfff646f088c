//! Message classification and per-message event emission.
//!
//! Each message yields, in order:
//!
//! 1. `all` with the whole message
//! 2. exactly one of the control kinds, checked in [`MessageKind::CONTROL`] order, or
//!    `tweet` when no control field is present
//!
//! and right after each of them a `data` event with the same payload if the
//! [`Subscription`] forwards that kind. Control kinds carry the value of their field,
//! except `event`, which like `tweet` carries the whole message.

use crate::config::Presence;
use crate::protocol::{Event, MessageKind, Payload, Subscription};
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::trace;

#[derive(Debug, Clone, Default)]
pub struct Classifier {
    presence: Presence,
    subscription: Subscription,
}

impl Classifier {
    pub fn new(presence: Presence, subscription: Subscription) -> Self {
        Self { presence, subscription }
    }

    /// Returns the kind of `message`, never [`MessageKind::All`]
    pub fn classify(&self, message: &Value) -> MessageKind {
        MessageKind::CONTROL.into_iter().find(|kind| self.is_present(message, kind.as_str())).unwrap_or(MessageKind::Tweet)
    }

    fn is_present(&self, message: &Value, field: &str) -> bool {
        match (message.get(field), self.presence) {
            (None, _) => false,
            (Some(_), Presence::Exists) => true,
            (Some(value), Presence::Truthy) => is_truthy(value),
        }
    }

    /// Classifies `message` and appends its events to `events`, in emission order
    pub fn dispatch(&self, message: Value, events: &mut VecDeque<Event>) {
        let kind = self.classify(&message);
        trace!(%kind, "classified message");

        let message = Arc::new(message);
        let payload = if kind.carries_whole_message() {
            Arc::clone(&message)
        } else {
            Arc::new(message.get(kind.as_str()).cloned().unwrap_or_default())
        };

        self.emit(MessageKind::All, message, events);
        self.emit(kind, payload, events);
    }

    fn emit(&self, kind: MessageKind, payload: Payload, events: &mut VecDeque<Event>) {
        if self.subscription.forwards(kind) {
            events.push_back(Event::message(kind, Arc::clone(&payload)));
            events.push_back(Event::Data(payload));
        } else {
            events.push_back(Event::message(kind, payload));
        }
    }
}

/// Javascript truthiness: `null`, `false`, zero and `""` are falsy
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f.abs() > 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
