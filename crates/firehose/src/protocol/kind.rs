use crate::protocol::UnknownKind;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The classification tag of a decoded message.
///
/// [`MessageKind::All`] is synthetic: it is emitted for every message, before the
/// message's own kind. Every other variant is the result of classification, where
/// [`MessageKind::Tweet`] is the fallback for messages that carry no control field.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    All,
    Delete,
    Limit,
    ScrubGeo,
    StatusWithheld,
    UserWithheld,
    Friends,
    Event,
    Tweet,
}

impl MessageKind {
    /// Control message kinds, in the priority order classification checks them.
    ///
    /// Each kind is recognized by a top-level field with the same name as the kind.
    pub const CONTROL: [MessageKind; 7] = [
        MessageKind::Delete,
        MessageKind::Limit,
        MessageKind::ScrubGeo,
        MessageKind::StatusWithheld,
        MessageKind::UserWithheld,
        MessageKind::Friends,
        MessageKind::Event,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::All => "all",
            MessageKind::Delete => "delete",
            MessageKind::Limit => "limit",
            MessageKind::ScrubGeo => "scrub_geo",
            MessageKind::StatusWithheld => "status_withheld",
            MessageKind::UserWithheld => "user_withheld",
            MessageKind::Friends => "friends",
            MessageKind::Event => "event",
            MessageKind::Tweet => "tweet",
        }
    }

    /// Returns true if events of this kind carry the whole message rather than a field of it
    #[inline]
    pub fn carries_whole_message(&self) -> bool {
        matches!(self, MessageKind::All | MessageKind::Event | MessageKind::Tweet)
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessageKind {
    type Err = UnknownKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let kind = match s {
            "all" => MessageKind::All,
            "delete" => MessageKind::Delete,
            "limit" => MessageKind::Limit,
            "scrub_geo" => MessageKind::ScrubGeo,
            "status_withheld" => MessageKind::StatusWithheld,
            "user_withheld" => MessageKind::UserWithheld,
            "friends" => MessageKind::Friends,
            "event" => MessageKind::Event,
            "tweet" => MessageKind::Tweet,
            _ => return Err(UnknownKind::new(s)),
        };
        Ok(kind)
    }
}

/// The name a subscriber filters events on.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Topic {
    /// `all` or one of the classified message kinds
    Message(MessageKind),
    /// forwarded payloads of subscribed kinds
    Data,
    Error,
}

impl Topic {
    pub fn as_str(&self) -> &'static str {
        match self {
            Topic::Message(kind) => kind.as_str(),
            Topic::Data => "data",
            Topic::Error => "error",
        }
    }
}

impl From<MessageKind> for Topic {
    fn from(kind: MessageKind) -> Self {
        Topic::Message(kind)
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Topic {
    type Err = UnknownKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "data" => Ok(Topic::Data),
            "error" => Ok(Topic::Error),
            other => other.parse().map(Topic::Message),
        }
    }
}
