//! Per-stream configuration.
//!
//! A [`StreamConfig`] is built with [`StreamConfig::builder`] or deserialized from json.
//! Fields missing from the json keep their defaults:
//!
//! ```
//! use micro_firehose::config::{Presence, StreamConfig};
//! use micro_firehose::protocol::MessageKind;
//!
//! let config = StreamConfig::from_json(r#"{"subscription": ["tweet", "limit"]}"#).unwrap();
//!
//! assert!(config.compression());
//! assert_eq!(config.presence(), Presence::Exists);
//! assert!(config.subscription().forwards(MessageKind::Limit));
//! ```

use crate::protocol::Subscription;
use serde::Deserialize;

/// How classification decides a control field is present on a message.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Presence {
    /// The key exists, whatever its value: `{"limit": 0}` is a `limit`
    #[default]
    Exists,
    /// The value is truthy: `null`, `false`, `0` and `""` count as absent, so
    /// `{"limit": 0}` falls through to the next check. Objects and arrays, empty or not,
    /// are truthy.
    Truthy,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    compression: bool,
    subscription: Subscription,
    presence: Presence,
    max_record_len: Option<usize>,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self { compression: true, subscription: Subscription::default(), presence: Presence::default(), max_record_len: None }
    }
}

impl StreamConfig {
    pub fn builder() -> StreamConfigBuilder {
        StreamConfigBuilder::new()
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Whether the response body is compressed and must be inflated
    pub fn compression(&self) -> bool {
        self.compression
    }

    pub fn subscription(&self) -> &Subscription {
        &self.subscription
    }

    pub fn presence(&self) -> Presence {
        self.presence
    }

    /// The largest record accepted, `None` means unbounded
    pub fn max_record_len(&self) -> Option<usize> {
        self.max_record_len
    }
}

#[derive(Debug, Clone, Default)]
pub struct StreamConfigBuilder {
    config: StreamConfig,
}

impl StreamConfigBuilder {
    fn new() -> Self {
        Self { config: StreamConfig::default() }
    }

    pub fn compression(mut self, compression: bool) -> Self {
        self.config.compression = compression;
        self
    }

    pub fn subscription(mut self, subscription: Subscription) -> Self {
        self.config.subscription = subscription;
        self
    }

    pub fn presence(mut self, presence: Presence) -> Self {
        self.config.presence = presence;
        self
    }

    pub fn max_record_len(mut self, max_record_len: usize) -> Self {
        self.config.max_record_len = Some(max_record_len);
        self
    }

    pub fn build(self) -> StreamConfig {
        self.config
    }
}
