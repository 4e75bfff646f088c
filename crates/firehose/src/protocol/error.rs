use bytes::Bytes;
use http::StatusCode;
use std::error::Error;
use std::io;
use thiserror::Error;

/// Boxed error produced by a [`Transport`](crate::transport::Transport) implementation.
pub type BoxError = Box<dyn Error + Send + Sync>;

/// Everything that can go wrong on a firehose stream.
///
/// Errors reach consumers as [`Event::Error`](crate::protocol::Event::Error); see
/// [`StreamError::is_fatal`] for which of them end the stream.
#[derive(Error, Debug)]
pub enum StreamError {
    #[error("transport error: {source}")]
    Transport {
        #[from]
        source: BoxError,
    },

    #[error("unexpected response status: {status}")]
    Status { status: StatusCode },

    #[error("inflate error: {source}")]
    Inflate {
        #[from]
        source: io::Error,
    },

    #[error("record size too large, current: {current_size} exceed the limit {max_size}")]
    RecordTooLong { current_size: usize, max_size: usize },

    #[error("invalid json record: {source}")]
    Decode { source: serde_json::Error, record: Bytes },
}

impl StreamError {
    /// The connection failed, or the transport reported an error.
    pub fn transport<E: Into<BoxError>>(e: E) -> Self {
        Self::Transport { source: e.into() }
    }

    /// The response status was not a success.
    pub fn status(status: StatusCode) -> Self {
        Self::Status { status }
    }

    /// The compressed body was malformed or cut short.
    pub fn inflate<E: Into<io::Error>>(e: E) -> Self {
        Self::Inflate { source: e.into() }
    }

    /// A record grew past the configured `max_size`, with or without its delimiter seen.
    pub fn record_too_long(current_size: usize, max_size: usize) -> Self {
        Self::RecordTooLong { current_size, max_size }
    }

    /// A record was not valid json. `record` holds the offending bytes.
    pub fn decode(source: serde_json::Error, record: Bytes) -> Self {
        Self::Decode { source, record }
    }

    /// Whether this error terminates the stream it occurred on.
    ///
    /// Only a malformed json record is recoverable: the stream skips it and moves on.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::Decode { .. })
    }

    /// The response status, if this error was caused by a non-success response.
    pub fn status_code(&self) -> Option<StatusCode> {
        match self {
            Self::Status { status } => Some(*status),
            _ => None,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown message kind: {name}")]
pub struct UnknownKind {
    name: String,
}

impl UnknownKind {
    pub(crate) fn new<S: ToString>(name: S) -> Self {
        Self { name: name.to_string() }
    }

    /// The name that failed to parse
    pub fn name(&self) -> &str {
        &self.name
    }
}
