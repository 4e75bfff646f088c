//! The seam between the firehose pipeline and the connection it reads from.
//!
//! Building, signing and sending the streaming request is left to the caller. The
//! pipeline only needs a [`Transport`]: a stream of [`TransportEvent`]s that can be
//! aborted. A transport reports the first response's status once, then body bytes,
//! and ends when the connection does.
//!
//! Three adapters are provided:
//!
//! - [`ResponseTransport`]: wraps an `http::Response` whose body implements `http_body::Body`
//! - [`ReaderTransport`]: wraps any `AsyncRead`, e.g. stdin or a file of recorded messages
//! - [`ChannelTransport`]: fed through a [`TransportSender`], for push-style http clients

mod channel;
mod reader;
mod response;

pub use channel::{ChannelTransport, TransportSender, channel_transport};
pub use reader::ReaderTransport;
pub use response::ResponseTransport;

use crate::protocol::BoxError;
use bytes::Bytes;
use futures::Stream;
use http::StatusCode;

/// A signal from the underlying connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// The status of the first response, reported once before any data
    Response(StatusCode),
    /// A chunk of the response body, as received
    Data(Bytes),
}

/// A connected streaming response.
///
/// The stream yields `Err` for connection-level failures and ends at end of stream.
pub trait Transport: Stream<Item = Result<TransportEvent, BoxError>> + Unpin {
    /// Tears down the underlying connection.
    ///
    /// The pipeline calls this at most once, and never polls the transport afterwards.
    fn abort(&mut self);
}
