use crate::protocol::BoxError;
use crate::transport::{Transport, TransportEvent};
use futures::{Stream, StreamExt};
use http::StatusCode;
use std::pin::Pin;
use std::task::{Context, Poll, ready};
use tokio::io::AsyncRead;
use tokio_util::io::ReaderStream;

/// A [`Transport`] reading the stream body from any [`AsyncRead`].
///
/// There is no response to inspect, so a `200 OK` status is reported before the first
/// read. Useful for replaying recorded streams from a file or from stdin.
#[derive(Debug)]
pub struct ReaderTransport<R> {
    responded: bool,
    reader: Option<ReaderStream<R>>,
}

impl<R: AsyncRead> ReaderTransport<R> {
    pub fn new(reader: R) -> Self {
        Self { responded: false, reader: Some(ReaderStream::new(reader)) }
    }

    /// Creates a `ReaderTransport` reading at most `capacity` bytes per chunk
    pub fn with_capacity(reader: R, capacity: usize) -> Self {
        Self { responded: false, reader: Some(ReaderStream::with_capacity(reader, capacity)) }
    }
}

impl<R: AsyncRead + Unpin> Stream for ReaderTransport<R> {
    type Item = Result<TransportEvent, BoxError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        let Some(reader) = this.reader.as_mut() else {
            return Poll::Ready(None);
        };

        if !this.responded {
            this.responded = true;
            return Poll::Ready(Some(Ok(TransportEvent::Response(StatusCode::OK))));
        }

        match ready!(reader.poll_next_unpin(cx)) {
            Some(Ok(bytes)) => Poll::Ready(Some(Ok(TransportEvent::Data(bytes)))),
            Some(Err(e)) => {
                this.reader = None;
                Poll::Ready(Some(Err(e.into())))
            }
            None => {
                this.reader = None;
                Poll::Ready(None)
            }
        }
    }
}

impl<R: AsyncRead + Unpin> Transport for ReaderTransport<R> {
    fn abort(&mut self) {
        self.reader = None;
    }
}
