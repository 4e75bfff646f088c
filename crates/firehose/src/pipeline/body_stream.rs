use crate::protocol::StreamError;
use crate::transport::{Transport, TransportEvent};
use bytes::Bytes;
use futures::{Stream, StreamExt};
use std::pin::Pin;
use std::task::{Context, Poll, ready};
use tracing::{debug, info, trace, warn};

/// The raw response body of a [`Transport`], checked against the response status.
///
/// The first response status must be a success, otherwise the stream yields a single
/// [`StreamError::Status`] and ends. Connection failures are yielded as
/// [`StreamError::Transport`], after which the stream ends too.
///
/// The transport is aborted exactly once: on the first fatal error, on [`BodyStream::abort`],
/// or when the `BodyStream` is dropped.
#[derive(Debug)]
pub struct BodyStream<T: Transport> {
    transport: T,
    responded: bool,
    done: bool,
    aborted: bool,
}

impl<T: Transport> BodyStream<T> {
    pub fn new(transport: T) -> Self {
        Self { transport, responded: false, done: false, aborted: false }
    }

    /// Aborts the transport and ends the stream. Later calls do nothing.
    pub fn abort(&mut self) {
        self.done = true;
        if self.aborted {
            return;
        }

        self.aborted = true;
        debug!("abort transport");
        self.transport.abort();
    }

    pub fn is_aborted(&self) -> bool {
        self.aborted
    }
}

impl<T: Transport> Stream for BodyStream<T> {
    type Item = Result<Bytes, StreamError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        loop {
            if this.done {
                return Poll::Ready(None);
            }

            match ready!(this.transport.poll_next_unpin(cx)) {
                Some(Ok(TransportEvent::Response(status))) => {
                    if this.responded {
                        warn!(%status, "ignore repeated response status");
                        continue;
                    }

                    this.responded = true;
                    if !status.is_success() {
                        this.abort();
                        return Poll::Ready(Some(Err(StreamError::status(status))));
                    }
                    info!(%status, "stream connected");
                }

                Some(Ok(TransportEvent::Data(bytes))) => {
                    if bytes.is_empty() {
                        continue;
                    }
                    trace!(len = bytes.len(), "received body chunk");
                    return Poll::Ready(Some(Ok(bytes)));
                }

                Some(Err(e)) => {
                    this.abort();
                    return Poll::Ready(Some(Err(StreamError::transport(e))));
                }

                None => {
                    debug!("transport ended");
                    this.done = true;
                    return Poll::Ready(None);
                }
            }
        }
    }
}

impl<T: Transport> Drop for BodyStream<T> {
    fn drop(&mut self) {
        self.abort();
    }
}
