use crate::codec::LineDecoder;
use crate::protocol::StreamError;
use bytes::{Bytes, BytesMut};
use futures::Stream;
use pin_project_lite::pin_project;
use std::pin::Pin;
use std::task::{Context, Poll, ready};
use tokio_util::codec::Decoder;
use tracing::{debug, error};

const INITIAL_CAPACITY: usize = 8 * 1024;

pin_project! {
    /// Frames a body stream into records with a [`LineDecoder`].
    ///
    /// Complete records already buffered are returned before the inner stream is polled
    /// again, so a burst of records in one chunk never pulls more input than needed.
    #[derive(Debug)]
    pub struct RecordStream<S> {
        #[pin]
        inner: S,
        decoder: LineDecoder,
        buffer: BytesMut,
        eof: bool,
        finished: bool,
    }
}

impl<S> RecordStream<S> {
    pub fn new(inner: S, decoder: LineDecoder) -> Self {
        Self { inner, decoder, buffer: BytesMut::with_capacity(INITIAL_CAPACITY), eof: false, finished: false }
    }

    pub fn get_mut(&mut self) -> &mut S {
        &mut self.inner
    }

    /// Bytes of a partial record waiting for its delimiter
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }
}

impl<S> Stream for RecordStream<S>
where
    S: Stream<Item = Result<Bytes, StreamError>>,
{
    type Item = Result<Bytes, StreamError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        loop {
            let this = self.as_mut().project();

            if *this.finished {
                return Poll::Ready(None);
            }

            let decoded = if *this.eof { this.decoder.decode_eof(this.buffer) } else { this.decoder.decode(this.buffer) };
            match decoded {
                Ok(Some(record)) => return Poll::Ready(Some(Ok(record))),
                Ok(None) if *this.eof => {
                    *this.finished = true;
                    return Poll::Ready(None);
                }
                Ok(None) => {}
                Err(e) => {
                    error!(cause = %e, "failed to frame record");
                    *this.finished = true;
                    return Poll::Ready(Some(Err(e)));
                }
            }

            match ready!(this.inner.poll_next(cx)) {
                Some(Ok(bytes)) => this.buffer.extend_from_slice(&bytes),
                Some(Err(e)) => {
                    if !this.buffer.is_empty() {
                        debug!(len = this.buffer.len(), "discard partial record");
                        this.buffer.clear();
                    }
                    *this.finished = true;
                    return Poll::Ready(Some(Err(e)));
                }
                None => *this.eof = true,
            }
        }
    }
}
