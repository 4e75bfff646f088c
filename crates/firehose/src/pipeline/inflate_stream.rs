use crate::codec::Inflater;
use crate::protocol::StreamError;
use bytes::Bytes;
use futures::Stream;
use pin_project_lite::pin_project;
use std::io;
use std::mem;
use std::pin::Pin;
use std::task::{Context, Poll, ready};
use tracing::error;

pin_project! {
    /// Inflates a compressed body, or passes it through when compression is off.
    ///
    /// Chunks that only complete part of a compressed block are swallowed. A malformed or
    /// truncated body yields one [`StreamError::Inflate`] and ends the stream, right after
    /// whatever the chunk inflated to before the malformed part.
    #[derive(Debug)]
    pub struct InflateStream<S> {
        #[pin]
        inner: S,
        mode: Mode,
    }
}

#[derive(Debug)]
enum Mode {
    Passthrough,
    Inflating(Inflater),
    Failed(io::Error),
    Finished,
}

impl<S> InflateStream<S> {
    pub fn new(inner: S, compression: bool) -> Self {
        let mode = if compression { Mode::Inflating(Inflater::new()) } else { Mode::Passthrough };
        Self { inner, mode }
    }

    pub fn get_mut(&mut self) -> &mut S {
        &mut self.inner
    }
}

impl<S> Stream for InflateStream<S>
where
    S: Stream<Item = Result<Bytes, StreamError>>,
{
    type Item = Result<Bytes, StreamError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        loop {
            let this = self.as_mut().project();

            let inflater = match this.mode {
                Mode::Finished => return Poll::Ready(None),
                Mode::Failed(_) => {
                    let Mode::Failed(e) = mem::replace(this.mode, Mode::Finished) else {
                        return Poll::Ready(None);
                    };
                    return Poll::Ready(Some(Err(StreamError::inflate(e))));
                }
                Mode::Passthrough => return this.inner.poll_next(cx),
                Mode::Inflating(inflater) => inflater,
            };

            match ready!(this.inner.poll_next(cx)) {
                Some(Ok(bytes)) => match inflater.inflate(&bytes) {
                    Ok(inflated) if inflated.is_empty() => continue,
                    Ok(inflated) => return Poll::Ready(Some(Ok(inflated))),
                    Err(e) => {
                        error!(cause = %e, "failed to inflate body chunk");
                        let inflated = inflater.take_inflated();
                        *this.mode = Mode::Failed(e);
                        if !inflated.is_empty() {
                            return Poll::Ready(Some(Ok(inflated)));
                        }
                    }
                },

                Some(Err(e)) => {
                    *this.mode = Mode::Finished;
                    return Poll::Ready(Some(Err(e)));
                }

                None => {
                    let Mode::Inflating(inflater) = mem::replace(this.mode, Mode::Finished) else {
                        return Poll::Ready(None);
                    };

                    return match inflater.finish() {
                        Ok(tail) if tail.is_empty() => Poll::Ready(None),
                        Ok(tail) => Poll::Ready(Some(Ok(tail))),
                        Err(e) => {
                            error!(cause = %e, "compressed body ended early");
                            Poll::Ready(Some(Err(StreamError::inflate(e))))
                        }
                    };
                }
            }
        }
    }
}
