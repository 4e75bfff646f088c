use crate::codec::{LineDecoder, MessageDecoder};
use crate::config::StreamConfig;
use crate::dispatch::Classifier;
use crate::pipeline::{BodyStream, InflateStream, RecordStream};
use crate::protocol::Event;
use crate::transport::Transport;
use futures::stream::FusedStream;
use futures::task::AtomicWaker;
use futures::{Stream, StreamExt};
use std::collections::VecDeque;
use std::fmt;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::task::{Context, Poll, ready};
use tracing::{debug, error, info, trace, warn};

type Records<T> = RecordStream<InflateStream<BodyStream<T>>>;

/// The firehose of one streaming connection, as a [`Stream`] of [`Event`]s.
///
/// Records are pulled from the transport only when the events of the previous message
/// have been consumed. Every error is yielded as an [`Event::Error`]; a fatal one aborts
/// the transport and is the last event of the stream.
///
/// The transport is aborted at most once, by the first of [`cancel`](FirehoseStream::cancel),
/// a [`CancelHandle`], a fatal error, or dropping the stream.
pub struct FirehoseStream<T: Transport> {
    records: Records<T>,
    decoder: MessageDecoder,
    classifier: Classifier,
    pending: VecDeque<Event>,
    cancel: Arc<CancelState>,
    state: State,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum State {
    Streaming,
    Finished,
}

impl<T: Transport> FirehoseStream<T> {
    pub fn new(transport: T, config: &StreamConfig) -> Self {
        let line_decoder = match config.max_record_len() {
            Some(max_length) => LineDecoder::with_max_length(max_length),
            None => LineDecoder::new(),
        };

        let body = BodyStream::new(transport);
        let inflated = InflateStream::new(body, config.compression());
        let records = RecordStream::new(inflated, line_decoder);

        debug!(compression = config.compression(), presence = ?config.presence(), "open firehose stream");

        Self {
            records,
            decoder: MessageDecoder::new(),
            classifier: Classifier::new(config.presence(), config.subscription().clone()),
            pending: VecDeque::with_capacity(4),
            cancel: Arc::new(CancelState::default()),
            state: State::Streaming,
        }
    }

    /// Returns a handle able to cancel this stream from another task
    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle { state: Arc::clone(&self.cancel) }
    }

    /// Stops the stream and aborts the transport.
    ///
    /// Events not yet consumed are dropped. Calling it again, or polling afterwards, is
    /// harmless: the stream just stays ended.
    pub fn cancel(&mut self) {
        self.cancel.cancel();
        self.shutdown();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    fn shutdown(&mut self) {
        self.pending.clear();
        self.state = State::Finished;
        self.records.get_mut().get_mut().abort();
    }
}

impl<T: Transport> Stream for FirehoseStream<T> {
    type Item = Event;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        this.cancel.waker.register(cx.waker());
        if this.cancel.is_cancelled() && !this.is_terminated() {
            info!("firehose stream cancelled");
            this.shutdown();
        }

        loop {
            if let Some(event) = this.pending.pop_front() {
                return Poll::Ready(Some(event));
            }

            if this.state == State::Finished {
                return Poll::Ready(None);
            }

            match ready!(this.records.poll_next_unpin(cx)) {
                Some(Ok(record)) => match this.decoder.decode(record) {
                    Ok(Some(message)) => this.classifier.dispatch(message, &mut this.pending),
                    Ok(None) => trace!("skip keep-alive record"),
                    Err(e) => {
                        warn!(cause = %e, "skip malformed record");
                        this.pending.push_back(Event::error(e));
                    }
                },

                Some(Err(e)) if !e.is_fatal() => {
                    warn!(cause = %e, "recoverable stream error");
                    this.pending.push_back(Event::error(e));
                }

                Some(Err(e)) => {
                    error!(cause = %e, "firehose stream failed");
                    this.shutdown();
                    this.pending.push_back(Event::error(e));
                }

                None => {
                    info!("firehose stream ended");
                    this.state = State::Finished;
                }
            }
        }
    }
}

impl<T: Transport> fmt::Debug for FirehoseStream<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FirehoseStream")
            .field("classifier", &self.classifier)
            .field("pending", &self.pending.len())
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl<T: Transport> FusedStream for FirehoseStream<T> {
    fn is_terminated(&self) -> bool {
        self.state == State::Finished && self.pending.is_empty()
    }
}

#[derive(Debug, Default)]
struct CancelState {
    cancelled: AtomicBool,
    waker: AtomicWaker,
}

impl CancelState {
    fn cancel(&self) {
        if !self.cancelled.swap(true, Ordering::AcqRel) {
            self.waker.wake();
        }
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

/// Cancels a [`FirehoseStream`] from outside the task polling it, e.g. from a timer.
///
/// A stream waiting on its transport is woken, ends, and aborts the transport.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    state: Arc<CancelState>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.state.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.state.is_cancelled()
    }
}
