use crate::pipeline::FirehoseStream;
use crate::protocol::{Event, Topic};
use crate::transport::Transport;
use futures::channel::{mpsc, oneshot};
use futures::future::{self, Either};
use futures::stream::FusedStream;
use futures::{SinkExt, Stream, StreamExt};
use std::collections::HashSet;
use std::pin::Pin;
use std::task::{Context, Poll};
use tracing::{debug, info};

const DEFAULT_BUFFER: usize = 16;

/// Fans the events of one [`FirehoseStream`] out to any number of subscribers.
///
/// Every subscriber gets its own bounded channel and only the topics it asked for. A
/// full channel holds up the whole stream, so a slow subscriber slows down the others
/// instead of piling up events. Once every subscriber is gone, the stream is cancelled,
/// even while the connection is idle.
///
/// ```no_run
/// use micro_firehose::config::StreamConfig;
/// use micro_firehose::dispatch::Dispatcher;
/// use micro_firehose::pipeline::FirehoseStream;
/// use micro_firehose::protocol::{MessageKind, Topic};
/// use micro_firehose::transport::ReaderTransport;
///
/// # async fn run() {
/// let stream = FirehoseStream::new(ReaderTransport::new(tokio::io::stdin()), &StreamConfig::default());
///
/// let mut dispatcher = Dispatcher::new();
/// let mut limits = dispatcher.subscribe([Topic::Message(MessageKind::Limit), Topic::Error]);
///
/// tokio::spawn(dispatcher.run(stream));
/// while let Some(event) = futures::StreamExt::next(&mut limits).await {
///     println!("{}: {:?}", event.name(), event.payload());
/// }
/// # }
/// ```
#[derive(Debug)]
pub struct Dispatcher {
    buffer: usize,
    subscribers: Vec<Subscriber>,
}

#[derive(Debug)]
struct Subscriber {
    /// `None` means every topic
    topics: Option<HashSet<Topic>>,
    sender: mpsc::Sender<Event>,
    /// Cancelled when the [`EventReceiver`] is dropped
    dropped: oneshot::Sender<()>,
}

impl Subscriber {
    fn accepts(&self, topic: Topic) -> bool {
        self.topics.as_ref().is_none_or(|topics| topics.contains(&topic))
    }

    fn is_gone(&self) -> bool {
        self.dropped.is_canceled() || self.sender.is_closed()
    }
}

/// Resolves once every subscriber has dropped its receiver
fn poll_unsubscribed(subscribers: &mut [Subscriber], cx: &mut Context<'_>) -> Poll<()> {
    let mut remaining = 0usize;
    for subscriber in subscribers {
        if subscriber.dropped.poll_canceled(cx).is_pending() {
            remaining += 1;
        }
    }

    if remaining == 0 { Poll::Ready(()) } else { Poll::Pending }
}

/// The receiving end of a subscription, a [`Stream`] of the subscribed [`Event`]s.
///
/// It ends when the firehose stream ends. Dropping it unsubscribes.
#[derive(Debug)]
pub struct EventReceiver {
    events: mpsc::Receiver<Event>,
    _subscribed: oneshot::Receiver<()>,
}

impl Stream for EventReceiver {
    type Item = Event;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.events.poll_next_unpin(cx)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.events.size_hint()
    }
}

impl FusedStream for EventReceiver {
    fn is_terminated(&self) -> bool {
        self.events.is_terminated()
    }
}

impl Dispatcher {
    /// Creates a `Dispatcher` with room for 16 events per subscriber
    pub fn new() -> Self {
        Self::with_buffer(DEFAULT_BUFFER)
    }

    /// Creates a `Dispatcher` whose subscriber channels hold up to `buffer` events
    pub fn with_buffer(buffer: usize) -> Self {
        Self { buffer, subscribers: Vec::new() }
    }

    /// Registers a subscriber for `topics`, returning the receiving end of its channel
    pub fn subscribe<I, T>(&mut self, topics: I) -> EventReceiver
    where
        I: IntoIterator<Item = T>,
        T: Into<Topic>,
    {
        let topics = topics.into_iter().map(Into::into).collect::<HashSet<_>>();
        self.register(Some(topics))
    }

    /// Registers a subscriber for every topic
    pub fn subscribe_all(&mut self) -> EventReceiver {
        self.register(None)
    }

    fn register(&mut self, topics: Option<HashSet<Topic>>) -> EventReceiver {
        let (sender, events) = mpsc::channel(self.buffer);
        let (dropped, subscribed) = oneshot::channel();
        self.subscribers.push(Subscriber { topics, sender, dropped });
        EventReceiver { events, _subscribed: subscribed }
    }

    /// Drives `stream` to its end, delivering each event to the matching subscribers.
    ///
    /// Returns early, cancelling the stream, as soon as no subscriber is left, without
    /// waiting for the next event.
    pub async fn run<T: Transport>(mut self, mut stream: FirehoseStream<T>) {
        let mut delivered = 0usize;

        loop {
            self.subscribers.retain(|subscriber| !subscriber.is_gone());
            if self.subscribers.is_empty() {
                info!(delivered, "no subscriber left, cancel firehose stream");
                stream.cancel();
                return;
            }

            let unsubscribed = future::poll_fn(|cx| poll_unsubscribed(&mut self.subscribers, cx));
            let event = match future::select(stream.next(), unsubscribed).await {
                Either::Left((Some(event), _)) => event,
                Either::Left((None, _)) => break,
                Either::Right(((), _)) => continue,
            };

            let topic = event.topic();
            for subscriber in self.subscribers.iter_mut().filter(|subscriber| subscriber.accepts(topic)) {
                if subscriber.sender.send(event.clone()).await.is_ok() {
                    delivered += 1;
                }
            }
        }

        debug!(delivered, "firehose stream ended, close subscribers");
        for subscriber in &mut self.subscribers {
            subscriber.sender.close_channel();
        }
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}
