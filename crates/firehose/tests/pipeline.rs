use bytes::Bytes;
use flate2::Compression;
use flate2::write::{GzEncoder, ZlibEncoder};
use futures::{Stream, StreamExt};
use http::StatusCode;
use micro_firehose::config::{Presence, StreamConfig};
use micro_firehose::dispatch::Dispatcher;
use micro_firehose::pipeline::FirehoseStream;
use micro_firehose::protocol::{BoxError, Event, MessageKind, StreamError, Subscription, Topic};
use micro_firehose::transport::{Transport, TransportEvent, channel_transport};
use serde_json::{Value, json};
use std::collections::VecDeque;
use std::io::Write;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::task::{Context, Poll};
use std::time::Duration;

/// Replays a fixed sequence of transport events and counts aborts
struct MockTransport {
    events: VecDeque<Result<TransportEvent, BoxError>>,
    aborted: bool,
    aborts: Arc<AtomicUsize>,
}

impl MockTransport {
    fn new(status: StatusCode, chunks: &[&[u8]]) -> (Self, Arc<AtomicUsize>) {
        let mut events = VecDeque::with_capacity(chunks.len() + 1);
        events.push_back(Ok(TransportEvent::Response(status)));
        events.extend(chunks.iter().map(|chunk| Ok(TransportEvent::Data(Bytes::copy_from_slice(chunk)))));
        Self::from_events(events)
    }

    fn from_events(events: VecDeque<Result<TransportEvent, BoxError>>) -> (Self, Arc<AtomicUsize>) {
        let aborts = Arc::new(AtomicUsize::new(0));
        (Self { events, aborted: false, aborts: Arc::clone(&aborts) }, aborts)
    }
}

impl Stream for MockTransport {
    type Item = Result<TransportEvent, BoxError>;

    fn poll_next(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        assert!(!this.aborted, "transport polled after abort");
        Poll::Ready(this.events.pop_front())
    }
}

impl Transport for MockTransport {
    fn abort(&mut self) {
        self.aborted = true;
        self.aborts.fetch_add(1, Ordering::SeqCst);
    }
}

fn plain(subscription: Subscription) -> StreamConfig {
    StreamConfig::builder().compression(false).subscription(subscription).build()
}

fn compressed(subscription: Subscription) -> StreamConfig {
    StreamConfig::builder().compression(true).subscription(subscription).build()
}

fn gzip(data: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

fn zlib(data: &[u8]) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

/// Collects `(name, payload)` pairs, with `Value::Null` standing in for error payloads
async fn collect<T: Transport>(stream: FirehoseStream<T>) -> Vec<(&'static str, Value)> {
    stream.map(|event| (event.name(), event.payload().map(|payload| (**payload).clone()).unwrap_or_default())).collect().await
}

const BODY: &[u8] = b"{\"text\":\"I love tacos\"}\n\n{\"limit\":{\"track\":5}}\n";

fn expected_body_events() -> Vec<(&'static str, Value)> {
    let tweet = json!({"text": "I love tacos"});
    vec![
        ("all", tweet.clone()),
        ("tweet", tweet.clone()),
        ("data", tweet),
        ("all", json!({"limit": {"track": 5}})),
        ("limit", json!({"track": 5})),
        ("data", json!({"track": 5})),
    ]
}

#[tokio::test]
async fn test_end_to_end() {
    let (transport, aborts) = MockTransport::new(StatusCode::OK, &[BODY]);
    let stream = FirehoseStream::new(transport, &plain(Subscription::kinds([MessageKind::Tweet, MessageKind::Limit])));

    assert_eq!(collect(stream).await, expected_body_events());
    assert_eq!(aborts.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_framing_is_independent_of_chunking() {
    let subscription = Subscription::kinds([MessageKind::Tweet, MessageKind::Limit]);

    for size in [1, 2, 3, 7, 23, BODY.len()] {
        let (transport, _) = MockTransport::new(StatusCode::OK, &BODY.chunks(size).collect::<Vec<_>>());
        let stream = FirehoseStream::new(transport, &plain(subscription.clone()));

        assert_eq!(collect(stream).await, expected_body_events(), "chunk size {size}");
    }
}

#[tokio::test]
async fn test_delimiter_at_chunk_boundary() {
    let chunks: &[&[u8]] = &[b"{\"text\":\"I love tacos\"}", b"\n", b"{\"delete\":{\"status\":{\"id\":1}}}\n"];
    let (transport, _) = MockTransport::new(StatusCode::OK, chunks);
    let stream = FirehoseStream::new(transport, &plain(Subscription::default()));

    let names = collect(stream).await.into_iter().map(|(name, _)| name).collect::<Vec<_>>();

    assert_eq!(names, vec!["all", "tweet", "data", "all", "delete"]);
}

#[tokio::test]
async fn test_blank_lines_emit_nothing() {
    let (transport, _) = MockTransport::new(StatusCode::OK, &[b"\n", b"\r\n  \n", b"\n"]);
    let stream = FirehoseStream::new(transport, &plain(Subscription::all()));

    assert!(collect(stream).await.is_empty());
}

#[tokio::test]
async fn test_error_status() {
    let (transport, aborts) = MockTransport::new(StatusCode::TOO_MANY_REQUESTS, &[BODY]);
    let stream = FirehoseStream::new(transport, &plain(Subscription::all()));

    let events = stream.collect::<Vec<_>>().await;

    assert_eq!(events.len(), 1);
    let error = events[0].as_error().unwrap();
    assert_eq!(error.status_code(), Some(StatusCode::TOO_MANY_REQUESTS));
    assert!(error.is_fatal());
    assert_eq!(aborts.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_cancel_after_partial_consumption() {
    let (transport, aborts) = MockTransport::new(StatusCode::OK, &[BODY, BODY, BODY]);
    let mut stream = FirehoseStream::new(transport, &plain(Subscription::default()));

    assert_eq!(stream.next().await.unwrap().name(), "all");
    assert_eq!(stream.next().await.unwrap().name(), "tweet");

    stream.cancel();
    assert_eq!(aborts.load(Ordering::SeqCst), 1);

    stream.cancel();
    assert!(stream.next().await.is_none());
    assert!(stream.next().await.is_none());

    drop(stream);
    assert_eq!(aborts.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_gzip_body() {
    let body = gzip(BODY);
    let (transport, _) = MockTransport::new(StatusCode::OK, &body.chunks(4).collect::<Vec<_>>());
    let stream = FirehoseStream::new(transport, &compressed(Subscription::kinds([MessageKind::Tweet, MessageKind::Limit])));

    assert_eq!(collect(stream).await, expected_body_events());
}

#[tokio::test]
async fn test_zlib_body() {
    let body = zlib(BODY);
    let (transport, _) = MockTransport::new(StatusCode::OK, &[&body[..1], &body[1..]]);
    let stream = FirehoseStream::new(transport, &compressed(Subscription::kinds([MessageKind::Tweet, MessageKind::Limit])));

    assert_eq!(collect(stream).await, expected_body_events());
}

#[tokio::test]
async fn test_truncated_gzip_body() {
    let body = gzip(BODY);
    let (transport, aborts) = MockTransport::new(StatusCode::OK, &[&body[..body.len() - 4]]);
    let stream = FirehoseStream::new(transport, &compressed(Subscription::disabled()));

    let events = stream.collect::<Vec<_>>().await;

    let last = events.last().unwrap().as_error().unwrap();
    assert!(matches!(last, StreamError::Inflate { .. }));
    assert_eq!(events.iter().filter(|event| event.is_error()).count(), 1);
    assert_eq!(aborts.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_concatenated_gzip_members_in_one_chunk() {
    let mut body = gzip(BODY);
    body.extend_from_slice(&gzip(BODY));
    let (transport, _) = MockTransport::new(StatusCode::OK, &[&body]);
    let stream = FirehoseStream::new(transport, &compressed(Subscription::kinds([MessageKind::Tweet, MessageKind::Limit])));

    let mut expected = expected_body_events();
    expected.extend(expected_body_events());
    assert_eq!(collect(stream).await, expected);
}

#[tokio::test]
async fn test_records_inflated_before_corruption_are_delivered() {
    let mut body = gzip(BODY);
    body.extend_from_slice(b"\x00\x01 not a gzip member");
    let (transport, aborts) = MockTransport::new(StatusCode::OK, &[&body]);
    let stream = FirehoseStream::new(transport, &compressed(Subscription::disabled()));

    let events = stream.collect::<Vec<_>>().await;

    let names = events.iter().map(Event::name).collect::<Vec<_>>();
    assert_eq!(names, vec!["all", "tweet", "all", "limit", "error"]);
    assert!(matches!(events[4].as_error(), Some(StreamError::Inflate { .. })));
    assert_eq!(aborts.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_truncated_zlib_body() {
    let body = zlib(BODY);
    let (transport, aborts) = MockTransport::new(StatusCode::OK, &[&body[..body.len() - 6]]);
    let stream = FirehoseStream::new(transport, &compressed(Subscription::disabled()));

    let events = stream.collect::<Vec<_>>().await;

    let last = events.last().unwrap().as_error().unwrap();
    assert!(matches!(last, StreamError::Inflate { .. }));
    assert_eq!(events.iter().filter(|event| event.is_error()).count(), 1);
    assert_eq!(aborts.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_malformed_record_is_not_fatal() {
    let chunks: &[&[u8]] = &[b"{\"text\":\"I love tacos\"}\n{\"text\":\n{\"delete\":{}}\n"];
    let (transport, _) = MockTransport::new(StatusCode::OK, chunks);
    let stream = FirehoseStream::new(transport, &plain(Subscription::disabled()));

    let events = stream.collect::<Vec<_>>().await;

    let names = events.iter().map(Event::name).collect::<Vec<_>>();
    assert_eq!(names, vec!["all", "tweet", "error", "all", "delete"]);

    let error = events[2].as_error().unwrap();
    assert!(!error.is_fatal());
    assert!(matches!(error, StreamError::Decode { record, .. } if record == &Bytes::from_static(b"{\"text\":")));
}

#[tokio::test]
async fn test_transport_error_mid_stream() {
    let events = VecDeque::from(vec![
        Ok(TransportEvent::Response(StatusCode::OK)),
        Ok(TransportEvent::Data(Bytes::from_static(b"{\"text\":\"I love tacos\"}\n{\"te"))),
        Err("connection reset by peer".into()),
        Ok(TransportEvent::Data(Bytes::from_static(b"xt\":\"never read\"}\n"))),
    ]);
    let (transport, aborts) = MockTransport::from_events(events);
    let stream = FirehoseStream::new(transport, &plain(Subscription::disabled()));

    let events = stream.collect::<Vec<_>>().await;

    let names = events.iter().map(Event::name).collect::<Vec<_>>();
    assert_eq!(names, vec!["all", "tweet", "error"]);
    assert!(matches!(events[2].as_error(), Some(StreamError::Transport { .. })));
    assert_eq!(aborts.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_record_too_long() {
    let (transport, aborts) = MockTransport::new(StatusCode::OK, &[b"{\"text\":\"short\"}\n", b"{\"text\":\"this one is much too long\"}\n"]);
    let config = StreamConfig::builder().compression(false).subscription(Subscription::disabled()).max_record_len(20).build();
    let stream = FirehoseStream::new(transport, &config);

    let names = collect(stream).await.into_iter().map(|(name, _)| name).collect::<Vec<_>>();

    assert_eq!(names, vec!["all", "tweet", "error"]);
    assert_eq!(aborts.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_presence_modes() {
    let chunks: &[&[u8]] = &[b"{\"limit\":0,\"text\":\"zero\"}\n"];

    let (transport, _) = MockTransport::new(StatusCode::OK, chunks);
    let exists = StreamConfig::builder().compression(false).presence(Presence::Exists).build();
    let names = collect(FirehoseStream::new(transport, &exists)).await.into_iter().map(|(name, _)| name).collect::<Vec<_>>();
    assert_eq!(names, vec!["all", "limit"]);

    let (transport, _) = MockTransport::new(StatusCode::OK, chunks);
    let truthy = StreamConfig::builder().compression(false).presence(Presence::Truthy).build();
    let names = collect(FirehoseStream::new(transport, &truthy)).await.into_iter().map(|(name, _)| name).collect::<Vec<_>>();
    assert_eq!(names, vec!["all", "tweet", "data"]);
}

#[tokio::test]
async fn test_subscription_all_doubles_every_emission() {
    let (transport, _) = MockTransport::new(StatusCode::OK, &[BODY]);
    let stream = FirehoseStream::new(transport, &plain(Subscription::all()));

    let events = collect(stream).await;

    let names = events.iter().map(|(name, _)| *name).collect::<Vec<_>>();
    assert_eq!(names, vec!["all", "data", "tweet", "data", "all", "data", "limit", "data"]);
    for pair in events.chunks(2) {
        assert_eq!(pair[0].1, pair[1].1);
    }
}

#[tokio::test]
async fn test_only_subscribed_kind_is_forwarded() {
    let (transport, _) = MockTransport::new(StatusCode::OK, &[b"{\"scrub_geo\":{\"user_id\":1}}\n{\"text\":\"al pastor\"}\n"]);
    let stream = FirehoseStream::new(transport, &plain(Subscription::default()));

    let data = collect(stream).await.into_iter().filter(|(name, _)| *name == "data").collect::<Vec<_>>();

    assert_eq!(data, vec![("data", json!({"text": "al pastor"}))]);
}

#[tokio::test]
async fn test_cancel_handle_wakes_pending_stream() {
    let (mut sender, transport) = channel_transport(4);
    let mut stream = FirehoseStream::new(transport, &plain(Subscription::default()));
    let handle = stream.cancel_handle();

    sender.response(StatusCode::OK).await.unwrap();
    sender.data(&b"{\"text\":\"I love tacos\"}\n"[..]).await.unwrap();

    let consumer = tokio::spawn(async move {
        let mut names = vec![];
        while let Some(event) = stream.next().await {
            names.push(event.name());
        }
        names
    });

    // the consumer drains the first message, then waits on the open transport
    tokio::time::sleep(Duration::from_millis(50)).await;
    handle.cancel();

    let names = tokio::time::timeout(Duration::from_secs(5), consumer).await.unwrap().unwrap();
    assert_eq!(names, vec!["all", "tweet", "data"]);
    assert!(sender.is_aborted());
}

#[tokio::test]
async fn test_dispatcher_delivers_subscribed_topics() {
    let (transport, _) = MockTransport::new(StatusCode::OK, &[BODY, b"{oops}\n"]);
    let stream = FirehoseStream::new(transport, &plain(Subscription::kinds([MessageKind::Tweet, MessageKind::Limit])));

    let mut dispatcher = Dispatcher::with_buffer(2);
    let tweets = dispatcher.subscribe([MessageKind::Tweet]);
    let data = dispatcher.subscribe([Topic::Data, Topic::Error]);

    let hub = tokio::spawn(dispatcher.run(stream));

    let (tweets, data) = futures::join!(
        tweets.map(|event| event.name()).collect::<Vec<_>>(),
        data.map(|event| event.name()).collect::<Vec<_>>()
    );
    hub.await.unwrap();

    assert_eq!(tweets, vec!["tweet"]);
    assert_eq!(data, vec!["data", "data", "error"]);
}

#[tokio::test]
async fn test_dispatcher_stops_without_subscribers() {
    let (mut sender, transport) = channel_transport(4);
    let stream = FirehoseStream::new(transport, &plain(Subscription::default()));

    let mut dispatcher = Dispatcher::new();
    let mut tweets = dispatcher.subscribe([MessageKind::Tweet]);
    let hub = tokio::spawn(dispatcher.run(stream));

    sender.response(StatusCode::OK).await.unwrap();
    sender.data(&b"{\"text\":\"I love tacos\"}\n"[..]).await.unwrap();
    assert_eq!(tweets.next().await.unwrap().name(), "tweet");

    drop(tweets);
    sender.data(&b"{\"text\":\"carnitas\"}\n"[..]).await.unwrap();

    tokio::time::timeout(Duration::from_secs(5), hub).await.unwrap().unwrap();
    assert!(sender.is_aborted());
}

#[tokio::test]
async fn test_dispatcher_stops_on_idle_connection() {
    let (mut sender, transport) = channel_transport(4);
    let stream = FirehoseStream::new(transport, &plain(Subscription::default()));

    let mut dispatcher = Dispatcher::new();
    let mut tweets = dispatcher.subscribe([MessageKind::Tweet]);
    let hub = tokio::spawn(dispatcher.run(stream));

    sender.response(StatusCode::OK).await.unwrap();
    sender.data(&b"{\"text\":\"I love tacos\"}\n"[..]).await.unwrap();
    assert_eq!(tweets.next().await.unwrap().name(), "tweet");

    drop(tweets);
    // keep-alives only, no event ever reaches the hub
    for _ in 0..3 {
        let _ = sender.data(&b"\r\n"[..]).await;
    }

    tokio::time::timeout(Duration::from_secs(5), hub).await.unwrap().unwrap();
    assert!(sender.is_aborted());
}
