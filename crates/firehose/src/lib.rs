//! An asynchronous client pipeline for streaming json apis
//!
//! This crate consumes the body of a long-lived streaming response, the kind a social
//! network firehose keeps open for hours, and turns it into a stream of typed events.
//! Connecting and authenticating is left to the caller: any http client works, as long
//! as its response can be adapted to a [`Transport`](transport::Transport).
//!
//! # Features
//!
//! - Gzip and zlib compressed bodies, detected from the first bytes
//! - Newline-delimited framing across arbitrary chunk boundaries, with keep-alive lines skipped
//! - Classification into `delete`, `limit`, `scrub_geo`, `status_withheld`,
//!   `user_withheld`, `friends`, `event` and `tweet` messages
//! - Subscribed kinds mirrored onto a generic `data` channel
//! - Pull-based backpressure, cancellation from any task, abort on drop
//! - Fan-out of events to topic subscribers over bounded channels
//!
//! # Example
//!
//! ```no_run
//! use futures::StreamExt;
//! use micro_firehose::config::StreamConfig;
//! use micro_firehose::pipeline::FirehoseStream;
//! use micro_firehose::protocol::{Event, MessageKind, Subscription};
//! use micro_firehose::transport::ReaderTransport;
//! use tracing::{Level, error, info};
//! use tracing_subscriber::FmtSubscriber;
//!
//! #[tokio::main]
//! async fn main() {
//!     let subscriber = FmtSubscriber::builder().with_max_level(Level::INFO).finish();
//!     tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");
//!
//!     let config = StreamConfig::builder()
//!         .compression(false)
//!         .subscription(Subscription::kinds([MessageKind::Tweet, MessageKind::Limit]))
//!         .build();
//!
//!     let mut stream = FirehoseStream::new(ReaderTransport::new(tokio::io::stdin()), &config);
//!     while let Some(event) = stream.next().await {
//!         match event {
//!             Event::Data(payload) => info!(%payload, "received"),
//!             Event::Error(e) => error!(cause = %e, "stream error"),
//!             _ => {}
//!         }
//!     }
//! }
//! ```
//!
//! # Architecture
//!
//! - [`transport`]: the seam to the http client, and a few adapters
//! - [`codec`]: inflating, framing, parsing and encoding the wire format
//! - [`dispatch`]: classification of messages and fan-out of events
//! - [`pipeline`]: the stages wired together into a [`FirehoseStream`](pipeline::FirehoseStream)
//! - [`protocol`]: the events, kinds and errors every stage shares
//! - [`config`]: per-stream options

pub mod codec;
pub mod config;
pub mod dispatch;
pub mod pipeline;
pub mod protocol;
pub mod transport;

mod utils;
pub(crate) use utils::ensure;
