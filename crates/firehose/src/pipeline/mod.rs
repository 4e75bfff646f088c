//! The stages between a [`Transport`](crate::transport::Transport) and the events it carries.
//!
//! Each stage is a [`futures::Stream`] polled by the one above it:
//!
//! ```text
//! Transport -> BodyStream -> InflateStream -> RecordStream -> FirehoseStream -> Event
//! ```
//!
//! - [`BodyStream`]: checks the response status and owns the transport's abort
//! - [`InflateStream`]: inflates the body when compression was negotiated
//! - [`RecordStream`]: frames the body into newline-delimited records
//! - [`FirehoseStream`]: decodes and classifies records into [`Event`](crate::protocol::Event)s
//!
//! Nothing is read ahead: a stage only polls its input when its own consumer asks for
//! the next item.

mod body_stream;
mod firehose_stream;
mod inflate_stream;
mod record_stream;

pub use body_stream::BodyStream;
pub use firehose_stream::{CancelHandle, FirehoseStream};
pub use inflate_stream::InflateStream;
pub use record_stream::RecordStream;
