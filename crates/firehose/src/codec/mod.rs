//! Codecs for the firehose wire format
//!
//! The wire format is newline-delimited json, optionally compressed:
//!
//! - [`Inflater`]: inflates gzip or zlib compressed bodies chunk by chunk
//! - [`LineDecoder`]: a [`tokio_util::codec::Decoder`] framing records on `\n`, keeping
//!   blank keep-alive records
//! - [`MessageDecoder`]: parses a record into a json value, dropping keep-alives
//! - [`NdjsonEncoder`]: a [`tokio_util::codec::Encoder`] writing values back out as
//!   newline-delimited json
//!
//! # Example
//!
//! ```
//! use bytes::BytesMut;
//! use micro_firehose::codec::{LineDecoder, MessageDecoder};
//! use tokio_util::codec::Decoder;
//!
//! let mut buffer = BytesMut::from(&b"{\"text\":\"hi\"}\n\n"[..]);
//! let mut framer = LineDecoder::new();
//! let decoder = MessageDecoder::new();
//!
//! let record = framer.decode(&mut buffer).unwrap().unwrap();
//! assert!(decoder.decode(record).unwrap().is_some());
//!
//! // the keep-alive frames as an empty record, and decodes to nothing
//! let record = framer.decode(&mut buffer).unwrap().unwrap();
//! assert!(decoder.decode(record).unwrap().is_none());
//! ```

mod inflater;
mod line_decoder;
mod message_decoder;
mod ndjson_encoder;

pub use inflater::Inflater;
pub use line_decoder::LineDecoder;
pub use message_decoder::MessageDecoder;
pub use ndjson_encoder::NdjsonEncoder;
