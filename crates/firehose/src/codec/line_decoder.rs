//! Decoder splitting a byte stream into newline-delimited records.
//!
//! Records are returned without their delimiter (`\n` or `\r\n`). Blank records are
//! returned too: on a streaming api an empty line is a keep-alive, and it is up to the
//! next stage to drop it.

use crate::ensure;
use crate::protocol::StreamError;
use bytes::{Bytes, BytesMut};
use tokio_util::codec::Decoder;
use tracing::trace;

/// A decoder that frames newline-delimited records.
///
/// Partial records stay in the source buffer until their delimiter arrives, so a record
/// may span any number of input chunks. The decoder remembers how far it already
/// scanned, so a long partial record is not rescanned for every new chunk.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineDecoder {
    /// Index of the next byte to scan for a delimiter
    next_index: usize,
    /// Largest record accepted, `None` means unbounded
    max_length: Option<usize>,
}

impl LineDecoder {
    /// Creates a new `LineDecoder` without a record size limit
    pub fn new() -> Self {
        Default::default()
    }

    /// Creates a `LineDecoder` rejecting records longer than `max_length` bytes.
    ///
    /// The limit also bounds how much of an unterminated record is buffered.
    pub fn with_max_length(max_length: usize) -> Self {
        Self { next_index: 0, max_length: Some(max_length) }
    }

    pub fn max_length(&self) -> Option<usize> {
        self.max_length
    }

    fn check_length(&self, length: usize) -> Result<(), StreamError> {
        if let Some(max_length) = self.max_length {
            ensure!(length <= max_length, StreamError::record_too_long(length, max_length));
        }
        Ok(())
    }
}

impl Decoder for LineDecoder {
    type Item = Bytes;
    type Error = StreamError;

    /// Attempts to split the next record off `src`
    ///
    /// # Returns
    ///
    /// - `Ok(Some(bytes))`: a complete record, delimiter stripped, possibly empty
    /// - `Ok(None)`: need more data
    /// - `Err(StreamError::RecordTooLong)`: the record exceeds the configured limit
    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let Some(offset) = src[self.next_index..].iter().position(|b| *b == b'\n') else {
            self.next_index = src.len();
            // a trailing `\r` may still turn out to be part of the delimiter
            let pending = if src.last() == Some(&b'\r') { src.len() - 1 } else { src.len() };
            self.check_length(pending)?;
            return Ok(None);
        };

        let newline_index = self.next_index + offset;
        self.next_index = 0;

        let mut line = src.split_to(newline_index + 1);
        line.truncate(newline_index);
        strip_cr(&mut line);
        self.check_length(line.len())?;

        trace!(len = line.len(), "framed record");
        Ok(Some(line.freeze()))
    }

    /// Flushes an unterminated trailing record once the input has ended
    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(line) = self.decode(src)? {
            return Ok(Some(line));
        }

        if src.is_empty() {
            return Ok(None);
        }

        self.next_index = 0;
        let mut line = src.split();
        strip_cr(&mut line);
        trace!(len = line.len(), "framed trailing record");
        Ok(Some(line.freeze()))
    }
}

fn strip_cr(line: &mut BytesMut) {
    if line.last() == Some(&b'\r') {
        line.truncate(line.len() - 1);
    }
}
