//! Streaming decompression of compressed response bodies.
//!
//! The inflater sniffs the format from the first bytes it sees: a gzip member starts
//! with the magic `1f 8b`, anything else is decoded as a zlib stream. Each input chunk
//! yields whatever output it completes, without blocking for more.
//!
//! Gzip bodies may hold several members back to back, decoded by `flate2`'s write-side
//! [`MultiGzDecoder`] into a growable buffer. Zlib bodies are driven through a raw
//! [`Decompress`] so that the end of the stream is known, and a body cut short is
//! reported on [`Inflater::finish`].

use bytes::{Bytes, BytesMut};
use flate2::write::MultiGzDecoder;
use flate2::{Decompress, FlushDecompress, Status};
use std::fmt;
use std::io;
use std::io::Write;
use std::mem;
use tracing::{debug, trace, warn};

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

const SCRATCH_SIZE: usize = 8 * 1024;

/// Sink collecting decompressed bytes.
#[derive(Debug)]
pub(crate) struct Writer {
    buf: BytesMut,
}

impl Writer {
    fn new() -> Self {
        Self { buf: BytesMut::with_capacity(4096) }
    }

    fn take(&mut self) -> Bytes {
        self.buf.split().freeze()
    }
}

impl io::Write for Writer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// A zlib stream that knows whether it has seen its end.
struct ZlibStream {
    decompress: Decompress,
    writer: Writer,
    ended: bool,
}

impl ZlibStream {
    fn new() -> Self {
        Self { decompress: Decompress::new(true), writer: Writer::new(), ended: false }
    }

    fn write_all(&mut self, mut data: &[u8]) -> io::Result<()> {
        let mut scratch = [0u8; SCRATCH_SIZE];

        loop {
            if self.ended {
                if !data.is_empty() {
                    warn!(len = data.len(), "ignore bytes after end of zlib stream");
                }
                return Ok(());
            }

            let total_in = self.decompress.total_in();
            let total_out = self.decompress.total_out();
            let status = self
                .decompress
                .decompress(data, &mut scratch, FlushDecompress::None)
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

            let consumed = (self.decompress.total_in() - total_in) as usize;
            let produced = (self.decompress.total_out() - total_out) as usize;
            self.writer.buf.extend_from_slice(&scratch[..produced]);
            data = &data[consumed..];

            match status {
                Status::StreamEnd => self.ended = true,
                // more output may be pending when the scratch buffer filled up
                Status::Ok | Status::BufError if produced == SCRATCH_SIZE => {}
                Status::Ok | Status::BufError if data.is_empty() || consumed == 0 => return Ok(()),
                Status::Ok | Status::BufError => {}
            }
        }
    }

    fn finish(mut self) -> io::Result<Bytes> {
        if !self.ended {
            return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "unexpected end of zlib stream"));
        }
        Ok(self.writer.take())
    }
}

/// A decompressor for gzip or zlib encoded byte streams.
pub struct Inflater {
    state: State,
}

enum State {
    /// Collecting enough bytes to tell the formats apart
    Sniffing(BytesMut),
    /// Gzip format, one or more members.
    Gzip(MultiGzDecoder<Writer>),
    /// Zlib (deflate) format.
    Zlib(ZlibStream),
}

impl Inflater {
    pub fn new() -> Self {
        Self { state: State::Sniffing(BytesMut::with_capacity(GZIP_MAGIC.len())) }
    }

    /// Returns the name of the detected format, if the inflater has seen enough bytes
    pub fn format(&self) -> Option<&'static str> {
        match &self.state {
            State::Sniffing(_) => None,
            State::Gzip(_) => Some("gzip"),
            State::Zlib(_) => Some("deflate"),
        }
    }

    /// Feeds compressed bytes, returning the bytes they decompress to.
    ///
    /// The returned bytes may be empty when the input only completes part of a block.
    /// When this fails, the bytes inflated before the malformed input are kept and can
    /// still be collected with [`take_inflated`](Inflater::take_inflated).
    pub fn inflate(&mut self, data: &[u8]) -> Result<Bytes, io::Error> {
        let State::Sniffing(head) = &mut self.state else {
            return self.write(data);
        };

        head.extend_from_slice(data);
        if head.len() < GZIP_MAGIC.len() {
            return Ok(Bytes::new());
        }

        let head = mem::take(head);
        self.state = if head.starts_with(&GZIP_MAGIC) {
            State::Gzip(MultiGzDecoder::new(Writer::new()))
        } else {
            State::Zlib(ZlibStream::new())
        };
        debug!(format = self.format(), "detected compressed stream format");

        self.write(&head)
    }

    fn write(&mut self, data: &[u8]) -> Result<Bytes, io::Error> {
        match &mut self.state {
            State::Sniffing(_) => {}
            State::Gzip(decoder) => {
                decoder.write_all(data)?;
                decoder.flush()?;
            }
            State::Zlib(stream) => stream.write_all(data)?,
        }

        let bytes = self.take_inflated();
        trace!(compressed = data.len(), inflated = bytes.len(), "inflated chunk");
        Ok(bytes)
    }

    /// Takes the bytes inflated so far and not yet returned.
    ///
    /// Only non-empty after [`inflate`](Inflater::inflate) failed partway through a chunk.
    pub fn take_inflated(&mut self) -> Bytes {
        match &mut self.state {
            State::Sniffing(_) => Bytes::new(),
            State::Gzip(decoder) => decoder.get_mut().take(),
            State::Zlib(stream) => stream.writer.take(),
        }
    }

    /// Finishes the stream, returning any buffered output.
    ///
    /// Fails if the compressed stream stopped partway through.
    pub fn finish(self) -> Result<Bytes, io::Error> {
        match self.state {
            State::Sniffing(head) if head.is_empty() => Ok(Bytes::new()),
            State::Sniffing(_) => Err(io::Error::new(io::ErrorKind::UnexpectedEof, "unexpected end of compressed stream")),
            State::Gzip(decoder) => decoder.finish().map(|writer| writer.buf.freeze()),
            State::Zlib(stream) => stream.finish(),
        }
    }
}

impl fmt::Debug for Inflater {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Inflater").field("format", &self.format()).finish()
    }
}

impl Default for Inflater {
    fn default() -> Self {
        Self::new()
    }
}
