use bytes::BytesMut;
use serde::Serialize;
use std::io;
use tokio_util::codec::Encoder;

/// An encoder writing values as newline-delimited json.
///
/// This is the inverse of [`LineDecoder`](crate::codec::LineDecoder) plus
/// [`MessageDecoder`](crate::codec::MessageDecoder): forwarded payloads can be piped
/// into any `FramedWrite` sink and read back as a firehose stream.
#[derive(Debug, Clone, Copy, Default)]
pub struct NdjsonEncoder;

impl NdjsonEncoder {
    pub fn new() -> Self {
        Self
    }
}

impl<T: Serialize> Encoder<T> for NdjsonEncoder {
    type Error = io::Error;

    fn encode(&mut self, item: T, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let json = serde_json::to_vec(&item)?;
        dst.reserve(json.len() + 1);
        dst.extend_from_slice(&json);
        dst.extend_from_slice(b"\n");
        Ok(())
    }
}
