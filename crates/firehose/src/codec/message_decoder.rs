use crate::protocol::StreamError;
use bytes::Bytes;
use serde_json::Value;

/// Parses framed records into json messages.
///
/// Whitespace-only records are keep-alives and decode to nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct MessageDecoder;

impl MessageDecoder {
    pub fn new() -> Self {
        Self
    }

    /// # Returns
    ///
    /// - `Ok(Some(value))`: the record held one json value
    /// - `Ok(None)`: the record was a keep-alive
    /// - `Err(StreamError::Decode)`: the record is not valid json, the record is kept in the error
    pub fn decode(&self, record: Bytes) -> Result<Option<Value>, StreamError> {
        if record.iter().all(u8::is_ascii_whitespace) {
            return Ok(None);
        }

        match serde_json::from_slice(&record) {
            Ok(value) => Ok(Some(value)),
            Err(e) => Err(StreamError::decode(e, record)),
        }
    }
}
