//! MsgPack record encoder using `rmp-serde`.
//!
//! Uses `to_vec_named` so structs serialize as maps (with field names)
//! rather than positional arrays. The observer on the other end of the
//! stream may be written in any language; the map format keeps each payload
//! fully self-describing, at the cost of a few bytes per field.

use crate::error::Result;
use crate::record::TraceRecord;

use super::RecordEncoder;

/// MessagePack record encoder.
///
/// The default encoder for the delivery path. Output is struct-as-map
/// (`to_vec_named`), decodable by any MessagePack implementation without a
/// schema.
#[derive(Debug, Clone, Copy, Default)]
pub struct MsgPackEncoder;

impl MsgPackEncoder {
    /// Decode payload bytes back into a record.
    ///
    /// Receivers use this on payloads extracted by the frame decoder.
    pub fn decode(bytes: &[u8]) -> Result<TraceRecord> {
        Ok(rmp_serde::from_slice(bytes)?)
    }
}

impl RecordEncoder for MsgPackEncoder {
    fn encode(&self, record: &TraceRecord) -> Result<Vec<u8>> {
        // to_vec_named, not to_vec: keep payloads self-describing.
        Ok(rmp_serde::to_vec_named(record)?)
    }
}
