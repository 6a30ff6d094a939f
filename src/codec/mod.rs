//! Codec module - record encoding for the delivery path.
//!
//! The delivery channel is encoding-agnostic: it consumes any
//! [`RecordEncoder`] and treats the output as an opaque payload. Two
//! encoders are provided:
//!
//! - [`MsgPackEncoder`] - MessagePack using `rmp-serde` (default; compact,
//!   self-describing struct-as-map output via `to_vec_named`)
//! - [`JsonEncoder`] - JSON using `serde_json` (human-readable)
//!
//! # Example
//!
//! ```
//! use tracewire::codec::{JsonEncoder, MsgPackEncoder, RecordEncoder};
//! # use std::collections::HashMap;
//! # use tracewire::record::TraceRecord;
//! # let record = TraceRecord {
//! #     record_id: "r".into(), target: "t".into(), method: "GET".into(),
//! #     request_headers: HashMap::new(), request_body: None,
//! #     response_headers: None, response_body: None, status_code: None,
//! #     started_at: chrono::Utc::now(), finished_at: None,
//! # };
//!
//! let msgpack = MsgPackEncoder.encode(&record).unwrap();
//! let json = JsonEncoder.encode(&record).unwrap();
//! assert!(msgpack.len() < json.len());
//! ```

mod json;
mod msgpack;

pub use json::JsonEncoder;
pub use msgpack::MsgPackEncoder;

use crate::error::Result;
use crate::record::TraceRecord;

/// Converts a record into self-contained payload bytes.
///
/// Implementations must be injectable across threads; a failed encode is
/// reported to the caller, which drops the record and continues (encoding
/// failures never abort the pipeline).
pub trait RecordEncoder: Send + Sync {
    /// Encode a record to payload bytes.
    fn encode(&self, record: &TraceRecord) -> Result<Vec<u8>>;
}
