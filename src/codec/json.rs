//! JSON record encoder using `serde_json`.
//!
//! Larger on the wire than MsgPack but trivially inspectable; useful when
//! the observer is a script or a human with a socket dump.

use crate::error::Result;
use crate::record::TraceRecord;

use super::RecordEncoder;

/// JSON record encoder.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonEncoder;

impl JsonEncoder {
    /// Decode payload bytes back into a record.
    pub fn decode(bytes: &[u8]) -> Result<TraceRecord> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

impl RecordEncoder for JsonEncoder {
    fn encode(&self, record: &TraceRecord) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(record)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::collections::HashMap;

    #[test]
    fn test_encode_decode_roundtrip() {
        let record = TraceRecord {
            record_id: "rec-json".to_string(),
            target: "https://example.com".to_string(),
            method: "PUT".to_string(),
            request_headers: HashMap::new(),
            request_body: Some(b"body".to_vec()),
            response_headers: None,
            response_body: None,
            status_code: None,
            started_at: Utc::now(),
            finished_at: None,
        };

        let encoded = JsonEncoder.encode(&record).unwrap();
        let decoded = JsonEncoder::decode(&encoded).unwrap();
        assert_eq!(decoded, record);
    }

    #[test]
    fn test_output_is_valid_json_object() {
        let record = TraceRecord {
            record_id: "rec-json-2".to_string(),
            target: "https://example.com".to_string(),
            method: "GET".to_string(),
            request_headers: HashMap::new(),
            request_body: None,
            response_headers: None,
            response_body: None,
            status_code: Some(204),
            started_at: Utc::now(),
            finished_at: None,
        };

        let encoded = JsonEncoder.encode(&record).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&encoded).unwrap();
        assert_eq!(value["recordId"], "rec-json-2");
        assert_eq!(value["statusCode"], 204);
    }
}
