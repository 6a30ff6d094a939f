//! Frame buffer for accumulating partial reads.
//!
//! Uses `bytes::BytesMut` for zero-copy buffer management.
//! Implements a state machine for handling fragmented frames:
//! - `WaitingForHeader`: Need at least 8 bytes
//! - `WaitingForPayload`: Length parsed, need N more payload bytes
//!
//! The underlying stream may fragment or coalesce frames arbitrarily; the
//! buffer extracts exactly the payloads that are complete and retains any
//! partial tail for the next push. It never blocks and never discards data.
//!
//! # Example
//!
//! ```
//! use tracewire::protocol::{encode_frame, FrameBuffer};
//!
//! let mut buffer = FrameBuffer::new();
//!
//! // Data arrives in chunks from the stream
//! let frame = encode_frame(b"record");
//! let payloads = buffer.push(&frame[..3]).unwrap();
//! assert!(payloads.is_empty());
//!
//! let payloads = buffer.push(&frame[3..]).unwrap();
//! assert_eq!(&payloads[0][..], b"record");
//! ```

use bytes::{Bytes, BytesMut};

use super::frame::{decode_length, DEFAULT_MAX_PAYLOAD_SIZE, FRAME_HEADER_SIZE};
use crate::error::{Result, TracewireError};

/// State machine for frame parsing.
#[derive(Debug, Clone)]
enum State {
    /// Waiting for a complete length prefix (need 8 bytes).
    WaitingForHeader,
    /// Length parsed, waiting for payload bytes.
    WaitingForPayload { remaining: usize },
}

/// Buffer for accumulating incoming bytes and extracting complete payloads.
///
/// Uses a state machine to handle partial reads efficiently.
/// All data is stored in a single `BytesMut` buffer to minimize allocations.
pub struct FrameBuffer {
    /// Accumulated bytes from stream reads.
    buffer: BytesMut,
    /// Current parsing state.
    state: State,
    /// Maximum allowed payload size.
    max_payload: u64,
}

impl FrameBuffer {
    /// Create a new frame buffer with default settings.
    ///
    /// Default capacity: 64KB, max payload: 1GB.
    pub fn new() -> Self {
        Self::with_max_payload(DEFAULT_MAX_PAYLOAD_SIZE)
    }

    /// Create a new frame buffer with a custom max payload size.
    pub fn with_max_payload(max_payload: u64) -> Self {
        Self {
            buffer: BytesMut::with_capacity(64 * 1024),
            state: State::WaitingForHeader,
            max_payload,
        }
    }

    /// Push data into the buffer and extract all complete payloads.
    ///
    /// This is the main API for processing incoming data from the stream.
    /// Returns the payloads of every frame completed by this chunk, in wire
    /// order; partial data is buffered internally for the next push.
    ///
    /// # Errors
    ///
    /// Returns [`TracewireError::Protocol`] if a declared payload length
    /// exceeds the configured maximum (corrupt or hostile stream).
    pub fn push(&mut self, data: &[u8]) -> Result<Vec<Bytes>> {
        self.buffer.extend_from_slice(data);

        let mut payloads = Vec::new();
        while let Some(payload) = self.try_extract_one()? {
            payloads.push(payload);
        }

        Ok(payloads)
    }

    /// Try to extract a single payload from the buffer.
    ///
    /// Returns:
    /// - `Ok(Some(payload))` if a complete frame was extracted
    /// - `Ok(None)` if more data is needed
    /// - `Err(...)` on a protocol violation (declared length too large)
    fn try_extract_one(&mut self) -> Result<Option<Bytes>> {
        match &self.state {
            State::WaitingForHeader => {
                if self.buffer.len() < FRAME_HEADER_SIZE {
                    return Ok(None);
                }

                let length = decode_length(&self.buffer[..FRAME_HEADER_SIZE])
                    .expect("buffer has enough bytes");

                if length > self.max_payload {
                    return Err(TracewireError::Protocol(format!(
                        "Declared payload size {} exceeds maximum {}",
                        length, self.max_payload
                    )));
                }

                // Consume header bytes
                let _ = self.buffer.split_to(FRAME_HEADER_SIZE);

                if length == 0 {
                    // Empty payload, frame is complete
                    return Ok(Some(Bytes::new()));
                }

                self.state = State::WaitingForPayload {
                    remaining: length as usize,
                };

                // Try to get the payload immediately
                self.try_extract_one()
            }

            State::WaitingForPayload { remaining } => {
                let remaining = *remaining;

                if self.buffer.len() < remaining {
                    return Ok(None);
                }

                // Extract payload (zero-copy freeze)
                let payload = self.buffer.split_to(remaining).freeze();

                // Reset state for the next frame
                self.state = State::WaitingForHeader;

                Ok(Some(payload))
            }
        }
    }

    /// Get the number of buffered bytes.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Check if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Clear the buffer and reset state.
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.state = State::WaitingForHeader;
    }

    /// Get the current state for debugging.
    #[cfg(test)]
    fn state_name(&self) -> &'static str {
        match &self.state {
            State::WaitingForHeader => "WaitingForHeader",
            State::WaitingForPayload { .. } => "WaitingForPayload",
        }
    }
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::encode_frame;

    #[test]
    fn test_single_complete_frame() {
        let mut buffer = FrameBuffer::new();
        let frame = encode_frame(b"hello");

        let payloads = buffer.push(&frame).unwrap();

        assert_eq!(payloads.len(), 1);
        assert_eq!(&payloads[0][..], b"hello");
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_multiple_frames_in_one_push() {
        let mut buffer = FrameBuffer::new();

        let mut combined = Vec::new();
        combined.extend_from_slice(&encode_frame(b"first"));
        combined.extend_from_slice(&encode_frame(b"second"));
        combined.extend_from_slice(&encode_frame(b"third"));

        let payloads = buffer.push(&combined).unwrap();

        assert_eq!(payloads.len(), 3);
        assert_eq!(&payloads[0][..], b"first");
        assert_eq!(&payloads[1][..], b"second");
        assert_eq!(&payloads[2][..], b"third");
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_fragmented_header() {
        let mut buffer = FrameBuffer::new();
        let frame = encode_frame(b"test");

        // Push first 5 bytes of the 8-byte header
        let payloads = buffer.push(&frame[..5]).unwrap();
        assert!(payloads.is_empty());
        assert_eq!(buffer.state_name(), "WaitingForHeader");

        // Push rest of header and payload
        let payloads = buffer.push(&frame[5..]).unwrap();
        assert_eq!(payloads.len(), 1);
        assert_eq!(&payloads[0][..], b"test");
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_fragmented_payload() {
        let mut buffer = FrameBuffer::new();
        let payload = b"this is a longer payload that will be fragmented";
        let frame = encode_frame(payload);

        // Push header + partial payload
        let partial_len = FRAME_HEADER_SIZE + 10;
        let payloads = buffer.push(&frame[..partial_len]).unwrap();
        assert!(payloads.is_empty());
        assert_eq!(buffer.state_name(), "WaitingForPayload");

        // Push rest of payload
        let payloads = buffer.push(&frame[partial_len..]).unwrap();
        assert_eq!(payloads.len(), 1);
        assert_eq!(&payloads[0][..], &payload[..]);
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_empty_payload() {
        let mut buffer = FrameBuffer::new();
        let frame = encode_frame(b"");

        let payloads = buffer.push(&frame).unwrap();

        assert_eq!(payloads.len(), 1);
        assert!(payloads[0].is_empty());
    }

    #[test]
    fn test_byte_at_a_time() {
        let mut buffer = FrameBuffer::new();
        let frame = encode_frame(b"hi");

        let mut all_payloads = Vec::new();
        for byte in &frame {
            let payloads = buffer.push(&[*byte]).unwrap();
            all_payloads.extend(payloads);
        }

        assert_eq!(all_payloads.len(), 1);
        assert_eq!(&all_payloads[0][..], b"hi");
    }

    #[test]
    fn test_every_split_point_yields_same_output() {
        // Fragmentation invariance: any way of splitting one frame into two
        // chunks produces the same single payload.
        let payload = b"fragmentation invariant payload";
        let frame = encode_frame(payload);

        for split in 0..=frame.len() {
            let mut buffer = FrameBuffer::new();
            let mut payloads = buffer.push(&frame[..split]).unwrap();
            payloads.extend(buffer.push(&frame[split..]).unwrap());

            assert_eq!(payloads.len(), 1, "split at {}", split);
            assert_eq!(&payloads[0][..], &payload[..], "split at {}", split);
            assert!(buffer.is_empty(), "split at {}", split);
        }
    }

    #[test]
    fn test_mixed_complete_and_partial() {
        let mut buffer = FrameBuffer::new();

        let frame1 = encode_frame(b"first");
        let frame2 = encode_frame(b"second");

        // Push first complete frame + partial second
        let mut data = frame1.clone();
        data.extend_from_slice(&frame2[..5]);

        let payloads = buffer.push(&data).unwrap();
        assert_eq!(payloads.len(), 1);
        assert_eq!(&payloads[0][..], b"first");
        assert_eq!(buffer.state_name(), "WaitingForHeader");

        // Complete second frame
        let payloads = buffer.push(&frame2[5..]).unwrap();
        assert_eq!(payloads.len(), 1);
        assert_eq!(&payloads[0][..], b"second");
    }

    #[test]
    fn test_large_payload() {
        let mut buffer = FrameBuffer::new();
        let payload = vec![0xAB; 1024 * 1024]; // 1MB
        let frame = encode_frame(&payload);

        let payloads = buffer.push(&frame).unwrap();

        assert_eq!(payloads.len(), 1);
        assert_eq!(payloads[0].len(), 1024 * 1024);
        assert!(payloads[0].iter().all(|&b| b == 0xAB));
    }

    #[test]
    fn test_max_payload_validation() {
        let mut buffer = FrameBuffer::with_max_payload(100);

        // Header claiming a 1000-byte payload
        let header = super::super::frame::encode_length(1000);
        let result = buffer.push(&header);

        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("exceeds maximum"));
    }

    #[test]
    fn test_clear_resets_state() {
        let mut buffer = FrameBuffer::new();
        let frame = encode_frame(b"test");

        // Push full header + partial payload to enter WaitingForPayload
        buffer.push(&frame[..FRAME_HEADER_SIZE + 1]).unwrap();
        assert_eq!(buffer.state_name(), "WaitingForPayload");
        assert!(!buffer.is_empty());

        buffer.clear();

        assert_eq!(buffer.state_name(), "WaitingForHeader");
        assert!(buffer.is_empty());
    }
}
