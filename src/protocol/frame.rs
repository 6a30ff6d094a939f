//! Length-prefix frame encoding.
//!
//! A frame on the wire is:
//! ```text
//! ┌────────────────────┬────────────────┐
//! │ Payload length     │ Payload        │
//! │ 8 bytes, uint64 BE │ length bytes   │
//! └────────────────────┴────────────────┘
//! ```
//!
//! The payload is an opaque, self-contained encoded record. The length
//! prefix is always big-endian; there is no other framing state, so encode
//! is a pure function and decode lives in the incremental
//! [`FrameBuffer`](super::FrameBuffer).

/// Frame header size in bytes (fixed, exactly 8).
pub const FRAME_HEADER_SIZE: usize = 8;

/// Default maximum payload size accepted by the decoder (1 GiB).
///
/// A declared length beyond the decoder's limit is treated as a corrupt
/// stream, not a large frame.
pub const DEFAULT_MAX_PAYLOAD_SIZE: u64 = 1_073_741_824;

/// Encode the length prefix for a payload of `len` bytes.
#[inline]
pub fn encode_length(len: usize) -> [u8; FRAME_HEADER_SIZE] {
    (len as u64).to_be_bytes()
}

/// Decode a length prefix from the start of `buf`.
///
/// Returns `None` if fewer than [`FRAME_HEADER_SIZE`] bytes are available.
#[inline]
pub fn decode_length(buf: &[u8]) -> Option<u64> {
    if buf.len() < FRAME_HEADER_SIZE {
        return None;
    }
    let mut header = [0u8; FRAME_HEADER_SIZE];
    header.copy_from_slice(&buf[..FRAME_HEADER_SIZE]);
    Some(u64::from_be_bytes(header))
}

/// Build a complete frame as a single byte vector.
///
/// # Example
///
/// ```
/// use tracewire::protocol::{encode_frame, FRAME_HEADER_SIZE};
///
/// let frame = encode_frame(b"hello");
/// assert_eq!(frame.len(), FRAME_HEADER_SIZE + 5);
/// assert_eq!(&frame[..FRAME_HEADER_SIZE], &[0, 0, 0, 0, 0, 0, 0, 5]);
/// assert_eq!(&frame[FRAME_HEADER_SIZE..], b"hello");
/// ```
pub fn encode_frame(payload: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(FRAME_HEADER_SIZE + payload.len());
    buf.extend_from_slice(&encode_length(payload.len()));
    buf.extend_from_slice(payload);
    buf
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_length_roundtrip() {
        let header = encode_length(0x0102030405060708);
        assert_eq!(decode_length(&header), Some(0x0102030405060708));
    }

    #[test]
    fn test_length_big_endian_byte_order() {
        let header = encode_length(0x0102030405060708);
        assert_eq!(
            header,
            [0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08]
        );
    }

    #[test]
    fn test_decode_too_short_buffer() {
        let buf = [0u8; FRAME_HEADER_SIZE - 1];
        assert!(decode_length(&buf).is_none());
    }

    #[test]
    fn test_encode_frame_layout() {
        let frame = encode_frame(b"abc");
        assert_eq!(frame.len(), FRAME_HEADER_SIZE + 3);
        assert_eq!(decode_length(&frame), Some(3));
        assert_eq!(&frame[FRAME_HEADER_SIZE..], b"abc");
    }

    #[test]
    fn test_encode_frame_empty_payload() {
        let frame = encode_frame(b"");
        assert_eq!(frame.len(), FRAME_HEADER_SIZE);
        assert_eq!(decode_length(&frame), Some(0));
    }

    #[test]
    fn test_frame_roundtrip_through_decoder() {
        use super::super::FrameBuffer;

        let payload = b"self-contained record bytes";
        let frame = encode_frame(payload);

        let mut buffer = FrameBuffer::new();
        let payloads = buffer.push(&frame).unwrap();

        assert_eq!(payloads.len(), 1);
        assert_eq!(&payloads[0][..], payload);
    }
}
