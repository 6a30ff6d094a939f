//! Protocol module - wire framing for the record stream.
//!
//! This module implements the byte-stream framing used between the tracer
//! and its observer:
//! - 8-byte big-endian length prefix encoding
//! - Frame buffer for accumulating partial reads

mod frame;
mod frame_buffer;

pub use frame::{
    decode_length, encode_frame, encode_length, DEFAULT_MAX_PAYLOAD_SIZE, FRAME_HEADER_SIZE,
};
pub use frame_buffer::FrameBuffer;
