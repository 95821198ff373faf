//! Protocol module - wire format, framing, and frame types.
//!
//! This module implements the binary framing of the native protocol:
//! - 9-byte v4 header encoding/decoding
//! - Opcodes and result kinds
//! - Frame buffer for accumulating partial reads
//! - Frame struct with typed accessors

mod frame;
mod frame_buffer;
mod opcode;
mod wire_format;

pub use frame::{build_frame, Frame};
pub use frame_buffer::{FrameBuffer, DEFAULT_BUFFER_CAPACITY};
pub use opcode::{Opcode, ResultKind};
pub use wire_format::{
    flags, Header, DIRECTION_RESPONSE, HEADER_SIZE, MAX_FRAME_LENGTH, MAX_STREAMS,
    PROTOCOL_VERSION, VERSION_MASK,
};
