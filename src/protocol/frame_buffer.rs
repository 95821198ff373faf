//! Frame buffer for accumulating partial reads.
//!
//! Uses `bytes::BytesMut` for zero-copy buffer management.
//! Implements a state machine for handling fragmented frames:
//! - `WaitingForHeader`: Need at least 9 bytes
//! - `WaitingForBody`: Header parsed, need N more body bytes
//!
//! # Example
//!
//! ```ignore
//! use cqlwire_client::protocol::FrameBuffer;
//!
//! let mut buffer = FrameBuffer::new();
//!
//! // Data arrives in chunks from the socket
//! let frames = buffer.push(&chunk)?;
//!
//! for frame in frames {
//!     println!("stream {} opcode {}", frame.stream(), frame.opcode());
//! }
//! ```

use bytes::{Bytes, BytesMut};

use super::wire_format::{Header, HEADER_SIZE, MAX_FRAME_LENGTH};
use super::Frame;
use crate::error::{CqlError, Result};

/// Default initial buffer capacity (64 KB).
pub const DEFAULT_BUFFER_CAPACITY: usize = 64 * 1024;

/// State machine for frame parsing.
#[derive(Debug, Clone)]
enum State {
    /// Waiting for complete header (need 9 bytes).
    WaitingForHeader,
    /// Header parsed, waiting for body bytes.
    WaitingForBody { header: Header, remaining: u32 },
}

/// Buffer for accumulating incoming bytes and extracting complete frames.
///
/// All data is stored in a single `BytesMut` buffer; extracted bodies are
/// frozen slices of it, so a body stays valid after the buffer moves on.
pub struct FrameBuffer {
    /// Accumulated bytes from socket reads.
    buffer: BytesMut,
    /// Current parsing state.
    state: State,
    /// Maximum allowed body length.
    max_frame_length: u32,
}

impl FrameBuffer {
    /// Create a new frame buffer with default settings.
    ///
    /// Default capacity: 64KB, max body: 256MB.
    pub fn new() -> Self {
        Self::with_capacity_and_max_length(DEFAULT_BUFFER_CAPACITY, MAX_FRAME_LENGTH)
    }

    /// Create a new frame buffer with a custom max body length.
    pub fn with_max_length(max_frame_length: u32) -> Self {
        Self::with_capacity_and_max_length(DEFAULT_BUFFER_CAPACITY, max_frame_length)
    }

    /// Create a new frame buffer with custom capacity and max body length.
    pub fn with_capacity_and_max_length(capacity: usize, max_frame_length: u32) -> Self {
        Self {
            buffer: BytesMut::with_capacity(capacity),
            state: State::WaitingForHeader,
            max_frame_length,
        }
    }

    /// Push data into the buffer and extract all complete frames.
    ///
    /// Returns the complete frames in arrival order (possibly none). Partial
    /// data is kept for the next push.
    ///
    /// # Errors
    ///
    /// Returns error if a body exceeds `max_frame_length` or a header carries
    /// an unknown opcode.
    pub fn push(&mut self, data: &[u8]) -> Result<Vec<Frame>> {
        self.buffer.extend_from_slice(data);

        let mut frames = Vec::new();
        while let Some(frame) = self.try_extract_one()? {
            frames.push(frame);
        }

        Ok(frames)
    }

    /// Try to extract a single frame from the buffer.
    fn try_extract_one(&mut self) -> Result<Option<Frame>> {
        match &self.state {
            State::WaitingForHeader => {
                // Peek, don't consume yet
                let header = match Header::decode(&self.buffer)? {
                    Some(header) => header,
                    None => return Ok(None),
                };

                if header.length > self.max_frame_length {
                    return Err(CqlError::Protocol(format!(
                        "Frame length {} exceeds maximum {}",
                        header.length, self.max_frame_length
                    )));
                }

                let _ = self.buffer.split_to(HEADER_SIZE);

                if header.length == 0 {
                    return Ok(Some(Frame::new(header, Bytes::new())));
                }

                self.state = State::WaitingForBody {
                    header,
                    remaining: header.length,
                };

                self.try_extract_one()
            }

            State::WaitingForBody { header, remaining } => {
                let remaining = *remaining as usize;

                if self.buffer.len() < remaining {
                    return Ok(None);
                }

                let body = self.buffer.split_to(remaining).freeze();
                let header = *header;

                self.state = State::WaitingForHeader;

                Ok(Some(Frame::new(header, body)))
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

    #[cfg(test)]
    fn state_name(&self) -> &'static str {
        match &self.state {
            State::WaitingForHeader => "WaitingForHeader",
            State::WaitingForBody { .. } => "WaitingForBody",
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
    use crate::protocol::{flags, Opcode};

    fn make_frame_bytes(stream: i16, opcode: Opcode, body: &[u8]) -> Vec<u8> {
        Frame::response(4, 0, stream, opcode, Bytes::copy_from_slice(body)).encode()
    }

    #[test]
    fn test_single_complete_frame() {
        let mut buffer = FrameBuffer::new();
        let frames = buffer
            .push(&make_frame_bytes(42, Opcode::Result, b"hello"))
            .unwrap();

        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].stream(), 42);
        assert_eq!(frames[0].body(), b"hello");
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_multiple_frames_in_one_push() {
        let mut buffer = FrameBuffer::new();

        let mut combined = make_frame_bytes(1, Opcode::Result, b"first");
        combined.extend(make_frame_bytes(-1, Opcode::Event, b"second"));
        combined.extend(make_frame_bytes(3, Opcode::Ready, b""));

        let frames = buffer.push(&combined).unwrap();

        assert_eq!(frames.len(), 3);
        assert_eq!(frames[0].stream(), 1);
        assert_eq!(frames[1].stream(), -1);
        assert_eq!(frames[2].opcode(), Opcode::Ready);
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_fragmented_header() {
        let mut buffer = FrameBuffer::new();
        let bytes = make_frame_bytes(7, Opcode::Result, b"test");

        assert!(buffer.push(&bytes[..5]).unwrap().is_empty());
        assert_eq!(buffer.state_name(), "WaitingForHeader");

        let frames = buffer.push(&bytes[5..]).unwrap();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].stream(), 7);
    }

    #[test]
    fn test_fragmented_body() {
        let mut buffer = FrameBuffer::new();
        let body = b"this is a longer body that will be fragmented";
        let bytes = make_frame_bytes(2, Opcode::Result, body);

        let split = HEADER_SIZE + 10;
        assert!(buffer.push(&bytes[..split]).unwrap().is_empty());
        assert_eq!(buffer.state_name(), "WaitingForBody");

        let frames = buffer.push(&bytes[split..]).unwrap();
        assert_eq!(frames[0].body(), body);
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_max_length_validation() {
        let mut buffer = FrameBuffer::with_max_length(100);
        let header = Header::response(4, flags::WARNING, 0, Opcode::Result, 1000);

        let err = buffer.push(&header.encode()).unwrap_err();
        assert!(err.to_string().contains("exceeds maximum"));
    }

    #[test]
    fn test_unknown_opcode_is_error() {
        let mut buffer = FrameBuffer::new();
        let raw = [0x84, 0, 0, 1, 0x77, 0, 0, 0, 0];
        assert!(buffer.push(&raw).is_err());
    }

    #[test]
    fn test_clear_resets_state() {
        let mut buffer = FrameBuffer::new();
        let bytes = make_frame_bytes(1, Opcode::Result, b"test");

        buffer.push(&bytes[..HEADER_SIZE]).unwrap();
        assert_eq!(buffer.state_name(), "WaitingForBody");

        buffer.clear();
        assert_eq!(buffer.state_name(), "WaitingForHeader");
        assert!(buffer.is_empty());
        assert_eq!(buffer.len(), 0);
    }

    #[test]
    fn test_byte_at_a_time() {
        let mut buffer = FrameBuffer::new();
        let bytes = make_frame_bytes(9, Opcode::Result, b"hi");

        let mut all = Vec::new();
        for byte in &bytes {
            all.extend(buffer.push(&[*byte]).unwrap());
        }

        assert_eq!(all.len(), 1);
        assert_eq!(all[0].body(), b"hi");
    }
}
