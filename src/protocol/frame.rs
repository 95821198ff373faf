//! Frame struct with typed accessors.
//!
//! Represents a complete protocol frame with header and body.
//! Uses `bytes::Bytes` for zero-copy body sharing.
//!
//! # Example
//!
//! ```
//! use cqlwire_client::protocol::{Frame, Opcode};
//! use bytes::Bytes;
//!
//! let frame = Frame::request(4, 7, Opcode::Options, Bytes::new()).unwrap();
//!
//! assert_eq!(frame.stream(), 7);
//! assert_eq!(frame.opcode(), Opcode::Options);
//! assert!(frame.body().is_empty());
//! ```

use bytes::Bytes;

use super::opcode::Opcode;
use super::wire_format::{Header, HEADER_SIZE};
use crate::error::{CqlError, Result};

/// A complete protocol frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Decoded header.
    pub header: Header,
    /// Body bytes (zero-copy via `bytes::Bytes`).
    pub body: Bytes,
}

impl Frame {
    /// Create a new frame from header and body.
    pub fn new(header: Header, body: Bytes) -> Self {
        Self { header, body }
    }

    /// Create a request frame; the header length is taken from the body.
    ///
    /// Fails with [`CqlError::Protocol`] if the body length does not fit the
    /// 32-bit length field.
    pub fn request(version: u8, stream: i16, opcode: Opcode, body: Bytes) -> Result<Self> {
        let length = u32::try_from(body.len()).map_err(|_| {
            CqlError::Protocol(format!("body of {} bytes does not fit a frame", body.len()))
        })?;
        let header = Header::request(version, stream, opcode, length);
        Ok(Self { header, body })
    }

    /// Create a response frame; the header length is taken from the body.
    ///
    /// Used by in-process peers. The length saturates, and a saturated
    /// length is always rejected by [`Header::validate`].
    pub fn response(version: u8, flags: u8, stream: i16, opcode: Opcode, body: Bytes) -> Self {
        let length = u32::try_from(body.len()).unwrap_or(u32::MAX);
        let header = Header::response(version, flags, stream, opcode, length);
        Self { header, body }
    }

    /// Get a reference to the body bytes.
    #[inline]
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Get a clone of the body as Bytes (cheap, zero-copy).
    #[inline]
    pub fn body_bytes(&self) -> Bytes {
        self.body.clone()
    }

    /// Get the opcode.
    #[inline]
    pub fn opcode(&self) -> Opcode {
        self.header.opcode
    }

    /// Get the stream id.
    #[inline]
    pub fn stream(&self) -> i16 {
        self.header.stream
    }

    /// Get the flags byte.
    #[inline]
    pub fn flags(&self) -> u8 {
        self.header.flags
    }

    /// Check if this is a server-pushed event (negative stream id).
    #[inline]
    pub fn is_event(&self) -> bool {
        self.header.is_event()
    }

    /// Encode header and body into one contiguous buffer.
    pub fn encode(&self) -> Vec<u8> {
        build_frame(&self.header, &self.body)
    }
}

/// Build a complete frame as a single byte vector.
///
/// # Example
///
/// ```
/// use cqlwire_client::protocol::{build_frame, Header, Opcode, HEADER_SIZE};
///
/// let header = Header::request(4, 1, Opcode::Query, 5);
/// let bytes = build_frame(&header, b"hello");
/// assert_eq!(bytes.len(), HEADER_SIZE + 5);
/// ```
pub fn build_frame(header: &Header, body: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(HEADER_SIZE + body.len());
    buf.extend_from_slice(&header.encode());
    buf.extend_from_slice(body);
    buf
}
