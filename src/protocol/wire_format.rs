//! Wire format encoding and decoding.
//!
//! Implements the 9-byte v4 frame header:
//! ```text
//! ┌─────────┬───────┬──────────┬────────┬──────────┐
//! │ Version │ Flags │ Stream   │ Opcode │ Length   │
//! │ 1 byte  │ 1 byte│ 2 bytes  │ 1 byte │ 4 bytes  │
//! │ dir|ver │       │ int16 BE │        │ uint32 BE│
//! └─────────┴───────┴──────────┴────────┴──────────┘
//! ```
//!
//! Bit 7 of the version byte is the direction (1 = response), the low seven
//! bits carry the protocol version.

use crate::error::{CqlError, Result};

use super::opcode::Opcode;

/// Header size in bytes (fixed, exactly 9).
pub const HEADER_SIZE: usize = 9;

/// Protocol version spoken by this client.
pub const PROTOCOL_VERSION: u8 = 4;

/// Maximum body length allowed by the protocol (256 MB).
pub const MAX_FRAME_LENGTH: u32 = 256 * 1024 * 1024;

/// Number of usable request stream ids (0..32768).
pub const MAX_STREAMS: usize = 32768;

/// Direction bit in the version byte.
pub const DIRECTION_RESPONSE: u8 = 0b1000_0000;

/// Mask for the version number in the version byte.
pub const VERSION_MASK: u8 = 0b0111_1111;

/// Flag constants for the header flags byte.
pub mod flags {
    /// Body is compressed.
    pub const COMPRESSION: u8 = 0x01;
    /// Tracing requested / tracing id present.
    pub const TRACING: u8 = 0x02;
    /// Custom payload present.
    pub const CUSTOM_PAYLOAD: u8 = 0x04;
    /// Warnings present.
    pub const WARNING: u8 = 0x08;

    /// Check if a specific flag is set.
    #[inline]
    pub fn has_flag(flags: u8, flag: u8) -> bool {
        flags & flag != 0
    }
}

/// Decoded frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// Raw version byte (direction bit + version).
    pub version: u8,
    /// Flags byte (see `flags` module).
    pub flags: u8,
    /// Stream identifier; negative for server-pushed events.
    pub stream: i16,
    /// Message opcode.
    pub opcode: Opcode,
    /// Body length in bytes.
    pub length: u32,
}

impl Header {
    /// Create a request header (direction bit clear).
    pub fn request(version: u8, stream: i16, opcode: Opcode, length: u32) -> Self {
        Self {
            version: version & VERSION_MASK,
            flags: 0,
            stream,
            opcode,
            length,
        }
    }

    /// Create a response header (direction bit set).
    pub fn response(version: u8, flags: u8, stream: i16, opcode: Opcode, length: u32) -> Self {
        Self {
            version: (version & VERSION_MASK) | DIRECTION_RESPONSE,
            flags,
            stream,
            opcode,
            length,
        }
    }

    /// Encode header to bytes (Big Endian).
    ///
    /// # Example
    ///
    /// ```
    /// use cqlwire_client::protocol::{Header, Opcode};
    ///
    /// let header = Header::request(4, 1, Opcode::Options, 0);
    /// assert_eq!(header.encode(), [0x04, 0, 0, 1, 0x05, 0, 0, 0, 0]);
    /// ```
    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        self.encode_into(&mut buf);
        buf
    }

    /// Encode header into an existing buffer.
    ///
    /// # Panics
    ///
    /// Panics if buffer is smaller than `HEADER_SIZE` (9 bytes).
    pub fn encode_into(&self, buf: &mut [u8]) {
        debug_assert!(buf.len() >= HEADER_SIZE);
        buf[0] = self.version;
        buf[1] = self.flags;
        buf[2..4].copy_from_slice(&self.stream.to_be_bytes());
        buf[4] = self.opcode as u8;
        buf[5..9].copy_from_slice(&self.length.to_be_bytes());
    }

    /// Decode header from bytes.
    ///
    /// Returns `Ok(None)` if the buffer is too short, and an error for an
    /// unknown opcode.
    pub fn decode(buf: &[u8]) -> Result<Option<Self>> {
        if buf.len() < HEADER_SIZE {
            return Ok(None);
        }
        Ok(Some(Self {
            version: buf[0],
            flags: buf[1],
            stream: i16::from_be_bytes([buf[2], buf[3]]),
            opcode: Opcode::try_from(buf[4])?,
            length: u32::from_be_bytes([buf[5], buf[6], buf[7], buf[8]]),
        }))
    }

    /// Validate an inbound header.
    ///
    /// Checks:
    /// - Direction bit marks a response
    /// - Version matches the negotiated version
    /// - Body length doesn't exceed max
    pub fn validate(&self, expected_version: u8, max_length: u32) -> Result<()> {
        if !self.is_response() {
            return Err(CqlError::Protocol(format!(
                "expected response frame, got request direction (stream {})",
                self.stream
            )));
        }

        if self.protocol_version() != expected_version {
            return Err(CqlError::Protocol(format!(
                "protocol version mismatch: expected {}, got {}",
                expected_version,
                self.protocol_version()
            )));
        }

        if self.length > max_length {
            return Err(CqlError::Protocol(format!(
                "Frame length {} exceeds maximum {}",
                self.length, max_length
            )));
        }

        Ok(())
    }

    /// Protocol version without the direction bit.
    #[inline]
    pub fn protocol_version(&self) -> u8 {
        self.version & VERSION_MASK
    }

    /// Check if this is a response.
    #[inline]
    pub fn is_response(&self) -> bool {
        self.version & DIRECTION_RESPONSE != 0
    }

    /// Check if the body is compressed.
    #[inline]
    pub fn is_compressed(&self) -> bool {
        flags::has_flag(self.flags, flags::COMPRESSION)
    }

    /// Check if a tracing id precedes the body.
    #[inline]
    pub fn has_tracing(&self) -> bool {
        flags::has_flag(self.flags, flags::TRACING)
    }

    /// Check if a custom payload precedes the body.
    #[inline]
    pub fn has_custom_payload(&self) -> bool {
        flags::has_flag(self.flags, flags::CUSTOM_PAYLOAD)
    }

    /// Check if a warning list precedes the body.
    #[inline]
    pub fn has_warnings(&self) -> bool {
        flags::has_flag(self.flags, flags::WARNING)
    }

    /// Check if this is a server-pushed event (negative stream id).
    #[inline]
    pub fn is_event(&self) -> bool {
        self.stream < 0
    }
}
