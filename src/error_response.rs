//! `ERROR` frame bodies.
//!
//! Body layout: `[int]` error code followed by a `[string]` message. Some
//! codes carry extra fields after the message; they are left unread.

use std::fmt;

use bytes::Bytes;

use crate::codec::WireReader;
use crate::error::Result;

/// Well-known error codes.
pub mod codes {
    pub const SERVER_ERROR: i32 = 0x0000;
    pub const PROTOCOL_ERROR: i32 = 0x000A;
    pub const BAD_CREDENTIALS: i32 = 0x0100;
    pub const UNAVAILABLE: i32 = 0x1000;
    pub const OVERLOADED: i32 = 0x1001;
    pub const IS_BOOTSTRAPPING: i32 = 0x1002;
    pub const TRUNCATE_ERROR: i32 = 0x1003;
    pub const WRITE_TIMEOUT: i32 = 0x1100;
    pub const READ_TIMEOUT: i32 = 0x1200;
    pub const READ_FAILURE: i32 = 0x1300;
    pub const FUNCTION_FAILURE: i32 = 0x1400;
    pub const WRITE_FAILURE: i32 = 0x1500;
    pub const SYNTAX_ERROR: i32 = 0x2000;
    pub const UNAUTHORIZED: i32 = 0x2100;
    pub const INVALID: i32 = 0x2200;
    pub const CONFIG_ERROR: i32 = 0x2300;
    pub const ALREADY_EXISTS: i32 = 0x2400;
    pub const UNPREPARED: i32 = 0x2500;
}

/// Structured `ERROR` response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorResponse {
    /// Protocol error code.
    pub code: i32,
    /// Server-supplied message.
    pub message: String,
}

impl ErrorResponse {
    /// Create an error response.
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Parse an `ERROR` body.
    pub fn parse(body: Bytes) -> Result<Self> {
        let mut reader = WireReader::new(body);
        Self::read(&mut reader)
    }

    /// Read an error from a positioned reader.
    pub fn read(reader: &mut WireReader) -> Result<Self> {
        let code = reader.read_int()?;
        let message = reader.read_string()?;
        Ok(Self { code, message })
    }

    /// Human-readable name of the error code.
    pub fn kind(&self) -> &'static str {
        match self.code {
            codes::SERVER_ERROR => "server error",
            codes::PROTOCOL_ERROR => "protocol error",
            codes::BAD_CREDENTIALS => "bad credentials",
            codes::UNAVAILABLE => "unavailable",
            codes::OVERLOADED => "overloaded",
            codes::IS_BOOTSTRAPPING => "is bootstrapping",
            codes::TRUNCATE_ERROR => "truncate error",
            codes::WRITE_TIMEOUT => "write timeout",
            codes::READ_TIMEOUT => "read timeout",
            codes::READ_FAILURE => "read failure",
            codes::FUNCTION_FAILURE => "function failure",
            codes::WRITE_FAILURE => "write failure",
            codes::SYNTAX_ERROR => "syntax error",
            codes::UNAUTHORIZED => "unauthorized",
            codes::INVALID => "invalid query",
            codes::CONFIG_ERROR => "config error",
            codes::ALREADY_EXISTS => "already exists",
            codes::UNPREPARED => "unprepared",
            _ => "unknown error",
        }
    }
}

impl fmt::Display for ErrorResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[0x{:04X} {}] {}", self.code, self.kind(), self.message)
    }
}
