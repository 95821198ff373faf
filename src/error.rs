//! Error types for cqlwire-client.

use thiserror::Error;

use crate::error_response::ErrorResponse;

/// Main error type for all cqlwire operations.
#[derive(Debug, Error)]
pub enum CqlError {
    /// The server answered with an `ERROR` frame.
    #[error("Server error: {0}")]
    Server(ErrorResponse),

    /// Malformed or truncated bytes, or an unknown wire code.
    #[error("Decode error: {0}")]
    Decode(String),

    /// Protocol violation (unexpected opcode, bad header, frame too large).
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// A recognized wire construct this client does not support.
    #[error("Unimplemented: {0}")]
    Unimplemented(String),

    /// Connection closed, either locally or by the transport.
    #[error("Connection closed")]
    ConnectionClosed,

    /// Every stream id in [0, 32768) is in flight.
    #[error("All stream ids are in use")]
    StreamIdsExhausted,

    /// `next()` was called on the last page of a result.
    #[error("No more pages")]
    NoMorePages,

    /// I/O error in the transport adapter.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration could not be parsed.
    #[error("Config error: {0}")]
    Config(#[from] serde_json::Error),
}

impl CqlError {
    /// Shorthand for a decode error.
    pub(crate) fn decode(msg: impl Into<String>) -> Self {
        CqlError::Decode(msg.into())
    }

    /// Shorthand for an unimplemented-feature error.
    pub(crate) fn unimplemented(what: impl Into<String>) -> Self {
        CqlError::Unimplemented(what.into())
    }

    /// Returns the server error, if this is one.
    pub fn server_error(&self) -> Option<&ErrorResponse> {
        match self {
            CqlError::Server(resp) => Some(resp),
            _ => None,
        }
    }
}

impl From<ErrorResponse> for CqlError {
    fn from(resp: ErrorResponse) -> Self {
        CqlError::Server(resp)
    }
}

/// Result type alias using CqlError.
pub type Result<T> = std::result::Result<T, CqlError>;
