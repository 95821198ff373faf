//! Response bodies and the result/pagination layer.
//!
//! Every response body may start with a preamble selected by header flags:
//! a 16-byte tracing id (`TRACING`), then a string list of server warnings
//! (`WARNING`). Custom payloads and compressed bodies are rejected.
//! [`ResponseBody::open`] consumes the preamble and leaves the reader at the
//! message proper.

mod page;
mod rows;

use tracing::warn;

use crate::codec::WireReader;
use crate::error::{CqlError, Result};
use crate::event::SchemaChange;
use crate::protocol::{Frame, ResultKind};

pub use page::Page;
pub use rows::{parse_rows_body, rows_flags, Column, Row, RowSet};

/// A response body with its preamble consumed.
#[derive(Debug)]
pub struct ResponseBody {
    /// Reader positioned after the preamble.
    pub reader: WireReader,
    /// Server warnings, empty unless the `WARNING` flag was set.
    pub warnings: Vec<String>,
    /// Tracing session id, when the `TRACING` flag was set.
    pub tracing_id: Option<[u8; 16]>,
}

impl ResponseBody {
    /// Consume the flag-selected preamble of `frame`'s body.
    ///
    /// Warnings are logged at `warn` as they are read.
    pub fn open(frame: &Frame) -> Result<Self> {
        let header = &frame.header;
        if header.is_compressed() {
            return Err(CqlError::unimplemented("compressed frame body"));
        }

        let mut reader = WireReader::new(frame.body_bytes());

        let tracing_id = if header.has_tracing() {
            Some(reader.read_uuid()?)
        } else {
            None
        };

        let warnings = if header.has_warnings() {
            let warnings = reader.read_string_list()?;
            for warning in &warnings {
                warn!(stream = frame.stream(), opcode = %frame.opcode(), "server warning: {}", warning);
            }
            warnings
        } else {
            Vec::new()
        };

        if header.has_custom_payload() {
            return Err(CqlError::unimplemented("custom payload"));
        }

        Ok(Self {
            reader,
            warnings,
            tracing_id,
        })
    }
}

/// A decoded `RESULT` body.
#[derive(Debug, Clone)]
pub enum ResultBody {
    Void,
    Rows(RowSet),
    /// Name of the keyspace now in use.
    SetKeyspace(String),
    /// Prepared results are recognized but not decoded.
    Prepared,
    SchemaChange(SchemaChange),
}

impl ResultBody {
    /// Kind tag of this result.
    pub fn kind(&self) -> ResultKind {
        match self {
            ResultBody::Void => ResultKind::Void,
            ResultBody::Rows(_) => ResultKind::Rows,
            ResultBody::SetKeyspace(_) => ResultKind::SetKeyspace,
            ResultBody::Prepared => ResultKind::Prepared,
            ResultBody::SchemaChange(_) => ResultKind::SchemaChange,
        }
    }
}

/// Decode a `RESULT` body: the kind int, then the kind-specific payload.
pub fn parse_result(reader: &mut WireReader) -> Result<ResultBody> {
    let kind = ResultKind::try_from(reader.read_int()?)?;
    let body = match kind {
        ResultKind::Void => ResultBody::Void,
        ResultKind::Rows => ResultBody::Rows(parse_rows_body(reader)?),
        ResultKind::SetKeyspace => ResultBody::SetKeyspace(reader.read_string()?),
        ResultKind::Prepared => ResultBody::Prepared,
        ResultKind::SchemaChange => ResultBody::SchemaChange(SchemaChange::read(reader)?),
    };
    Ok(body)
}
