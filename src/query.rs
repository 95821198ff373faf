//! Statements and `QUERY` body construction.
//!
//! A [`Statement`] captures everything needed to (re)issue a query: text,
//! consistency, bound values, page size and paging state. Pages keep their
//! statement so the next page is a replay with a new paging state.
//!
//! Bound values are passed already serialized; value encoding is the
//! caller's concern.

use bytes::Bytes;

use crate::codec::WireWriter;
use crate::error::{CqlError, Result};

/// Consistency levels and their wire codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u16)]
pub enum Consistency {
    Any = 0x0000,
    One = 0x0001,
    Two = 0x0002,
    Three = 0x0003,
    Quorum = 0x0004,
    All = 0x0005,
    #[default]
    LocalQuorum = 0x0006,
    EachQuorum = 0x0007,
    Serial = 0x0008,
    LocalSerial = 0x0009,
    LocalOne = 0x000A,
}

/// Query flags for the v4 `QUERY` body.
pub mod query_flags {
    /// Bound values follow.
    pub const VALUES: u8 = 0x01;
    /// Result page size follows.
    pub const PAGE_SIZE: u8 = 0x04;
    /// Paging state follows.
    pub const PAGING_STATE: u8 = 0x08;
}

/// A query and its execution parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    /// CQL text.
    pub query: String,
    /// Consistency; `None` uses the builder's default.
    pub consistency: Option<Consistency>,
    /// Serialized bound values; `None` entries are nulls.
    pub values: Vec<Option<Bytes>>,
    /// Rows per page; `None` lets the server decide.
    pub page_size: Option<i32>,
    /// Continuation token from a previous page.
    pub paging_state: Option<Bytes>,
}

impl Statement {
    /// Create a statement with no values and default options.
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            consistency: None,
            values: Vec::new(),
            page_size: None,
            paging_state: None,
        }
    }

    /// Set the consistency level.
    pub fn consistency(mut self, consistency: Consistency) -> Self {
        self.consistency = Some(consistency);
        self
    }

    /// Set the serialized bound values.
    pub fn values(mut self, values: Vec<Option<Bytes>>) -> Self {
        self.values = values;
        self
    }

    /// Set the page size.
    pub fn page_size(mut self, page_size: i32) -> Self {
        self.page_size = Some(page_size);
        self
    }

    /// Copy of this statement resuming from `paging_state`.
    pub fn with_paging_state(&self, paging_state: Bytes) -> Self {
        Self {
            paging_state: Some(paging_state),
            ..self.clone()
        }
    }
}

/// Serializes statements into `QUERY` bodies.
pub trait QueryBuilder: Send + Sync {
    /// Build the body for `statement`.
    fn build(&self, statement: &Statement) -> Result<Bytes>;
}

/// Default v4 `QUERY` body encoder.
#[derive(Debug, Clone, Default)]
pub struct SimpleQueryBuilder {
    default_consistency: Consistency,
}

impl SimpleQueryBuilder {
    /// Create a builder with `LOCAL_QUORUM` as the default consistency.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a builder using `consistency` when a statement sets none.
    pub fn with_default_consistency(consistency: Consistency) -> Self {
        Self {
            default_consistency: consistency,
        }
    }
}

impl QueryBuilder for SimpleQueryBuilder {
    fn build(&self, statement: &Statement) -> Result<Bytes> {
        let mut writer = WireWriter::with_capacity(statement.query.len() + 32);
        let consistency = statement.consistency.unwrap_or(self.default_consistency);

        writer
            .write_long_string(&statement.query)
            .write_short(consistency as u16);

        let mut flags = 0u8;
        if !statement.values.is_empty() {
            flags |= query_flags::VALUES;
        }
        if statement.page_size.is_some() {
            flags |= query_flags::PAGE_SIZE;
        }
        if statement.paging_state.is_some() {
            flags |= query_flags::PAGING_STATE;
        }
        writer.write_byte(flags);

        if !statement.values.is_empty() {
            let count = u16::try_from(statement.values.len()).map_err(|_| {
                CqlError::Protocol(format!(
                    "{} bound values, a query takes at most {}",
                    statement.values.len(),
                    u16::MAX
                ))
            })?;
            writer.write_short(count);
            for value in &statement.values {
                writer.write_bytes(value.as_deref());
            }
        }
        if let Some(page_size) = statement.page_size {
            writer.write_int(page_size);
        }
        if let Some(paging_state) = &statement.paging_state {
            writer.write_bytes(Some(&paging_state[..]));
        }

        Ok(writer.finish())
    }
}
