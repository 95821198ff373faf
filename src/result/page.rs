//! One page of a rows result, bound to the connection that produced it.

use std::sync::Arc;

use bytes::Bytes;

use super::rows::{Column, Row, RowSet};
use crate::connection::Connection;
use crate::error::{CqlError, Result};
use crate::query::Statement;

/// A page of rows.
///
/// Holds the issuing connection and statement so [`Page::next`] can replay
/// the statement with this page's paging state.
#[derive(Debug, Clone)]
pub struct Page {
    columns: Arc<[Column]>,
    rows: Vec<Row>,
    paging_state: Option<Bytes>,
    warnings: Vec<String>,
    connection: Connection,
    statement: Statement,
}

impl Page {
    pub(crate) fn new(
        set: RowSet,
        warnings: Vec<String>,
        connection: Connection,
        statement: Statement,
    ) -> Self {
        Self {
            columns: set.columns,
            rows: set.rows,
            paging_state: set.paging_state,
            warnings,
            connection,
            statement,
        }
    }

    /// Column metadata shared by every row.
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Rows on this page.
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Take the rows.
    pub fn into_rows(self) -> Vec<Row> {
        self.rows
    }

    /// Number of rows on this page.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// True when this page carries no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// True when no further pages exist.
    pub fn is_last(&self) -> bool {
        self.paging_state.is_none()
    }

    /// Continuation token for the next page.
    pub fn paging_state(&self) -> Option<&Bytes> {
        self.paging_state.as_ref()
    }

    /// Warnings the server attached to this response.
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// The statement that produced this page.
    pub fn statement(&self) -> &Statement {
        &self.statement
    }

    /// Fetch the following page.
    ///
    /// Fails with [`CqlError::NoMorePages`] on the last page.
    pub async fn next(&self) -> Result<Page> {
        let paging_state = self.paging_state.clone().ok_or(CqlError::NoMorePages)?;
        let statement = self.statement.with_paging_state(paging_state);
        match self.connection.query(statement).await? {
            Some(page) => Ok(page),
            None => Err(CqlError::Protocol(
                "continuation query did not return rows".to_string(),
            )),
        }
    }
}

impl IntoIterator for Page {
    type Item = Row;
    type IntoIter = std::vec::IntoIter<Row>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.into_iter()
    }
}

impl<'a> IntoIterator for &'a Page {
    type Item = &'a Row;
    type IntoIter = std::slice::Iter<'a, Row>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}
