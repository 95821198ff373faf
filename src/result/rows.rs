//! Rows result bodies: column metadata and decoded rows.
//!
//! Layout (v4):
//! ```text
//! <flags:int><columns_count:int>[<paging_state:bytes>]
//! [<global_keyspace:string><global_table:string>]
//! (<keyspace><table>)?<name:string><type:option>  x columns_count
//! <rows_count:int> (<cell:bytes> x columns_count) x rows_count
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;

use crate::codec::WireReader;
use crate::error::{CqlError, Result};
use crate::types::{decode_value, parse_value_type, Value, ValueType};

/// Rows metadata flags.
pub mod rows_flags {
    /// One keyspace/table pair applies to every column.
    pub const GLOBAL_TABLES_SPEC: i32 = 0x0001;
    /// A paging state follows; more pages are available.
    pub const HAS_MORE_PAGES: i32 = 0x0002;
    /// Column metadata omitted (prepared statements only).
    pub const NO_METADATA: i32 = 0x0004;
}

/// Column metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub keyspace: String,
    pub table: String,
    pub name: String,
    pub value_type: ValueType,
}

/// One row, positionally aligned with its result set's columns.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    columns: Arc<[Column]>,
    values: Vec<Value>,
}

impl Row {
    /// Create a row; `values` must line up with `columns`.
    pub fn new(columns: Arc<[Column]>, values: Vec<Value>) -> Self {
        debug_assert_eq!(columns.len(), values.len());
        Self { columns, values }
    }

    /// Value at column index `idx`.
    pub fn get(&self, idx: usize) -> Option<&Value> {
        self.values.get(idx)
    }

    /// Value of the column named `name`.
    ///
    /// With duplicate names the right-most column wins, matching `to_map`.
    pub fn get_by_name(&self, name: &str) -> Option<&Value> {
        self.columns
            .iter()
            .rposition(|c| c.name == name)
            .and_then(|idx| self.values.get(idx))
    }

    /// Columns of the owning result set.
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Values in column order.
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Take the values.
    pub fn into_values(self) -> Vec<Value> {
        self.values
    }

    /// Number of cells.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True for a row with no columns.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Name-to-value view. Later columns overwrite earlier ones of the same
    /// name.
    pub fn to_map(&self) -> HashMap<String, Value> {
        let mut map = HashMap::with_capacity(self.values.len());
        for (column, value) in self.columns.iter().zip(&self.values) {
            map.insert(column.name.clone(), value.clone());
        }
        map
    }
}

/// A decoded rows result.
#[derive(Debug, Clone)]
pub struct RowSet {
    pub columns: Arc<[Column]>,
    pub rows: Vec<Row>,
    /// Continuation token, present iff more pages follow.
    pub paging_state: Option<Bytes>,
}

impl RowSet {
    /// True when the server reported no further pages.
    pub fn is_last(&self) -> bool {
        self.paging_state.is_none()
    }
}

/// Parse a rows body positioned just after the result kind.
pub fn parse_rows_body(reader: &mut WireReader) -> Result<RowSet> {
    let flags = reader.read_int()?;
    let column_count = reader.read_int()?;
    if column_count < 0 {
        return Err(CqlError::decode(format!("negative column count {}", column_count)));
    }

    let paging_state = if flags & rows_flags::HAS_MORE_PAGES != 0 {
        // Copied: the token outlives the frame buffer.
        let state = reader.read_bytes(true)?;
        if state.is_none() {
            return Err(CqlError::decode("more pages flagged but paging state is null"));
        }
        state
    } else {
        None
    };

    if flags & rows_flags::NO_METADATA != 0 {
        return Err(CqlError::unimplemented("rows result without metadata"));
    }

    let global_spec = if flags & rows_flags::GLOBAL_TABLES_SPEC != 0 {
        Some((reader.read_string()?, reader.read_string()?))
    } else {
        None
    };

    let mut columns = Vec::with_capacity((column_count as usize).min(reader.remaining()));
    for _ in 0..column_count {
        let (keyspace, table) = match &global_spec {
            Some((keyspace, table)) => (keyspace.clone(), table.clone()),
            None => (reader.read_string()?, reader.read_string()?),
        };
        let name = reader.read_string()?;
        let value_type = parse_value_type(reader)?;
        columns.push(Column {
            keyspace,
            table,
            name,
            value_type,
        });
    }
    let columns: Arc<[Column]> = columns.into();

    let row_count = reader.read_int()?;
    if row_count < 0 {
        return Err(CqlError::decode(format!("negative row count {}", row_count)));
    }
    if row_count > 0 && columns.is_empty() {
        return Err(CqlError::decode(format!("{} rows without columns", row_count)));
    }
    // Every cell carries at least its 4-byte length.
    let min_cells_len = (row_count as usize)
        .saturating_mul(columns.len())
        .saturating_mul(4);
    if min_cells_len > reader.remaining() {
        return Err(CqlError::decode(format!(
            "{} rows of {} columns need at least {} bytes, {} remaining",
            row_count,
            columns.len(),
            min_cells_len,
            reader.remaining()
        )));
    }

    let mut rows = Vec::with_capacity((row_count as usize).min(reader.remaining()));
    for _ in 0..row_count {
        let mut values = Vec::with_capacity(columns.len());
        for column in columns.iter() {
            let value = match reader.read_bytes(false)? {
                Some(raw) => decode_value(&column.value_type, raw)?,
                None => Value::Null,
            };
            values.push(value);
        }
        rows.push(Row::new(Arc::clone(&columns), values));
    }

    Ok(RowSet {
        columns,
        rows,
        paging_state,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::WireWriter;

    fn global_two_columns(writer: &mut WireWriter, flags: i32) {
        writer.write_int(flags).write_int(2);
        if flags & rows_flags::HAS_MORE_PAGES != 0 {
            writer.write_bytes(Some(b"next-page"));
        }
        writer
            .write_string("ks")
            .write_string("users")
            .write_string("id")
            .write_short(0x0009)
            .write_string("name")
            .write_short(0x000D);
    }

    #[test]
    fn test_global_spec_rows() {
        let mut writer = WireWriter::new();
        global_two_columns(&mut writer, rows_flags::GLOBAL_TABLES_SPEC);
        writer
            .write_int(2)
            .write_bytes(Some(&1i32.to_be_bytes()))
            .write_bytes(Some(b"ada"))
            .write_bytes(Some(&2i32.to_be_bytes()))
            .write_bytes(None);

        let mut reader = WireReader::new(writer.finish());
        let set = parse_rows_body(&mut reader).unwrap();

        assert!(set.is_last());
        assert_eq!(set.columns.len(), 2);
        assert_eq!(set.columns[1].keyspace, "ks");
        assert_eq!(set.columns[1].table, "users");
        assert_eq!(set.rows.len(), 2);
        assert_eq!(set.rows[0].get_by_name("name").unwrap().as_str(), Some("ada"));
        assert_eq!(set.rows[1].get(0), Some(&Value::Int(2)));
        assert!(set.rows[1].get_by_name("name").unwrap().is_null());
        assert!(reader.is_empty());
    }

    #[test]
    fn test_per_column_spec() {
        let mut writer = WireWriter::new();
        writer
            .write_int(0)
            .write_int(1)
            .write_string("ks1")
            .write_string("t1")
            .write_string("flag")
            .write_short(0x0004)
            .write_int(1)
            .write_bytes(Some(&[0]));

        let set = parse_rows_body(&mut WireReader::new(writer.finish())).unwrap();
        assert_eq!(set.columns[0].keyspace, "ks1");
        assert_eq!(set.columns[0].table, "t1");
        assert_eq!(set.rows[0].values(), &[Value::Boolean(false)]);
    }

    #[test]
    fn test_more_pages_copies_paging_state() {
        let mut writer = WireWriter::new();
        global_two_columns(
            &mut writer,
            rows_flags::GLOBAL_TABLES_SPEC | rows_flags::HAS_MORE_PAGES,
        );
        writer.write_int(0);
        let body = writer.finish();

        let set = parse_rows_body(&mut WireReader::new(body.clone())).unwrap();
        let state = set.paging_state.clone().unwrap();

        assert!(!set.is_last());
        assert_eq!(&state[..], b"next-page");
        assert!(!body.as_ptr_range().contains(&state.as_ptr()));
    }

    #[test]
    fn test_no_metadata_is_unimplemented() {
        let mut writer = WireWriter::new();
        writer.write_int(rows_flags::NO_METADATA).write_int(1).write_int(0);
        let err = parse_rows_body(&mut WireReader::new(writer.finish())).unwrap_err();
        assert!(matches!(err, CqlError::Unimplemented(_)));
    }

    #[test]
    fn test_unsupported_column_type_fails() {
        let mut writer = WireWriter::new();
        writer
            .write_int(rows_flags::GLOBAL_TABLES_SPEC)
            .write_int(1)
            .write_string("ks")
            .write_string("t")
            .write_string("tags")
            .write_short(0x0020)
            .write_short(0x000D)
            .write_int(0);
        let err = parse_rows_body(&mut WireReader::new(writer.finish())).unwrap_err();
        assert!(err.to_string().contains("list"));
    }

    #[test]
    fn test_truncated_rows() {
        let mut writer = WireWriter::new();
        global_two_columns(&mut writer, rows_flags::GLOBAL_TABLES_SPEC);
        writer.write_int(1).write_bytes(Some(&1i32.to_be_bytes()));
        let err = parse_rows_body(&mut WireReader::new(writer.finish())).unwrap_err();
        assert!(matches!(err, CqlError::Decode(_)));
    }

    #[test]
    fn test_rows_without_columns_rejected() {
        let mut writer = WireWriter::new();
        writer.write_int(0).write_int(0).write_int(5_000_000);
        let err = parse_rows_body(&mut WireReader::new(writer.finish())).unwrap_err();
        assert!(matches!(err, CqlError::Decode(_)));
        assert!(err.to_string().contains("without columns"));

        let mut writer = WireWriter::new();
        writer.write_int(0).write_int(0).write_int(0);
        let set = parse_rows_body(&mut WireReader::new(writer.finish())).unwrap();
        assert!(set.columns.is_empty());
        assert!(set.rows.is_empty());
    }

    #[test]
    fn test_row_count_beyond_body_rejected() {
        let mut writer = WireWriter::new();
        global_two_columns(&mut writer, rows_flags::GLOBAL_TABLES_SPEC);
        writer
            .write_int(i32::MAX)
            .write_bytes(Some(&1i32.to_be_bytes()))
            .write_bytes(None);
        let err = parse_rows_body(&mut WireReader::new(writer.finish())).unwrap_err();
        assert!(matches!(err, CqlError::Decode(_)));
        assert!(err.to_string().contains("remaining"));
    }

    #[test]
    fn test_duplicate_names_last_wins() {
        let columns: Arc<[Column]> = vec![
            Column {
                keyspace: "ks".into(),
                table: "t".into(),
                name: "v".into(),
                value_type: ValueType::Int,
            },
            Column {
                keyspace: "ks".into(),
                table: "t".into(),
                name: "v".into(),
                value_type: ValueType::Int,
            },
        ]
        .into();
        let row = Row::new(columns, vec![Value::Int(1), Value::Int(2)]);

        assert_eq!(row.get_by_name("v"), Some(&Value::Int(2)));
        assert_eq!(row.to_map()["v"], Value::Int(2));
        assert_eq!(row.len(), 2);
    }
}
