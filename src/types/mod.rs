//! Type system - column type descriptors and value decoding.
//!
//! A column type arrives on the wire as an `[option]`: a 16-bit type code,
//! followed by a class name for custom types or nested options for
//! parametric types. Only `set` is supported among the parametric kinds;
//! `list`, `map`, `udt` and `tuple` are recognized and rejected.
//!
//! # Example
//!
//! ```
//! use cqlwire_client::codec::WireReader;
//! use cqlwire_client::types::{parse_value_type, ValueType};
//! use bytes::Bytes;
//!
//! // set<int>
//! let mut reader = WireReader::new(Bytes::from_static(&[0x00, 0x22, 0x00, 0x09]));
//! let ty = parse_value_type(&mut reader).unwrap();
//! assert_eq!(ty, ValueType::Set(Box::new(ValueType::Int)));
//! ```

mod value;

use std::fmt;

use crate::codec::WireReader;
use crate::error::{CqlError, Result};

pub use value::{decode_value, Value};

/// Wire type codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum RawType {
    Custom = 0x0000,
    Ascii = 0x0001,
    BigInt = 0x0002,
    Blob = 0x0003,
    Boolean = 0x0004,
    Counter = 0x0005,
    Decimal = 0x0006,
    Double = 0x0007,
    Float = 0x0008,
    Int = 0x0009,
    Timestamp = 0x000B,
    Uuid = 0x000C,
    Varchar = 0x000D,
    Varint = 0x000E,
    TimeUuid = 0x000F,
    Inet = 0x0010,
    Date = 0x0011,
    Time = 0x0012,
    SmallInt = 0x0013,
    TinyInt = 0x0014,
    List = 0x0020,
    Map = 0x0021,
    Set = 0x0022,
    Udt = 0x0030,
    Tuple = 0x0031,
}

impl RawType {
    /// Map a wire code to a type tag.
    pub fn from_code(code: u16) -> Option<Self> {
        let raw = match code {
            0x0000 => RawType::Custom,
            0x0001 => RawType::Ascii,
            0x0002 => RawType::BigInt,
            0x0003 => RawType::Blob,
            0x0004 => RawType::Boolean,
            0x0005 => RawType::Counter,
            0x0006 => RawType::Decimal,
            0x0007 => RawType::Double,
            0x0008 => RawType::Float,
            0x0009 => RawType::Int,
            0x000B => RawType::Timestamp,
            0x000C => RawType::Uuid,
            0x000D => RawType::Varchar,
            0x000E => RawType::Varint,
            0x000F => RawType::TimeUuid,
            0x0010 => RawType::Inet,
            0x0011 => RawType::Date,
            0x0012 => RawType::Time,
            0x0013 => RawType::SmallInt,
            0x0014 => RawType::TinyInt,
            0x0020 => RawType::List,
            0x0021 => RawType::Map,
            0x0022 => RawType::Set,
            0x0030 => RawType::Udt,
            0x0031 => RawType::Tuple,
            _ => return None,
        };
        Some(raw)
    }

    /// CQL name of the type.
    pub fn name(self) -> &'static str {
        match self {
            RawType::Custom => "custom",
            RawType::Ascii => "ascii",
            RawType::BigInt => "bigint",
            RawType::Blob => "blob",
            RawType::Boolean => "boolean",
            RawType::Counter => "counter",
            RawType::Decimal => "decimal",
            RawType::Double => "double",
            RawType::Float => "float",
            RawType::Int => "int",
            RawType::Timestamp => "timestamp",
            RawType::Uuid => "uuid",
            RawType::Varchar => "varchar",
            RawType::Varint => "varint",
            RawType::TimeUuid => "timeuuid",
            RawType::Inet => "inet",
            RawType::Date => "date",
            RawType::Time => "time",
            RawType::SmallInt => "smallint",
            RawType::TinyInt => "tinyint",
            RawType::List => "list",
            RawType::Map => "map",
            RawType::Set => "set",
            RawType::Udt => "udt",
            RawType::Tuple => "tuple",
        }
    }
}

/// Column type descriptor.
///
/// `Custom` carries the server-side class name; `Set` carries its element
/// type. Every other supported type is a plain scalar.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ValueType {
    Custom(String),
    Ascii,
    BigInt,
    Blob,
    Boolean,
    Counter,
    Decimal,
    Double,
    Float,
    Int,
    Timestamp,
    Uuid,
    Varchar,
    Varint,
    TimeUuid,
    Inet,
    Date,
    Time,
    SmallInt,
    TinyInt,
    Set(Box<ValueType>),
}

impl ValueType {
    /// Wire tag of this descriptor.
    pub fn raw_type(&self) -> RawType {
        match self {
            ValueType::Custom(_) => RawType::Custom,
            ValueType::Ascii => RawType::Ascii,
            ValueType::BigInt => RawType::BigInt,
            ValueType::Blob => RawType::Blob,
            ValueType::Boolean => RawType::Boolean,
            ValueType::Counter => RawType::Counter,
            ValueType::Decimal => RawType::Decimal,
            ValueType::Double => RawType::Double,
            ValueType::Float => RawType::Float,
            ValueType::Int => RawType::Int,
            ValueType::Timestamp => RawType::Timestamp,
            ValueType::Uuid => RawType::Uuid,
            ValueType::Varchar => RawType::Varchar,
            ValueType::Varint => RawType::Varint,
            ValueType::TimeUuid => RawType::TimeUuid,
            ValueType::Inet => RawType::Inet,
            ValueType::Date => RawType::Date,
            ValueType::Time => RawType::Time,
            ValueType::SmallInt => RawType::SmallInt,
            ValueType::TinyInt => RawType::TinyInt,
            ValueType::Set(_) => RawType::Set,
        }
    }

    /// Class name for custom types.
    pub fn custom_type_name(&self) -> Option<&str> {
        match self {
            ValueType::Custom(name) => Some(name),
            _ => None,
        }
    }

    /// Nested type parameters (the element type of a set).
    pub fn parameters(&self) -> Option<&[ValueType]> {
        match self {
            ValueType::Set(element) => Some(std::slice::from_ref(element.as_ref())),
            _ => None,
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueType::Custom(name) => write!(f, "'{}'", name),
            ValueType::Set(element) => write!(f, "set<{}>", element),
            other => f.write_str(other.raw_type().name()),
        }
    }
}

/// Parse a type `[option]` from the reader.
pub fn parse_value_type(reader: &mut WireReader) -> Result<ValueType> {
    let code = reader.read_short()?;
    let raw = RawType::from_code(code)
        .ok_or_else(|| CqlError::unimplemented(format!("type code 0x{:04X}", code)))?;

    let ty = match raw {
        RawType::Custom => ValueType::Custom(reader.read_string()?),
        RawType::Ascii => ValueType::Ascii,
        RawType::BigInt => ValueType::BigInt,
        RawType::Blob => ValueType::Blob,
        RawType::Boolean => ValueType::Boolean,
        RawType::Counter => ValueType::Counter,
        RawType::Decimal => ValueType::Decimal,
        RawType::Double => ValueType::Double,
        RawType::Float => ValueType::Float,
        RawType::Int => ValueType::Int,
        RawType::Timestamp => ValueType::Timestamp,
        RawType::Uuid => ValueType::Uuid,
        RawType::Varchar => ValueType::Varchar,
        RawType::Varint => ValueType::Varint,
        RawType::TimeUuid => ValueType::TimeUuid,
        RawType::Inet => ValueType::Inet,
        RawType::Date => ValueType::Date,
        RawType::Time => ValueType::Time,
        RawType::SmallInt => ValueType::SmallInt,
        RawType::TinyInt => ValueType::TinyInt,
        RawType::Set => ValueType::Set(Box::new(parse_value_type(reader)?)),
        RawType::List | RawType::Map | RawType::Udt | RawType::Tuple => {
            return Err(CqlError::unimplemented(format!(
                "{} type (code 0x{:04X})",
                raw.name(),
                code
            )));
        }
    };
    Ok(ty)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    use crate::codec::WireWriter;

    fn reader_for(build: impl FnOnce(&mut WireWriter)) -> WireReader {
        let mut writer = WireWriter::new();
        build(&mut writer);
        WireReader::new(writer.finish())
    }

    #[test]
    fn test_scalar_codes() {
        let cases = [
            (0x0001, ValueType::Ascii),
            (0x0002, ValueType::BigInt),
            (0x0009, ValueType::Int),
            (0x000B, ValueType::Timestamp),
            (0x000D, ValueType::Varchar),
            (0x0014, ValueType::TinyInt),
        ];
        for (code, expected) in cases {
            let mut reader = reader_for(|w| {
                w.write_short(code);
            });
            let ty = parse_value_type(&mut reader).unwrap();
            assert_eq!(ty, expected);
            assert_eq!(ty.raw_type() as u16, code);
            assert!(ty.parameters().is_none());
            assert!(ty.custom_type_name().is_none());
        }
    }

    #[test]
    fn test_custom_type_reads_class_name() {
        let mut reader = reader_for(|w| {
            w.write_short(0x0000)
                .write_string("org.apache.cassandra.db.marshal.DurationType");
        });
        let ty = parse_value_type(&mut reader).unwrap();
        assert_eq!(
            ty.custom_type_name(),
            Some("org.apache.cassandra.db.marshal.DurationType")
        );
        assert_eq!(ty.raw_type(), RawType::Custom);
        assert!(reader.is_empty());
    }

    #[test]
    fn test_nested_set() {
        let mut reader = reader_for(|w| {
            w.write_short(0x0022).write_short(0x0022).write_short(0x000D);
        });
        let ty = parse_value_type(&mut reader).unwrap();
        assert_eq!(
            ty,
            ValueType::Set(Box::new(ValueType::Set(Box::new(ValueType::Varchar))))
        );
        assert_eq!(ty.to_string(), "set<set<varchar>>");
        assert_eq!(ty.parameters().unwrap().len(), 1);
    }

    #[test]
    fn test_parametric_kinds_are_unimplemented() {
        for (code, name) in [(0x0020, "list"), (0x0021, "map"), (0x0030, "udt"), (0x0031, "tuple")] {
            let mut reader = reader_for(|w| {
                w.write_short(code).write_short(0x0009);
            });
            let err = parse_value_type(&mut reader).unwrap_err();
            assert!(matches!(err, CqlError::Unimplemented(_)));
            assert!(err.to_string().contains(name), "{} missing from {}", name, err);
        }
    }

    #[test]
    fn test_set_of_unsupported_element_fails() {
        let mut reader = reader_for(|w| {
            w.write_short(0x0022).write_short(0x0021);
        });
        assert!(parse_value_type(&mut reader).is_err());
    }

    #[test]
    fn test_unmapped_code() {
        let mut reader = WireReader::new(Bytes::from_static(&[0x00, 0x0A]));
        let err = parse_value_type(&mut reader).unwrap_err();
        assert!(err.to_string().contains("0x000A"));
    }

    #[test]
    fn test_truncated_set() {
        let mut reader = WireReader::new(Bytes::from_static(&[0x00, 0x22]));
        assert!(matches!(
            parse_value_type(&mut reader),
            Err(CqlError::Decode(_))
        ));
    }
}
