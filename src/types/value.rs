//! Decoded cell values.

use std::net::IpAddr;

use bytes::Bytes;
use serde::Serialize;

use super::ValueType;
use crate::codec::{ip_from_slice, WireReader};
use crate::error::{CqlError, Result};

/// A decoded column value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    /// Null cell (`[bytes]` length -1).
    Null,
    Ascii(String),
    BigInt(i64),
    Blob(Bytes),
    Boolean(bool),
    Counter(i64),
    /// Arbitrary-precision decimal: `unscaled * 10^-scale`, with `unscaled`
    /// a big-endian two's complement integer.
    Decimal { scale: i32, unscaled: Bytes },
    Double(f64),
    Float(f32),
    Int(i32),
    /// Milliseconds since the Unix epoch.
    Timestamp(i64),
    Uuid([u8; 16]),
    Varchar(String),
    /// Big-endian two's complement integer of any width.
    Varint(Bytes),
    TimeUuid([u8; 16]),
    Inet(IpAddr),
    /// Days since the epoch, centered at 2^31.
    Date(u32),
    /// Nanoseconds since midnight.
    Time(i64),
    SmallInt(i16),
    TinyInt(i8),
    Set(Vec<Value>),
    /// Value of a custom type, left opaque.
    Custom { class: String, bytes: Bytes },
}

impl Value {
    /// True for a null cell.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Text of an `ascii` or `varchar` value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Ascii(s) | Value::Varchar(s) => Some(s),
            _ => None,
        }
    }

    /// Any integer-valued scalar widened to `i64`.
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Value::BigInt(v) | Value::Counter(v) | Value::Timestamp(v) | Value::Time(v) => Some(v),
            Value::Int(v) => Some(v as i64),
            Value::SmallInt(v) => Some(v as i64),
            Value::TinyInt(v) => Some(v as i64),
            _ => None,
        }
    }

    /// `int` value.
    pub fn as_i32(&self) -> Option<i32> {
        match *self {
            Value::Int(v) => Some(v),
            _ => None,
        }
    }

    /// `double` or `float` value.
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Value::Double(v) => Some(v),
            Value::Float(v) => Some(v as f64),
            _ => None,
        }
    }

    /// `boolean` value.
    pub fn as_bool(&self) -> Option<bool> {
        match *self {
            Value::Boolean(v) => Some(v),
            _ => None,
        }
    }

    /// Raw bytes of a `blob` or custom value.
    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            Value::Blob(b) | Value::Custom { bytes: b, .. } => Some(b),
            _ => None,
        }
    }

    /// Elements of a set.
    pub fn as_set(&self) -> Option<&[Value]> {
        match self {
            Value::Set(items) => Some(items),
            _ => None,
        }
    }

    /// A `varint` that fits in 128 bits.
    pub fn as_i128(&self) -> Option<i128> {
        match self {
            Value::Varint(raw) => varint_to_i128(raw),
            other => other.as_i64().map(i128::from),
        }
    }
}

fn varint_to_i128(raw: &[u8]) -> Option<i128> {
    if raw.is_empty() || raw.len() > 16 {
        return None;
    }
    let fill = if raw[0] & 0x80 != 0 { 0xFF } else { 0x00 };
    let mut buf = [fill; 16];
    buf[16 - raw.len()..].copy_from_slice(raw);
    Some(i128::from_be_bytes(buf))
}

fn fixed<const N: usize>(raw: &[u8], ty: &ValueType) -> Result<[u8; N]> {
    raw.try_into().map_err(|_| {
        CqlError::decode(format!(
            "{} value must be {} bytes, got {}",
            ty,
            N,
            raw.len()
        ))
    })
}

fn utf8(raw: &[u8], ty: &ValueType) -> Result<String> {
    String::from_utf8(raw.to_vec())
        .map_err(|e| CqlError::decode(format!("invalid {} value: {}", ty, e)))
}

/// Decode one non-null cell according to its column type.
pub fn decode_value(ty: &ValueType, raw: Bytes) -> Result<Value> {
    let value = match ty {
        ValueType::Custom(class) => Value::Custom {
            class: class.clone(),
            bytes: raw,
        },
        ValueType::Ascii => {
            if !raw.is_ascii() {
                return Err(CqlError::decode("ascii value contains non-ASCII bytes"));
            }
            Value::Ascii(utf8(&raw, ty)?)
        }
        ValueType::Varchar => Value::Varchar(utf8(&raw, ty)?),
        ValueType::BigInt => Value::BigInt(i64::from_be_bytes(fixed(&raw, ty)?)),
        ValueType::Counter => Value::Counter(i64::from_be_bytes(fixed(&raw, ty)?)),
        ValueType::Timestamp => Value::Timestamp(i64::from_be_bytes(fixed(&raw, ty)?)),
        ValueType::Time => Value::Time(i64::from_be_bytes(fixed(&raw, ty)?)),
        ValueType::Blob => Value::Blob(raw),
        ValueType::Boolean => {
            let [b] = fixed::<1>(&raw, ty)?;
            Value::Boolean(b != 0)
        }
        ValueType::Decimal => {
            if raw.len() < 5 {
                return Err(CqlError::decode(format!(
                    "decimal value needs at least 5 bytes, got {}",
                    raw.len()
                )));
            }
            let scale = i32::from_be_bytes(fixed(&raw[..4], ty)?);
            Value::Decimal {
                scale,
                unscaled: raw.slice(4..),
            }
        }
        ValueType::Double => Value::Double(f64::from_be_bytes(fixed(&raw, ty)?)),
        ValueType::Float => Value::Float(f32::from_be_bytes(fixed(&raw, ty)?)),
        ValueType::Int => Value::Int(i32::from_be_bytes(fixed(&raw, ty)?)),
        ValueType::Uuid => Value::Uuid(fixed(&raw, ty)?),
        ValueType::TimeUuid => Value::TimeUuid(fixed(&raw, ty)?),
        ValueType::Varint => {
            if raw.is_empty() {
                return Err(CqlError::decode("varint value is empty"));
            }
            Value::Varint(raw)
        }
        ValueType::Inet => Value::Inet(ip_from_slice(&raw)?),
        ValueType::Date => Value::Date(u32::from_be_bytes(fixed(&raw, ty)?)),
        ValueType::SmallInt => Value::SmallInt(i16::from_be_bytes(fixed(&raw, ty)?)),
        ValueType::TinyInt => Value::TinyInt(i8::from_be_bytes(fixed(&raw, ty)?)),
        ValueType::Set(element) => decode_set(element, raw)?,
    };
    Ok(value)
}

fn decode_set(element: &ValueType, raw: Bytes) -> Result<Value> {
    let mut reader = WireReader::new(raw);
    let count = reader.read_int()?;
    if count < 0 {
        return Err(CqlError::decode(format!("negative set size {}", count)));
    }

    let mut items = Vec::with_capacity((count as usize).min(reader.remaining() / 4));
    for _ in 0..count {
        let item = match reader.read_bytes(false)? {
            Some(bytes) => decode_value(element, bytes)?,
            None => Value::Null,
        };
        items.push(item);
    }

    if !reader.is_empty() {
        return Err(CqlError::decode(format!(
            "{} trailing bytes after set<{}>",
            reader.remaining(),
            element
        )));
    }
    Ok(Value::Set(items))
}
