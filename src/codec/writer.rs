//! Growable writer for protocol primitives.
//!
//! All multi-byte integers are written in network byte order.

use std::collections::HashMap;

use bytes::{BufMut, Bytes, BytesMut};

/// Writer accumulating a frame body.
#[derive(Debug, Default)]
pub struct WireWriter {
    buf: BytesMut,
}

impl WireWriter {
    /// Create an empty writer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a writer with a pre-sized buffer.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(capacity),
        }
    }

    /// Bytes written so far.
    #[inline]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// True if nothing was written.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Write one byte.
    pub fn write_byte(&mut self, value: u8) -> &mut Self {
        self.buf.put_u8(value);
        self
    }

    /// Write an unsigned 16-bit `[short]`.
    pub fn write_short(&mut self, value: u16) -> &mut Self {
        self.buf.put_u16(value);
        self
    }

    /// Write a signed 32-bit `[int]`.
    pub fn write_int(&mut self, value: i32) -> &mut Self {
        self.buf.put_i32(value);
        self
    }

    /// Write a signed 64-bit `[long]`.
    pub fn write_long(&mut self, value: i64) -> &mut Self {
        self.buf.put_i64(value);
        self
    }

    /// Write raw bytes with no length prefix.
    pub fn write_raw(&mut self, raw: &[u8]) -> &mut Self {
        self.buf.put_slice(raw);
        self
    }

    /// Write a `[string]` (16-bit length prefix).
    pub fn write_string(&mut self, value: &str) -> &mut Self {
        self.buf.put_u16(value.len() as u16);
        self.buf.put_slice(value.as_bytes());
        self
    }

    /// Write a `[long string]`.
    pub fn write_long_string(&mut self, value: &str) -> &mut Self {
        self.buf.put_i32(value.len() as i32);
        self.buf.put_slice(value.as_bytes());
        self
    }

    /// Write a `[bytes]` value; `None` writes the -1 null sentinel.
    pub fn write_bytes(&mut self, value: Option<&[u8]>) -> &mut Self {
        match value {
            Some(raw) => {
                self.buf.put_i32(raw.len() as i32);
                self.buf.put_slice(raw);
            }
            None => self.buf.put_i32(-1),
        }
        self
    }

    /// Write a `[short bytes]` value.
    pub fn write_short_bytes(&mut self, value: &[u8]) -> &mut Self {
        self.buf.put_u16(value.len() as u16);
        self.buf.put_slice(value);
        self
    }

    /// Write a `[string list]`.
    pub fn write_string_list<S: AsRef<str>>(&mut self, values: &[S]) -> &mut Self {
        self.buf.put_u16(values.len() as u16);
        for value in values {
            self.write_string(value.as_ref());
        }
        self
    }

    /// Write a `[string map]`. Keys are written in sorted order so that equal
    /// maps produce identical bodies.
    pub fn write_string_map(&mut self, map: &HashMap<String, String>) -> &mut Self {
        let mut entries: Vec<_> = map.iter().collect();
        entries.sort();
        self.buf.put_u16(entries.len() as u16);
        for (key, value) in entries {
            self.write_string(key);
            self.write_string(value);
        }
        self
    }

    /// Freeze the accumulated bytes.
    pub fn finish(self) -> Bytes {
        self.buf.freeze()
    }
}
