//! Cursor-based reader for protocol primitives.
//!
//! Reads big-endian primitives from a `Bytes` body, starting at offset 0 and
//! advancing an internal cursor. Running out of bytes is a decode error,
//! never a panic.
//!
//! # Example
//!
//! ```
//! use cqlwire_client::codec::WireReader;
//! use bytes::Bytes;
//!
//! let mut reader = WireReader::new(Bytes::from_static(&[0, 2, b'h', b'i']));
//! assert_eq!(reader.read_string().unwrap(), "hi");
//! assert_eq!(reader.remaining(), 0);
//! ```

use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use bytes::{Buf, Bytes};

use crate::error::{CqlError, Result};

/// Reader over a frame body.
#[derive(Debug, Clone)]
pub struct WireReader {
    buf: Bytes,
}

impl WireReader {
    /// Create a reader positioned at the start of `buf`.
    pub fn new(buf: Bytes) -> Self {
        Self { buf }
    }

    /// Bytes left after the cursor.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.buf.remaining()
    }

    /// True when every byte has been consumed.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    fn ensure(&self, n: usize, what: &str) -> Result<()> {
        if self.buf.remaining() < n {
            return Err(CqlError::decode(format!(
                "need {} bytes for {}, {} remaining",
                n,
                what,
                self.buf.remaining()
            )));
        }
        Ok(())
    }

    /// Read one unsigned byte.
    pub fn read_byte(&mut self) -> Result<u8> {
        self.ensure(1, "byte")?;
        Ok(self.buf.get_u8())
    }

    /// Read an unsigned 16-bit `[short]`.
    pub fn read_short(&mut self) -> Result<u16> {
        self.ensure(2, "short")?;
        Ok(self.buf.get_u16())
    }

    /// Read a signed 32-bit `[int]`.
    pub fn read_int(&mut self) -> Result<i32> {
        self.ensure(4, "int")?;
        Ok(self.buf.get_i32())
    }

    /// Read a signed 64-bit `[long]`.
    pub fn read_long(&mut self) -> Result<i64> {
        self.ensure(8, "long")?;
        Ok(self.buf.get_i64())
    }

    /// Skip `n` bytes.
    pub fn skip(&mut self, n: usize) -> Result<()> {
        self.ensure(n, "skip")?;
        self.buf.advance(n);
        Ok(())
    }

    /// Take `n` raw bytes without copying.
    pub fn take(&mut self, n: usize) -> Result<Bytes> {
        self.ensure(n, "raw bytes")?;
        Ok(self.buf.split_to(n))
    }

    fn read_utf8(&mut self, len: usize) -> Result<String> {
        let raw = self.take(len)?;
        String::from_utf8(raw.to_vec())
            .map_err(|e| CqlError::decode(format!("invalid UTF-8 in string: {}", e)))
    }

    /// Read a `[string]`: 16-bit length then UTF-8 bytes.
    pub fn read_string(&mut self) -> Result<String> {
        let len = self.read_short()? as usize;
        self.read_utf8(len)
    }

    /// Read a `[long string]`: 32-bit length then UTF-8 bytes.
    pub fn read_long_string(&mut self) -> Result<String> {
        let len = self.read_int()?;
        if len < 0 {
            return Err(CqlError::decode(format!("negative long string length {}", len)));
        }
        self.read_utf8(len as usize)
    }

    /// Read a `[bytes]` value.
    ///
    /// A length of -1 is null (`None`), 0 is an empty blob. With `copy` set the
    /// returned bytes own their memory instead of sharing the frame buffer.
    pub fn read_bytes(&mut self, copy: bool) -> Result<Option<Bytes>> {
        let len = self.read_int()?;
        match len {
            -1 => Ok(None),
            n if n < 0 => Err(CqlError::decode(format!("invalid bytes length {}", n))),
            n => {
                let raw = self.take(n as usize)?;
                if copy {
                    Ok(Some(Bytes::copy_from_slice(&raw)))
                } else {
                    Ok(Some(raw))
                }
            }
        }
    }

    /// Read a `[short bytes]` value (16-bit length, never null).
    pub fn read_short_bytes(&mut self) -> Result<Bytes> {
        let len = self.read_short()? as usize;
        self.take(len)
    }

    /// Read a `[string list]`.
    pub fn read_string_list(&mut self) -> Result<Vec<String>> {
        let n = self.read_short()? as usize;
        let mut list = Vec::with_capacity(n.min(self.remaining() / 2));
        for _ in 0..n {
            list.push(self.read_string()?);
        }
        Ok(list)
    }

    /// Read a `[string map]`.
    pub fn read_string_map(&mut self) -> Result<HashMap<String, String>> {
        let n = self.read_short()? as usize;
        let mut map = HashMap::with_capacity(n.min(self.remaining() / 4));
        for _ in 0..n {
            let key = self.read_string()?;
            let value = self.read_string()?;
            map.insert(key, value);
        }
        Ok(map)
    }

    /// Read a `[string multimap]` (SUPPORTED body).
    pub fn read_string_multimap(&mut self) -> Result<HashMap<String, Vec<String>>> {
        let n = self.read_short()? as usize;
        let mut map = HashMap::with_capacity(n.min(self.remaining() / 4));
        for _ in 0..n {
            let key = self.read_string()?;
            let values = self.read_string_list()?;
            map.insert(key, values);
        }
        Ok(map)
    }

    /// Read a 16-byte `[uuid]`.
    pub fn read_uuid(&mut self) -> Result<[u8; 16]> {
        self.ensure(16, "uuid")?;
        let mut uuid = [0u8; 16];
        self.buf.copy_to_slice(&mut uuid);
        Ok(uuid)
    }

    /// Read an `[inet]`: address size byte, address, then port int.
    pub fn read_inet(&mut self) -> Result<(IpAddr, i32)> {
        let size = self.read_byte()? as usize;
        let addr = self.take(size)?;
        let ip = ip_from_slice(&addr)?;
        let port = self.read_int()?;
        Ok((ip, port))
    }
}

/// Interpret a 4- or 16-byte slice as an IP address.
pub(crate) fn ip_from_slice(raw: &[u8]) -> Result<IpAddr> {
    match raw.len() {
        4 => Ok(IpAddr::V4(Ipv4Addr::new(raw[0], raw[1], raw[2], raw[3]))),
        16 => {
            let mut octets = [0u8; 16];
            octets.copy_from_slice(raw);
            Ok(IpAddr::V6(Ipv6Addr::from(octets)))
        }
        n => Err(CqlError::decode(format!("invalid inet address length {}", n))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_primitives_in_order() {
        let bytes = Bytes::from_static(&[0x7F, 0x01, 0x02, 0xFF, 0xFF, 0xFF, 0xFE]);
        let mut reader = WireReader::new(bytes);

        assert_eq!(reader.read_byte().unwrap(), 0x7F);
        assert_eq!(reader.read_short().unwrap(), 0x0102);
        assert_eq!(reader.read_int().unwrap(), -2);
        assert!(reader.is_empty());
    }

    #[test]
    fn test_exhausted_buffer_is_decode_error() {
        let mut reader = WireReader::new(Bytes::from_static(&[0x00, 0x01]));
        let err = reader.read_int().unwrap_err();
        assert!(matches!(err, CqlError::Decode(_)));
        assert!(err.to_string().contains("need 4 bytes"));
    }

    #[test]
    fn test_string_length_past_end() {
        let mut reader = WireReader::new(Bytes::from_static(&[0x00, 0x05, b'a', b'b']));
        assert!(matches!(reader.read_string(), Err(CqlError::Decode(_))));
    }

    #[test]
    fn test_invalid_utf8() {
        let mut reader = WireReader::new(Bytes::from_static(&[0x00, 0x02, 0xC3, 0x28]));
        let err = reader.read_string().unwrap_err();
        assert!(err.to_string().contains("UTF-8"));
    }

    #[test]
    fn test_bytes_null_and_empty() {
        let bytes = Bytes::from_static(&[0xFF, 0xFF, 0xFF, 0xFF, 0, 0, 0, 0]);
        let mut reader = WireReader::new(bytes);

        assert_eq!(reader.read_bytes(false).unwrap(), None);
        assert_eq!(reader.read_bytes(false).unwrap(), Some(Bytes::new()));
    }

    #[test]
    fn test_bytes_negative_length_rejected() {
        let bytes = Bytes::from_static(&[0xFF, 0xFF, 0xFF, 0xFE]);
        let mut reader = WireReader::new(bytes);
        let err = reader.read_bytes(false).unwrap_err();
        assert!(err.to_string().contains("invalid bytes length -2"));
    }

    #[test]
    fn test_bytes_copy_detaches_from_source() {
        let source = Bytes::from(vec![0, 0, 0, 3, 1, 2, 3]);
        let mut shared = WireReader::new(source.clone());
        let mut copied = WireReader::new(source.clone());

        let view = shared.read_bytes(false).unwrap().unwrap();
        let owned = copied.read_bytes(true).unwrap().unwrap();

        assert_eq!(view, owned);
        assert_eq!(view.as_ptr(), source[4..].as_ptr());
        assert_ne!(owned.as_ptr(), source[4..].as_ptr());
    }

    #[test]
    fn test_string_multimap() {
        let mut raw = vec![0, 1];
        raw.extend_from_slice(&[0, 11]);
        raw.extend_from_slice(b"CQL_VERSION");
        raw.extend_from_slice(&[0, 1, 0, 5]);
        raw.extend_from_slice(b"3.4.5");
        let mut reader = WireReader::new(Bytes::from(raw));

        let map = reader.read_string_multimap().unwrap();
        assert_eq!(map["CQL_VERSION"], vec!["3.4.5".to_string()]);
    }

    #[test]
    fn test_inet_v4() {
        let raw = vec![4, 127, 0, 0, 1, 0, 0, 0x23, 0x52];
        let mut reader = WireReader::new(Bytes::from(raw));
        let (ip, port) = reader.read_inet().unwrap();
        assert_eq!(ip, IpAddr::V4(Ipv4Addr::LOCALHOST));
        assert_eq!(port, 9042);
    }

    #[test]
    fn test_inet_bad_size() {
        let raw = vec![3, 1, 2, 3, 0, 0, 0, 0];
        let mut reader = WireReader::new(Bytes::from(raw));
        assert!(reader.read_inet().is_err());
    }
}
