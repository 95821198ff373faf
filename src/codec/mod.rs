//! Codec module - protocol primitive encoding and decoding.
//!
//! - [`WireWriter`] - accumulates primitives into a growable buffer
//! - [`WireReader`] - consumes primitives from a frame body with a cursor
//!
//! # Example
//!
//! ```
//! use cqlwire_client::codec::{WireReader, WireWriter};
//!
//! let mut writer = WireWriter::new();
//! writer.write_string("hello").write_bytes(None);
//!
//! let mut reader = WireReader::new(writer.finish());
//! assert_eq!(reader.read_string().unwrap(), "hello");
//! assert_eq!(reader.read_bytes(false).unwrap(), None);
//! ```

mod reader;
mod writer;

pub(crate) use reader::ip_from_slice;
pub use reader::WireReader;
pub use writer::WireWriter;
