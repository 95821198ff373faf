//! # cqlwire-client
//!
//! Async client for the CQL native binary protocol (v4 framing).
//!
//! The crate multiplexes concurrent requests over one connection using
//! stream ids, performs the `STARTUP`/authentication handshake, decodes
//! `RESULT` bodies into typed rows and follows paging state across pages.
//!
//! ## Architecture
//!
//! - **Transport**: ordered frame channels ([`FrameTransport`]), fed either
//!   by [`transport::spawn_io`] over any async byte stream or by an
//!   in-process peer
//! - **Engine**: [`Connection`] allocates stream ids, routes responses to
//!   their waiters and broadcasts server events
//! - **Results**: [`Page`] holds decoded [`Row`]s and fetches the next page
//!   on demand
//!
//! Sockets, TLS, compression, prepared statements, batches and connection
//! pooling are out of scope; callers bring their own connected stream.
//!
//! ## Example
//!
//! ```no_run
//! use cqlwire_client::auth::NoAuthenticator;
//! use cqlwire_client::{Connection, Consistency, Statement};
//!
//! # async fn run() -> cqlwire_client::Result<()> {
//! let stream = tokio::net::TcpStream::connect("127.0.0.1:9042").await?;
//! let conn = Connection::builder().connect(stream);
//! conn.start(&NoAuthenticator).await?;
//!
//! conn.execute("CREATE KEYSPACE IF NOT EXISTS app WITH replication = \
//!               {'class': 'SimpleStrategy', 'replication_factor': 1}",
//!              Some(Consistency::One), vec![]).await?;
//!
//! let statement = Statement::new("SELECT keyspace_name FROM system_schema.keyspaces")
//!     .page_size(100);
//! let mut page = conn.query(statement).await?;
//! while let Some(current) = page {
//!     for row in &current {
//!         println!("{:?}", row.get_by_name("keyspace_name"));
//!     }
//!     page = if current.is_last() { None } else { Some(current.next().await?) };
//! }
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod codec;
pub mod config;
pub mod connection;
pub mod error;
pub mod error_response;
pub mod event;
pub mod protocol;
pub mod query;
pub mod result;
pub mod transport;
pub mod types;

pub use config::ConnectionConfig;
pub use connection::{Connection, ConnectionBuilder};
pub use error::{CqlError, Result};
pub use error_response::ErrorResponse;
pub use event::{Event, EventType};
pub use protocol::{Frame, Opcode};
pub use query::{Consistency, QueryBuilder, SimpleQueryBuilder, Statement};
pub use result::{Column, Page, Row};
pub use transport::FrameTransport;
pub use types::{Value, ValueType};
