//! Fluent connection setup.
//!
//! # Example
//!
//! ```no_run
//! use cqlwire_client::auth::PasswordAuthenticator;
//! use cqlwire_client::{Connection, Statement};
//!
//! # async fn run() -> cqlwire_client::Result<()> {
//! let stream = tokio::net::TcpStream::connect("127.0.0.1:9042").await?;
//! let conn = Connection::builder()
//!     .event_capacity(64)
//!     .connect(stream);
//!
//! conn.start(&PasswordAuthenticator::new("cassandra", "cassandra")).await?;
//! if let Some(page) = conn.query(Statement::new("SELECT * FROM system.local")).await? {
//!     for row in &page {
//!         println!("{:?}", row.to_map());
//!     }
//! }
//! conn.close();
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncWrite};

use super::Connection;
use crate::config::ConnectionConfig;
use crate::query::{QueryBuilder, SimpleQueryBuilder};
use crate::transport::{spawn_io, FrameTransport};

/// Builder for configuring and opening a [`Connection`].
pub struct ConnectionBuilder {
    config: ConnectionConfig,
    query_builder: Arc<dyn QueryBuilder>,
}

impl ConnectionBuilder {
    /// Create a builder with default settings and the v4 query encoder.
    pub fn new() -> Self {
        Self {
            config: ConnectionConfig::default(),
            query_builder: Arc::new(SimpleQueryBuilder::new()),
        }
    }

    /// Replace the whole configuration.
    pub fn config(mut self, config: ConnectionConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the protocol version.
    ///
    /// Default: 4
    pub fn protocol_version(mut self, version: u8) -> Self {
        self.config.protocol_version = version;
        self
    }

    /// Set the CQL version announced in `STARTUP`.
    ///
    /// Default: "3.0.0"
    pub fn cql_version(mut self, version: impl Into<String>) -> Self {
        self.config.cql_version = version.into();
        self
    }

    /// Set the outbound queue capacity.
    ///
    /// Default: 1024
    pub fn outbound_capacity(mut self, capacity: usize) -> Self {
        self.config.outbound_capacity = capacity;
        self
    }

    /// Set the per-subscriber event buffer.
    ///
    /// Default: 256
    pub fn event_capacity(mut self, capacity: usize) -> Self {
        self.config.event_capacity = capacity;
        self
    }

    /// Set the largest accepted response body.
    ///
    /// Default: 256 MiB
    pub fn max_frame_length(mut self, length: u32) -> Self {
        self.config.max_frame_length = length;
        self
    }

    /// Set the transport read buffer size.
    ///
    /// Default: 64 KiB
    pub fn read_buffer_size(mut self, size: usize) -> Self {
        self.config.read_buffer_size = size;
        self
    }

    /// Use a custom encoder for `QUERY` bodies.
    pub fn query_builder(mut self, builder: impl QueryBuilder + 'static) -> Self {
        self.query_builder = Arc::new(builder);
        self
    }

    /// Run the connection over an existing frame transport.
    ///
    /// Must be called within a tokio runtime.
    pub fn open(self, transport: FrameTransport) -> Connection {
        Connection::spawn(transport, self.config, self.query_builder)
    }

    /// Run the connection over a byte stream, e.g. a connected `TcpStream`.
    ///
    /// The transport tasks end with the connection: the writer once the
    /// outbound queue drains, the reader when the connection closes.
    /// Must be called within a tokio runtime.
    pub fn connect<S>(self, stream: S) -> Connection
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (transport, tasks) = spawn_io(stream, &self.config);
        let connection = self.open(transport);
        connection.track(tasks.reader.abort_handle());
        connection
    }
}

impl Default for ConnectionBuilder {
    fn default() -> Self {
        Self::new()
    }
}
