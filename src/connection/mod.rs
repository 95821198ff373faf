//! Connection engine: stream multiplexing, the startup handshake and the
//! request operations.
//!
//! A [`Connection`] is a cheap handle over shared state. Any number of tasks
//! may issue requests concurrently; each request takes the lowest free
//! stream id and waits for the response carrying that id. One router task
//! per connection reads the inbound frame stream and hands each response to
//! its waiter. Frames on negative stream ids are server events and go to
//! the broadcast channel behind [`Connection::subscribe_events`].
//!
//! ```text
//!   send() ──► StreamTable (id, oneshot) ──► outbound ──► server
//!                   ▲
//!   router ◄── inbound ◄─────────────────────────────── server
//!     └──► broadcast (events)
//! ```

mod builder;
mod streams;

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use bytes::Bytes;
use tokio::sync::{broadcast, mpsc};
use tokio::task::AbortHandle;
use tracing::{debug, warn};

use crate::auth::{Authenticator, PASSWORD_AUTHENTICATOR};
use crate::codec::WireWriter;
use crate::config::ConnectionConfig;
use crate::error::{CqlError, Result};
use crate::error_response::ErrorResponse;
use crate::event::EventType;
use crate::protocol::{Frame, Opcode};
use crate::query::{Consistency, QueryBuilder, Statement};
use crate::result::{parse_result, Page, ResponseBody, ResultBody};
use crate::transport::FrameTransport;

pub use builder::ConnectionBuilder;

use streams::{Allocation, StreamTable};

/// Handle to a multiplexed connection.
///
/// Clones share the same connection. Closing any clone closes all of them.
#[derive(Clone)]
pub struct Connection {
    inner: Arc<Inner>,
}

struct Inner {
    config: ConnectionConfig,
    query_builder: Arc<dyn QueryBuilder>,
    streams: Mutex<StreamTable>,
    events: Mutex<Option<broadcast::Sender<Frame>>>,
    /// Router task, plus the transport reader when the connection owns it.
    tasks: Mutex<Vec<AbortHandle>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Inner {
    fn route_response(&self, frame: Frame) {
        let stream = frame.stream();
        let opcode = frame.opcode();
        let routed = lock(&self.streams).complete(frame);
        match routed {
            Ok(()) => debug!(stream, %opcode, "routed response"),
            Err(_) => warn!(stream, %opcode, "no pending request for response; dropping frame"),
        }
    }

    /// Fail pending requests, refuse new ones and end event delivery.
    fn shutdown(&self) -> usize {
        let failed = lock(&self.streams).close();
        lock(&self.events).take();
        failed
    }

    fn abort_tasks(&self) {
        for task in lock(&self.tasks).drain(..) {
            task.abort();
        }
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        self.abort_tasks();
    }
}

async fn route_frames(
    inner: Weak<Inner>,
    mut inbound: mpsc::Receiver<Frame>,
    events: broadcast::Sender<Frame>,
) {
    while let Some(frame) = inbound.recv().await {
        if frame.is_event() {
            debug!(stream = frame.stream(), opcode = %frame.opcode(), "routing event");
            // Having no subscribers is fine.
            let _ = events.send(frame);
            continue;
        }

        match inner.upgrade() {
            Some(inner) => inner.route_response(frame),
            None => return,
        }
    }

    debug!("inbound frame stream ended");
    if let Some(inner) = inner.upgrade() {
        let failed = inner.shutdown();
        if failed > 0 {
            warn!(failed, "transport closed with requests in flight");
        }
    }
}

/// Build the `CqlError` for an `ERROR` response.
fn server_error(frame: &Frame) -> CqlError {
    let parsed =
        ResponseBody::open(frame).and_then(|mut body| ErrorResponse::read(&mut body.reader));
    match parsed {
        Ok(response) => CqlError::Server(response),
        Err(e) => e,
    }
}

impl Connection {
    /// Start configuring a connection.
    pub fn builder() -> ConnectionBuilder {
        ConnectionBuilder::new()
    }

    /// Run a connection over `transport` with default settings.
    ///
    /// Must be called within a tokio runtime.
    pub fn open(transport: FrameTransport) -> Self {
        ConnectionBuilder::new().open(transport)
    }

    fn spawn(
        transport: FrameTransport,
        config: ConnectionConfig,
        query_builder: Arc<dyn QueryBuilder>,
    ) -> Self {
        let FrameTransport { outbound, inbound } = transport;
        let (events, _) = broadcast::channel(config.event_capacity.max(1));

        let inner = Arc::new(Inner {
            config,
            query_builder,
            streams: Mutex::new(StreamTable::new(outbound)),
            events: Mutex::new(Some(events.clone())),
            tasks: Mutex::new(Vec::new()),
        });

        let router = tokio::spawn(route_frames(Arc::downgrade(&inner), inbound, events));
        lock(&inner.tasks).push(router.abort_handle());

        Connection { inner }
    }

    /// Abort `task` when this connection closes.
    fn track(&self, task: AbortHandle) {
        lock(&self.inner.tasks).push(task);
    }

    /// Configuration in effect.
    pub fn config(&self) -> &ConnectionConfig {
        &self.inner.config
    }

    /// True once the connection is closed, locally or by the transport.
    pub fn is_closed(&self) -> bool {
        lock(&self.inner.streams).is_closed()
    }

    /// Requests awaiting a response.
    pub fn in_flight(&self) -> usize {
        lock(&self.inner.streams).in_flight()
    }

    /// Send one request and wait for its response.
    ///
    /// The response is returned whatever its opcode, `ERROR` included.
    /// Dropping the future while it waits for queue space leaves no stream
    /// id reserved.
    ///
    /// # Errors
    ///
    /// - [`CqlError::Protocol`] if `body` is longer than the configured
    ///   maximum frame length
    /// - [`CqlError::ConnectionClosed`] if the connection is closed, or
    ///   closes before the response arrives
    /// - [`CqlError::StreamIdsExhausted`] if every stream id is in flight
    pub async fn send(&self, opcode: Opcode, body: Bytes) -> Result<Frame> {
        let max_length = self.inner.config.max_frame_length;
        if body.len() > max_length as usize {
            return Err(CqlError::Protocol(format!(
                "request body of {} bytes exceeds maximum {}",
                body.len(),
                max_length
            )));
        }

        let outbound = lock(&self.inner.streams).outbound()?;
        let permit = outbound
            .reserve()
            .await
            .map_err(|_| CqlError::ConnectionClosed)?;

        let Allocation { stream, response } = lock(&self.inner.streams).allocate()?;
        let frame = match Frame::request(self.inner.config.protocol_version, stream, opcode, body) {
            Ok(frame) => frame,
            Err(e) => {
                lock(&self.inner.streams).take(stream);
                return Err(e);
            }
        };
        debug!(stream, %opcode, length = frame.header.length, "sending request");
        permit.send(frame);
        drop(outbound);

        response.await.map_err(|_| CqlError::ConnectionClosed)?
    }

    /// Perform the `STARTUP` handshake, authenticating if the server asks.
    ///
    /// Only `PasswordAuthenticator` is supported, with a single
    /// `AUTH_RESPONSE` round.
    pub async fn start(&self, authenticator: &dyn Authenticator) -> Result<()> {
        let mut options = HashMap::with_capacity(1);
        options.insert(
            "CQL_VERSION".to_string(),
            self.inner.config.cql_version.clone(),
        );
        let mut writer = WireWriter::new();
        writer.write_string_map(&options);

        let response = self.send(Opcode::Startup, writer.finish()).await?;
        match response.opcode() {
            Opcode::Ready => {
                debug!("connection ready");
                Ok(())
            }
            Opcode::Authenticate => self.authenticate(&response, authenticator).await,
            Opcode::Error => Err(server_error(&response)),
            other => Err(CqlError::unimplemented(format!(
                "{} in reply to STARTUP",
                other
            ))),
        }
    }

    async fn authenticate(&self, frame: &Frame, authenticator: &dyn Authenticator) -> Result<()> {
        let mut body = ResponseBody::open(frame)?;
        let class = body.reader.read_string()?;
        if class != PASSWORD_AUTHENTICATOR {
            return Err(CqlError::unimplemented(format!("authenticator {}", class)));
        }
        debug!(authenticator = %class, "server requested authentication");

        let token = authenticator.initial_response(&[]).await?;
        let mut writer = WireWriter::with_capacity(token.len() + 4);
        writer.write_bytes(Some(&token[..]));

        let response = self.send(Opcode::AuthResponse, writer.finish()).await?;
        match response.opcode() {
            Opcode::AuthSuccess => {
                debug!("authenticated");
                Ok(())
            }
            Opcode::Error => Err(server_error(&response)),
            Opcode::AuthChallenge => Err(CqlError::unimplemented("multi-step SASL challenge")),
            other => Err(CqlError::unimplemented(format!(
                "{} in reply to AUTH_RESPONSE",
                other
            ))),
        }
    }

    /// Send `statement` as a `QUERY` and decode the `RESULT`.
    async fn run(&self, statement: &Statement) -> Result<(ResultBody, Vec<String>)> {
        let body = self.inner.query_builder.build(statement)?;
        let response = self.send(Opcode::Query, body).await?;
        match response.opcode() {
            Opcode::Result => {
                let mut body = ResponseBody::open(&response)?;
                let result = parse_result(&mut body.reader)?;
                match &result {
                    ResultBody::SetKeyspace(keyspace) => debug!(%keyspace, "keyspace set"),
                    ResultBody::SchemaChange(change) => debug!(?change, "schema changed"),
                    _ => {}
                }
                Ok((result, body.warnings))
            }
            Opcode::Error => Err(server_error(&response)),
            other => Err(CqlError::Protocol(format!(
                "expected RESULT, got {}",
                other
            ))),
        }
    }

    /// Run a statement that returns no rows.
    ///
    /// `consistency` of `None` uses the query builder's default. Rows and
    /// prepared results are reported as [`CqlError::Unimplemented`]; use
    /// [`Connection::query`] for reads.
    pub async fn execute(
        &self,
        query: &str,
        consistency: Option<Consistency>,
        values: Vec<Option<Bytes>>,
    ) -> Result<()> {
        let mut statement = Statement::new(query).values(values);
        statement.consistency = consistency;

        let (result, _) = self.run(&statement).await?;
        match result {
            ResultBody::Void | ResultBody::SetKeyspace(_) | ResultBody::SchemaChange(_) => Ok(()),
            ResultBody::Rows(_) => Err(CqlError::unimplemented("rows result from execute")),
            ResultBody::Prepared => Err(CqlError::unimplemented("prepared result")),
        }
    }

    /// Run a statement and return its first page of rows.
    ///
    /// Returns `None` for results without rows (void, keyspace and schema
    /// changes).
    pub async fn query(&self, statement: Statement) -> Result<Option<Page>> {
        let (result, warnings) = self.run(&statement).await?;
        match result {
            ResultBody::Rows(set) => Ok(Some(Page::new(set, warnings, self.clone(), statement))),
            ResultBody::Void | ResultBody::SetKeyspace(_) | ResultBody::SchemaChange(_) => Ok(None),
            ResultBody::Prepared => Err(CqlError::unimplemented("prepared result")),
        }
    }

    /// Ask the server which `STARTUP` options it supports.
    pub async fn options(&self) -> Result<HashMap<String, Vec<String>>> {
        let response = self.send(Opcode::Options, Bytes::new()).await?;
        match response.opcode() {
            Opcode::Supported => ResponseBody::open(&response)?.reader.read_string_multimap(),
            Opcode::Error => Err(server_error(&response)),
            other => Err(CqlError::Protocol(format!(
                "expected SUPPORTED, got {}",
                other
            ))),
        }
    }

    /// Subscribe this connection to server events of the given kinds.
    pub async fn register(&self, event_types: &[EventType]) -> Result<()> {
        let names: Vec<&str> = event_types.iter().map(|t| t.as_str()).collect();
        let mut writer = WireWriter::new();
        writer.write_string_list(&names);

        let response = self.send(Opcode::Register, writer.finish()).await?;
        match response.opcode() {
            Opcode::Ready => Ok(()),
            Opcode::Error => Err(server_error(&response)),
            other => Err(CqlError::Protocol(format!("expected READY, got {}", other))),
        }
    }

    /// Receive every event frame routed after this call, in arrival order.
    ///
    /// The receiver reports closure once the connection closes. Decode
    /// frames with [`Event::parse`](crate::event::Event::parse).
    pub fn subscribe_events(&self) -> Result<broadcast::Receiver<Frame>> {
        lock(&self.inner.events)
            .as_ref()
            .map(broadcast::Sender::subscribe)
            .ok_or(CqlError::ConnectionClosed)
    }

    /// Close the connection.
    ///
    /// Pending requests fail with [`CqlError::ConnectionClosed`], the
    /// outbound side is released so the transport can shut down, and event
    /// subscribers see their channel close. Closing twice is a no-op.
    pub fn close(&self) {
        let failed = self.inner.shutdown();
        self.inner.abort_tasks();
        debug!(failed, "connection closed");
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("protocol_version", &self.inner.config.protocol_version)
            .field("closed", &self.is_closed())
            .field("in_flight", &self.in_flight())
            .finish()
    }
}
