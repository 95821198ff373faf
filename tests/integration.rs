//! End-to-end tests: a `Connection` over an in-memory byte stream, talking
//! to a scripted server that decodes requests with the crate's own framing.

use std::collections::VecDeque;
use std::time::Duration;

use bytes::Bytes;
use tokio::io::{duplex, AsyncReadExt, AsyncWriteExt, DuplexStream};

use cqlwire_client::auth::{PasswordAuthenticator, PASSWORD_AUTHENTICATOR};
use cqlwire_client::codec::{WireReader, WireWriter};
use cqlwire_client::event::StatusChange;
use cqlwire_client::protocol::{flags, FrameBuffer};
use cqlwire_client::query::query_flags;
use cqlwire_client::{
    Connection, CqlError, Event, EventType, Frame, Opcode, Statement, Value,
};

/// Server end of a duplex stream.
struct Server {
    stream: DuplexStream,
    buffer: FrameBuffer,
    queued: VecDeque<Frame>,
}

impl Server {
    fn new(stream: DuplexStream) -> Self {
        Self {
            stream,
            buffer: FrameBuffer::new(),
            queued: VecDeque::new(),
        }
    }

    /// Next request, or `None` once the client shuts its write side.
    async fn next_request(&mut self) -> Option<Frame> {
        let mut buf = [0u8; 512];
        loop {
            if let Some(frame) = self.queued.pop_front() {
                return Some(frame);
            }
            let n = self.stream.read(&mut buf).await.unwrap();
            if n == 0 {
                return None;
            }
            self.queued.extend(self.buffer.push(&buf[..n]).unwrap());
        }
    }

    async fn send(&mut self, frame: Frame) {
        self.stream.write_all(&frame.encode()).await.unwrap();
    }

    async fn reply(&mut self, request: &Frame, opcode: Opcode, body: Bytes) {
        self.send(Frame::response(4, 0, request.stream(), opcode, body))
            .await;
    }
}

fn setup() -> (Connection, Server) {
    let (client, server) = duplex(64 * 1024);
    (Connection::builder().connect(client), Server::new(server))
}

fn query_text(request: &Frame) -> String {
    WireReader::new(request.body_bytes())
        .read_long_string()
        .unwrap()
}

fn paging_state(request: &Frame) -> Option<Bytes> {
    let mut reader = WireReader::new(request.body_bytes());
    reader.read_long_string().unwrap();
    reader.read_short().unwrap();
    let flags = reader.read_byte().unwrap();
    if flags & query_flags::PAGE_SIZE != 0 {
        reader.read_int().unwrap();
    }
    if flags & query_flags::PAGING_STATE != 0 {
        reader.read_bytes(false).unwrap()
    } else {
        None
    }
}

/// Rows result with columns `id int, name varchar, tags set<varchar>`.
fn users_page(rows: &[(i32, Option<&str>, Vec<&str>)], paging_state: Option<&[u8]>) -> Bytes {
    let mut w = WireWriter::new();
    w.write_int(2)
        .write_int(if paging_state.is_some() { 0x0003 } else { 0x0001 })
        .write_int(3);
    if let Some(state) = paging_state {
        w.write_bytes(Some(state));
    }
    w.write_string("app")
        .write_string("users")
        .write_string("id")
        .write_short(0x0009)
        .write_string("name")
        .write_short(0x000D)
        .write_string("tags")
        .write_short(0x0022)
        .write_short(0x000D)
        .write_int(rows.len() as i32);

    for (id, name, tags) in rows {
        w.write_bytes(Some(&id.to_be_bytes()));
        w.write_bytes(name.map(str::as_bytes));
        let mut set = WireWriter::new();
        set.write_int(tags.len() as i32);
        for tag in tags {
            set.write_bytes(Some(tag.as_bytes()));
        }
        w.write_bytes(Some(&set.finish()[..]));
    }
    w.finish()
}

#[tokio::test]
async fn test_handshake_query_and_paging() {
    let (conn, mut server) = setup();

    let script = tokio::spawn(async move {
        let startup = server.next_request().await.unwrap();
        assert_eq!(startup.opcode(), Opcode::Startup);
        let mut body = WireWriter::new();
        body.write_string(PASSWORD_AUTHENTICATOR);
        server.reply(&startup, Opcode::Authenticate, body.finish()).await;

        let auth = server.next_request().await.unwrap();
        assert_eq!(auth.opcode(), Opcode::AuthResponse);
        server.reply(&auth, Opcode::AuthSuccess, Bytes::new()).await;

        while let Some(request) = server.next_request().await {
            assert_eq!(request.opcode(), Opcode::Query);
            let body = match paging_state(&request) {
                None => users_page(
                    &[(1, Some("ada"), vec!["admin", "ops"]), (2, None, vec![])],
                    Some(b"\x00\x01cursor"),
                ),
                Some(state) => {
                    assert_eq!(&state[..], b"\x00\x01cursor");
                    users_page(&[(3, Some("grace"), vec!["dev"])], None)
                }
            };
            server.reply(&request, Opcode::Result, body).await;
        }
    });

    conn.start(&PasswordAuthenticator::new("app", "s3cret"))
        .await
        .unwrap();

    let first = conn
        .query(Statement::new("SELECT id, name, tags FROM app.users").page_size(2))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(first.columns().len(), 3);
    assert_eq!(first.columns()[2].value_type.to_string(), "set<varchar>");
    assert!(!first.is_last());

    let ada = &first.rows()[0];
    assert_eq!(ada.get_by_name("name").unwrap().as_str(), Some("ada"));
    assert_eq!(
        ada.get_by_name("tags").unwrap().as_set().unwrap(),
        &[Value::Varchar("admin".into()), Value::Varchar("ops".into())]
    );
    assert!(first.rows()[1].get(1).unwrap().is_null());

    let second = first.next().await.unwrap();
    assert!(second.is_last());
    let row = second.rows()[0].to_map();
    assert_eq!(row["id"], Value::Int(3));
    assert!(matches!(second.next().await, Err(CqlError::NoMorePages)));

    conn.close();
    tokio::time::timeout(Duration::from_secs(5), script)
        .await
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn test_concurrent_requests_answered_out_of_order() {
    let (conn, mut server) = setup();

    let mut handles = Vec::new();
    for i in 0..8 {
        let conn = conn.clone();
        handles.push(tokio::spawn(async move {
            let statement = Statement::new(format!("SELECT {}", i));
            let page = conn.query(statement).await.unwrap().unwrap();
            (i, page.rows()[0].get(0).cloned())
        }));
    }

    let mut requests = Vec::new();
    for _ in 0..8 {
        requests.push(server.next_request().await.unwrap());
    }
    let mut streams: Vec<_> = requests.iter().map(Frame::stream).collect();
    streams.sort_unstable();
    assert_eq!(streams, (0..8).collect::<Vec<i16>>());

    for request in requests.iter().rev() {
        let n: i32 = query_text(request)[7..].parse().unwrap();
        server
            .reply(request, Opcode::Result, users_page(&[(n, None, vec![])], None))
            .await;
    }

    for handle in handles {
        let (i, value) = handle.await.unwrap();
        assert_eq!(value, Some(Value::Int(i)));
    }
}

#[tokio::test]
async fn test_response_split_into_single_bytes() {
    let (conn, mut server) = setup();

    let pending = tokio::spawn({
        let conn = conn.clone();
        async move { conn.options().await }
    });

    let request = server.next_request().await.unwrap();
    let mut body = WireWriter::new();
    body.write_short(2)
        .write_string("COMPRESSION")
        .write_string_list(&["lz4", "snappy"])
        .write_string("CQL_VERSION")
        .write_string_list(&["3.4.5"]);
    let response = Frame::response(4, 0, request.stream(), Opcode::Supported, body.finish());

    for byte in response.encode() {
        server.stream.write_all(&[byte]).await.unwrap();
        server.stream.flush().await.unwrap();
    }

    let options = pending.await.unwrap().unwrap();
    assert_eq!(options["COMPRESSION"], vec!["lz4", "snappy"]);
}

#[tokio::test]
async fn test_events_over_stream() {
    let (conn, mut server) = setup();
    let mut events = conn.subscribe_events().unwrap();

    let register = tokio::spawn({
        let conn = conn.clone();
        async move { conn.register(&[EventType::StatusChange]).await }
    });
    let request = server.next_request().await.unwrap();
    assert_eq!(request.opcode(), Opcode::Register);
    server.reply(&request, Opcode::Ready, Bytes::new()).await;
    register.await.unwrap().unwrap();

    for status in ["UP", "DOWN"] {
        let mut body = WireWriter::new();
        body.write_string("STATUS_CHANGE")
            .write_string(status)
            .write_byte(4)
            .write_raw(&[10, 0, 0, 2])
            .write_int(9042);
        server
            .send(Frame::response(4, 0, -1, Opcode::Event, body.finish()))
            .await;
    }

    let changes: Vec<_> = [events.recv().await.unwrap(), events.recv().await.unwrap()]
        .iter()
        .map(|frame| match Event::parse(frame).unwrap() {
            Event::StatusChange { change, address } => {
                assert_eq!(address.port(), 9042);
                change
            }
            other => panic!("unexpected event {:?}", other),
        })
        .collect();
    assert_eq!(changes, vec![StatusChange::Up, StatusChange::Down]);
}

#[tokio::test]
async fn test_server_hangup_fails_pending() {
    let (conn, mut server) = setup();

    let pending = tokio::spawn({
        let conn = conn.clone();
        async move { conn.execute("INSERT INTO t (k) VALUES (1)", None, vec![]).await }
    });
    server.next_request().await.unwrap();
    drop(server);

    let result = tokio::time::timeout(Duration::from_secs(5), pending)
        .await
        .unwrap()
        .unwrap();
    assert!(matches!(result, Err(CqlError::ConnectionClosed)));
    assert!(conn.is_closed());
}

#[tokio::test]
async fn test_oversized_frame_closes_connection() {
    let (client, server) = duplex(4096);
    let conn = Connection::builder().max_frame_length(16).connect(client);
    let mut server = Server::new(server);

    let pending = tokio::spawn({
        let conn = conn.clone();
        async move { conn.options().await }
    });
    let request = server.next_request().await.unwrap();
    server
        .reply(&request, Opcode::Supported, Bytes::from(vec![0u8; 64]))
        .await;

    let result = tokio::time::timeout(Duration::from_secs(5), pending)
        .await
        .unwrap()
        .unwrap();
    assert!(matches!(result, Err(CqlError::ConnectionClosed)));
}

#[tokio::test]
async fn test_warning_and_error_responses() {
    let (conn, mut server) = setup();

    let script = tokio::spawn(async move {
        let request = server.next_request().await.unwrap();
        let mut body = WireWriter::new();
        body.write_string_list(&["Batch too large"]).write_int(1);
        server
            .send(Frame::response(4, flags::WARNING, request.stream(), Opcode::Result, body.finish()))
            .await;

        let request = server.next_request().await.unwrap();
        let mut body = WireWriter::new();
        body.write_int(0x2200).write_string("unconfigured table nope");
        server.reply(&request, Opcode::Error, body.finish()).await;
    });

    conn.execute("UPDATE t SET v = 1 WHERE k = 1", None, vec![])
        .await
        .unwrap();

    let err = conn
        .query(Statement::new("SELECT * FROM nope"))
        .await
        .unwrap_err();
    let server_error = err.server_error().unwrap();
    assert_eq!(server_error.code, 0x2200);
    assert_eq!(server_error.message, "unconfigured table nope");

    script.await.unwrap();
}
