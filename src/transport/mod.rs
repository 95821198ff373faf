//! Frame transports.
//!
//! A [`FrameTransport`] is an ordered pair of frame channels: requests go
//! out on `outbound`, responses and events come back on `inbound`. The
//! connection engine only sees frames, so anything that can move frames can
//! serve as a transport:
//!
//! - [`spawn_io`] adapts any `AsyncRead + AsyncWrite` byte stream (a TCP or
//!   TLS stream opened by the caller, or `tokio::io::duplex` in tests)
//! - [`FrameTransport::pair`] links a transport to an in-process peer that
//!   plays the server

mod reader;
mod writer;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::error;

use crate::config::ConnectionConfig;
use crate::error::Result;
use crate::protocol::Frame;

use reader::{reader_loop, ReaderSettings};
use writer::writer_loop;

/// Ordered frame channels to and from a server.
#[derive(Debug)]
pub struct FrameTransport {
    /// Frames to write, in order.
    pub outbound: mpsc::Sender<Frame>,
    /// Frames read, in arrival order. Ends when the server side is gone.
    pub inbound: mpsc::Receiver<Frame>,
}

/// Server side of an in-process transport.
#[derive(Debug)]
pub struct PeerTransport {
    /// Frames the client sent.
    pub requests: mpsc::Receiver<Frame>,
    /// Frames to deliver to the client.
    pub responses: mpsc::Sender<Frame>,
}

impl FrameTransport {
    /// Create a transport from its two channel ends.
    pub fn new(outbound: mpsc::Sender<Frame>, inbound: mpsc::Receiver<Frame>) -> Self {
        Self { outbound, inbound }
    }

    /// Create a transport linked to an in-process peer.
    ///
    /// Dropping `PeerTransport::responses` ends the client's inbound stream
    /// as a closed socket would.
    pub fn pair(capacity: usize) -> (FrameTransport, PeerTransport) {
        let (outbound, requests) = mpsc::channel(capacity);
        let (responses, inbound) = mpsc::channel(capacity);
        (
            FrameTransport { outbound, inbound },
            PeerTransport {
                requests,
                responses,
            },
        )
    }
}

/// Handles of the tasks behind [`spawn_io`].
#[derive(Debug)]
pub struct IoTasks {
    pub reader: JoinHandle<Result<()>>,
    pub writer: JoinHandle<Result<()>>,
}

/// Drive a byte stream as a frame transport.
///
/// Spawns a writer task that batches queued frames into vectored writes and
/// shuts the write half down once every outbound sender is dropped, and a
/// reader task that decodes and validates response frames. A read failure
/// is logged and ends the inbound stream. Must be called within a tokio
/// runtime.
pub fn spawn_io<S>(stream: S, config: &ConnectionConfig) -> (FrameTransport, IoTasks)
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    let (read_half, write_half) = tokio::io::split(stream);
    let (outbound, outbound_rx) = mpsc::channel(config.outbound_capacity.max(1));
    let (inbound_tx, inbound) = mpsc::channel(config.outbound_capacity.max(1));

    let writer = tokio::spawn(async move {
        let result = writer_loop(outbound_rx, write_half).await;
        if let Err(e) = &result {
            error!("transport write failed: {}", e);
        }
        result
    });

    let settings = ReaderSettings {
        protocol_version: config.protocol_version,
        max_frame_length: config.max_frame_length,
        read_buffer_size: config.read_buffer_size,
    };
    let reader = tokio::spawn(async move {
        let result = reader_loop(read_half, inbound_tx, settings).await;
        if let Err(e) = &result {
            error!("transport read failed: {}", e);
        }
        result
    });

    (FrameTransport { outbound, inbound }, IoTasks { reader, writer })
}
