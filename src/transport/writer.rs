//! Writer task: drains the outbound queue onto the byte stream.
//!
//! ```text
//! send() ─┐
//! send() ─┼─► mpsc::Sender<Frame> ─► writer task ─► AsyncWrite
//! send() ─┘
//! ```
//!
//! Frames already queued are written together with one `write_vectored`
//! call where the stream allows it. When every sender is gone the task
//! shuts the write half down and exits.

use std::io::IoSlice;

use bytes::Bytes;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tracing::debug;

use crate::error::{CqlError, Result};
use crate::protocol::{Frame, HEADER_SIZE};

/// Maximum frames to batch in a single write operation.
const MAX_BATCH_SIZE: usize = 64;

/// A frame with its header pre-encoded.
#[derive(Debug)]
struct OutboundFrame {
    header: [u8; HEADER_SIZE],
    body: Bytes,
}

impl OutboundFrame {
    fn size(&self) -> usize {
        HEADER_SIZE + self.body.len()
    }
}

impl From<Frame> for OutboundFrame {
    fn from(frame: Frame) -> Self {
        Self {
            header: frame.header.encode(),
            body: frame.body,
        }
    }
}

/// Receive frames and write them until the channel closes.
pub(crate) async fn writer_loop<W>(mut rx: mpsc::Receiver<Frame>, mut writer: W) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut batch = Vec::with_capacity(MAX_BATCH_SIZE);
    loop {
        let first = match rx.recv().await {
            Some(frame) => frame,
            None => {
                debug!("outbound queue closed; shutting down write half");
                writer.shutdown().await?;
                return Ok(());
            }
        };

        batch.clear();
        batch.push(OutboundFrame::from(first));
        while batch.len() < MAX_BATCH_SIZE {
            match rx.try_recv() {
                Ok(frame) => batch.push(OutboundFrame::from(frame)),
                Err(_) => break,
            }
        }

        write_batch(&mut writer, &batch).await?;
    }
}

fn write_zero() -> CqlError {
    CqlError::Io(std::io::Error::new(
        std::io::ErrorKind::WriteZero,
        "write_vectored returned 0",
    ))
}

/// Write a batch with scatter/gather I/O, resuming after partial writes.
async fn write_batch<W>(writer: &mut W, batch: &[OutboundFrame]) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    if batch.is_empty() {
        return Ok(());
    }

    let total_size: usize = batch.iter().map(OutboundFrame::size).sum();
    let mut total_written = 0;

    while total_written < total_size {
        let slices = build_remaining_slices(batch, total_written);
        if slices.is_empty() {
            break;
        }
        let written = writer.write_vectored(&slices).await?;
        if written == 0 {
            return Err(write_zero());
        }
        total_written += written;
    }

    writer.flush().await?;
    Ok(())
}

/// IoSlices covering everything after the first `skip_bytes` of the batch.
fn build_remaining_slices(batch: &[OutboundFrame], skip_bytes: usize) -> Vec<IoSlice<'_>> {
    let mut slices = Vec::with_capacity(batch.len() * 2);
    let mut offset = 0;

    for frame in batch {
        let header_end = offset + HEADER_SIZE;
        if skip_bytes < header_end {
            slices.push(IoSlice::new(&frame.header[skip_bytes.saturating_sub(offset)..]));
        }
        offset = header_end;

        if !frame.body.is_empty() {
            let body_end = offset + frame.body.len();
            if skip_bytes < body_end {
                slices.push(IoSlice::new(&frame.body[skip_bytes.saturating_sub(offset)..]));
            }
            offset = body_end;
        }
    }

    slices
}
