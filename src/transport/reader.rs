//! Reader task: decodes frames off the byte stream.

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::mpsc;
use tracing::debug;

use crate::error::Result;
use crate::protocol::{Frame, FrameBuffer};

/// Settings the reader checks every inbound header against.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ReaderSettings {
    pub protocol_version: u8,
    pub max_frame_length: u32,
    pub read_buffer_size: usize,
}

/// Read until end of stream, forwarding complete frames in arrival order.
///
/// Returns `Ok(())` on a clean end of stream or once the inbound receiver
/// is dropped. Dropping `inbound` on return ends the consumer's stream.
pub(crate) async fn reader_loop<R>(
    mut reader: R,
    inbound: mpsc::Sender<Frame>,
    settings: ReaderSettings,
) -> Result<()>
where
    R: AsyncRead + Unpin,
{
    let mut frame_buffer = FrameBuffer::with_max_length(settings.max_frame_length);
    let mut buf = vec![0u8; settings.read_buffer_size.max(1)];

    loop {
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            if !frame_buffer.is_empty() {
                debug!(buffered = frame_buffer.len(), "stream ended mid-frame");
            }
            return Ok(());
        }

        for frame in frame_buffer.push(&buf[..n])? {
            frame
                .header
                .validate(settings.protocol_version, settings.max_frame_length)?;
            if inbound.send(frame).await.is_err() {
                debug!("inbound receiver dropped; stopping reader");
                return Ok(());
            }
        }
    }
}
