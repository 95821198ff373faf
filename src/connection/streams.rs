//! Stream-id allocation and the pending-response table.
//!
//! Ids are handed out lowest-free-first from `[0, MAX_STREAMS)`. A slot is
//! held from allocation until its response arrives or the table closes, so
//! an id is never reused while the server may still answer on it.

use tokio::sync::{mpsc, oneshot};

use crate::error::{CqlError, Result};
use crate::protocol::{Frame, MAX_STREAMS};

/// Completion handle for one in-flight request.
pub(crate) type ResponseSender = oneshot::Sender<Result<Frame>>;

/// What `allocate` hands the caller.
pub(crate) struct Allocation {
    pub stream: i16,
    pub response: oneshot::Receiver<Result<Frame>>,
}

/// Pending requests plus the open/closed state of the connection.
///
/// Guarded by a single mutex so that closing and allocating never
/// interleave: after `close` returns, no new slot can be created and every
/// existing one has been failed.
pub(crate) struct StreamTable {
    slots: Vec<Option<ResponseSender>>,
    /// Every id below this one is in use.
    lowest_free: usize,
    in_flight: usize,
    outbound: Option<mpsc::Sender<Frame>>,
}

impl StreamTable {
    pub fn new(outbound: mpsc::Sender<Frame>) -> Self {
        let mut slots = Vec::with_capacity(MAX_STREAMS);
        slots.resize_with(MAX_STREAMS, || None);
        Self {
            slots,
            lowest_free: 0,
            in_flight: 0,
            outbound: Some(outbound),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.outbound.is_none()
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// Sender for outbound frames, while the table is open.
    pub fn outbound(&self) -> Result<mpsc::Sender<Frame>> {
        self.outbound.clone().ok_or(CqlError::ConnectionClosed)
    }

    /// Reserve the lowest free id and register its completion handle.
    ///
    /// Callers hold queue capacity before allocating, so the frame goes out
    /// without another await and the slot cannot be stranded unsent.
    pub fn allocate(&mut self) -> Result<Allocation> {
        if self.is_closed() {
            return Err(CqlError::ConnectionClosed);
        }

        let idx = self.slots[self.lowest_free..]
            .iter()
            .position(Option::is_none)
            .map(|offset| self.lowest_free + offset)
            .ok_or(CqlError::StreamIdsExhausted)?;
        let stream = i16::try_from(idx).map_err(|_| CqlError::StreamIdsExhausted)?;

        let (tx, rx) = oneshot::channel();
        self.slots[idx] = Some(tx);
        self.lowest_free = idx + 1;
        self.in_flight += 1;

        Ok(Allocation {
            stream,
            response: rx,
        })
    }

    /// Remove the slot for `stream`, returning its handle if it was in use.
    pub fn take(&mut self, stream: i16) -> Option<ResponseSender> {
        let idx = usize::try_from(stream).ok()?;
        let sender = self.slots.get_mut(idx)?.take()?;
        self.in_flight -= 1;
        self.lowest_free = self.lowest_free.min(idx);
        Some(sender)
    }

    /// Deliver a response to its waiter.
    ///
    /// Returns the frame back if no request is pending on its stream.
    pub fn complete(&mut self, frame: Frame) -> std::result::Result<(), Frame> {
        match self.take(frame.stream()) {
            // The waiter may have gone away; the slot is freed either way.
            Some(sender) => {
                let _ = sender.send(Ok(frame));
                Ok(())
            }
            None => Err(frame),
        }
    }

    /// Stop accepting requests and fail every pending one.
    ///
    /// Drops the table's outbound sender. Returns how many requests were
    /// failed; a second call fails none.
    pub fn close(&mut self) -> usize {
        self.outbound = None;
        let mut failed = 0;
        for slot in &mut self.slots {
            if let Some(sender) = slot.take() {
                let _ = sender.send(Err(CqlError::ConnectionClosed));
                failed += 1;
            }
        }
        self.in_flight = 0;
        self.lowest_free = 0;
        failed
    }
}
