//! Boundary transport between execution contexts.
//!
//! The canvas and the control panel run independently; they only exchange
//! serialized event frames. A [`BoundaryPort`] pair is the two ends of that
//! link. Delivery is asynchronous and there is no ordering guarantee between
//! the two directions, so consumers treat snapshots as eventually
//! consistent: a later `slide-updated` always supersedes an earlier one.
//!
//! Frames are validated on receipt; frames that fail to decode are dropped
//! with a warning instead of reaching the consumer.

use crate::protocol::{Event, ProtocolError};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender, error::TryRecvError};

/// One end of a boundary link.
pub struct BoundaryPort {
    label: &'static str,
    tx: UnboundedSender<String>,
    rx: UnboundedReceiver<String>,
}

/// Create a connected pair of ports. Frames sent on one are received on the
/// other.
pub fn boundary_pair(a: &'static str, b: &'static str) -> (BoundaryPort, BoundaryPort) {
    let (a_tx, b_rx) = mpsc::unbounded_channel();
    let (b_tx, a_rx) = mpsc::unbounded_channel();
    (
        BoundaryPort {
            label: a,
            tx: a_tx,
            rx: a_rx,
        },
        BoundaryPort {
            label: b,
            tx: b_tx,
            rx: b_rx,
        },
    )
}

impl BoundaryPort {
    pub fn label(&self) -> &'static str {
        self.label
    }

    /// Serialize and send an event to the other side.
    ///
    /// # Errors
    /// [`ProtocolError::Disconnected`] if the other port has been dropped.
    pub fn send(&self, event: impl Into<Event>) -> Result<(), ProtocolError> {
        let event = event.into();
        let frame = event.encode()?;
        log::debug!("{}: send {}", self.label, event.name());
        self.send_frame(frame)
    }

    /// Send a pre-encoded frame as-is.
    pub fn send_frame(&self, frame: String) -> Result<(), ProtocolError> {
        self.tx.send(frame).map_err(|_| ProtocolError::Disconnected)
    }

    /// Take the next valid event without waiting. Invalid frames are logged
    /// and skipped. Returns `None` when nothing is pending.
    pub fn try_recv(&mut self) -> Option<Event> {
        loop {
            match self.rx.try_recv() {
                Ok(frame) => {
                    if let Some(event) = self.accept(&frame) {
                        return Some(event);
                    }
                }
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => return None,
            }
        }
    }

    /// Drain every pending valid event.
    pub fn drain(&mut self) -> Vec<Event> {
        std::iter::from_fn(|| self.try_recv()).collect()
    }

    /// Wait for the next valid event. Returns `None` once the other side is
    /// gone and the queue is empty.
    pub async fn recv(&mut self) -> Option<Event> {
        while let Some(frame) = self.rx.recv().await {
            if let Some(event) = self.accept(&frame) {
                return Some(event);
            }
        }
        None
    }

    fn accept(&self, frame: &str) -> Option<Event> {
        match Event::decode(frame) {
            Ok(event) => Some(event),
            Err(e) => {
                log::warn!("{}: dropped frame: {e}", self.label);
                None
            }
        }
    }
}
