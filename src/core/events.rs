//! Session event definitions

use crate::session::{SessionId, SessionState};
use crate::terminal::GridSize;
use tokio::sync::mpsc;

/// Events published by terminal sessions
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Lifecycle state changed
    StateChanged { session_id: SessionId, state: SessionState },

    /// A bootstrap step failed; the session has no process
    BootFailed { session_id: SessionId, error: String },

    /// Shell process exited (None if the exit signal was dropped)
    Exited { session_id: SessionId, code: Option<i32> },

    /// Terminal grid re-fitted after a host window resize
    Resized { session_id: SessionId, size: GridSize },
}

/// Cloneable sender for session events.
///
/// Sending never fails from the caller's point of view: a dropped receiver
/// just means nobody is listening anymore.
#[derive(Clone)]
pub struct EventSender {
    tx: mpsc::UnboundedSender<SessionEvent>,
}

impl EventSender {
    pub fn new(tx: mpsc::UnboundedSender<SessionEvent>) -> Self {
        Self { tx }
    }

    /// Create a sender together with its receiving end
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<SessionEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }

    pub fn send(&self, event: SessionEvent) {
        let _ = self.tx.send(event);
    }
}
