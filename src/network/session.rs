//! Handle to the live connection, shared by every handler and task.

use std::sync::Arc;

use bantracker_proto::Message;
use parking_lot::{RwLock, RwLockReadGuard};
use tokio::sync::mpsc;
use tracing::debug;

use super::waiters::{Expectation, Waiters};
use crate::error::SessionError;
use crate::state::Tracker;

/// Cheap to clone; all clones talk to the same connection.
#[derive(Clone)]
pub struct Session {
    outgoing: mpsc::UnboundedSender<Message>,
    waiters: Arc<Waiters>,
    tracker: Arc<RwLock<Tracker>>,
}

impl Session {
    pub(crate) fn new(
        outgoing: mpsc::UnboundedSender<Message>,
        waiters: Arc<Waiters>,
        tracker: Arc<RwLock<Tracker>>,
    ) -> Self {
        Self {
            outgoing,
            waiters,
            tracker,
        }
    }

    /// Queue a message for the writer task.
    pub fn send(&self, msg: Message) -> Result<(), SessionError> {
        self.outgoing.send(msg).map_err(|e| {
            debug!(command = %e.0.command, "Dropping outbound message, session closed");
            SessionError::Disconnected
        })
    }

    /// Register interest in inbound lines matching `filter`.
    ///
    /// Register before sending the request the filter is waiting for, or a
    /// fast reply can slip past.
    pub fn expect<F>(&self, filter: F) -> Expectation
    where
        F: Fn(&Message) -> bool + Send + Sync + 'static,
    {
        self.waiters.register(Box::new(filter))
    }

    /// Read access to channel state. Do not hold across an `.await`.
    pub fn tracker(&self) -> RwLockReadGuard<'_, Tracker> {
        self.tracker.read()
    }

    /// Whether the connection behind this handle is still up.
    pub fn is_connected(&self) -> bool {
        !self.outgoing.is_closed()
    }

    /// Stop counting on op in `channel` once we have sent our own `-o`.
    pub fn forget_own_op(&self, channel: &str) {
        self.tracker.write().revoke_own_op(channel);
    }

    /// A session with no socket behind it, and the queue it writes to.
    #[cfg(test)]
    pub(crate) fn detached(tracker: Tracker) -> (Self, mpsc::UnboundedReceiver<Message>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let session = Self::new(tx, Arc::new(Waiters::default()), Arc::new(RwLock::new(tracker)));
        (session, rx)
    }

    /// Feed an inbound line the way the reader task does: tracker first,
    /// then expectations.
    #[cfg(test)]
    pub(crate) fn deliver(&self, line: &str) -> Message {
        let msg: Message = line.parse().unwrap();
        self.tracker.write().apply(&msg);
        self.waiters.offer(&msg);
        msg
    }
}
