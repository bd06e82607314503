//! Request/response correlation.
//!
//! A handler that needs the server's answer registers an [`Expectation`]
//! with a filter *before* sending the request, then awaits matching lines
//! with a deadline. The reader task offers every inbound message to every
//! registered filter after the tracker has seen it.

use std::sync::Arc;
use std::sync::Weak;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use bantracker_proto::Message;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::error::SessionError;

/// Predicate deciding whether an inbound message belongs to an expectation.
pub type Filter = Box<dyn Fn(&Message) -> bool + Send + Sync>;

struct Slot {
    id: u64,
    filter: Filter,
    tx: mpsc::UnboundedSender<Message>,
}

/// Registry of pending expectations for one connection.
#[derive(Default)]
pub struct Waiters {
    slots: Mutex<Vec<Slot>>,
    next_id: AtomicU64,
    closed: AtomicBool,
}

impl Waiters {
    /// Register a filter. Matching messages queue up until consumed.
    pub fn register(self: &Arc<Self>, filter: Filter) -> Expectation {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);

        // A closed registry drops `tx` here, so the first wait reports
        // `Disconnected` instead of sleeping until the deadline.
        if !self.closed.load(Ordering::Acquire) {
            self.slots.lock().push(Slot { id, filter, tx });
        }

        Expectation {
            id,
            rx,
            waiters: Arc::downgrade(self),
        }
    }

    /// Hand a copy of `msg` to every expectation whose filter accepts it.
    pub fn offer(&self, msg: &Message) {
        let mut slots = self.slots.lock();
        slots.retain(|slot| {
            if (slot.filter)(msg) {
                slot.tx.send(msg.clone()).is_ok()
            } else {
                !slot.tx.is_closed()
            }
        });
    }

    /// Fail every pending and future expectation with `Disconnected`.
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
        self.slots.lock().clear();
    }

    /// Number of live registrations.
    #[cfg(test)]
    pub fn pending(&self) -> usize {
        self.slots.lock().len()
    }

    fn unregister(&self, id: u64) {
        self.slots.lock().retain(|slot| slot.id != id);
    }
}

/// A registered interest in upcoming server lines. Dropping it unregisters.
pub struct Expectation {
    id: u64,
    rx: mpsc::UnboundedReceiver<Message>,
    waiters: Weak<Waiters>,
}

impl Expectation {
    /// Next matching message, waiting at most `within`.
    pub async fn next(&mut self, within: Duration) -> Result<Message, SessionError> {
        match tokio::time::timeout(within, self.rx.recv()).await {
            Ok(Some(msg)) => Ok(msg),
            Ok(None) => Err(SessionError::Disconnected),
            Err(_) => Err(SessionError::Timeout),
        }
    }

    /// Next matching message, waiting until `deadline`.
    pub async fn next_before(
        &mut self,
        deadline: tokio::time::Instant,
    ) -> Result<Message, SessionError> {
        let within = deadline.saturating_duration_since(tokio::time::Instant::now());
        self.next(within).await
    }
}

impl Drop for Expectation {
    fn drop(&mut self) {
        if let Some(waiters) = self.waiters.upgrade() {
            waiters.unregister(self.id);
        }
    }
}
