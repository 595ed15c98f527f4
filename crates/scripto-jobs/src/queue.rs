//! Bounded interaction queue.
//!
//! Submitters reserve a slot before persisting anything, so a full queue
//! rejects the request without leaving an orphaned pending record.

use tokio::sync::mpsc::{self, error::TrySendError};
use uuid::Uuid;

use scripto_core::{Error, Result};

/// Create a queue with room for `capacity` waiting interactions.
pub fn channel(capacity: usize) -> (InteractionQueue, QueueReceiver) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (InteractionQueue { tx }, QueueReceiver { rx })
}

/// Sending side, owned by the orchestrator.
#[derive(Clone)]
pub struct InteractionQueue {
    tx: mpsc::Sender<Uuid>,
}

impl InteractionQueue {
    /// Reserve a slot. Fails with `Error::Unavailable` when the queue is
    /// full or the worker has gone away.
    pub fn reserve(&self) -> Result<QueueSlot<'_>> {
        match self.tx.try_reserve() {
            Ok(permit) => Ok(QueueSlot { permit }),
            Err(TrySendError::Full(())) => Err(Error::Unavailable(
                "Interaction queue is full, try again later".to_string(),
            )),
            Err(TrySendError::Closed(())) => Err(Error::Unavailable(
                "Interaction worker is not running".to_string(),
            )),
        }
    }

    /// Free slots right now.
    pub fn available(&self) -> usize {
        self.tx.capacity()
    }

    pub fn max_capacity(&self) -> usize {
        self.tx.max_capacity()
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// A reserved queue slot. Dropping it releases the slot.
pub struct QueueSlot<'a> {
    permit: mpsc::Permit<'a, Uuid>,
}

impl QueueSlot<'_> {
    pub fn enqueue(self, id: Uuid) {
        self.permit.send(id);
    }
}

/// Receiving side, owned by the worker.
pub struct QueueReceiver {
    rx: mpsc::Receiver<Uuid>,
}

impl QueueReceiver {
    pub async fn recv(&mut self) -> Option<Uuid> {
        self.rx.recv().await
    }
}
