//! Sender registry: sender address → bounded remediation queue.
//!
//! Built once at startup, then shared read-only with the HTTP handlers.
//! Registering a sender spawns its worker immediately, so the registry must
//! be populated from inside a Tokio runtime.

use std::collections::HashMap;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use bounce_common::config::WILDCARD_SENDER;
use bounce_common::error::AppError;

use crate::remediation::Remediator;
use crate::worker;

/// Default capacity of each sender queue.
pub const DEFAULT_QUEUE_CAPACITY: usize = 100;

/// Outcome of a non-blocking enqueue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Offer {
    Queued,
    /// Queue at capacity; the address was dropped.
    Full,
    /// Worker already stopped; the address was dropped.
    Closed,
}

/// Producer side of one sender's queue.
#[derive(Debug, Clone)]
pub struct SenderQueue {
    sender: String,
    tx: mpsc::Sender<String>,
}

impl SenderQueue {
    /// Registry key this queue was registered under (may be the wildcard).
    pub fn sender(&self) -> &str {
        &self.sender
    }

    /// Enqueue without waiting for capacity.
    pub fn offer(&self, address: &str) -> Offer {
        match self.tx.try_send(address.to_string()) {
            Ok(()) => Offer::Queued,
            Err(TrySendError::Full(_)) => Offer::Full,
            Err(TrySendError::Closed(_)) => Offer::Closed,
        }
    }
}

/// All registered senders plus the lifecycle of their workers.
pub struct SenderRegistry {
    queues: HashMap<String, SenderQueue>,
    capacity: usize,
    shutdown: CancellationToken,
    workers: TaskTracker,
}

impl SenderRegistry {
    pub fn new(capacity: usize) -> Self {
        Self::with_shutdown(capacity, CancellationToken::new())
    }

    /// Registry whose workers stop when `shutdown` is cancelled.
    pub fn with_shutdown(capacity: usize, shutdown: CancellationToken) -> Self {
        Self {
            queues: HashMap::new(),
            capacity: capacity.max(1),
            shutdown,
            workers: TaskTracker::new(),
        }
    }

    /// Add `remediator` as the processor for notifications sent from `sender`.
    ///
    /// Returns [`AppError::DuplicateSender`] if `sender` is already
    /// registered; the existing entry is left untouched.
    pub fn register<R: Remediator>(
        &mut self,
        sender: impl Into<String>,
        remediator: R,
    ) -> Result<(), AppError> {
        let sender = sender.into();
        if self.queues.contains_key(&sender) {
            return Err(AppError::DuplicateSender(sender));
        }

        let (tx, rx) = mpsc::channel(self.capacity);
        self.workers.spawn(worker::run(
            sender.clone(),
            rx,
            remediator,
            self.shutdown.child_token(),
        ));

        tracing::info!(sender = %sender, capacity = self.capacity, "Sender registered");
        self.queues
            .insert(sender.clone(), SenderQueue { sender, tx });
        Ok(())
    }

    /// Queue for `sender`, falling back to the wildcard entry.
    pub fn resolve(&self, sender: &str) -> Option<&SenderQueue> {
        self.queues
            .get(sender)
            .or_else(|| self.queues.get(WILDCARD_SENDER))
    }

    pub fn len(&self) -> usize {
        self.queues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queues.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Signal every worker to stop. Queued addresses are abandoned.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    /// Wait until every worker has stopped. Call after [`Self::shutdown`].
    pub async fn stopped(&self) {
        self.workers.close();
        self.workers.wait().await;
    }
}

impl Drop for SenderRegistry {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}
