//! Correlation of native requests with their completion events.
//!
//! Every call into the native engine is fire-and-forget: the engine later
//! raises a `request-completed` event carrying the id that was passed in.
//! [`PendingOperations`] hands out those ids and keeps one single-shot
//! channel per outstanding request so the caller can await the event.

use crate::error::{Result, TransportError};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::oneshot;

/// Correlation token passed to the native engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(u64);

impl RequestId {
    /// Wrap a raw id.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// The raw id as passed across the native boundary.
    pub fn get(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Table of outstanding native requests.
#[derive(Debug, Default)]
pub struct PendingOperations {
    next_id: AtomicU64,
    pending: Mutex<HashMap<RequestId, oneshot::Sender<()>>>,
}

impl PendingOperations {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a request id that no completion will ever be waited on.
    ///
    /// Native frame reads and writes take an id too, but never raise a
    /// completion for it. Sharing the counter keeps ids unique per session.
    pub fn next_id(&self) -> RequestId {
        RequestId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Allocate a new request id and register its completion.
    pub fn begin(&self) -> PendingCompletion {
        let (tx, rx) = oneshot::channel();
        let mut pending = self.pending.lock();
        // Allocated under the lock so insertion order follows id order.
        let id = self.next_id();
        pending.insert(id, tx);
        PendingCompletion { id, rx }
    }

    /// Mark a request as completed and wake its waiter.
    ///
    /// Returns [`TransportError::UnknownRequest`] if the id was never issued
    /// or already resolved.
    pub fn resolve(&self, id: RequestId) -> Result<()> {
        let sender = self.pending.lock().remove(&id);
        match sender {
            Some(tx) => {
                // The waiter may have given up after a timeout.
                if tx.send(()).is_err() {
                    tracing::debug!(request_id = %id, "completion arrived after waiter left");
                }
                Ok(())
            }
            None => Err(TransportError::UnknownRequest(id)),
        }
    }

    /// Forget a request whose waiter gave up. Returns whether it was still
    /// outstanding.
    pub fn abandon(&self, id: RequestId) -> bool {
        let removed = self.pending.lock().remove(&id).is_some();
        if removed {
            tracing::debug!(request_id = %id, "abandoned native request");
        }
        removed
    }

    /// Drop every outstanding completion. Waiters observe `Cancelled`.
    pub fn cancel_all(&self) -> usize {
        let drained: Vec<_> = self.pending.lock().drain().collect();
        if !drained.is_empty() {
            tracing::debug!(count = drained.len(), "cancelled outstanding native requests");
        }
        drained.len()
    }

    /// Number of requests still awaiting completion.
    pub fn len(&self) -> usize {
        self.pending.lock().len()
    }

    /// Whether no request is outstanding.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Receiving half of a registered request.
#[derive(Debug)]
pub struct PendingCompletion {
    id: RequestId,
    rx: oneshot::Receiver<()>,
}

impl PendingCompletion {
    /// The id to hand to the native call.
    pub fn id(&self) -> RequestId {
        self.id
    }

    /// Wait until the matching completion event arrives.
    ///
    /// With `timeout == None` this waits indefinitely, which is the native
    /// engine's contract. A bound turns a lost completion into
    /// [`TransportError::Timeout`].
    pub async fn wait(self, timeout: Option<Duration>) -> Result<()> {
        let id = self.id;
        let received = match timeout {
            Some(limit) => tokio::time::timeout(limit, self.rx).await.map_err(|_| {
                TransportError::timeout(format!("request {id} not completed within {limit:?}"))
            })?,
            None => self.rx.await,
        };
        received.map_err(|_| TransportError::cancelled(format!("request {id} was abandoned")))
    }
}
