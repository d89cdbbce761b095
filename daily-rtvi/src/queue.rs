//! Ordered outbound application messages.
//!
//! Messages are drained by exactly one worker task, which hands each one to
//! the native engine and waits for its completion before taking the next.
//! The engine is asynchronous, so this is what keeps app messages in push
//! order on the wire.

use crate::completion::PendingOperations;
use crate::error::{Result, TransportError};
use crate::native::CallClient;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::JoinHandle;

#[derive(Debug)]
struct QueueState<T> {
    items: VecDeque<T>,
    stopped: bool,
}

/// FIFO queue with a single asynchronous consumer and a stop flag.
#[derive(Debug)]
pub struct MessageQueue<T> {
    state: Mutex<QueueState<T>>,
    notify: Notify,
}

impl<T> Default for MessageQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> MessageQueue<T> {
    /// Create an open, empty queue.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(QueueState { items: VecDeque::new(), stopped: false }),
            notify: Notify::new(),
        }
    }

    /// Create a queue that is already stopped and drops every push.
    pub fn closed() -> Self {
        let queue = Self::new();
        queue.state.lock().stopped = true;
        queue
    }

    /// Enqueue an item. Returns `false` if the queue is stopped and the
    /// item was dropped.
    pub fn push(&self, item: T) -> bool {
        {
            let mut state = self.state.lock();
            if state.stopped {
                return false;
            }
            state.items.push_back(item);
        }
        self.notify.notify_one();
        true
    }

    /// Wait for the next item.
    ///
    /// Returns `None` once the queue is stopped, on this and every later
    /// call.
    pub async fn pop(&self) -> Option<T> {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            {
                let mut state = self.state.lock();
                if state.stopped {
                    return None;
                }
                if let Some(item) = state.items.pop_front() {
                    return Some(item);
                }
            }
            notified.await;
        }
    }

    /// Stop the queue, discarding anything not yet popped. Idempotent.
    pub fn stop(&self) {
        let discarded = {
            let mut state = self.state.lock();
            if state.stopped {
                return;
            }
            state.stopped = true;
            let discarded = state.items.len();
            state.items.clear();
            discarded
        };
        if discarded > 0 {
            tracing::debug!(discarded, "message queue stopped with pending items");
        }
        self.notify.notify_waiters();
    }

    /// Whether [`stop`](Self::stop) has been called.
    pub fn is_stopped(&self) -> bool {
        self.state.lock().stopped
    }

    /// Number of items waiting to be popped.
    pub fn len(&self) -> usize {
        self.state.lock().items.len()
    }

    /// Whether nothing is waiting to be popped.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// App-message queue of one connection plus its drain worker.
///
/// Pushes are buffered from [`open`](Self::open) on and drained once
/// [`start`](Self::start) attaches the worker. Before `open` and after
/// [`stop`](Self::stop) they are dropped.
pub struct OutboundMessageQueue {
    queue: Mutex<Arc<MessageQueue<Value>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Default for OutboundMessageQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl OutboundMessageQueue {
    /// Create a queue with no worker.
    pub fn new() -> Self {
        Self { queue: Mutex::new(Arc::new(MessageQueue::closed())), worker: Mutex::new(None) }
    }

    /// Install a fresh queue that buffers pushes until a worker starts.
    pub fn open(&self) {
        let fresh = Arc::new(MessageQueue::new());
        let previous = std::mem::replace(&mut *self.queue.lock(), fresh);
        previous.stop();
    }

    /// Spawn the drain worker on the current runtime. Messages buffered
    /// since [`open`](Self::open) are sent first; without an open queue a
    /// fresh one is installed.
    pub fn start(
        &self,
        client: Arc<dyn CallClient>,
        completions: Arc<PendingOperations>,
        completion_timeout: Option<Duration>,
    ) -> Result<()> {
        let mut worker = self.worker.lock();
        if worker.is_some() {
            return Err(TransportError::AlreadyRunning("message drain worker".to_string()));
        }

        let queue = {
            let mut current = self.queue.lock();
            if current.is_stopped() {
                *current = Arc::new(MessageQueue::new());
            }
            Arc::clone(&current)
        };
        *worker =
            Some(tokio::spawn(drain_messages(queue, client, completions, completion_timeout)));
        tracing::debug!("message drain worker started");
        Ok(())
    }

    /// Enqueue a message for the worker. Returns `false` if it was dropped.
    pub fn push(&self, message: Value) -> bool {
        let queue = Arc::clone(&self.queue.lock());
        let accepted = queue.push(message);
        if !accepted {
            tracing::debug!("dropping app message: queue is not running");
        }
        accepted
    }

    /// Stop accepting messages and wait for the worker to finish the send
    /// it is currently waiting on.
    pub async fn stop(&self) {
        self.queue.lock().stop();
        let worker = self.worker.lock().take();
        if let Some(handle) = worker {
            if let Err(e) = handle.await {
                tracing::warn!(error = %e, "message drain worker ended abnormally");
            }
            tracing::debug!("message drain worker stopped");
        }
    }

    /// Stop accepting messages without waiting for the worker.
    ///
    /// The worker still exits after its current send resolves.
    pub fn stop_detached(&self) {
        self.queue.lock().stop();
        self.worker.lock().take();
    }

    /// Messages waiting for the worker.
    pub fn len(&self) -> usize {
        self.queue.lock().len()
    }

    /// Whether no message is waiting.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether a drain worker is currently attached.
    pub fn is_running(&self) -> bool {
        self.worker.lock().is_some()
    }
}

async fn drain_messages(
    queue: Arc<MessageQueue<Value>>,
    client: Arc<dyn CallClient>,
    completions: Arc<PendingOperations>,
    completion_timeout: Option<Duration>,
) {
    while let Some(message) = queue.pop().await {
        let payload = match serde_json::to_string(&message) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!(error = %e, "skipping unserializable app message");
                continue;
            }
        };

        let completion = completions.begin();
        let request_id = completion.id();
        client.send_app_message(request_id, &payload);
        if let Err(e) = completion.wait(completion_timeout).await {
            completions.abandon(request_id);
            tracing::warn!(request_id = %request_id, error = %e, "app message send did not complete");
        }
    }
}
