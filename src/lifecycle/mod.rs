//! Lifecycle operations and the per-connection scheduler that serializes
//! them.
//!
//! At most one lifecycle operation runs per connection at a time. Submitting
//! a new operation supersedes the active one: the predecessor's token is
//! cancelled and the successor waits for the predecessor's task to finish
//! before it starts, so a half-done handshake can never interleave with the
//! teardown that replaced it.

pub mod connect;
pub mod disconnect;

pub use connect::MAX_CONNECT_RETRIES;

use crate::connection::ConnectionId;
use futures::future::BoxFuture;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

struct OperationHandle {
    seq: u64,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

/// Serializes lifecycle operations per connection id.
pub struct LifecycleScheduler {
    active: Mutex<HashMap<ConnectionId, OperationHandle>>,
    next_seq: AtomicU64,
}

impl LifecycleScheduler {
    pub fn new() -> Self {
        Self {
            active: Mutex::new(HashMap::new()),
            next_seq: AtomicU64::new(0),
        }
    }

    /// Submits an operation for `id`, superseding whatever is active.
    pub async fn submit<F>(self: &Arc<Self>, id: ConnectionId, op: F)
    where
        F: FnOnce(CancellationToken, u64) -> BoxFuture<'static, ()> + Send + 'static,
    {
        let mut active = self.active.lock().await;
        self.start_locked(&mut active, id, op);
    }

    /// Resubmits on behalf of a running operation, but only while that
    /// operation still owns the slot. Returns false when something else
    /// superseded it in the meantime, in which case `op` is dropped unrun.
    pub(crate) async fn resubmit_if_active<F>(
        self: &Arc<Self>,
        id: ConnectionId,
        seq: u64,
        op: F,
    ) -> bool
    where
        F: FnOnce(CancellationToken, u64) -> BoxFuture<'static, ()> + Send + 'static,
    {
        let mut active = self.active.lock().await;
        if active.get(&id).map(|handle| handle.seq) != Some(seq) {
            debug!("dropping follow-up for {id}, operation was superseded");
            return false;
        }
        self.start_locked(&mut active, id, op);
        true
    }

    fn start_locked<F>(
        self: &Arc<Self>,
        active: &mut HashMap<ConnectionId, OperationHandle>,
        id: ConnectionId,
        op: F,
    ) where
        F: FnOnce(CancellationToken, u64) -> BoxFuture<'static, ()> + Send + 'static,
    {
        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst);
        let cancel = CancellationToken::new();
        let fut = op(cancel.clone(), seq);

        let prev = active.remove(&id);
        if let Some(prev) = &prev {
            prev.cancel.cancel();
        }

        let scheduler = Arc::clone(self);
        let task = tokio::spawn(async move {
            if let Some(prev) = prev {
                // The predecessor must acknowledge the cancel by running to
                // completion before the successor touches the connection.
                let _ = prev.task.await;
            }
            fut.await;
            scheduler.finish(id, seq).await;
        });

        active.insert(id, OperationHandle { seq, cancel, task });
    }

    /// Releases the slot when the operation that owns it completes. A stale
    /// sequence number means the slot was already handed to a successor.
    async fn finish(&self, id: ConnectionId, seq: u64) {
        let mut active = self.active.lock().await;
        if active.get(&id).map(|handle| handle.seq) == Some(seq) {
            active.remove(&id);
        }
    }

    /// Cancels the active operation for `id`, if any, and waits for it to
    /// wind down.
    pub async fn cancel(&self, id: ConnectionId) {
        let handle = self.active.lock().await.remove(&id);
        if let Some(handle) = handle {
            handle.cancel.cancel();
            let _ = handle.task.await;
        }
    }

    /// Cancels every active operation and waits for all of them.
    pub async fn cancel_all(&self) {
        let drained: Vec<OperationHandle> =
            self.active.lock().await.drain().map(|(_, h)| h).collect();
        for handle in &drained {
            handle.cancel.cancel();
        }
        for handle in drained {
            let _ = handle.task.await;
        }
    }

    /// Whether an operation is currently scheduled for `id`.
    pub async fn has_active(&self, id: ConnectionId) -> bool {
        self.active.lock().await.contains_key(&id)
    }
}

impl Default for LifecycleScheduler {
    fn default() -> Self {
        Self::new()
    }
}
