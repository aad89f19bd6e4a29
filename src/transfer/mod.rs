//! Transfer sessions and the manager that tracks one per connected link.

mod session;

use crate::config::LinkConfig;
use crate::connection::{Connection, ConnectionId};
use crate::error::{Error, Result};
use crate::transport::TransportStream;
use bytes::Bytes;
use session::TransferSession;
use std::collections::HashMap;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::warn;

/// Owns the live transfer sessions, keyed by connection id.
pub struct TransferManager {
    sessions: Mutex<HashMap<ConnectionId, TransferSession>>,
}

impl TransferManager {
    pub fn new() -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Starts a session over a freshly connected stream. A stale session
    /// left behind by an earlier link is torn down first.
    pub(crate) async fn open(
        &self,
        conn: &Connection,
        stream: Box<dyn TransportStream>,
        config: &LinkConfig,
    ) {
        let session = TransferSession::spawn(
            conn.clone(),
            stream,
            config.send_queue_capacity,
            config.poll_interval,
        );
        let stale = self.sessions.lock().await.insert(conn.id(), session);
        if let Some(stale) = stale {
            warn!("replacing a stale transfer session for {}", conn.id());
            stale.close().await;
        }
    }

    /// Queues one payload for ordered delivery on the given connection.
    pub async fn send(&self, id: ConnectionId, payload: Bytes) -> Result<()> {
        let queue = {
            let sessions = self.sessions.lock().await;
            match sessions.get(&id) {
                Some(session) => session.queue(),
                None => return Err(Error::NotConnected),
            }
        };
        queue.send(payload).await.map_err(|_| Error::QueueClosed)
    }

    /// Stops the session's I/O tasks and shuts down the stream under it.
    /// No session means nothing to close.
    pub(crate) async fn shutdown_stream(&self, id: ConnectionId) -> Result<()> {
        let writer = {
            let sessions = self.sessions.lock().await;
            match sessions.get(&id) {
                Some(session) => {
                    // The send worker may be parked mid-write holding the
                    // writer lock; interrupt it first or the shutdown below
                    // would wait behind a write the peer never drains.
                    session.interrupt();
                    session.writer()
                }
                None => return Ok(()),
            }
        };
        writer.lock().await.shutdown().await?;
        Ok(())
    }

    /// Tears down the session for `id`. Returns whether one existed.
    pub(crate) async fn close(&self, id: ConnectionId) -> bool {
        let session = self.sessions.lock().await.remove(&id);
        match session {
            Some(session) => {
                session.close().await;
                true
            }
            None => false,
        }
    }

    /// Whether a session is live for `id`.
    pub async fn is_active(&self, id: ConnectionId) -> bool {
        self.sessions.lock().await.contains_key(&id)
    }

    /// Number of live sessions.
    pub async fn active_count(&self) -> usize {
        self.sessions.lock().await.len()
    }

    /// Tears down every session.
    pub(crate) async fn close_all(&self) {
        let drained: Vec<TransferSession> = self
            .sessions
            .lock()
            .await
            .drain()
            .map(|(_, session)| session)
            .collect();
        for session in drained {
            session.close().await;
        }
    }
}

impl Default for TransferManager {
    fn default() -> Self {
        Self::new()
    }
}
