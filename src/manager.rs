//! Top-level facade tying registry, lifecycle scheduler, and transfer
//! sessions together.

use crate::config::LinkConfig;
use crate::connection::registry::ConnectionRegistry;
use crate::connection::{Connection, ConnectionId, ConnectionStatus};
use crate::error::{Error, Result};
use crate::lifecycle::connect::connect_op;
use crate::lifecycle::disconnect::disconnect_op;
use crate::lifecycle::LifecycleScheduler;
use crate::transfer::TransferManager;
use bytes::Bytes;
use std::sync::Arc;
use tracing::{debug, warn};

/// Entry point for applications: owns the registry, schedules lifecycle
/// operations, and routes outbound data to the right transfer session.
pub struct LinkManager {
    config: LinkConfig,
    registry: Arc<ConnectionRegistry>,
    scheduler: Arc<LifecycleScheduler>,
    transfers: Arc<TransferManager>,
}

impl LinkManager {
    pub fn new() -> Self {
        Self::with_config(LinkConfig::default())
    }

    pub fn with_config(config: LinkConfig) -> Self {
        Self {
            config,
            registry: Arc::new(ConnectionRegistry::new()),
            scheduler: Arc::new(LifecycleScheduler::new()),
            transfers: Arc::new(TransferManager::new()),
        }
    }

    /// The registry of known connections.
    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    /// The active configuration.
    pub fn config(&self) -> &LinkConfig {
        &self.config
    }

    /// Stores a connection, replacing any stored version of it.
    pub async fn register(&self, conn: Connection) -> Option<Connection> {
        self.registry.put(conn).await
    }

    /// Forgets a connection. Live operations and sessions are untouched;
    /// disconnect first if the link is up.
    pub async fn unregister(&self, conn: &Connection) -> Option<Connection> {
        self.registry.remove(conn).await
    }

    /// Looks up a registered connection by identity.
    pub async fn connection(&self, id: ConnectionId) -> Result<Connection> {
        self.registry
            .get(id)
            .await
            .ok_or(Error::UnknownConnection(id))
    }

    /// Starts the connect workflow for `conn`, superseding any lifecycle
    /// operation already running for it. Already-connected links are left
    /// alone.
    pub async fn connect(&self, conn: &Connection) {
        if conn.status().await == ConnectionStatus::Connected {
            debug!("{} is already connected", conn.id());
            return;
        }
        let op = connect_op(
            conn.clone(),
            0,
            Arc::clone(&self.scheduler),
            Arc::clone(&self.transfers),
            self.config.clone(),
        );
        self.scheduler.submit(conn.id(), op).await;
    }

    /// Starts the disconnect workflow for `conn`. Submitted unconditionally
    /// so it also cancels an in-flight connect; the workflow itself is a
    /// no-op on links that are not up.
    pub async fn disconnect(&self, conn: &Connection) {
        let op = disconnect_op(conn.clone(), Arc::clone(&self.transfers));
        self.scheduler.submit(conn.id(), op).await;
    }

    /// Queues one payload for ordered delivery on `conn`.
    pub async fn send(&self, conn: &Connection, payload: Bytes) -> Result<()> {
        if conn.status().await != ConnectionStatus::Connected {
            warn!("rejecting send on {}: not connected", conn.id());
            return Err(Error::NotConnected);
        }
        self.transfers.send(conn.id(), payload).await
    }

    /// Whether a transfer session is live for `conn`.
    pub async fn has_session(&self, conn: &Connection) -> bool {
        self.transfers.is_active(conn.id()).await
    }

    /// Cancels every lifecycle operation and tears down every session.
    pub async fn shutdown(&self) {
        self.scheduler.cancel_all().await;
        self.transfers.close_all().await;
    }
}

impl Default for LinkManager {
    fn default() -> Self {
        Self::new()
    }
}
