//! Identity-keyed store of known connections.

use super::{Connection, ConnectionId};
use crate::events::RegistryEvent;
use std::collections::HashMap;
use tokio::sync::{broadcast, RwLock};
use tracing::debug;

const REGISTRY_EVENT_CAPACITY: usize = 32;

/// Registry of known connections, exactly one entry per identity.
///
/// Insertion dedups by identity, not structural equality: a renamed or
/// re-addressed connection for the same device replaces its stored version
/// instead of duplicating it.
pub struct ConnectionRegistry {
    entries: RwLock<HashMap<ConnectionId, Connection>>,
    changed: broadcast::Sender<RegistryEvent>,
}

impl ConnectionRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            changed: broadcast::channel(REGISTRY_EVENT_CAPACITY).0,
        }
    }

    /// Inserts a connection, replacing any stored version of it.
    ///
    /// Returns the replaced entry, if any. Fires a membership event either
    /// way.
    pub async fn put(&self, connection: Connection) -> Option<Connection> {
        let id = connection.id();
        let replaced = self.entries.write().await.insert(id, connection);
        if replaced.is_some() {
            debug!("registry replaced {id}");
            let _ = self.changed.send(RegistryEvent::Replaced(id));
        } else {
            debug!("registry added {id}");
            let _ = self.changed.send(RegistryEvent::Added(id));
        }
        replaced
    }

    /// Removes the stored version of the given connection, if any.
    ///
    /// Fires a membership event only when something was removed.
    pub async fn remove(&self, connection: &Connection) -> Option<Connection> {
        let id = connection.id();
        let removed = self.entries.write().await.remove(&id);
        if removed.is_some() {
            debug!("registry removed {id}");
            let _ = self.changed.send(RegistryEvent::Removed(id));
        }
        removed
    }

    /// Direct lookup by identity.
    pub async fn get(&self, id: ConnectionId) -> Option<Connection> {
        self.entries.read().await.get(&id).cloned()
    }

    /// All known identities.
    pub async fn ids(&self) -> Vec<ConnectionId> {
        self.entries.read().await.keys().copied().collect()
    }

    /// Snapshot of all known connections.
    pub async fn connections(&self) -> Vec<Connection> {
        self.entries.read().await.values().cloned().collect()
    }

    /// Number of known connections.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Whether the registry is empty.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Subscribe to membership changes.
    pub fn subscribe(&self) -> broadcast::Receiver<RegistryEvent> {
        self.changed.subscribe()
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::{ConnectionProfile, Endpoint, TransportKind};
    use crate::transport::mock::MockTransport;

    fn tcp_connection(name: &str) -> Connection {
        let (transport, _peers) = MockTransport::new(TransportKind::Tcp);
        Connection::new(
            name,
            Endpoint::Tcp {
                host: "10.0.0.5".into(),
                port: 9000,
            },
            transport,
        )
        .expect("connection")
    }

    /// A distinct Connection object carrying an existing identity, as the
    /// application produces when it edits a stored connection.
    fn new_version_of(conn: &Connection, name: &str) -> Connection {
        let (transport, _peers) = MockTransport::new(TransportKind::Tcp);
        Connection::from_profile(
            ConnectionProfile {
                id: conn.id(),
                name: name.into(),
                endpoint: conn.endpoint().clone(),
            },
            transport,
        )
        .expect("connection")
    }

    #[tokio::test]
    async fn test_put_and_get() {
        let registry = ConnectionRegistry::new();
        let conn = tcp_connection("a");

        assert!(registry.put(conn.clone()).await.is_none());
        assert_eq!(registry.len().await, 1);

        let found = registry.get(conn.id()).await.expect("lookup");
        assert!(found.is_version_of(&conn));
    }

    #[tokio::test]
    async fn test_put_replaces_by_identity() {
        let registry = ConnectionRegistry::new();
        let original = tcp_connection("printer");
        let renamed = new_version_of(&original, "label printer");

        assert!(registry.put(original.clone()).await.is_none());
        let replaced = registry.put(renamed.clone()).await.expect("replaced entry");

        assert!(replaced.is_version_of(&original));
        assert_eq!(registry.len().await, 1);
        let stored = registry.get(original.id()).await.expect("lookup");
        assert_eq!(stored.name().await, "label printer");
    }

    #[tokio::test]
    async fn test_repeated_puts_keep_one_entry() {
        let registry = ConnectionRegistry::new();
        let conn = tcp_connection("a");

        registry.put(conn.clone()).await;
        for i in 0..5 {
            let version = new_version_of(&conn, &format!("rename {i}"));
            assert!(registry.put(version).await.is_some());
        }
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn test_remove_returns_stored_entry() {
        let registry = ConnectionRegistry::new();
        let conn = tcp_connection("a");
        registry.put(conn.clone()).await;

        let removed = registry.remove(&conn).await.expect("removed entry");
        assert!(removed.is_version_of(&conn));
        assert!(registry.is_empty().await);
        assert!(registry.remove(&conn).await.is_none());
    }

    #[tokio::test]
    async fn test_membership_events() {
        let registry = ConnectionRegistry::new();
        let mut events = registry.subscribe();
        let conn = tcp_connection("a");

        registry.put(conn.clone()).await;
        registry.put(new_version_of(&conn, "b")).await;
        registry.remove(&conn).await;
        // Removing an absent entry stays silent.
        registry.remove(&conn).await;

        assert_eq!(
            events.recv().await.expect("event"),
            RegistryEvent::Added(conn.id())
        );
        assert_eq!(
            events.recv().await.expect("event"),
            RegistryEvent::Replaced(conn.id())
        );
        assert_eq!(
            events.recv().await.expect("event"),
            RegistryEvent::Removed(conn.id())
        );
        assert!(matches!(
            events.try_recv(),
            Err(broadcast::error::TryRecvError::Empty)
        ));
    }
}
