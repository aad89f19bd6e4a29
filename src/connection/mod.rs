//! Connection entity and its connectivity state machine.
//!
//! A [`Connection`] is the application-facing handle for one remote device:
//! identity, label, status, the transport capability chosen at construction,
//! and the listener hub its events flow through. All clones share state.

pub mod registry;

use crate::error::{Error, Result};
use crate::events::{ListenerHub, MetadataEvent};
use crate::profile::{ConnectionProfile, Endpoint, TransportKind};
use crate::transport::Transport;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

/// Opaque, globally unique connection identity, assigned at creation.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    /// Mints a fresh identity.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// The underlying UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for ConnectionId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Connectivity state of one connection.
///
/// `Disconnected` is the initial state. Stream access is only valid while
/// `Connected`; everything else rejects with [`Error::NotConnected`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Disconnected,
    Connecting,
    Connected,
    ConnectFailed,
    ConnectCanceled,
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConnectionStatus::Disconnected => "disconnected",
            ConnectionStatus::Connecting => "connecting",
            ConnectionStatus::Connected => "connected",
            ConnectionStatus::ConnectFailed => "connect failed",
            ConnectionStatus::ConnectCanceled => "connect canceled",
        };
        f.write_str(s)
    }
}

struct Inner {
    id: ConnectionId,
    name: RwLock<String>,
    status: RwLock<ConnectionStatus>,
    endpoint: Endpoint,
    transport: Arc<dyn Transport>,
    events: ListenerHub,
}

/// Handle to one remote-device relationship. Cheap to clone; all clones
/// observe the same name, status, and events.
#[derive(Clone)]
pub struct Connection {
    inner: Arc<Inner>,
}

impl Connection {
    /// Builds a connection with a fresh identity.
    ///
    /// The adapter's kind must match the endpoint; downstream code never
    /// inspects transport types again.
    pub fn new(
        name: impl Into<String>,
        endpoint: Endpoint,
        transport: Arc<dyn Transport>,
    ) -> Result<Self> {
        let profile = ConnectionProfile::new(name, endpoint)?;
        Self::from_profile(profile, transport)
    }

    /// Rebuilds a connection from a stored profile, keeping its identity.
    pub fn from_profile(profile: ConnectionProfile, transport: Arc<dyn Transport>) -> Result<Self> {
        profile.endpoint.validate()?;
        if transport.kind() != profile.endpoint.kind() {
            return Err(Error::KindMismatch {
                endpoint: profile.endpoint.kind(),
                adapter: transport.kind(),
            });
        }
        Ok(Self {
            inner: Arc::new(Inner {
                id: profile.id,
                name: RwLock::new(profile.name),
                status: RwLock::new(ConnectionStatus::Disconnected),
                endpoint: profile.endpoint,
                transport,
                events: ListenerHub::new(),
            }),
        })
    }

    /// The stable identity of this connection.
    pub fn id(&self) -> ConnectionId {
        self.inner.id
    }

    /// The transport kind behind this connection.
    pub fn kind(&self) -> TransportKind {
        self.inner.endpoint.kind()
    }

    /// The transport-specific addressing of this connection.
    pub fn endpoint(&self) -> &Endpoint {
        &self.inner.endpoint
    }

    /// The current label.
    pub async fn name(&self) -> String {
        self.inner.name.read().await.clone()
    }

    /// Relabels the connection and fires a metadata event.
    pub async fn set_name(&self, name: impl Into<String>) {
        let name = name.into();
        *self.inner.name.write().await = name.clone();
        self.inner.events.notify_metadata(MetadataEvent {
            id: self.inner.id,
            name,
        });
    }

    /// The current connectivity status.
    pub async fn status(&self) -> ConnectionStatus {
        *self.inner.status.read().await
    }

    pub(crate) async fn set_status(&self, status: ConnectionStatus) {
        let mut current = self.inner.status.write().await;
        if *current != status {
            debug!("{}: {} -> {}", self.inner.id, *current, status);
            *current = status;
        }
    }

    /// Whether both handles refer to the same device relationship,
    /// regardless of label or status differences.
    pub fn is_version_of(&self, other: &Connection) -> bool {
        self.inner.id == other.inner.id
    }

    /// The notification channels for this connection.
    pub fn events(&self) -> &ListenerHub {
        &self.inner.events
    }

    pub(crate) fn transport(&self) -> &Arc<dyn Transport> {
        &self.inner.transport
    }

    /// Snapshot of the persistable fields.
    pub async fn profile(&self) -> ConnectionProfile {
        ConnectionProfile {
            id: self.inner.id,
            name: self.name().await,
            endpoint: self.inner.endpoint.clone(),
        }
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.inner.id)
            .field("endpoint", &self.inner.endpoint)
            .finish()
    }
}
