//! Per-connection and registry-level notification channels.

use crate::connection::ConnectionId;
use bytes::Bytes;
use tokio::sync::broadcast;

/// Buffered events per channel before slow subscribers start lagging.
pub const EVENT_CAPACITY: usize = 32;

/// A connection's label changed.
#[derive(Debug, Clone)]
pub struct MetadataEvent {
    pub id: ConnectionId,
    pub name: String,
}

/// Terminal outcome of a connect workflow.
///
/// Failure is its own variant so subscribers never have to cross-check
/// status to tell the two outcomes apart.
#[derive(Debug, Clone)]
pub enum ConnectEvent {
    /// Handshake completed and a transfer session is live.
    Established { id: ConnectionId },
    /// Retries exhausted; the connection settled in `ConnectFailed`.
    Failed { id: ConnectionId },
}

impl ConnectEvent {
    /// The connection this event is about.
    pub fn id(&self) -> ConnectionId {
        match self {
            ConnectEvent::Established { id } | ConnectEvent::Failed { id } => *id,
        }
    }
}

/// Teardown finished and the connection is back to `Disconnected`.
#[derive(Debug, Clone)]
pub struct DisconnectEvent {
    pub id: ConnectionId,
}

/// One unit of inbound data, published in wire order.
#[derive(Debug, Clone)]
pub struct DataEvent {
    pub id: ConnectionId,
    pub payload: Bytes,
}

/// Registry membership changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryEvent {
    Added(ConnectionId),
    Replaced(ConnectionId),
    Removed(ConnectionId),
}

/// The four subscription points of one connection.
///
/// The hub lives inside the `Connection`, not the transfer session, so
/// subscriptions survive reconnects. Dispatch happens on whichever task
/// fires the event; events sent with no live subscribers are dropped.
///
/// Each channel buffers [`EVENT_CAPACITY`] events. A subscriber that falls
/// further behind observes [`broadcast::error::RecvError::Lagged`] and
/// resumes at the oldest event still buffered; the skipped events are lost
/// to that subscriber only.
#[derive(Debug)]
pub struct ListenerHub {
    metadata: broadcast::Sender<MetadataEvent>,
    connect: broadcast::Sender<ConnectEvent>,
    disconnect: broadcast::Sender<DisconnectEvent>,
    data: broadcast::Sender<DataEvent>,
}

impl ListenerHub {
    pub(crate) fn new() -> Self {
        Self {
            metadata: broadcast::channel(EVENT_CAPACITY).0,
            connect: broadcast::channel(EVENT_CAPACITY).0,
            disconnect: broadcast::channel(EVENT_CAPACITY).0,
            data: broadcast::channel(EVENT_CAPACITY).0,
        }
    }

    /// Subscribe to label changes.
    pub fn subscribe_metadata(&self) -> broadcast::Receiver<MetadataEvent> {
        self.metadata.subscribe()
    }

    /// Subscribe to connect outcomes.
    pub fn subscribe_connect(&self) -> broadcast::Receiver<ConnectEvent> {
        self.connect.subscribe()
    }

    /// Subscribe to disconnects.
    pub fn subscribe_disconnect(&self) -> broadcast::Receiver<DisconnectEvent> {
        self.disconnect.subscribe()
    }

    /// Subscribe to inbound data.
    ///
    /// Inbound chunks can arrive faster than a subscriber drains them; a
    /// receiver more than [`EVENT_CAPACITY`] events behind loses the
    /// oldest chunks and sees a `Lagged` error marking the gap.
    pub fn subscribe_data(&self) -> broadcast::Receiver<DataEvent> {
        self.data.subscribe()
    }

    pub(crate) fn notify_metadata(&self, event: MetadataEvent) {
        let _ = self.metadata.send(event);
    }

    pub(crate) fn notify_connect(&self, event: ConnectEvent) {
        let _ = self.connect.send(event);
    }

    pub(crate) fn notify_disconnect(&self, event: DisconnectEvent) {
        let _ = self.disconnect.send(event);
    }

    pub(crate) fn notify_data(&self, event: DataEvent) {
        let _ = self.data.send(event);
    }
}
