//! Device link core: connection lifecycle scheduling and ordered data
//! transfer over heterogeneous transports (TCP, serial-over-Bluetooth, USB
//! serial).
//!
//! The entry point is [`LinkManager`], constructed by the application's
//! composition root. Applications build a [`Connection`] around a transport
//! adapter, register it, and drive it through `connect`/`send`/`disconnect`;
//! everything else (retry policy, operation supersession, the per-connection
//! send worker and receive loop) happens on background tasks and is observed
//! through the connection's [`ListenerHub`] channels.

pub mod config;
pub mod connection;
pub mod error;
pub mod events;
pub mod lifecycle;
pub mod manager;
pub mod profile;
pub mod transfer;
pub mod transport;
pub mod wire;

pub use config::LinkConfig;
pub use connection::registry::ConnectionRegistry;
pub use connection::{Connection, ConnectionId, ConnectionStatus};
pub use error::{Error, Result};
pub use events::{
    ConnectEvent, DataEvent, DisconnectEvent, ListenerHub, MetadataEvent, RegistryEvent,
};
pub use manager::LinkManager;
pub use profile::{BtAddress, ConnectionProfile, Endpoint, TransportKind};
pub use transport::{Transport, TransportStream};
