//! Transport adapters and the capability interface they implement.

pub mod serial;
pub mod tcp;
pub mod traits;

#[cfg(test)]
pub(crate) mod mock;

pub use serial::{SerialTransport, DEFAULT_BAUD_RATE};
pub use tcp::TcpTransport;
pub use traits::{Transport, TransportStream};
