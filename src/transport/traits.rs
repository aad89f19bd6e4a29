//! Transport capability abstraction for pluggable device links.

use crate::error::Result;
use crate::profile::TransportKind;
use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};

/// A duplex byte stream produced by a transport handshake.
pub trait TransportStream: AsyncRead + AsyncWrite + Send + Unpin + 'static {}

impl<T: AsyncRead + AsyncWrite + Send + Unpin + 'static> TransportStream for T {}

/// Capability interface implemented once per transport kind.
///
/// Adapters stay thin: they perform the handshake and hand the stream over,
/// leaving retry policy, supersession, and teardown sequencing to the
/// lifecycle workflows. The stream is exclusively owned by the connection's
/// transfer session from the moment `connect` returns.
#[async_trait]
pub trait Transport: Send + Sync {
    /// The kind of link this adapter drives.
    fn kind(&self) -> TransportKind;

    /// Performs the handshake, yielding the duplex stream.
    async fn connect(&self) -> Result<Box<dyn TransportStream>>;

    /// Best-effort link teardown beyond closing the stream.
    async fn disconnect(&self) -> Result<()>;

    /// Whether the medium reports an established link right now.
    async fn is_connected(&self) -> bool;

    /// Hands back the live stream when the link came up despite a handshake
    /// that reported an error. Most media cannot, which is the default.
    async fn reclaim(&self) -> Option<Box<dyn TransportStream>> {
        None
    }
}
