//! TCP/IP socket transport.

use crate::error::Result;
use crate::profile::TransportKind;
use crate::transport::traits::{Transport, TransportStream};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::net::TcpStream;
use tracing::debug;

/// Adapter connecting to a remote TCP endpoint.
pub struct TcpTransport {
    host: String,
    port: u16,
    link_up: AtomicBool,
}

impl TcpTransport {
    /// Creates an adapter for the given remote endpoint.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            link_up: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl Transport for TcpTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Tcp
    }

    async fn connect(&self) -> Result<Box<dyn TransportStream>> {
        debug!("dialing {}:{}", self.host, self.port);
        let stream = TcpStream::connect((self.host.as_str(), self.port)).await?;
        self.link_up.store(true, Ordering::SeqCst);
        Ok(Box::new(stream))
    }

    async fn disconnect(&self) -> Result<()> {
        // The socket closes with the stream; only the link flag is ours.
        self.link_up.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn is_connected(&self) -> bool {
        self.link_up.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_connect_to_local_listener() {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");
        tokio::spawn(async move {
            let _ = listener.accept().await;
        });

        let transport = TcpTransport::new("127.0.0.1", addr.port());
        assert!(!transport.is_connected().await);

        let _stream = transport.connect().await.expect("connect");
        assert!(transport.is_connected().await);

        transport.disconnect().await.expect("disconnect");
        assert!(!transport.is_connected().await);
    }

    #[tokio::test]
    async fn test_connect_refused() {
        // Bind and drop a listener to find a port nothing is listening on.
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");
        drop(listener);

        let transport = TcpTransport::new("127.0.0.1", addr.port());
        assert!(transport.connect().await.is_err());
        assert!(!transport.is_connected().await);
    }
}
