//! Scripted in-memory transport used by the lifecycle and transfer tests.

use crate::error::{Error, Result};
use crate::profile::TransportKind;
use crate::transport::traits::{Transport, TransportStream};
use async_trait::async_trait;
use std::io;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use tokio::io::{duplex, DuplexStream};
use tokio::sync::{mpsc, watch, Mutex};

const PIPE_CAPACITY: usize = 4096;

/// In-memory transport whose handshakes can be scripted to fail, hang, or
/// leave a reclaimable link behind. Each successful handshake pushes the far
/// end of the pipe to the peer channel so tests can read and write as the
/// remote device.
pub(crate) struct MockTransport {
    kind: TransportKind,
    /// Upcoming connect calls that fail; `u32::MAX` means fail forever.
    failures: AtomicU32,
    attempts: AtomicU32,
    in_flight: AtomicU32,
    max_in_flight: AtomicU32,
    gate: Mutex<Option<watch::Receiver<bool>>>,
    connected: AtomicBool,
    reclaimable: Mutex<Option<DuplexStream>>,
    peers: mpsc::UnboundedSender<DuplexStream>,
}

impl MockTransport {
    pub(crate) fn new(
        kind: TransportKind,
    ) -> (Arc<Self>, mpsc::UnboundedReceiver<DuplexStream>) {
        let (peers, peer_rx) = mpsc::unbounded_channel();
        let transport = Arc::new(Self {
            kind,
            failures: AtomicU32::new(0),
            attempts: AtomicU32::new(0),
            in_flight: AtomicU32::new(0),
            max_in_flight: AtomicU32::new(0),
            gate: Mutex::new(None),
            connected: AtomicBool::new(false),
            reclaimable: Mutex::new(None),
            peers,
        });
        (transport, peer_rx)
    }

    /// The next `n` handshakes fail, then handshakes succeed again.
    pub(crate) fn fail_next(&self, n: u32) {
        self.failures.store(n, Ordering::SeqCst);
    }

    /// Every handshake fails from now on.
    pub(crate) fn fail_always(&self) {
        self.failures.store(u32::MAX, Ordering::SeqCst);
    }

    /// Parks every handshake until the returned sender publishes `true`.
    pub(crate) async fn gate_handshakes(&self) -> watch::Sender<bool> {
        let (tx, rx) = watch::channel(false);
        *self.gate.lock().await = Some(rx);
        tx
    }

    /// Total handshakes started so far.
    pub(crate) fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Largest number of handshakes that were ever live at once.
    pub(crate) fn max_concurrent_handshakes(&self) -> u32 {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// Arranges for the link to come up as a side effect of the next failed
    /// handshake, so `reclaim` has a live stream to hand back.
    pub(crate) async fn preload_reclaimable(&self) {
        let (near, far) = duplex(PIPE_CAPACITY);
        let _ = self.peers.send(far);
        *self.reclaimable.lock().await = Some(near);
    }
}

/// Decrements the live-handshake counter even when the handshake future is
/// dropped mid-flight by a cancellation.
struct HandshakeGuard<'a>(&'a AtomicU32);

impl Drop for HandshakeGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl Transport for MockTransport {
    fn kind(&self) -> TransportKind {
        self.kind
    }

    async fn connect(&self) -> Result<Box<dyn TransportStream>> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let live = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(live, Ordering::SeqCst);
        let _guard = HandshakeGuard(&self.in_flight);

        let gate = self.gate.lock().await.clone();
        if let Some(mut gate) = gate {
            // Park until the test opens the gate or drops the sender.
            while !*gate.borrow() {
                if gate.changed().await.is_err() {
                    break;
                }
            }
        }

        let failures = self.failures.load(Ordering::SeqCst);
        if failures > 0 {
            if failures != u32::MAX {
                self.failures.store(failures - 1, Ordering::SeqCst);
            }
            return Err(Error::Io(io::Error::new(
                io::ErrorKind::ConnectionRefused,
                "scripted handshake failure",
            )));
        }

        let (near, far) = duplex(PIPE_CAPACITY);
        let _ = self.peers.send(far);
        self.connected.store(true, Ordering::SeqCst);
        Ok(Box::new(near))
    }

    async fn disconnect(&self) -> Result<()> {
        self.connected.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn reclaim(&self) -> Option<Box<dyn TransportStream>> {
        let stream = self.reclaimable.lock().await.take()?;
        self.connected.store(true, Ordering::SeqCst);
        Some(Box::new(stream))
    }
}
