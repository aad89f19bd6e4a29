//! Serial tty transport, covering serial-over-Bluetooth and USB serial
//! peripherals.
//!
//! Pairing and tty binding happen outside the core: a paired Bluetooth
//! device shows up as an rfcomm tty, a USB serial peripheral as a ttyUSB or
//! ttyACM node, and this adapter just opens the path it was given.

use crate::error::Result;
use crate::profile::TransportKind;
use crate::transport::traits::{Transport, TransportStream};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio_serial::SerialPortBuilderExt;
use tracing::debug;

/// Baud rate used when the caller does not specify one.
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Adapter opening a serial tty device.
pub struct SerialTransport {
    kind: TransportKind,
    path: String,
    baud_rate: u32,
    link_up: AtomicBool,
}

impl SerialTransport {
    /// Creates an adapter for an arbitrary tty.
    pub fn new(kind: TransportKind, path: impl Into<String>, baud_rate: u32) -> Self {
        Self {
            kind,
            path: path.into(),
            baud_rate,
            link_up: AtomicBool::new(false),
        }
    }

    /// Adapter for a paired Bluetooth device bound to an rfcomm tty.
    pub fn bluetooth(path: impl Into<String>) -> Self {
        Self::new(TransportKind::Bluetooth, path, DEFAULT_BAUD_RATE)
    }

    /// Adapter for a USB serial peripheral.
    pub fn usb(path: impl Into<String>) -> Self {
        Self::new(TransportKind::Usb, path, DEFAULT_BAUD_RATE)
    }

    /// The tty path this adapter opens.
    pub fn path(&self) -> &str {
        &self.path
    }
}

#[async_trait]
impl Transport for SerialTransport {
    fn kind(&self) -> TransportKind {
        self.kind
    }

    async fn connect(&self) -> Result<Box<dyn TransportStream>> {
        debug!("opening {} at {} baud", self.path, self.baud_rate);
        let stream = tokio_serial::new(&self.path, self.baud_rate).open_native_async()?;
        self.link_up.store(true, Ordering::SeqCst);
        Ok(Box::new(stream))
    }

    async fn disconnect(&self) -> Result<()> {
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

    #[test]
    fn test_constructors_pick_kind() {
        let bt = SerialTransport::bluetooth("/dev/rfcomm0");
        assert_eq!(bt.kind(), TransportKind::Bluetooth);
        assert_eq!(bt.path(), "/dev/rfcomm0");

        let usb = SerialTransport::usb("/dev/ttyUSB0");
        assert_eq!(usb.kind(), TransportKind::Usb);
    }

    #[tokio::test]
    async fn test_connect_missing_tty_fails() {
        let transport = SerialTransport::usb("/dev/devlink-test-no-such-tty");
        assert!(transport.connect().await.is_err());
        assert!(!transport.is_connected().await);
    }
}
