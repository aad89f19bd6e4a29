//! Connection profiles: the transport-agnostic description of a remote
//! device, and the flat persistence record it round-trips through.

use crate::connection::ConnectionId;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The concrete communication medium behind a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransportKind {
    Bluetooth,
    Tcp,
    Usb,
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportKind::Bluetooth => write!(f, "Bluetooth"),
            TransportKind::Tcp => write!(f, "TCP"),
            TransportKind::Usb => write!(f, "USB"),
        }
    }
}

/// A Bluetooth device address in `AA:BB:CC:DD:EE:FF` form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BtAddress([u8; 6]);

impl BtAddress {
    /// Build an address from raw octets.
    pub fn new(octets: [u8; 6]) -> Self {
        Self(octets)
    }

    /// The raw address octets.
    pub fn octets(&self) -> [u8; 6] {
        self.0
    }
}

impl FromStr for BtAddress {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let mut octets = [0u8; 6];
        let mut parts = s.split(':');
        for octet in octets.iter_mut() {
            let part = parts
                .next()
                .ok_or_else(|| Error::InvalidAddress(s.to_string()))?;
            if part.len() != 2 {
                return Err(Error::InvalidAddress(s.to_string()));
            }
            *octet = u8::from_str_radix(part, 16)
                .map_err(|_| Error::InvalidAddress(s.to_string()))?;
        }
        if parts.next().is_some() {
            return Err(Error::InvalidAddress(s.to_string()));
        }
        Ok(Self(octets))
    }
}

impl TryFrom<String> for BtAddress {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<BtAddress> for String {
    fn from(addr: BtAddress) -> Self {
        addr.to_string()
    }
}

impl fmt::Display for BtAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(
            f,
            "{a:02X}:{b:02X}:{c:02X}:{d:02X}:{e:02X}:{g:02X}"
        )
    }
}

/// Transport-specific addressing for one connection.
///
/// Serializes with the flat `transportKind` tag the persistence record
/// expects, so a profile round-trips through any flat key/value store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "transportKind")]
pub enum Endpoint {
    Bluetooth { address: BtAddress },
    Tcp { host: String, port: u16 },
    Usb { device: String },
}

impl Endpoint {
    /// The transport kind this endpoint addresses.
    pub fn kind(&self) -> TransportKind {
        match self {
            Endpoint::Bluetooth { .. } => TransportKind::Bluetooth,
            Endpoint::Tcp { .. } => TransportKind::Tcp,
            Endpoint::Usb { .. } => TransportKind::Usb,
        }
    }

    /// Rejects endpoints that can never be handed to a transport.
    pub fn validate(&self) -> Result<()> {
        match self {
            Endpoint::Bluetooth { .. } => Ok(()),
            Endpoint::Tcp { host, port } => {
                if host.is_empty() {
                    return Err(Error::InvalidEndpoint("empty host".into()));
                }
                if *port == 0 {
                    return Err(Error::InvalidEndpoint("port 0".into()));
                }
                Ok(())
            }
            Endpoint::Usb { device } => {
                if device.is_empty() {
                    return Err(Error::InvalidEndpoint("empty device path".into()));
                }
                Ok(())
            }
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Bluetooth { address } => write!(f, "bt://{address}"),
            Endpoint::Tcp { host, port } => write!(f, "tcp://{host}:{port}"),
            Endpoint::Usb { device } => write!(f, "usb://{device}"),
        }
    }
}

/// The persistence record for one connection: identity, label, and
/// transport-specific addressing as flat key/value fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionProfile {
    pub id: ConnectionId,
    pub name: String,
    #[serde(flatten)]
    pub endpoint: Endpoint,
}

impl ConnectionProfile {
    /// Creates a profile with a freshly assigned identity.
    pub fn new(name: impl Into<String>, endpoint: Endpoint) -> Result<Self> {
        endpoint.validate()?;
        Ok(Self {
            id: ConnectionId::new(),
            name: name.into(),
            endpoint,
        })
    }
}
