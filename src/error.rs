//! Error types shared across the crate.

use crate::connection::ConnectionId;
use crate::profile::TransportKind;
use thiserror::Error;

/// Errors surfaced at call boundaries.
///
/// Lifecycle and transfer failures that happen on background tasks never
/// appear here; they become status transitions, listener events, and log
/// lines instead.
#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serial port error: {0}")]
    Serial(#[from] tokio_serial::Error),

    #[error("invalid bluetooth address {0:?}")]
    InvalidAddress(String),

    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("transport kind mismatch: endpoint is {endpoint}, adapter is {adapter}")]
    KindMismatch {
        endpoint: TransportKind,
        adapter: TransportKind,
    },

    #[error("connection is not connected")]
    NotConnected,

    #[error("unknown connection {0}")]
    UnknownConnection(ConnectionId),

    #[error("interchange record is missing field `{0}`")]
    MissingField(&'static str),

    #[error("unknown transport tag {0:?}")]
    UnknownTransportTag(String),

    #[error("{0} connections have no interchange encoding")]
    NoInterchangeForm(TransportKind),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("send queue closed")]
    QueueClosed,
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
