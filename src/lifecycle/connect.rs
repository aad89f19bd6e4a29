//! Connect workflow: bounded retries, cancellation, and link reclamation.

use crate::config::LinkConfig;
use crate::connection::{Connection, ConnectionStatus};
use crate::events::ConnectEvent;
use crate::lifecycle::LifecycleScheduler;
use crate::transfer::TransferManager;
use crate::transport::TransportStream;
use futures::future::BoxFuture;
use futures::FutureExt;
use std::sync::Arc;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Automatic retries after the first failed attempt.
pub const MAX_CONNECT_RETRIES: u32 = 3;

/// Builds the scheduler operation for one connect attempt.
pub(crate) fn connect_op(
    conn: Connection,
    attempt: u32,
    scheduler: Arc<LifecycleScheduler>,
    transfers: Arc<TransferManager>,
    config: LinkConfig,
) -> impl FnOnce(CancellationToken, u64) -> BoxFuture<'static, ()> + Send + 'static {
    move |token, seq| {
        run_connect(conn, attempt, seq, token, scheduler, transfers, config).boxed()
    }
}

async fn run_connect(
    conn: Connection,
    attempt: u32,
    seq: u64,
    token: CancellationToken,
    scheduler: Arc<LifecycleScheduler>,
    transfers: Arc<TransferManager>,
    config: LinkConfig,
) {
    if token.is_cancelled() {
        conn.set_status(ConnectionStatus::ConnectCanceled).await;
        return;
    }
    conn.set_status(ConnectionStatus::Connecting).await;

    let handshake = timeout(config.connect_timeout, conn.transport().connect());
    let outcome = tokio::select! {
        biased;
        _ = token.cancelled() => {
            conn.set_status(ConnectionStatus::ConnectCanceled).await;
            return;
        }
        outcome = handshake => outcome,
    };

    match outcome {
        Ok(Ok(stream)) => establish(&conn, stream, &transfers, &config).await,
        Ok(Err(err)) => {
            warn!(
                "connect attempt {} for {} failed: {err}",
                attempt + 1,
                conn.id()
            );
            retry_or_fail(conn, attempt, seq, token, scheduler, transfers, config).await;
        }
        Err(_) => {
            warn!(
                "connect attempt {} for {} timed out after {:?}",
                attempt + 1,
                conn.id(),
                config.connect_timeout
            );
            retry_or_fail(conn, attempt, seq, token, scheduler, transfers, config).await;
        }
    }
}

async fn retry_or_fail(
    conn: Connection,
    attempt: u32,
    seq: u64,
    token: CancellationToken,
    scheduler: Arc<LifecycleScheduler>,
    transfers: Arc<TransferManager>,
    config: LinkConfig,
) {
    // Some media report a handshake error while the link actually came up.
    // Trust the medium over the error and keep the link.
    if let Some(stream) = conn.transport().reclaim().await {
        info!(
            "link for {} is up despite a failed handshake, keeping it",
            conn.id()
        );
        establish(&conn, stream, &transfers, &config).await;
        return;
    }

    if token.is_cancelled() {
        conn.set_status(ConnectionStatus::ConnectCanceled).await;
        return;
    }

    if attempt < MAX_CONNECT_RETRIES {
        let next = connect_op(
            conn.clone(),
            attempt + 1,
            Arc::clone(&scheduler),
            transfers,
            config,
        );
        if !scheduler.resubmit_if_active(conn.id(), seq, next).await {
            conn.set_status(ConnectionStatus::ConnectCanceled).await;
        }
        return;
    }

    conn.set_status(ConnectionStatus::ConnectFailed).await;
    conn.events()
        .notify_connect(ConnectEvent::Failed { id: conn.id() });
}

/// Marks the connection connected and hands the stream to its transfer
/// session. Status flips before the session spawns so the receive loop sees
/// a connected link from its first poll.
async fn establish(
    conn: &Connection,
    stream: Box<dyn TransportStream>,
    transfers: &TransferManager,
    config: &LinkConfig,
) {
    conn.set_status(ConnectionStatus::Connected).await;
    transfers.open(conn, stream, config).await;
    info!("connection {} established over {}", conn.id(), conn.kind());
    conn.events()
        .notify_connect(ConnectEvent::Established { id: conn.id() });
}
