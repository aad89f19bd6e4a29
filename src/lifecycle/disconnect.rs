//! Disconnect workflow: stream shutdown, link teardown, session cleanup.

use crate::connection::{Connection, ConnectionStatus};
use crate::events::DisconnectEvent;
use crate::transfer::TransferManager;
use futures::future::BoxFuture;
use futures::FutureExt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Builds the scheduler operation for a disconnect.
pub(crate) fn disconnect_op(
    conn: Connection,
    transfers: Arc<TransferManager>,
) -> impl FnOnce(CancellationToken, u64) -> BoxFuture<'static, ()> + Send + 'static {
    move |token, _seq| run_disconnect(conn, transfers, token).boxed()
}

async fn run_disconnect(
    conn: Connection,
    transfers: Arc<TransferManager>,
    token: CancellationToken,
) {
    if token.is_cancelled() {
        return;
    }

    if conn.status().await == ConnectionStatus::Connected {
        // Close the stream first. If that fails while the medium still
        // reports a live link, the connection genuinely remains connected,
        // so teardown stops here rather than declaring a phantom
        // disconnect.
        if let Err(err) = transfers.shutdown_stream(conn.id()).await {
            warn!("closing the stream for {} failed: {err}", conn.id());
            if conn.transport().is_connected().await {
                warn!("link for {} is still up, keeping the connection", conn.id());
                return;
            }
        }

        if let Err(err) = conn.transport().disconnect().await {
            warn!("link teardown for {} reported: {err}", conn.id());
        }

        conn.set_status(ConnectionStatus::Disconnected).await;
        info!("connection {} disconnected", conn.id());
    } else {
        // No live link, but the request still settles: leftover session
        // state goes away and the terminal notification fires, so a caller
        // that hung up on a pending connect is not left waiting.
        debug!("no live link for {}, completing teardown", conn.id());
    }

    transfers.close(conn.id()).await;
    conn.events()
        .notify_disconnect(DisconnectEvent { id: conn.id() });
}
