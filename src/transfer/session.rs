//! Per-connection transfer session: one ordered send worker and one polling
//! receive loop over the split transport stream.

use crate::connection::{Connection, ConnectionId, ConnectionStatus};
use crate::events::DataEvent;
use crate::transport::TransportStream;
use bytes::Bytes;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

const READ_BUF_SIZE: usize = 4096;

/// Write half of the stream, shared so the disconnect workflow can shut the
/// stream down while the send worker is alive.
pub(crate) type SharedWriter = Arc<Mutex<WriteHalf<Box<dyn TransportStream>>>>;

pub(crate) struct TransferSession {
    cancel: CancellationToken,
    queue: mpsc::Sender<Bytes>,
    writer: SharedWriter,
    send_task: JoinHandle<()>,
    recv_task: JoinHandle<()>,
}

impl TransferSession {
    /// Splits the stream and spawns the two I/O tasks.
    pub(crate) fn spawn(
        conn: Connection,
        stream: Box<dyn TransportStream>,
        queue_capacity: usize,
        poll_interval: Duration,
    ) -> Self {
        let (reader, writer) = tokio::io::split(stream);
        let writer = Arc::new(Mutex::new(writer));
        let (queue, queue_rx) = mpsc::channel(queue_capacity);
        let cancel = CancellationToken::new();

        let send_task = tokio::spawn(send_worker(
            conn.id(),
            Arc::clone(&writer),
            queue_rx,
            cancel.clone(),
        ));
        let recv_task = tokio::spawn(receive_loop(conn, reader, cancel.clone(), poll_interval));

        Self {
            cancel,
            queue,
            writer,
            send_task,
            recv_task,
        }
    }

    pub(crate) fn queue(&self) -> mpsc::Sender<Bytes> {
        self.queue.clone()
    }

    pub(crate) fn writer(&self) -> SharedWriter {
        Arc::clone(&self.writer)
    }

    /// Stops both I/O tasks without waiting for them. A write parked on a
    /// full transport buffer is abandoned, releasing the writer lock.
    pub(crate) fn interrupt(&self) {
        self.cancel.cancel();
    }

    /// Stops both tasks and closes the stream if nothing else did.
    pub(crate) async fn close(self) {
        self.cancel.cancel();
        let _ = self.send_task.await;
        let _ = self.recv_task.await;
        let _ = self.writer.lock().await.shutdown().await;
    }
}

/// Drains the queue one payload at a time, preserving submission order.
/// A failed write drops that payload and moves on.
async fn send_worker(
    id: ConnectionId,
    writer: SharedWriter,
    mut queue: mpsc::Receiver<Bytes>,
    cancel: CancellationToken,
) {
    loop {
        let payload = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            payload = queue.recv() => match payload {
                Some(payload) => payload,
                None => break,
            },
        };

        // The write races cancellation so teardown can reclaim the writer
        // lock from a write parked on a full transport buffer.
        let write = async {
            let mut writer = writer.lock().await;
            writer.write_all(&payload).await?;
            writer.flush().await
        };
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            result = write => {
                if let Err(err) = result {
                    warn!("write of {} bytes on {id} failed: {err}", payload.len());
                }
            }
        }
    }
    debug!("send worker for {id} stopped");
}

/// Polls the stream and publishes whatever arrives, in wire order. EOF and
/// read errors are treated as transient; only cancellation or a status
/// change ends the loop.
async fn receive_loop(
    conn: Connection,
    mut reader: ReadHalf<Box<dyn TransportStream>>,
    cancel: CancellationToken,
    poll_interval: Duration,
) {
    let mut buf = vec![0u8; READ_BUF_SIZE];
    loop {
        if cancel.is_cancelled() || conn.status().await != ConnectionStatus::Connected {
            break;
        }

        match timeout(poll_interval, reader.read(&mut buf)).await {
            // Nothing arrived this poll.
            Err(_) => continue,
            Ok(Ok(0)) => {
                debug!("remote end of {} reported EOF", conn.id());
                if !pause(&cancel, poll_interval).await {
                    break;
                }
            }
            Ok(Ok(n)) => {
                conn.events().notify_data(DataEvent {
                    id: conn.id(),
                    payload: Bytes::copy_from_slice(&buf[..n]),
                });
            }
            Ok(Err(err)) => {
                warn!("read on {} failed: {err}", conn.id());
                if !pause(&cancel, poll_interval).await {
                    break;
                }
            }
        }
    }
    debug!("receive loop for {} stopped", conn.id());
}

/// Waits one poll interval; false means cancellation arrived first.
async fn pause(cancel: &CancellationToken, interval: Duration) -> bool {
    tokio::select! {
        _ = cancel.cancelled() => false,
        _ = tokio::time::sleep(interval) => true,
    }
}
