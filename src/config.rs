//! Tunables for the link manager.

use std::time::Duration;

/// Configuration shared by the lifecycle workflows and transfer sessions.
#[derive(Debug, Clone)]
pub struct LinkConfig {
    /// Upper bound on a single transport handshake attempt.
    pub connect_timeout: Duration,
    /// Receive poll window, and the backoff after a transient read failure.
    pub poll_interval: Duration,
    /// Capacity of the per-connection outbound queue.
    pub send_queue_capacity: usize,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            poll_interval: Duration::from_millis(50),
            send_queue_capacity: 128,
        }
    }
}
