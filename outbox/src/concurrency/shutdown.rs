//! Shutdown signaling for background workers.
//!
//! A single [`ShutdownTx`] broadcasts a one-way shutdown signal to any number
//! of [`ShutdownRx`] receivers over a watch channel. The signal never reverts
//! once sent.

use tokio::sync::watch;

/// Sending half of the shutdown channel.
#[derive(Debug, Clone)]
pub struct ShutdownTx {
    tx: watch::Sender<bool>,
}

impl ShutdownTx {
    /// Creates a new receiver subscribed to this sender.
    pub fn subscribe(&self) -> ShutdownRx {
        ShutdownRx {
            rx: self.tx.subscribe(),
        }
    }

    /// Broadcasts the shutdown signal to all subscribed receivers.
    ///
    /// Returns an error if every receiver has been dropped, in which case
    /// there is nothing left to shut down.
    pub fn shutdown(&self) -> Result<(), watch::error::SendError<bool>> {
        self.tx.send(true)
    }
}

/// Receiving half of the shutdown channel.
#[derive(Debug, Clone)]
pub struct ShutdownRx {
    rx: watch::Receiver<bool>,
}

impl ShutdownRx {
    /// Returns whether shutdown has been signaled.
    pub fn is_shutdown(&self) -> bool {
        *self.rx.borrow()
    }

    /// Waits until the shutdown signal is broadcast.
    ///
    /// Resolves immediately if shutdown was already signaled. Also resolves
    /// if the sender is dropped, which is treated as an implicit shutdown.
    pub async fn wait_for_shutdown(&self) {
        let mut rx = self.rx.clone();
        // A closed channel means the sender is gone and no more work will be
        // scheduled, so both outcomes mean stop.
        let _ = rx.wait_for(|shutdown| *shutdown).await;
    }
}

/// Creates a connected shutdown channel pair.
pub fn create_shutdown_channel() -> (ShutdownTx, ShutdownRx) {
    let (tx, rx) = watch::channel(false);

    (ShutdownTx { tx }, ShutdownRx { rx })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn shutdown_is_observed_by_all_receivers() {
        let (tx, rx) = create_shutdown_channel();
        let other_rx = tx.subscribe();

        assert!(!rx.is_shutdown());
        assert!(!other_rx.is_shutdown());

        tx.shutdown().unwrap();

        assert!(rx.is_shutdown());
        assert!(other_rx.is_shutdown());
        rx.wait_for_shutdown().await;
        other_rx.wait_for_shutdown().await;
    }

    #[tokio::test]
    async fn dropped_sender_resolves_waiters() {
        let (tx, rx) = create_shutdown_channel();
        drop(tx);

        // Must not hang.
        rx.wait_for_shutdown().await;
    }
}
