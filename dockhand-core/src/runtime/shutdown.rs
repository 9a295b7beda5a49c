//! Graceful shutdown signaling
//!
//! One broadcast signal fans out to every control loop; the binaries feed
//! it from SIGINT/SIGTERM. Loops finish their in-flight tick before
//! stopping.

use tokio::sync::broadcast;
use tracing::{info, warn};

/// Shutdown signal broadcaster.
#[derive(Clone)]
pub struct ShutdownSignal {
    sender: broadcast::Sender<()>,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(1);
        Self { sender }
    }

    /// Trigger shutdown for every subscriber.
    pub fn trigger(&self) {
        let _ = self.sender.send(());
    }

    /// New receiver for this signal.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.sender.subscribe()
    }

    /// Spawn a task that triggers this signal on SIGINT or SIGTERM.
    pub fn spawn_signal_listener(&self) {
        let signal = self.clone();
        tokio::spawn(async move {
            wait_for_termination().await;
            info!("termination signal received, shutting down");
            signal.trigger();
        });
    }
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(unix)]
async fn wait_for_termination() {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut term) => {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = term.recv() => {}
            }
        }
        Err(e) => {
            warn!("failed to install SIGTERM handler, falling back to ctrl-c: {e}");
            let _ = tokio::signal::ctrl_c().await;
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_termination() {
    let _ = tokio::signal::ctrl_c().await;
}
