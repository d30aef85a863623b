use std::time::Duration;

use tokio::signal;
use tokio::sync::watch;

/// Process-wide shutdown signal.
///
/// The server, the refresh worker and the topology watcher all hold a
/// receiver; signalling once stops every one of them.
pub struct ShutdownManager {
    shutdown: watch::Sender<bool>,
    drain_timeout: Duration,
}

impl ShutdownManager {
    pub fn new() -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            shutdown,
            drain_timeout: Duration::from_secs(10),
        }
    }

    /// How long in-flight requests get to finish once shutdown starts.
    pub fn drain_timeout(&self) -> Duration {
        self.drain_timeout
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.shutdown.subscribe()
    }

    /// Resolve on Ctrl-C, SIGTERM, or [`signal_shutdown`](Self::signal_shutdown).
    pub async fn wait_for_shutdown(&self) -> std::io::Result<()> {
        let mut rx = self.subscribe();
        if *rx.borrow() {
            return Ok(());
        }

        #[cfg(unix)]
        {
            let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())?;
            tokio::select! {
                _ = signal::ctrl_c() => {},
                _ = sigterm.recv() => {},
                _ = cancelled(&mut rx) => {},
            }
        }

        #[cfg(not(unix))]
        {
            tokio::select! {
                _ = signal::ctrl_c() => {},
                _ = cancelled(&mut rx) => {},
            }
        }

        if !self.shutdown.send_replace(true) {
            tracing::info!("Shutting down gracefully...");
        }
        Ok(())
    }

    pub fn signal_shutdown(&self) {
        self.shutdown.send_replace(true);
    }

    pub fn is_shutting_down(&self) -> bool {
        *self.shutdown.borrow()
    }
}

impl Default for ShutdownManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolve once shutdown has been signalled, or the manager is gone.
pub async fn cancelled(rx: &mut watch::Receiver<bool>) {
    let _ = rx.wait_for(|stop| *stop).await;
}
