use std::sync::Arc;

use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::refresh::RefreshCoordinator;
use crate::shutdown::cancelled;

/// Non-blocking handle for asking the refresh worker to re-query backends.
///
/// Requests collapse: while one is pending, further requests are dropped.
#[derive(Clone)]
pub struct RefreshTrigger {
    tx: mpsc::Sender<()>,
}

impl RefreshTrigger {
    /// Schedule a forced refresh. Returns `true` if a new refresh was
    /// queued, `false` if one was already pending or the worker is gone.
    pub fn request(&self) -> bool {
        match self.tx.try_send(()) {
            Ok(()) => {
                tracing::info!("Scheduled backend refresh after a failed broadcast");
                true
            }
            Err(TrySendError::Full(())) => {
                tracing::debug!("Backend refresh already pending");
                false
            }
            Err(TrySendError::Closed(())) => {
                tracing::warn!("Refresh worker is not running, dropping refresh request");
                false
            }
        }
    }
}

/// Start the task that serves [`RefreshTrigger`] requests until shutdown.
pub fn spawn_refresh_worker(
    coordinator: Arc<RefreshCoordinator>,
    mut shutdown: watch::Receiver<bool>,
) -> (RefreshTrigger, JoinHandle<()>) {
    let (tx, mut rx) = mpsc::channel(1);

    let handle = tokio::spawn(async move {
        loop {
            tokio::select! {
                biased;
                _ = cancelled(&mut shutdown) => break,
                request = rx.recv() => match request {
                    Some(()) => {
                        coordinator.refresh_and_get().await;
                    }
                    None => break,
                },
            }
        }
        tracing::debug!("Refresh worker stopped");
    });

    (RefreshTrigger { tx }, handle)
}
