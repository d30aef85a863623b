//! Single-flight ownership of the backend snapshot.
//!
//! The coordinator is the only writer of the current [`BackendSet`].
//! Readers take a cheap clone of the snapshot and never wait on a refresh.
//! Refreshes are serialized by an async mutex, and a caller that queued
//! behind a refresh takes that refresh's result instead of starting
//! another one.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::Mutex;

use crate::backend::{validate_backend_set, BackendDirectory, BackendSet, DirectoryError};

pub struct RefreshCoordinator {
    directory: Arc<dyn BackendDirectory>,
    current: RwLock<BackendSet>,
    refresh_lock: Mutex<()>,
    /// Completed refresh attempts, successful or not.
    generation: AtomicU64,
}

impl RefreshCoordinator {
    /// Populate the first snapshot from `directory`.
    ///
    /// # Errors
    /// Fails if the directory errors, returns nothing, or returns a
    /// malformed address. Callers treat this as fatal.
    pub async fn initialize(directory: Arc<dyn BackendDirectory>) -> Result<Self, DirectoryError> {
        let addresses = directory.backend_addresses(false).await?;
        validate_backend_set(&addresses)?;

        let snapshot = BackendSet::new(addresses);
        tracing::info!(
            provider = directory.name(),
            backends = %snapshot,
            "Initialized backend provider"
        );

        Ok(Self {
            directory,
            current: RwLock::new(snapshot),
            refresh_lock: Mutex::new(()),
            generation: AtomicU64::new(0),
        })
    }

    /// The latest known backends. Never performs I/O.
    pub fn snapshot(&self) -> BackendSet {
        self.current.read().clone()
    }

    /// Number of refresh attempts completed so far.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Force the directory to re-query its source and return the result.
    ///
    /// A failed or invalid refresh leaves the previous snapshot in place and
    /// returns it.
    pub async fn refresh_and_get(&self) -> BackendSet {
        let observed = self.generation();
        let _guard = self.refresh_lock.lock().await;

        if self.generation() != observed {
            tracing::debug!("Joined a refresh that completed while waiting");
            return self.snapshot();
        }

        match self.directory.backend_addresses(true).await {
            Ok(addresses) => match validate_backend_set(&addresses) {
                Ok(()) => {
                    let snapshot = BackendSet::new(addresses);
                    tracing::info!(
                        provider = self.directory.name(),
                        backends = %snapshot,
                        "Refreshed backends"
                    );
                    *self.current.write() = snapshot;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Discarding invalid backend refresh, keeping previous set");
                }
            },
            Err(e) => {
                tracing::warn!(error = %e, "Backend refresh failed, keeping previous set");
            }
        }

        self.generation.fetch_add(1, Ordering::SeqCst);
        self.snapshot()
    }
}
