//! Periodic topology check.
//!
//! On every tick the watcher forces a refresh, compares the result with
//! the set it saw last time, and purges the whole fleet when new backends
//! have appeared. A fresh node may have missed invalidations that the
//! others received, so every cache is cleared to keep them consistent.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use crate::backend::BackendSet;
use crate::refresh::{PurgeBroadcaster, PurgeReport, RefreshCoordinator};
use crate::shutdown::cancelled;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum WatcherState {
    Idle = 0,
    Refreshing = 1,
}

/// Outcome of one topology check.
#[derive(Debug, Clone)]
pub struct TopologyChange {
    pub current: BackendSet,
    pub added: Vec<String>,
    pub removed: Vec<String>,
    /// Present when new backends triggered a purge.
    pub purge: Option<PurgeReport>,
}

pub struct TopologyWatcher {
    coordinator: Arc<RefreshCoordinator>,
    purger: Arc<PurgeBroadcaster>,
    interval: Duration,
    state: Arc<AtomicU8>,
}

impl TopologyWatcher {
    pub fn new(
        coordinator: Arc<RefreshCoordinator>,
        purger: Arc<PurgeBroadcaster>,
        interval: Duration,
    ) -> Self {
        Self {
            coordinator,
            purger,
            interval,
            state: Arc::new(AtomicU8::new(WatcherState::Idle as u8)),
        }
    }

    pub fn state(&self) -> WatcherState {
        load_state(&self.state)
    }

    /// Start the periodic loop. A zero interval disables the watcher and
    /// nothing is spawned.
    pub fn spawn(self, shutdown: watch::Receiver<bool>) -> Option<WatcherHandle> {
        if self.interval.is_zero() {
            tracing::info!("Topology refresh disabled");
            return None;
        }

        tracing::info!(interval = ?self.interval, "Starting topology watcher");
        let state = self.state.clone();
        let join = tokio::spawn(self.run(shutdown));
        Some(WatcherHandle { state, join })
    }

    async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut previous = self.coordinator.snapshot();
        let mut ticker = interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = cancelled(&mut shutdown) => break,
                _ = ticker.tick() => {
                    previous = self.check_topology(&previous).await.current;
                }
            }
        }
        tracing::debug!("Topology watcher stopped");
    }

    /// Run one refresh-and-compare cycle against `previous`.
    pub async fn check_topology(&self, previous: &BackendSet) -> TopologyChange {
        self.set_state(WatcherState::Refreshing);
        let current = self.coordinator.refresh_and_get().await;
        let added = current.added_since(previous);
        let removed = current.removed_since(previous);
        self.set_state(WatcherState::Idle);

        if !removed.is_empty() {
            tracing::info!(removed = ?removed, "Backends left the pool");
        }

        let purge = if added.is_empty() {
            None
        } else {
            tracing::info!(added = ?added, "New backends detected, purging all caches");
            Some(self.purger.purge_all(&current).await)
        };

        TopologyChange {
            current,
            added,
            removed,
            purge,
        }
    }

    fn set_state(&self, state: WatcherState) {
        self.state.store(state as u8, Ordering::SeqCst);
    }
}

/// Handle to a running watcher task.
pub struct WatcherHandle {
    state: Arc<AtomicU8>,
    join: JoinHandle<()>,
}

impl WatcherHandle {
    pub fn state(&self) -> WatcherState {
        load_state(&self.state)
    }

    /// Wait for the loop to exit after shutdown has been signalled.
    pub async fn join(self) {
        if let Err(e) = self.join.await {
            tracing::error!(error = %e, "Topology watcher task failed");
        }
    }
}

fn load_state(state: &AtomicU8) -> WatcherState {
    match state.load(Ordering::SeqCst) {
        1 => WatcherState::Refreshing,
        _ => WatcherState::Idle,
    }
}
