//! Keeping the backend set current.
//!
//! The [`RefreshCoordinator`] owns the snapshot every broadcast reads. It is
//! refreshed two ways: on demand through a [`RefreshTrigger`] when a
//! broadcast hits an unreachable backend, and periodically by the
//! [`TopologyWatcher`], which purges the fleet when nodes join.

mod coordinator;
mod purge;
mod trigger;
mod watcher;

pub use coordinator::RefreshCoordinator;
pub use purge::{PurgeBroadcaster, PurgeReport};
pub use trigger::{spawn_refresh_worker, RefreshTrigger};
pub use watcher::{TopologyChange, TopologyWatcher, WatcherHandle, WatcherState};
