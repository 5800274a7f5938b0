//! Workspace façade crate.
//!
//! Host applications can depend on `playlist-sync-workspace` alone and reach
//! the bridge contracts, runtime utilities and the reconciliation core without
//! wiring each crate individually.

pub use bridge_traits;
pub use core_runtime;
pub use core_sync;

pub use core_sync::{ListSyncCoordinator, ReconcileReport, SyncConfig, SyncError};
