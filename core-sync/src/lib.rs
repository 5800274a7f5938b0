//! # Playlist Order Reconciliation
//!
//! Keeps a local playlist in step with a remote list: membership first, then
//! relative order.
//!
//! ## Overview
//!
//! An external matcher pairs every remote list item with what the local
//! playlist holds for it. Both sides may be single items or nested groupings
//! (show, season, episode). From those match entries this crate:
//! - Flattens each pair into aligned leaf pairs ([`Expander`])
//! - Hands unmatched or matched pairs to a membership handler ([`UpdatePhase`])
//! - Computes and issues the minimal single-pass sequence of relocations
//!   that brings the local order in line with the remote one ([`Reconciler`])
//!
//! ## Components
//!
//! - **Keys** (`key`): correlation keys and grouping sub-keys
//! - **Sides** (`side`): leaf or insertion-ordered grouping values
//! - **Entries** (`entry`): match entries and their debug table rendering
//! - **Expander** (`expander`): lazy hierarchical flattening
//! - **Snapshot** (`snapshot`): physical local order and the hole-aware working order
//! - **Reconciler** (`reconciler`): sort phase
//! - **Update** (`update`): membership phase
//! - **Diagnostics** (`diagnostics`): structured per-pair events
//! - **Coordinator** (`coordinator`): one full pass for a remote list

pub mod coordinator;
pub mod diagnostics;
pub mod entry;
pub mod error;
pub mod expander;
pub mod key;
pub mod reconciler;
pub mod side;
pub mod snapshot;
pub mod update;

pub use coordinator::{ListRef, ListSyncCoordinator, MatchSource, PassId, ReconcileReport, SyncConfig};
pub use diagnostics::{Diagnostic, DiagnosticSink, RecordingDiagnostics, TracingDiagnostics};
pub use entry::{LocalSide, MatchEntry, MatchTable, MediaKind, RemoteItem, RemoteSide};
pub use error::{Result, SyncError};
pub use expander::{Expander, Expansion, LeafPair};
pub use key::{CorrelationKey, SubKey};
pub use reconciler::{AbsentSlotPolicy, Reconciler, RelocateOp, SortReport};
pub use side::{Side, SideShape};
pub use snapshot::{LocalSnapshot, Slot, SlotOrder};
pub use update::{
    IdentityResolver, MediaIdentity, PairContext, PairHandler, PairStatus, UpdatePhase,
    UpdateReport, UpdateScope,
};
