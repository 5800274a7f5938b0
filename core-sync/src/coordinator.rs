//! # List Sync Coordinator
//!
//! Runs one reconciliation pass for a remote list against the local playlist.
//!
//! ## Workflow
//!
//! 1. **Match**: ask the [`MatchSource`] for the list's entries in remote order
//! 2. **Update**: settle membership through the [`UpdatePhase`]
//! 3. **Re-match**: membership may have changed, so entries are fetched again
//! 4. **Sort**: read the local order once and reorder it with the
//!    [`Reconciler`] (or only plan the moves in dry-run mode)
//!
//! A pass is synchronous and must not overlap with another pass over the same
//! playlist. Collaborator faults abort the pass and are returned to the caller.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use core_runtime::CoreConfig;
//! use core_sync::{ListRef, ListSyncCoordinator};
//!
//! let core = CoreConfig::builder()
//!     .playlist_backend(playlist)
//!     .build()?;
//!
//! let coordinator = ListSyncCoordinator::new(&core, matcher, resolver, handler);
//! let report = coordinator.process(&ListRef::new("watchlist"))?;
//! println!("{} items moved", report.sort.moved());
//! ```

use crate::diagnostics::{Diagnostic, DiagnosticSink, TracingDiagnostics};
use crate::entry::{MatchEntry, MatchTable};
use crate::error::{Result, SyncError};
use crate::reconciler::{AbsentSlotPolicy, Reconciler, SortReport};
use crate::snapshot::LocalSnapshot;
use crate::update::{IdentityResolver, PairHandler, UpdatePhase, UpdateReport, UpdateScope};
use bridge_traits::platform::PlatformSendSync;
use bridge_traits::{Clock, PlaylistBackend};
use chrono::{DateTime, Utc};
use core_runtime::{CoreConfig, FeatureFlags};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, info_span, instrument, warn};
use uuid::Uuid;

/// Identifies the remote list a pass reconciles against.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ListRef {
    pub id: String,
    pub name: Option<String>,
}

impl ListRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

impl fmt::Display for ListRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{} ({})", name, self.id),
            None => f.write_str(&self.id),
        }
    }
}

/// External matcher pairing remote list items with local ones.
pub trait MatchSource: PlatformSendSync {
    /// Entries in remote order, deduplicated by key.
    ///
    /// # Errors
    ///
    /// Implementations report their own failures as
    /// [`SyncError::MatchSource`]; the pass is aborted.
    fn match_entries(&self, list: &ListRef) -> Result<Vec<MatchEntry>>;
}

/// Unique identifier for a reconciliation pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PassId(Uuid);

impl PassId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse a pass ID from a string
    ///
    /// # Errors
    ///
    /// Returns an error if the string is not a valid UUID
    pub fn from_string(s: &str) -> Result<Self> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| SyncError::InvalidKey(format!("invalid pass id '{}': {}", s, e)))
    }
}

impl Default for PassId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for PassId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

/// Coordinator configuration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Cursor behaviour for remote leaves without a local counterpart
    pub absent_slot_policy: AbsentSlotPolicy,

    /// Pairs handed to the update handler
    pub update_scope: UpdateScope,

    /// Plan the sort phase without relocating anything
    pub dry_run: bool,

    /// Log the match table at debug level before each pass
    pub log_match_table: bool,
}

impl SyncConfig {
    pub fn from_features(features: &FeatureFlags) -> Self {
        Self {
            absent_slot_policy: if features.reserve_absent_slots {
                AbsentSlotPolicy::Reserve
            } else {
                AbsentSlotPolicy::Collapse
            },
            update_scope: if features.update_unmatched_only {
                UpdateScope::UnmatchedOnly
            } else {
                UpdateScope::AllPairs
            },
            dry_run: features.dry_run,
            log_match_table: features.log_match_table,
        }
    }

    pub fn from_core(core: &CoreConfig) -> Self {
        Self::from_features(&core.features)
    }
}

/// Outcome of one pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileReport {
    pub pass_id: PassId,
    pub list_id: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// The sort phase was planned but not applied
    pub dry_run: bool,
    pub update: UpdateReport,
    pub sort: SortReport,
}

impl ReconcileReport {
    pub fn duration_ms(&self) -> i64 {
        (self.finished_at - self.started_at).num_milliseconds()
    }
}

/// Orchestrates update and sort phases for remote lists
pub struct ListSyncCoordinator {
    config: SyncConfig,
    playlist: Arc<dyn PlaylistBackend>,
    clock: Arc<dyn Clock>,
    match_source: Arc<dyn MatchSource>,
    resolver: Arc<dyn IdentityResolver>,
    handler: Arc<dyn PairHandler>,
    diagnostics: Arc<dyn DiagnosticSink>,
}

impl ListSyncCoordinator {
    /// Create a coordinator from the runtime configuration and the three
    /// external collaborators.
    pub fn new(
        core: &CoreConfig,
        match_source: Arc<dyn MatchSource>,
        resolver: Arc<dyn IdentityResolver>,
        handler: Arc<dyn PairHandler>,
    ) -> Self {
        Self {
            config: SyncConfig::from_core(core),
            playlist: Arc::clone(&core.playlist_backend),
            clock: Arc::clone(&core.clock),
            match_source,
            resolver,
            handler,
            diagnostics: Arc::new(TracingDiagnostics),
        }
    }

    /// Replace the default tracing-only diagnostic sink.
    pub fn with_diagnostics(mut self, diagnostics: Arc<dyn DiagnosticSink>) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    pub fn with_config(mut self, config: SyncConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Reconcile the local playlist with one remote list.
    ///
    /// # Errors
    ///
    /// Returns an error if the match source, the pair handler, or the
    /// playlist backend fails. Relocations issued before a failure are not
    /// rolled back.
    #[instrument(skip(self), fields(list_id = %list.id))]
    pub fn process(&self, list: &ListRef) -> Result<ReconcileReport> {
        let pass_id = PassId::new();
        let span = info_span!("reconcile_pass", pass_id = %pass_id, dry_run = self.config.dry_run);
        let _enter = span.enter();

        let started_at = self.clock.now();
        let sink: &dyn DiagnosticSink = &*self.diagnostics;

        info!("Phase 1: Matching remote list {}", list);
        let entries = self.match_source.match_entries(list)?;
        if entries.is_empty() {
            sink.report(Diagnostic::EmptyRemoteList {
                list_id: list.id.clone(),
            });
            return Ok(self.report(pass_id, list, started_at, UpdateReport::default(), SortReport::default()));
        }
        self.log_entries("Matched", &entries);

        info!("Phase 2: Updating membership for {} entries", entries.len());
        let update = UpdatePhase::new(sink)
            .with_scope(self.config.update_scope)
            .run(&entries, &*self.resolver, &*self.handler)?;

        info!("Phase 3: Re-matching after membership update");
        let entries = self.match_source.match_entries(list)?;
        self.log_entries("Re-matched", &entries);

        info!("Phase 4: Sorting local playlist");
        let mut snapshot = LocalSnapshot::capture(&*self.playlist)?;
        let reconciler = Reconciler::new(sink).with_absent_policy(self.config.absent_slot_policy);
        let sort = if self.config.dry_run {
            let plan = reconciler.plan(&entries, &mut snapshot);
            for op in &plan.operations {
                info!("[dry run] would {}", op);
            }
            plan
        } else {
            reconciler.reconcile(&entries, &mut snapshot, &*self.playlist)?
        };

        let report = self.report(pass_id, list, started_at, update, sort);
        info!(
            "Pass {} for {} finished in {}ms: {} handled, {} moved",
            pass_id,
            list,
            report.duration_ms(),
            report.update.handled,
            report.sort.moved()
        );
        Ok(report)
    }

    fn log_entries(&self, stage: &str, entries: &[MatchEntry]) {
        if entries.is_empty() {
            warn!("{} entries are empty, nothing to sort", stage);
        } else if self.config.log_match_table {
            debug!("{} {} entries:\n{}", stage, entries.len(), MatchTable(entries));
        }
    }

    fn report(
        &self,
        pass_id: PassId,
        list: &ListRef,
        started_at: DateTime<Utc>,
        update: UpdateReport,
        sort: SortReport,
    ) -> ReconcileReport {
        ReconcileReport {
            pass_id,
            list_id: list.id.clone(),
            started_at,
            finished_at: self.clock.now(),
            dry_run: self.config.dry_run,
            update,
            sort,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::RecordingDiagnostics;
    use crate::entry::{MediaKind, RemoteItem};
    use crate::key::CorrelationKey;
    use crate::update::{MediaIdentity, PairContext};
    use bridge_traits::{InMemoryPlaylist, LocalItem};
    use mockall::mock;

    mock! {
        pub Matcher {}

        impl MatchSource for Matcher {
            fn match_entries(&self, list: &ListRef) -> Result<Vec<MatchEntry>>;
        }
    }

    mock! {
        pub Resolver {}

        impl IdentityResolver for Resolver {
            fn resolve(&self, remote: &RemoteItem) -> Option<MediaIdentity>;
        }
    }

    mock! {
        pub Handler {}

        impl PairHandler for Handler {
            fn handle(&self, identity: MediaIdentity, context: PairContext) -> Result<()>;
        }
    }

    fn playlist(handles: &[&str]) -> Arc<InMemoryPlaylist> {
        Arc::new(InMemoryPlaylist::new(
            handles.iter().map(|h| LocalItem::new(format!("rk-{}", h), *h)).collect(),
        ))
    }

    fn entries(order: &[&str]) -> Vec<MatchEntry> {
        order
            .iter()
            .enumerate()
            .map(|(i, h)| {
                MatchEntry::leaf(
                    CorrelationKey::new(["imdb", *h]),
                    i,
                    Some((i, LocalItem::new(format!("rk-{}", h), *h))),
                    RemoteItem::new(MediaKind::Movie, *h),
                )
            })
            .collect()
    }

    fn permissive_resolver() -> Arc<MockResolver> {
        let mut resolver = MockResolver::new();
        resolver
            .expect_resolve()
            .returning(|remote| Some(MediaIdentity::new(remote.kind, CorrelationKey::new(["imdb", remote.id.as_str()]))));
        Arc::new(resolver)
    }

    fn counting_handler(times: usize) -> Arc<MockHandler> {
        let mut handler = MockHandler::new();
        handler.expect_handle().times(times).returning(|_, _| Ok(()));
        Arc::new(handler)
    }

    fn core(playlist: Arc<InMemoryPlaylist>, dry_run: bool) -> CoreConfig {
        CoreConfig::builder()
            .playlist_backend(playlist)
            .dry_run(dry_run)
            .build()
            .unwrap()
    }

    #[test]
    fn test_sync_config_from_features() {
        let features = FeatureFlags {
            dry_run: true,
            log_match_table: false,
            reserve_absent_slots: true,
            update_unmatched_only: true,
        };
        let config = SyncConfig::from_features(&features);

        assert!(config.dry_run);
        assert_eq!(config.absent_slot_policy, AbsentSlotPolicy::Reserve);
        assert_eq!(config.update_scope, UpdateScope::UnmatchedOnly);
        assert_eq!(SyncConfig::default().absent_slot_policy, AbsentSlotPolicy::Collapse);
    }

    #[test]
    fn test_pass_id_roundtrip() {
        let id = PassId::new();
        assert_eq!(PassId::from_string(&id.to_string()).unwrap(), id);
        assert!(PassId::from_string("not-a-uuid").is_err());
    }

    #[test]
    fn test_process_reorders_and_rematches() {
        let playlist = playlist(&["c", "a", "b"]);
        let mut source = MockMatcher::new();
        // Once before the update phase and once after it
        source
            .expect_match_entries()
            .times(2)
            .returning(|_| Ok(entries(&["a", "b", "c"])));

        let coordinator = ListSyncCoordinator::new(
            &core(Arc::clone(&playlist), false),
            Arc::new(source),
            permissive_resolver(),
            counting_handler(3),
        );
        let report = coordinator.process(&ListRef::new("watchlist")).unwrap();

        assert_eq!(report.list_id, "watchlist");
        assert_eq!(report.update.handled, 3);
        assert_eq!(report.sort.moved(), 2);
        assert!(!report.dry_run);
        assert!(report.finished_at >= report.started_at);

        let order: Vec<String> = playlist.items().into_iter().map(|i| i.playlist_item_id.to_string()).collect();
        assert_eq!(order, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_dry_run_leaves_playlist_untouched() {
        let playlist = playlist(&["b", "a"]);
        let mut source = MockMatcher::new();
        source.expect_match_entries().returning(|_| Ok(entries(&["a", "b"])));

        let coordinator = ListSyncCoordinator::new(
            &core(Arc::clone(&playlist), true),
            Arc::new(source),
            permissive_resolver(),
            counting_handler(2),
        );
        let report = coordinator.process(&ListRef::new("watchlist")).unwrap();

        assert!(report.dry_run);
        assert_eq!(report.sort.moved(), 1);
        let order: Vec<String> = playlist.items().into_iter().map(|i| i.playlist_item_id.to_string()).collect();
        assert_eq!(order, vec!["b", "a"]);
    }

    #[test]
    fn test_empty_remote_list_stops_early() {
        let diagnostics = Arc::new(RecordingDiagnostics::new());
        let mut source = MockMatcher::new();
        source.expect_match_entries().times(1).returning(|_| Ok(Vec::new()));

        let coordinator = ListSyncCoordinator::new(
            &core(playlist(&["a"]), false),
            Arc::new(source),
            permissive_resolver(),
            counting_handler(0),
        )
        .with_diagnostics(diagnostics.clone());
        let report = coordinator.process(&ListRef::new("empty").with_name("Empty list")).unwrap();

        assert_eq!(report.update, UpdateReport::default());
        assert_eq!(report.sort, SortReport::default());
        assert_eq!(
            diagnostics.events(),
            vec![Diagnostic::EmptyRemoteList {
                list_id: "empty".to_string(),
            }]
        );
    }

    #[test]
    fn test_match_source_error_propagates() {
        let mut source = MockMatcher::new();
        source
            .expect_match_entries()
            .returning(|list| Err(SyncError::MatchSource(format!("{} unavailable", list.id))));

        let coordinator = ListSyncCoordinator::new(
            &core(playlist(&["a"]), false),
            Arc::new(source),
            permissive_resolver(),
            counting_handler(0),
        );
        let result = coordinator.process(&ListRef::new("watchlist"));

        assert!(matches!(result, Err(SyncError::MatchSource(msg)) if msg == "watchlist unavailable"));
    }

    #[test]
    fn test_list_ref_display() {
        assert_eq!(ListRef::new("123").to_string(), "123");
        assert_eq!(ListRef::new("123").with_name("Favourites").to_string(), "Favourites (123)");
    }
}
