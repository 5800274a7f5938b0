//! # Sequence Reconciler: Sort Phase
//!
//! Brings the local playlist into the relative order of the remote list with
//! a single left-to-right pass over the flattened leaf pairs.
//!
//! ## Algorithm
//!
//! A cursor names the next working-order slot that must hold a correctly
//! placed leaf. For each pair:
//!
//! 1. Absent local leaf: nothing to move. The cursor advances only under
//!    [`AbsentSlotPolicy::Reserve`].
//! 2. Local leaf already placed in this pass: skipped.
//! 3. Local leaf not in the snapshot: [`Diagnostic::MissingLocal`], cursor
//!    advances.
//! 4. Leaf already at the cursor: no operation.
//! 5. Otherwise a [`RelocateOp`] places it after the nearest occupied slot
//!    before the cursor (or at the front). A forward move leaves a hole at
//!    the old slot; a backward move compacts it. The leaf then takes the
//!    cursor slot.
//!
//! Slots before the cursor never shift, so every operation is computed
//! against a mirror that matches what the backing store holds after the
//! previous operations. Each leaf moves at most once and an already ordered
//! playlist produces no operations.
//!
//! Unmatched local items are not part of the working order. They never move
//! and keep their relative order.

use crate::diagnostics::{Diagnostic, DiagnosticSink};
use crate::entry::{MatchEntry, RemoteItem};
use crate::error::Result;
use crate::expander::{Expander, LeafPair};
use crate::snapshot::{LocalSnapshot, SlotOrder};
use bridge_traits::{LocalItem, PlaylistBackend, PlaylistItemId};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use tracing::{debug, info, instrument};

/// One physical move: put `item` right after `after`, or first when `after`
/// is `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelocateOp {
    pub item: PlaylistItemId,
    pub after: Option<PlaylistItemId>,
    /// Working-order slot the item left
    pub from_index: usize,
    /// Working-order slot the item now holds
    pub to_index: usize,
}

impl RelocateOp {
    pub fn is_to_front(&self) -> bool {
        self.after.is_none()
    }
}

impl fmt::Display for RelocateOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.after {
            Some(after) => write!(
                f,
                "move {} after {} ({} -> {})",
                self.item, after, self.from_index, self.to_index
            ),
            None => write!(
                f,
                "move {} to front ({} -> {})",
                self.item, self.from_index, self.to_index
            ),
        }
    }
}

/// How a remote leaf without a local counterpart affects the cursor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AbsentSlotPolicy {
    /// Absent leaves take no slot
    #[default]
    Collapse,
    /// Absent leaves reserve a slot for an item the update phase may add
    Reserve,
}

/// Outcome of one sort phase.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortReport {
    /// Operations in the order they were (or would be) issued
    pub operations: Vec<RelocateOp>,
    pub pairs_visited: usize,
    pub in_place: usize,
    pub skipped_absent: usize,
    pub skipped_missing: usize,
    pub skipped_already_placed: usize,
}

impl SortReport {
    pub fn moved(&self) -> usize {
        self.operations.len()
    }
}

/// Sort-phase driver.
pub struct Reconciler<'s> {
    sink: &'s dyn DiagnosticSink,
    absent_policy: AbsentSlotPolicy,
}

impl<'s> Reconciler<'s> {
    pub fn new(sink: &'s dyn DiagnosticSink) -> Self {
        Self {
            sink,
            absent_policy: AbsentSlotPolicy::default(),
        }
    }

    pub fn with_absent_policy(mut self, policy: AbsentSlotPolicy) -> Self {
        self.absent_policy = policy;
        self
    }

    pub fn absent_policy(&self) -> AbsentSlotPolicy {
        self.absent_policy
    }

    /// Compute the operations without issuing them. The snapshot is updated
    /// as if they had been applied.
    pub fn plan(&self, entries: &[MatchEntry], snapshot: &mut LocalSnapshot) -> SortReport {
        let mut issue = |_: &RelocateOp| -> Result<()> { Ok(()) };
        // The no-op issuer cannot fail
        self.run(entries, snapshot, &mut issue).unwrap_or_default()
    }

    /// Reorder `backend` to follow `entries`, issuing each operation inline.
    ///
    /// # Errors
    ///
    /// A failing [`PlaylistBackend::relocate`] aborts the pass. Operations
    /// issued before the failure stay applied, and the snapshot reflects
    /// exactly those.
    #[instrument(skip_all, fields(entries = entries.len(), local_items = snapshot.len()))]
    pub fn reconcile(
        &self,
        entries: &[MatchEntry],
        snapshot: &mut LocalSnapshot,
        backend: &dyn PlaylistBackend,
    ) -> Result<SortReport> {
        let mut issue = |op: &RelocateOp| -> Result<()> {
            debug!("Relocating: {}", op);
            backend.relocate(&op.item, op.after.as_ref())?;
            Ok(())
        };
        let report = self.run(entries, snapshot, &mut issue)?;

        info!(
            "Sort phase finished: {} moved, {} in place, {} absent, {} missing",
            report.moved(),
            report.in_place,
            report.skipped_absent,
            report.skipped_missing
        );
        Ok(report)
    }

    fn run(
        &self,
        entries: &[MatchEntry],
        snapshot: &mut LocalSnapshot,
        issue: &mut dyn FnMut(&RelocateOp) -> Result<()>,
    ) -> Result<SortReport> {
        let expander = Expander::new(self.sink);
        let pairs: Vec<LeafPair<'_, LocalItem, RemoteItem>> = entries
            .iter()
            .flat_map(|entry| expander.expand_entry(entry))
            .collect();

        let tracked: HashSet<&PlaylistItemId> = pairs
            .iter()
            .filter_map(|pair| pair.local)
            .map(|item| &item.playlist_item_id)
            .filter(|id| snapshot.contains(id))
            .collect();
        let mut order = snapshot.tracked_slots(&tracked);
        debug!(
            "Sorting {} leaf pairs over {} tracked of {} local items",
            pairs.len(),
            order.len(),
            snapshot.len()
        );

        let mut report = SortReport {
            pairs_visited: pairs.len(),
            ..SortReport::default()
        };
        let mut placed: HashSet<&PlaylistItemId> = HashSet::with_capacity(tracked.len());
        let mut cursor = 0;

        for pair in &pairs {
            let Some(local) = pair.local else {
                report.skipped_absent += 1;
                if self.absent_policy == AbsentSlotPolicy::Reserve {
                    cursor += 1;
                }
                continue;
            };
            let id = &local.playlist_item_id;

            if placed.contains(id) {
                self.sink.report(Diagnostic::AlreadyPlaced {
                    playlist_item_id: id.to_string(),
                    target_cursor: cursor,
                });
                report.skipped_already_placed += 1;
                continue;
            }

            let Some(current) = order.position(id) else {
                self.sink.report(Diagnostic::MissingLocal {
                    playlist_item_id: id.to_string(),
                    media_id: local.media_id.clone(),
                    target_cursor: cursor,
                });
                report.skipped_missing += 1;
                cursor += 1;
                continue;
            };

            if current != cursor {
                let op = RelocateOp {
                    item: id.clone(),
                    after: order
                        .reference_before(cursor, id)
                        .map(|reference| reference.playlist_item_id.clone()),
                    from_index: current,
                    to_index: cursor,
                };

                issue(&op)?;
                snapshot.apply(&op);
                Self::shift(&mut order, current, cursor, local);
                report.operations.push(op);
            } else {
                report.in_place += 1;
            }

            placed.insert(id);
            cursor += 1;
        }

        Ok(report)
    }

    /// Working-order update for a move from `current` to `cursor`.
    fn shift(order: &mut SlotOrder, current: usize, cursor: usize, item: &LocalItem) {
        if cursor > current {
            order.vacate(current);
        } else {
            order.remove(current);
        }
        order.place(cursor, item.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::RecordingDiagnostics;
    use crate::entry::MediaKind;
    use crate::key::CorrelationKey;
    use crate::side::Side;
    use bridge_traits::error::{BridgeError, Result as BridgeResult};
    use bridge_traits::InMemoryPlaylist;
    use std::sync::Mutex;

    /// In-memory playlist that records every relocate and fails on one item.
    struct RecordingPlaylist {
        inner: InMemoryPlaylist,
        fail_on: Option<PlaylistItemId>,
        calls: Mutex<Vec<(String, Option<String>)>>,
    }

    impl RecordingPlaylist {
        fn new(items: &[LocalItem], fail_on: Option<&str>) -> Self {
            Self {
                inner: InMemoryPlaylist::new(items.to_vec()),
                fail_on: fail_on.map(PlaylistItemId::from),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<(String, Option<String>)> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl PlaylistBackend for RecordingPlaylist {
        fn current_order(&self) -> BridgeResult<Vec<LocalItem>> {
            self.inner.current_order()
        }

        fn relocate(&self, item: &PlaylistItemId, after: Option<&PlaylistItemId>) -> BridgeResult<()> {
            self.calls
                .lock()
                .unwrap()
                .push((item.to_string(), after.map(ToString::to_string)));
            if self.fail_on.as_ref() == Some(item) {
                return Err(BridgeError::OperationFailed("server went away".to_string()));
            }
            self.inner.relocate(item, after)
        }
    }

    fn local(name: &str) -> LocalItem {
        LocalItem::new(format!("rk-{}", name), format!("pl-{}", name))
    }

    fn remote(name: &str) -> RemoteItem {
        RemoteItem::new(MediaKind::Movie, name)
    }

    /// One leaf entry per remote name, matched locally unless listed in `unmatched`.
    fn entries(remote_order: &[&str], unmatched: &[&str]) -> Vec<MatchEntry> {
        remote_order
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let local = (!unmatched.contains(name)).then(|| (i, local(name)));
                MatchEntry::leaf(CorrelationKey::new(["imdb", *name]), i, local, remote(name))
            })
            .collect()
    }

    fn snapshot(order: &[&str]) -> LocalSnapshot {
        LocalSnapshot::new(order.iter().map(|n| local(n)).collect()).unwrap()
    }

    fn names(snapshot: &LocalSnapshot) -> Vec<String> {
        snapshot
            .items()
            .iter()
            .map(|i| i.playlist_item_id.as_str().trim_start_matches("pl-").to_string())
            .collect()
    }

    fn id(name: &str) -> PlaylistItemId {
        PlaylistItemId::new(format!("pl-{}", name))
    }

    #[test]
    fn test_single_backward_move() {
        let sink = RecordingDiagnostics::new();
        let mut snapshot = snapshot(&["B", "C", "A"]);

        let report = Reconciler::new(&sink).plan(&entries(&["A", "B", "C"], &[]), &mut snapshot);

        assert_eq!(
            report.operations,
            vec![RelocateOp {
                item: id("A"),
                after: None,
                from_index: 2,
                to_index: 0,
            }]
        );
        assert!(report.operations[0].is_to_front());
        assert_eq!(report.in_place, 2);
        assert_eq!(names(&snapshot), vec!["A", "B", "C"]);
    }

    #[test]
    fn test_full_reorder_reaches_remote_order() {
        let sink = RecordingDiagnostics::new();
        let mut snapshot = snapshot(&["C", "A", "B"]);
        let backend = InMemoryPlaylist::new(snapshot.items().to_vec());

        let report = Reconciler::new(&sink)
            .reconcile(&entries(&["A", "B", "C"], &[]), &mut snapshot, &backend)
            .unwrap();

        assert_eq!(report.moved(), 2);
        assert_eq!(names(&snapshot), vec!["A", "B", "C"]);
        assert_eq!(backend.items(), snapshot.items());
    }

    #[test]
    fn test_ordered_playlist_issues_nothing() {
        let sink = RecordingDiagnostics::new();
        let mut snapshot = snapshot(&["A", "B", "C", "D"]);

        let report = Reconciler::new(&sink).plan(&entries(&["A", "B", "C", "D"], &[]), &mut snapshot);

        assert!(report.operations.is_empty());
        assert_eq!(report.in_place, 4);
        assert!(sink.is_empty());
    }

    #[test]
    fn test_forward_move_leaves_hole() {
        // B and C found before A under Reserve: A must move forward past them
        let sink = RecordingDiagnostics::new();
        let mut snapshot = snapshot(&["A", "B", "C"]);
        let entries = entries(&["X", "B", "A", "C"], &["X"]);

        let report = Reconciler::new(&sink)
            .with_absent_policy(AbsentSlotPolicy::Reserve)
            .plan(&entries, &mut snapshot);

        // cursor 0 reserved by X, B at 1 in place, A at 0 moves forward to 2
        assert_eq!(report.skipped_absent, 1);
        assert_eq!(report.operations.len(), 1);
        assert_eq!(report.operations[0].item, id("A"));
        assert_eq!(report.operations[0].after, Some(id("B")));
        assert_eq!((report.operations[0].from_index, report.operations[0].to_index), (0, 2));
        // The hole left by A keeps C at slot 3, exactly where the cursor lands
        assert_eq!(report.in_place, 2);
        assert_eq!(names(&snapshot), vec!["B", "A", "C"]);
    }

    #[test]
    fn test_collapse_ignores_absent_leaves() {
        let sink = RecordingDiagnostics::new();
        let mut snapshot = snapshot(&["A", "B", "C"]);
        let entries = entries(&["X", "B", "A", "C"], &["X"]);

        let report = Reconciler::new(&sink).plan(&entries, &mut snapshot);

        assert_eq!(report.skipped_absent, 1);
        assert_eq!(report.operations.len(), 1);
        assert_eq!(report.operations[0].item, id("B"));
        assert!(report.operations[0].is_to_front());
        assert_eq!(names(&snapshot), vec!["B", "A", "C"]);
    }

    #[test]
    fn test_unmatched_local_items_stay_put() {
        let sink = RecordingDiagnostics::new();
        // u1..u3 have no remote entry
        let mut snapshot = snapshot(&["u1", "C", "u2", "B", "A", "u3"]);

        let report = Reconciler::new(&sink).plan(&entries(&["A", "B", "C"], &[]), &mut snapshot);

        let order = names(&snapshot);
        let matched: Vec<&str> = order.iter().map(String::as_str).filter(|n| !n.starts_with('u')).collect();
        let unmatched: Vec<&str> = order.iter().map(String::as_str).filter(|n| n.starts_with('u')).collect();
        assert_eq!(matched, vec!["A", "B", "C"]);
        assert_eq!(unmatched, vec!["u1", "u2", "u3"]);
        assert_eq!(report.moved(), 2);
    }

    #[test]
    fn test_shared_local_leaf_moves_once() {
        let sink = RecordingDiagnostics::new();
        let mut snapshot = snapshot(&["A", "S"]);
        let season = Side::group([
            (1u32, Side::leaf(RemoteItem::new(MediaKind::Episode, "e1"))),
            (2u32, Side::leaf(RemoteItem::new(MediaKind::Episode, "e2"))),
        ]);
        let entries = vec![
            MatchEntry::grouped(CorrelationKey::new(["tvdb", "1"]), 0, Some((1, Side::leaf(local("S")))), season),
            MatchEntry::leaf(CorrelationKey::new(["imdb", "A"]), 1, Some((0, local("A"))), remote("A")),
        ];

        let report = Reconciler::new(&sink).plan(&entries, &mut snapshot);

        assert_eq!(report.pairs_visited, 3);
        assert_eq!(report.moved(), 1);
        assert_eq!(report.skipped_already_placed, 1);
        assert_eq!(names(&snapshot), vec!["S", "A"]);
        assert_eq!(sink.count(|d| matches!(d, Diagnostic::AlreadyPlaced { .. })), 1);
    }

    #[test]
    fn test_missing_local_advances_cursor() {
        let sink = RecordingDiagnostics::new();
        // Matcher claims Z is local, but the playlist no longer holds it
        let mut snapshot = snapshot(&["B", "A"]);

        let report = Reconciler::new(&sink).plan(&entries(&["A", "Z", "B"], &[]), &mut snapshot);

        assert_eq!(report.skipped_missing, 1);
        assert_eq!(
            sink.events(),
            vec![Diagnostic::MissingLocal {
                playlist_item_id: "pl-Z".to_string(),
                media_id: "rk-Z".to_string(),
                target_cursor: 1,
            }]
        );
        // B lands behind the slot Z would have taken
        assert_eq!(report.moved(), 2);
        assert_eq!(report.operations[1].after, Some(id("A")));
        assert_eq!(report.operations[1].to_index, 2);
        assert_eq!(names(&snapshot), vec!["A", "B"]);
    }

    #[test]
    fn test_relocate_failure_aborts_pass() {
        let sink = RecordingDiagnostics::new();
        let mut snapshot = snapshot(&["C", "B", "A"]);
        let backend = RecordingPlaylist::new(snapshot.items(), Some("pl-B"));

        let result = Reconciler::new(&sink).reconcile(&entries(&["A", "B", "C"], &[]), &mut snapshot, &backend);

        assert!(matches!(result, Err(crate::SyncError::Bridge(BridgeError::OperationFailed(_)))));
        assert_eq!(backend.calls().len(), 2);
        // Only the first move was applied, and the mirror agrees
        assert_eq!(names(&snapshot), vec!["A", "C", "B"]);
        assert_eq!(backend.inner.items(), snapshot.items());
    }

    #[test]
    fn test_operations_are_issued_in_order() {
        let sink = RecordingDiagnostics::new();
        let mut snapshot = snapshot(&["D", "C", "B", "A"]);
        let backend = RecordingPlaylist::new(snapshot.items(), None);

        let report = Reconciler::new(&sink)
            .reconcile(&entries(&["A", "B", "C", "D"], &[]), &mut snapshot, &backend)
            .unwrap();

        assert_eq!(
            backend.calls(),
            vec![
                ("pl-A".to_string(), None),
                ("pl-B".to_string(), Some("pl-A".to_string())),
                ("pl-C".to_string(), Some("pl-B".to_string())),
            ]
        );
        assert_eq!(report.moved(), 3);
        assert_eq!(report.in_place, 1);
        assert_eq!(backend.inner.items(), snapshot.items());
    }

    #[test]
    fn test_relocate_op_display() {
        let op = RelocateOp {
            item: id("A"),
            after: Some(id("B")),
            from_index: 0,
            to_index: 2,
        };
        assert_eq!(op.to_string(), "move pl-A after pl-B (0 -> 2)");
    }
}
