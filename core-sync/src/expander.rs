//! # Hierarchical Expander
//!
//! Flattens one matched pair, whose sides may each be a leaf or a grouping,
//! into aligned `(local leaf or absent, remote leaf)` pairs.
//!
//! ## Branches
//!
//! | local        | remote  | enumeration |
//! |--------------|---------|-------------|
//! | leaf/absent  | leaf    | the pair itself |
//! | group        | group   | every remote sub-key, local looked up by the same key |
//! | group        | leaf    | every local sub-value against the shared remote leaf |
//! | leaf/absent  | group   | the shared local value against every remote sub-value |
//!
//! Local sub-keys missing from a remote grouping are never visited. The only
//! shape the type system cannot rule out is a missing remote side; it is
//! reported as [`Diagnostic::UnsupportedShape`] and produces no pairs.
//!
//! The returned [`Expansion`] is lazy: it walks an explicit frame stack and
//! allocates nothing per leaf.

use crate::diagnostics::{Diagnostic, DiagnosticSink};
use crate::entry::{MatchEntry, RemoteItem};
use crate::key::SubKey;
use crate::side::Side;
use bridge_traits::LocalItem;
use indexmap::map::{Iter, Values};
use indexmap::IndexMap;
use std::iter::FusedIterator;

/// One flattened leaf pair.
#[derive(Debug, PartialEq, Eq)]
pub struct LeafPair<'a, L, R> {
    pub local: Option<&'a L>,
    pub remote: &'a R,
}

impl<L, R> Clone for LeafPair<'_, L, R> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<L, R> Copy for LeafPair<'_, L, R> {}

/// Flattens match entries, reporting unsupported shapes to its sink.
#[derive(Clone, Copy)]
pub struct Expander<'s> {
    sink: &'s dyn DiagnosticSink,
}

impl<'s> Expander<'s> {
    pub fn new(sink: &'s dyn DiagnosticSink) -> Self {
        Self { sink }
    }

    /// Expand a local/remote side pair into leaf pairs.
    pub fn expand<'a, L, R>(
        &self,
        local: Option<&'a Side<L>>,
        remote: Option<&'a Side<R>>,
    ) -> Expansion<'a, L, R>
    where
        's: 'a,
    {
        Expansion {
            sink: self.sink,
            stack: Vec::new(),
            start: Some((local, remote)),
        }
    }

    /// Expand both sides of a match entry.
    pub fn expand_entry<'a>(&self, entry: &'a MatchEntry) -> Expansion<'a, LocalItem, RemoteItem>
    where
        's: 'a,
    {
        self.expand(entry.local.items.as_ref(), entry.remote.items.as_ref())
    }
}

enum Frame<'a, L, R> {
    /// Both sides grouped: remote keys drive, local looked up by key
    ByRemoteKey {
        local: &'a IndexMap<SubKey, Side<L>>,
        remote: Iter<'a, SubKey, Side<R>>,
    },
    /// Local grouped against one remote leaf
    ByLocal {
        local: Values<'a, SubKey, Side<L>>,
        remote: &'a Side<R>,
    },
    /// Remote grouped against one local leaf (or nothing)
    ByRemote {
        local: Option<&'a Side<L>>,
        remote: Values<'a, SubKey, Side<R>>,
    },
}

/// Lazy, single-use sequence of leaf pairs produced by [`Expander::expand`].
pub struct Expansion<'a, L, R> {
    sink: &'a dyn DiagnosticSink,
    stack: Vec<Frame<'a, L, R>>,
    start: Option<(Option<&'a Side<L>>, Option<&'a Side<R>>)>,
}

impl<'a, L, R> Expansion<'a, L, R> {
    /// Classify one pair: yield it when both sides are leaves, otherwise
    /// push the frame that enumerates its children.
    fn descend(
        &mut self,
        local: Option<&'a Side<L>>,
        remote: Option<&'a Side<R>>,
    ) -> Option<LeafPair<'a, L, R>> {
        let Some(remote) = remote else {
            self.sink.report(Diagnostic::UnsupportedShape {
                local: Side::shape_of(local),
                remote: Side::<R>::shape_of(None),
            });
            return None;
        };

        match (local, remote) {
            (None, Side::Leaf(remote)) => Some(LeafPair {
                local: None,
                remote,
            }),
            (Some(Side::Leaf(local)), Side::Leaf(remote)) => Some(LeafPair {
                local: Some(local),
                remote,
            }),
            (Some(Side::Group(local)), Side::Group(children)) => {
                self.stack.push(Frame::ByRemoteKey {
                    local,
                    remote: children.iter(),
                });
                None
            }
            (Some(Side::Group(local)), Side::Leaf(_)) => {
                self.stack.push(Frame::ByLocal {
                    local: local.values(),
                    remote,
                });
                None
            }
            (None | Some(Side::Leaf(_)), Side::Group(children)) => {
                self.stack.push(Frame::ByRemote {
                    local,
                    remote: children.values(),
                });
                None
            }
        }
    }
}

impl<'a, L, R> Iterator for Expansion<'a, L, R> {
    type Item = LeafPair<'a, L, R>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some((local, remote)) = self.start.take() {
            if let Some(pair) = self.descend(local, remote) {
                return Some(pair);
            }
        }

        loop {
            let (local, remote) = match self.stack.last_mut()? {
                Frame::ByRemoteKey { local, remote } => {
                    let local: &'a IndexMap<SubKey, Side<L>> = *local;
                    match remote.next() {
                        Some((key, child)) => (local.get(key), Some(child)),
                        None => {
                            self.stack.pop();
                            continue;
                        }
                    }
                }
                Frame::ByLocal { local, remote } => {
                    let remote: &'a Side<R> = *remote;
                    match local.next() {
                        Some(child) => (Some(child), Some(remote)),
                        None => {
                            self.stack.pop();
                            continue;
                        }
                    }
                }
                Frame::ByRemote { local, remote } => {
                    let local: Option<&'a Side<L>> = *local;
                    match remote.next() {
                        Some(child) => (local, Some(child)),
                        None => {
                            self.stack.pop();
                            continue;
                        }
                    }
                }
            };

            if let Some(pair) = self.descend(local, remote) {
                return Some(pair);
            }
        }
    }
}

impl<L, R> FusedIterator for Expansion<'_, L, R> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::RecordingDiagnostics;
    use crate::side::SideShape;

    type Pairs = Vec<(Option<&'static str>, &'static str)>;

    fn flatten(
        sink: &RecordingDiagnostics,
        local: Option<&Side<&'static str>>,
        remote: Option<&Side<&'static str>>,
    ) -> Pairs {
        Expander::new(sink)
            .expand(local, remote)
            .map(|pair| (pair.local.copied(), *pair.remote))
            .collect()
    }

    fn season(episodes: &[(u32, &'static str)]) -> Side<&'static str> {
        Side::group(episodes.iter().map(|(n, e)| (*n, Side::leaf(*e))))
    }

    #[test]
    fn test_leaf_against_leaf() {
        let sink = RecordingDiagnostics::new();
        let local = Side::leaf("L");
        let remote = Side::leaf("R");

        assert_eq!(flatten(&sink, Some(&local), Some(&remote)), vec![(Some("L"), "R")]);
        assert_eq!(flatten(&sink, None, Some(&remote)), vec![(None, "R")]);
        assert!(sink.is_empty());
    }

    #[test]
    fn test_groups_join_on_remote_keys() {
        let sink = RecordingDiagnostics::new();
        let local = Side::group([
            (1u32, season(&[(1, "l-s1e1"), (3, "l-s1e3")])),
            (9u32, season(&[(1, "l-s9e1")])),
        ]);
        let remote = Side::group([
            (1u32, season(&[(1, "r-s1e1"), (2, "r-s1e2"), (3, "r-s1e3")])),
            (2u32, season(&[(1, "r-s2e1")])),
        ]);

        let pairs = flatten(&sink, Some(&local), Some(&remote));

        // Local season 9 is not visited; missing local children are absent
        assert_eq!(
            pairs,
            vec![
                (Some("l-s1e1"), "r-s1e1"),
                (None, "r-s1e2"),
                (Some("l-s1e3"), "r-s1e3"),
                (None, "r-s2e1"),
            ]
        );
    }

    #[test]
    fn test_local_group_against_remote_leaf() {
        let sink = RecordingDiagnostics::new();
        let local = season(&[(2, "e2"), (1, "e1")]);
        let remote = Side::leaf("season-1");

        assert_eq!(
            flatten(&sink, Some(&local), Some(&remote)),
            vec![(Some("e2"), "season-1"), (Some("e1"), "season-1")]
        );
    }

    #[test]
    fn test_remote_group_shares_local_leaf() {
        let sink = RecordingDiagnostics::new();
        let local = Side::leaf("L");
        let remote = Side::group([(1u32, season(&[(1, "e1"), (2, "e2")]))]);

        assert_eq!(
            flatten(&sink, Some(&local), Some(&remote)),
            vec![(Some("L"), "e1"), (Some("L"), "e2")]
        );
    }

    #[test]
    fn test_remote_group_without_local() {
        let sink = RecordingDiagnostics::new();
        let remote = Side::group([(1u32, season(&[(1, "e1")])), (2u32, season(&[(1, "e2")]))]);

        assert_eq!(
            flatten(&sink, None, Some(&remote)),
            vec![(None, "e1"), (None, "e2")]
        );
    }

    #[test]
    fn test_missing_remote_is_unsupported() {
        let sink = RecordingDiagnostics::new();
        let local = season(&[(1, "e1")]);

        assert!(flatten(&sink, Some(&local), None).is_empty());
        assert_eq!(
            sink.events(),
            vec![Diagnostic::UnsupportedShape {
                local: SideShape::Group,
                remote: SideShape::Absent,
            }]
        );
    }

    #[test]
    fn test_remote_leaf_count_is_conserved() {
        let sink = RecordingDiagnostics::new();
        let remote = Side::group([
            (1u32, season(&[(1, "a"), (2, "b"), (3, "c")])),
            (2u32, Side::group([(1u32, season(&[(1, "d")])), (2u32, Side::leaf("e"))])),
            (3u32, Side::group(Vec::<(u32, Side<&str>)>::new())),
        ]);
        let locals = [
            None,
            Some(Side::leaf("L")),
            Some(season(&[(1, "x"), (7, "y")])),
        ];

        for local in &locals {
            let pairs = flatten(&sink, local.as_ref(), Some(&remote));
            assert_eq!(pairs.len(), remote.leaf_count());
            let remotes: Vec<&str> = pairs.iter().map(|(_, r)| *r).collect();
            assert_eq!(remotes, vec!["a", "b", "c", "d", "e"]);
        }
    }

    #[test]
    fn test_expansion_is_deterministic() {
        let sink = RecordingDiagnostics::new();
        let local = Side::group([(2u32, season(&[(1, "l2")])), (1u32, season(&[(1, "l1")]))]);
        let remote = Side::group([(2u32, season(&[(1, "r2")])), (1u32, season(&[(1, "r1")]))]);

        let first = flatten(&sink, Some(&local), Some(&remote));
        let second = flatten(&sink, Some(&local), Some(&remote));

        assert_eq!(first, second);
        assert_eq!(first, vec![(Some("l2"), "r2"), (Some("l1"), "r1")]);
    }

    #[test]
    fn test_expansion_is_lazy() {
        let sink = RecordingDiagnostics::new();
        let remote = season(&[(1, "e1"), (2, "e2"), (3, "e3")]);

        let mut expansion = Expander::new(&sink).expand::<&str, &str>(None, Some(&remote));
        assert_eq!(expansion.next().map(|p| *p.remote), Some("e1"));
        assert_eq!(expansion.stack.len(), 1);

        let rest: Vec<&str> = expansion.by_ref().map(|p| *p.remote).collect();
        assert_eq!(rest, vec!["e2", "e3"]);
        assert!(expansion.next().is_none());
    }

    #[test]
    fn test_expand_entry() {
        use crate::entry::{MatchEntry, MediaKind};
        use crate::key::CorrelationKey;

        let sink = RecordingDiagnostics::new();
        let local = Side::leaf(LocalItem::new("rk-1", "pl-1"));
        let remote = Side::group([
            (1u32, Side::leaf(RemoteItem::new(MediaKind::Episode, "e1"))),
            (2u32, Side::leaf(RemoteItem::new(MediaKind::Episode, "e2"))),
        ]);
        let entry = MatchEntry::grouped(CorrelationKey::new(["tvdb", "1"]), 0, Some((0, local)), remote);

        let pairs: Vec<_> = Expander::new(&sink).expand_entry(&entry).collect();
        assert_eq!(pairs.len(), 2);
        assert!(pairs.iter().all(|p| p.local.map(|l| l.media_id.as_str()) == Some("rk-1")));
        assert_eq!(pairs[1].remote.id, "e2");
    }
}
