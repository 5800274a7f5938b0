//! # Sequence Reconciler: Update Phase
//!
//! Settles list membership before the sort phase runs. Every flattened pair
//! in scope gets a canonical identity from an [`IdentityResolver`]; resolved
//! pairs are handed to a [`PairHandler`], which adds or removes local items
//! as it sees fit.
//!
//! An unresolvable pair is reported and skipped without affecting the rest of
//! the pass. Handler failures are collaborator faults and abort the phase.

use crate::diagnostics::{Diagnostic, DiagnosticSink};
use crate::entry::{MatchEntry, MediaKind, RemoteItem};
use crate::error::Result;
use crate::expander::Expander;
use crate::key::CorrelationKey;
use bridge_traits::platform::PlatformSendSync;
use bridge_traits::LocalItem;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

/// Canonical identity of a remote leaf.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MediaIdentity {
    pub kind: MediaKind,
    pub key: CorrelationKey,
}

impl MediaIdentity {
    pub fn new(kind: MediaKind, key: CorrelationKey) -> Self {
        Self { kind, key }
    }
}

/// Resolves remote leaves to canonical identities.
pub trait IdentityResolver: PlatformSendSync {
    /// `None` when the leaf cannot be identified.
    fn resolve(&self, remote: &RemoteItem) -> Option<MediaIdentity>;
}

/// Whether a pair had a local counterpart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PairStatus {
    Matched,
    MissingLocal,
}

/// Everything a handler knows about one pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairContext {
    /// Key of the match entry the pair was expanded from
    pub key: CorrelationKey,
    pub status: PairStatus,
    pub local: Option<LocalItem>,
    pub remote: RemoteItem,
}

/// Applies membership changes for one resolved pair.
pub trait PairHandler: PlatformSendSync {
    /// # Errors
    ///
    /// Any error aborts the update phase and the pass.
    fn handle(&self, identity: MediaIdentity, context: PairContext) -> Result<()>;
}

/// Which pairs the update phase visits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateScope {
    /// Every flattened pair
    #[default]
    AllPairs,
    /// Only pairs whose local leaf is absent
    UnmatchedOnly,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateReport {
    pub pairs_visited: usize,
    pub handled: usize,
    pub unresolved: usize,
    pub skipped_by_scope: usize,
}

/// Update-phase driver.
pub struct UpdatePhase<'s> {
    sink: &'s dyn DiagnosticSink,
    scope: UpdateScope,
}

impl<'s> UpdatePhase<'s> {
    pub fn new(sink: &'s dyn DiagnosticSink) -> Self {
        Self {
            sink,
            scope: UpdateScope::default(),
        }
    }

    pub fn with_scope(mut self, scope: UpdateScope) -> Self {
        self.scope = scope;
        self
    }

    #[instrument(skip_all, fields(entries = entries.len(), scope = ?self.scope))]
    pub fn run(
        &self,
        entries: &[MatchEntry],
        resolver: &dyn IdentityResolver,
        handler: &dyn PairHandler,
    ) -> Result<UpdateReport> {
        let expander = Expander::new(self.sink);
        let mut report = UpdateReport::default();

        for entry in entries {
            for pair in expander.expand_entry(entry) {
                report.pairs_visited += 1;

                if self.scope == UpdateScope::UnmatchedOnly && pair.local.is_some() {
                    report.skipped_by_scope += 1;
                    continue;
                }

                let Some(identity) = resolver.resolve(pair.remote) else {
                    self.sink.report(Diagnostic::Unresolved {
                        key: entry.key.to_string(),
                        remote: pair.remote.to_string(),
                        local: pair.local.map(ToString::to_string),
                    });
                    report.unresolved += 1;
                    continue;
                };

                let status = match pair.local {
                    Some(_) => PairStatus::Matched,
                    None => PairStatus::MissingLocal,
                };
                debug!("Handling {} ({:?}) as {}", pair.remote, status, identity.key);

                handler.handle(
                    identity,
                    PairContext {
                        key: entry.key.clone(),
                        status,
                        local: pair.local.cloned(),
                        remote: pair.remote.clone(),
                    },
                )?;
                report.handled += 1;
            }
        }

        info!(
            "Update phase finished: {} handled, {} unresolved of {} pairs",
            report.handled, report.unresolved, report.pairs_visited
        );
        Ok(report)
    }
}
