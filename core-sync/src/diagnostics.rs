//! # Reconciliation Diagnostics
//!
//! Per-pair problems never abort a pass. They are reported as structured
//! [`Diagnostic`] events on a [`DiagnosticSink`] handed to each component, so
//! the orchestration layer can count, log, or surface them.
//!
//! ## Sinks
//!
//! - [`TracingDiagnostics`]: emits each event through `tracing` at the
//!   event's severity (default)
//! - [`RecordingDiagnostics`]: keeps every event in memory and also emits it
//!   through `tracing`

use crate::side::SideShape;
use bridge_traits::platform::PlatformSendSync;
use bridge_traits::LogLevel;
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use tracing::{debug, info, warn};

/// Structured diagnostic raised while expanding or reconciling a pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum Diagnostic {
    /// The expander received a side combination it cannot flatten.
    UnsupportedShape { local: SideShape, remote: SideShape },

    /// A matched local leaf is not in the current order snapshot.
    MissingLocal {
        playlist_item_id: String,
        media_id: String,
        target_cursor: usize,
    },

    /// A local leaf was already placed earlier in the same pass.
    AlreadyPlaced {
        playlist_item_id: String,
        target_cursor: usize,
    },

    /// The identity resolver could not identify a remote leaf.
    Unresolved {
        key: String,
        remote: String,
        local: Option<String>,
    },

    /// The match source returned nothing for a list.
    EmptyRemoteList { list_id: String },
}

impl Diagnostic {
    /// Returns a human-readable description of the event.
    pub fn description(&self) -> &str {
        match self {
            Diagnostic::UnsupportedShape { .. } => "Unsupported side shapes, pair dropped",
            Diagnostic::MissingLocal { .. } => "Local item missing from snapshot",
            Diagnostic::AlreadyPlaced { .. } => "Local item already placed in this pass",
            Diagnostic::Unresolved { .. } => "Unable to identify remote item",
            Diagnostic::EmptyRemoteList { .. } => "Unable to retrieve remote list items",
        }
    }

    pub fn severity(&self) -> LogLevel {
        match self {
            Diagnostic::UnsupportedShape { .. }
            | Diagnostic::Unresolved { .. }
            | Diagnostic::EmptyRemoteList { .. } => LogLevel::Warn,
            Diagnostic::MissingLocal { .. } => LogLevel::Info,
            Diagnostic::AlreadyPlaced { .. } => LogLevel::Debug,
        }
    }
}

/// Receiver of diagnostics for one or more passes.
pub trait DiagnosticSink: PlatformSendSync {
    fn report(&self, diagnostic: Diagnostic);
}

/// Emits diagnostics as `tracing` events.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingDiagnostics;

impl DiagnosticSink for TracingDiagnostics {
    fn report(&self, diagnostic: Diagnostic) {
        let description = diagnostic.description();
        match diagnostic.severity() {
            LogLevel::Warn | LogLevel::Error => warn!(?diagnostic, "{}", description),
            LogLevel::Info => info!(?diagnostic, "{}", description),
            LogLevel::Debug | LogLevel::Trace => debug!(?diagnostic, "{}", description),
        }
    }
}

/// Collects diagnostics in memory.
#[derive(Debug, Default)]
pub struct RecordingDiagnostics {
    events: Mutex<Vec<Diagnostic>>,
}

impl RecordingDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every diagnostic reported so far.
    pub fn events(&self) -> Vec<Diagnostic> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    /// Number of reported diagnostics matching `predicate`.
    pub fn count(&self, predicate: impl Fn(&Diagnostic) -> bool) -> usize {
        self.events
            .lock()
            .map(|events| events.iter().filter(|d| predicate(d)).count())
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.count(|_| true) == 0
    }
}

impl DiagnosticSink for RecordingDiagnostics {
    fn report(&self, diagnostic: Diagnostic) {
        TracingDiagnostics.report(diagnostic.clone());
        if let Ok(mut events) = self.events.lock() {
            events.push(diagnostic);
        }
    }
}
