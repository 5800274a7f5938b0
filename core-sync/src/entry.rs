//! Match entries
//!
//! The external matcher pairs every remote list item with whatever the local
//! playlist holds for it and hands the result over as [`MatchEntry`] values,
//! in remote order. Both phases of a pass consume the same entries.

use crate::key::CorrelationKey;
use crate::side::Side;
use bridge_traits::LocalItem;
use core_runtime::logging::format_index;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of media a remote list item refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Movie,
    Show,
    Season,
    Episode,
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MediaKind::Movie => "movie",
            MediaKind::Show => "show",
            MediaKind::Season => "season",
            MediaKind::Episode => "episode",
        };
        f.write_str(name)
    }
}

/// A leaf of the remote list.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RemoteItem {
    pub kind: MediaKind,
    /// Identifier in the remote catalog
    pub id: String,
    pub title: Option<String>,
}

impl RemoteItem {
    pub fn new(kind: MediaKind, id: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
            title: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}

impl fmt::Display for RemoteItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.title {
            Some(title) => write!(f, "{}:{} ({})", self.kind, self.id, title),
            None => write!(f, "{}:{}", self.kind, self.id),
        }
    }
}

/// Local half of a match entry.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LocalSide {
    /// Position among all local items before expansion, `None` when nothing
    /// local corresponds to the entry yet
    pub index: Option<usize>,
    pub items: Option<Side<LocalItem>>,
}

/// Remote half of a match entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteSide {
    /// Position among all remote items before expansion
    pub index: usize,
    /// Always present for a well-formed entry
    pub items: Option<Side<RemoteItem>>,
}

/// One keyed result of the external matcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchEntry {
    pub key: CorrelationKey,
    pub index: usize,
    pub local: LocalSide,
    pub remote: RemoteSide,
}

impl MatchEntry {
    pub fn new(key: CorrelationKey, index: usize, local: LocalSide, remote: RemoteSide) -> Self {
        Self {
            key,
            index,
            local,
            remote,
        }
    }

    /// Entry whose remote side is a single leaf.
    ///
    /// `local` carries the local index and item when one was matched.
    pub fn leaf(
        key: CorrelationKey,
        index: usize,
        local: Option<(usize, LocalItem)>,
        remote: RemoteItem,
    ) -> Self {
        let local = match local {
            Some((local_index, item)) => LocalSide {
                index: Some(local_index),
                items: Some(Side::Leaf(item)),
            },
            None => LocalSide::default(),
        };

        Self::new(
            key,
            index,
            local,
            RemoteSide {
                index,
                items: Some(Side::Leaf(remote)),
            },
        )
    }

    /// Entry for groupings on one or both sides.
    pub fn grouped(
        key: CorrelationKey,
        index: usize,
        local: Option<(usize, Side<LocalItem>)>,
        remote: Side<RemoteItem>,
    ) -> Self {
        let local = match local {
            Some((local_index, items)) => LocalSide {
                index: Some(local_index),
                items: Some(items),
            },
            None => LocalSide::default(),
        };

        Self::new(
            key,
            index,
            local,
            RemoteSide {
                index,
                items: Some(remote),
            },
        )
    }
}

/// Tabular rendering of match entries for debug logs.
///
/// One line per entry: key, entry index, local side, local index, remote
/// index, remote side. Missing indices render as `---`.
pub struct MatchTable<'a>(pub &'a [MatchEntry]);

impl fmt::Display for MatchTable<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, entry) in self.0.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }

            let local = entry
                .local
                .items
                .as_ref()
                .map(|side| side.to_string())
                .unwrap_or_else(|| "---".to_string());
            let remote = entry
                .remote
                .items
                .as_ref()
                .map(|side| side.to_string())
                .unwrap_or_else(|| "---".to_string());

            write!(
                f,
                "    [{:<16}]({:>3}) - {:>40} <[{:>3}] - [{:>3}]> {}",
                entry.key.to_string(),
                entry.index,
                local,
                format_index(entry.local.index),
                entry.remote.index,
                remote
            )?;
        }
        Ok(())
    }
}
