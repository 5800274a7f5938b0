//! Local Playlist Bridge
//!
//! Contract between the reconciliation core and the host's mutable playlist
//! (the backing store). The host exposes two capabilities:
//!
//! - reading the current item order once per pass ([`PlaylistBackend::current_order`])
//! - moving one item to immediately follow another, or to the front
//!   ([`PlaylistBackend::relocate`])
//!
//! There is deliberately no "insert at index" or "rewrite whole list"
//! operation; the core expresses every reorder through `relocate`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Mutex;

use crate::error::{BridgeError, Result};
use crate::platform::PlatformSendSync;

/// Opaque handle of an entry inside the host playlist.
///
/// The handle is stable while the entry stays in the playlist; it only
/// changes when the entry is removed and added again.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlaylistItemId(String);

impl PlaylistItemId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlaylistItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PlaylistItemId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for PlaylistItemId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// A leaf of the local playlist.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LocalItem {
    /// Identity of the media the entry points at (e.g. a library rating key)
    pub media_id: String,
    /// Handle required by [`PlaylistBackend::relocate`]
    pub playlist_item_id: PlaylistItemId,
}

impl LocalItem {
    pub fn new(media_id: impl Into<String>, playlist_item_id: impl Into<PlaylistItemId>) -> Self {
        Self {
            media_id: media_id.into(),
            playlist_item_id: playlist_item_id.into(),
        }
    }
}

impl fmt::Display for LocalItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.media_id, self.playlist_item_id)
    }
}

/// Host playlist bridge
///
/// Implementations are called synchronously and inline. Failures are
/// collaborator faults: the core does not retry them and aborts the pass.
pub trait PlaylistBackend: PlatformSendSync {
    /// Return the playlist entries in their current order.
    fn current_order(&self) -> Result<Vec<LocalItem>>;

    /// Move `item` so that it immediately follows `after`, or to the front
    /// when `after` is `None`.
    fn relocate(&self, item: &PlaylistItemId, after: Option<&PlaylistItemId>) -> Result<()>;
}

/// In-memory playlist that physically applies moves.
///
/// Useful for dry runs and for hosts that stage changes before flushing them
/// to a remote media server.
#[derive(Debug, Default)]
pub struct InMemoryPlaylist {
    items: Mutex<Vec<LocalItem>>,
}

impl InMemoryPlaylist {
    pub fn new(items: Vec<LocalItem>) -> Self {
        Self {
            items: Mutex::new(items),
        }
    }

    /// Snapshot of the current order.
    pub fn items(&self) -> Vec<LocalItem> {
        self.lock().map(|items| items.clone()).unwrap_or_default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Vec<LocalItem>>> {
        self.items
            .lock()
            .map_err(|_| BridgeError::OperationFailed("playlist lock poisoned".to_string()))
    }
}

impl PlaylistBackend for InMemoryPlaylist {
    fn current_order(&self) -> Result<Vec<LocalItem>> {
        Ok(self.lock()?.clone())
    }

    fn relocate(&self, item: &PlaylistItemId, after: Option<&PlaylistItemId>) -> Result<()> {
        let mut items = self.lock()?;

        let from = items
            .iter()
            .position(|i| &i.playlist_item_id == item)
            .ok_or_else(|| BridgeError::ItemNotFound(item.to_string()))?;

        let to = match after {
            None => 0,
            Some(reference) if reference == item => return Ok(()),
            Some(reference) => {
                let index = items
                    .iter()
                    .position(|i| &i.playlist_item_id == reference)
                    .ok_or_else(|| BridgeError::ItemNotFound(reference.to_string()))?;
                // Position after `item` has been taken out of the list
                if index > from {
                    index
                } else {
                    index + 1
                }
            }
        };

        let moved = items.remove(from);
        items.insert(to, moved);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(playlist: &InMemoryPlaylist) -> Vec<String> {
        playlist
            .items()
            .into_iter()
            .map(|i| i.playlist_item_id.to_string())
            .collect()
    }

    fn playlist(handles: &[&str]) -> InMemoryPlaylist {
        InMemoryPlaylist::new(
            handles
                .iter()
                .map(|h| LocalItem::new(format!("media-{h}"), *h))
                .collect(),
        )
    }

    #[test]
    fn test_relocate_to_front() {
        let list = playlist(&["a", "b", "c"]);
        list.relocate(&"c".into(), None).unwrap();
        assert_eq!(ids(&list), vec!["c", "a", "b"]);
    }

    #[test]
    fn test_relocate_after_reference() {
        let list = playlist(&["a", "b", "c", "d"]);
        list.relocate(&"a".into(), Some(&"c".into())).unwrap();
        assert_eq!(ids(&list), vec!["b", "c", "a", "d"]);

        list.relocate(&"d".into(), Some(&"b".into())).unwrap();
        assert_eq!(ids(&list), vec!["b", "d", "c", "a"]);
    }

    #[test]
    fn test_relocate_unknown_item() {
        let list = playlist(&["a"]);
        let err = list.relocate(&"zz".into(), None).unwrap_err();
        assert!(matches!(err, BridgeError::ItemNotFound(id) if id == "zz"));

        let err = list.relocate(&"a".into(), Some(&"zz".into())).unwrap_err();
        assert!(matches!(err, BridgeError::ItemNotFound(_)));
        // Failed relocation must not drop the item
        assert_eq!(ids(&list), vec!["a"]);
    }

    #[test]
    fn test_local_item_display() {
        let item = LocalItem::new("rk-12", "pl-3");
        assert_eq!(item.to_string(), "rk-12#pl-3");
    }
}
