//! # Local Order Snapshot
//!
//! In-memory view of the backing store for one pass. It exists in two forms:
//!
//! - [`LocalSnapshot`]: the physical order, every local item including the
//!   ones no remote entry refers to. Kept in step with the backing store by
//!   replaying each issued [`RelocateOp`].
//! - [`SlotOrder`]: the working order of the sort phase. It holds only the
//!   tracked items, and its slots may be [`Slot::Hole`] after a forward move
//!   so that positions behind the cursor keep their meaning.

use crate::error::{Result, SyncError};
use crate::reconciler::RelocateOp;
use bridge_traits::{LocalItem, PlaylistBackend, PlaylistItemId};
use std::collections::HashSet;
use tracing::debug;

/// State of one working-order slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Slot {
    Occupied(LocalItem),
    /// Vacated by a forward move, not compacted yet
    Hole,
}

impl Slot {
    pub fn item(&self) -> Option<&LocalItem> {
        match self {
            Slot::Occupied(item) => Some(item),
            Slot::Hole => None,
        }
    }

    pub fn is_hole(&self) -> bool {
        matches!(self, Slot::Hole)
    }
}

/// Physical order of the local playlist, read once per pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalSnapshot {
    mirror: Vec<LocalItem>,
}

impl LocalSnapshot {
    /// Build a snapshot from an ordered item list.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::DuplicateItem`] if two items share a playlist
    /// item handle.
    pub fn new(items: Vec<LocalItem>) -> Result<Self> {
        let mut seen = HashSet::with_capacity(items.len());
        for item in &items {
            if !seen.insert(&item.playlist_item_id) {
                return Err(SyncError::DuplicateItem(item.playlist_item_id.to_string()));
            }
        }
        Ok(Self { mirror: items })
    }

    /// Read the current order from the backing store.
    pub fn capture(backend: &dyn PlaylistBackend) -> Result<Self> {
        let items = backend.current_order()?;
        debug!("Captured local order with {} items", items.len());
        Self::new(items)
    }

    /// Items in physical order.
    pub fn items(&self) -> &[LocalItem] {
        &self.mirror
    }

    pub fn len(&self) -> usize {
        self.mirror.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mirror.is_empty()
    }

    pub fn position(&self, id: &PlaylistItemId) -> Option<usize> {
        self.mirror
            .iter()
            .position(|item| &item.playlist_item_id == id)
    }

    pub fn contains(&self, id: &PlaylistItemId) -> bool {
        self.position(id).is_some()
    }

    /// Replay one relocate against the mirror, with the same semantics as
    /// [`PlaylistBackend::relocate`].
    pub(crate) fn apply(&mut self, op: &RelocateOp) {
        let Some(from) = self.position(&op.item) else {
            return;
        };
        let to = match &op.after {
            None => 0,
            Some(after) if after == &op.item => return,
            Some(after) => match self.position(after) {
                Some(index) if index > from => index,
                Some(index) => index + 1,
                None => return,
            },
        };

        let item = self.mirror.remove(from);
        self.mirror.insert(to, item);
    }

    /// Working order over the items in `tracked`, in physical order.
    pub(crate) fn tracked_slots(&self, tracked: &HashSet<&PlaylistItemId>) -> SlotOrder {
        SlotOrder {
            slots: self
                .mirror
                .iter()
                .filter(|item| tracked.contains(&item.playlist_item_id))
                .cloned()
                .map(Slot::Occupied)
                .collect(),
        }
    }
}

/// Hole-aware working order used by the sort phase.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SlotOrder {
    slots: Vec<Slot>,
}

impl SlotOrder {
    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn occupied_count(&self) -> usize {
        self.slots.iter().filter(|slot| !slot.is_hole()).count()
    }

    /// Slot index currently holding `id`.
    pub fn position(&self, id: &PlaylistItemId) -> Option<usize> {
        self.slots
            .iter()
            .position(|slot| slot.item().is_some_and(|item| &item.playlist_item_id == id))
    }

    /// Nearest occupied slot before `cursor`, skipping holes and `exclude`.
    pub fn reference_before(&self, cursor: usize, exclude: &PlaylistItemId) -> Option<&LocalItem> {
        self.slots[..cursor.min(self.slots.len())]
            .iter()
            .rev()
            .filter_map(Slot::item)
            .find(|item| &item.playlist_item_id != exclude)
    }

    /// Replace the slot at `index` with a hole.
    pub fn vacate(&mut self, index: usize) -> Option<LocalItem> {
        let slot = self.slots.get_mut(index)?;
        match std::mem::replace(slot, Slot::Hole) {
            Slot::Occupied(item) => Some(item),
            Slot::Hole => None,
        }
    }

    /// Remove the slot at `index`, shifting later slots left.
    pub fn remove(&mut self, index: usize) -> Option<Slot> {
        (index < self.slots.len()).then(|| self.slots.remove(index))
    }

    /// Put `item` at `index`: a hole there is overwritten, an occupied slot
    /// is shifted right, and an index past the end is padded with holes.
    pub fn place(&mut self, index: usize, item: LocalItem) {
        if index >= self.slots.len() {
            self.slots.resize(index, Slot::Hole);
            self.slots.push(Slot::Occupied(item));
        } else if self.slots[index].is_hole() {
            self.slots[index] = Slot::Occupied(item);
        } else {
            self.slots.insert(index, Slot::Occupied(item));
        }
    }

    /// Occupied items in slot order.
    pub fn items(&self) -> Vec<&LocalItem> {
        self.slots.iter().filter_map(Slot::item).collect()
    }
}
