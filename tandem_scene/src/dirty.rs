// Copyright 2026 the Tandem Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Dirty-tracking channels and the change log shared by scene collections.
//!
//! Scene collections are written by a synchronizer and read by a render
//! loop on its own schedule. Each mutation marks the touched slot on one
//! [`understory_dirty`] channel; the render loop calls `take_changes` once
//! per frame and gets every slot that changed since the previous call.
//!
//! All channels are local-only: scene slots have no parent/child edges, so
//! only the explicitly marked slot appears in the drain output.

use std::mem;

use understory_dirty::{Channel, CycleHandling, DirtyTracker};

/// Visibility flag changed.
pub const SHOW: Channel = Channel::new(0);

/// Alpha changed.
pub const ALPHA: Channel = Channel::new(1);

/// Content changed (refreshed imagery, added or removed primitives).
pub const CONTENT: Channel = Channel::new(2);

/// Position in the collection changed.
pub const ORDER: Channel = Channel::new(3);

/// The set of changes drained from one scene collection.
///
/// Fields contain raw slot indices, which stay valid until the slot is
/// destroyed. Slots destroyed since the last drain appear only in
/// [`destroyed`](Self::destroyed).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SceneChanges {
    /// Slots whose visibility changed.
    pub shown: Vec<u32>,
    /// Slots whose alpha changed.
    pub alpha: Vec<u32>,
    /// Slots whose content changed.
    pub content: Vec<u32>,
    /// Slots that moved within the collection.
    pub reordered: Vec<u32>,
    /// Slots inserted into the collection.
    pub added: Vec<u32>,
    /// Slots removed from the collection.
    pub removed: Vec<u32>,
    /// Slots released for reuse.
    pub destroyed: Vec<u32>,
}

impl SceneChanges {
    /// Returns `true` if nothing changed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.shown.is_empty()
            && self.alpha.is_empty()
            && self.content.is_empty()
            && self.reordered.is_empty()
            && self.added.is_empty()
            && self.removed.is_empty()
            && self.destroyed.is_empty()
    }
}

/// Per-collection dirty state.
pub(crate) struct ChangeLog {
    dirty: DirtyTracker<u32>,
    pending_added: Vec<u32>,
    pending_removed: Vec<u32>,
    pending_destroyed: Vec<u32>,
}

impl std::fmt::Debug for ChangeLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeLog")
            .field("pending_added", &self.pending_added)
            .field("pending_removed", &self.pending_removed)
            .field("pending_destroyed", &self.pending_destroyed)
            .finish_non_exhaustive()
    }
}

impl Default for ChangeLog {
    fn default() -> Self {
        Self {
            dirty: DirtyTracker::with_cycle_handling(CycleHandling::Error),
            pending_added: Vec::new(),
            pending_removed: Vec::new(),
            pending_destroyed: Vec::new(),
        }
    }
}

impl ChangeLog {
    pub(crate) fn mark(&mut self, idx: u32, channel: Channel) {
        self.dirty.mark(idx, channel);
    }

    pub(crate) fn added(&mut self, idx: u32) {
        self.pending_added.push(idx);
    }

    pub(crate) fn removed(&mut self, idx: u32) {
        self.pending_removed.push(idx);
    }

    /// Forgets every pending mark of a released slot.
    pub(crate) fn destroyed(&mut self, idx: u32) {
        self.dirty.remove_key(idx);
        self.pending_added.retain(|&i| i != idx);
        self.pending_removed.retain(|&i| i != idx);
        self.pending_destroyed.push(idx);
    }

    pub(crate) fn take(&mut self) -> SceneChanges {
        let mut changes = SceneChanges {
            shown: self.drain(SHOW),
            alpha: self.drain(ALPHA),
            content: self.drain(CONTENT),
            reordered: self.drain(ORDER),
            ..SceneChanges::default()
        };
        mem::swap(&mut self.pending_added, &mut changes.added);
        mem::swap(&mut self.pending_removed, &mut changes.removed);
        mem::swap(&mut self.pending_destroyed, &mut changes.destroyed);
        changes
    }

    fn drain(&mut self, channel: Channel) -> Vec<u32> {
        self.dirty.drain(channel).deterministic().run().collect()
    }
}
