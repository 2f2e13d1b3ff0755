// Copyright 2026 the Tandem Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Ordered imagery layer collection.

use std::{fmt, mem};

use hashbrown::{HashMap, HashSet};
use kurbo::Rect;
use tandem_core::map::Projection;

use crate::dirty::{self, ChangeLog, SceneChanges};

/// A handle to an imagery layer in an [`ImageryLayerCollection`].
///
/// Generational, so a handle to a destroyed layer never aliases its
/// successor in the same slot.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ImageryLayerId {
    idx: u32,
    generation: u32,
}

impl ImageryLayerId {
    /// Returns the raw slot index, as found in [`SceneChanges`].
    #[inline]
    #[must_use]
    pub const fn index(self) -> u32 {
        self.idx
    }
}

impl fmt::Debug for ImageryLayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ImageryLayerId({}@gen{})", self.idx, self.generation)
    }
}

/// Where an imagery layer gets its pixels from.
#[derive(Clone, Debug, PartialEq)]
pub struct ImageryProvider {
    /// URL template.
    pub url: String,
    /// Projection the imagery is served in.
    pub projection: Projection,
    /// Area covered, in degrees; `None` means the whole globe.
    pub rectangle: Option<Rect>,
}

/// One imagery layer.
#[derive(Clone, Debug, PartialEq)]
pub struct ImageryLayer {
    /// Pixel source.
    pub provider: ImageryProvider,
    /// Whether the layer is drawn.
    pub show: bool,
    /// Alpha in `0..=1`.
    pub alpha: f64,
    /// Bumped on every [`ImageryLayerCollection::refresh`].
    pub revision: u32,
}

/// Imagery layers, ordered bottom to top.
///
/// Layers are created detached, then added to the draw order. Removing a
/// layer from the order does not release it unless asked to; a released
/// layer's handle becomes stale. The collection may also hold layers added
/// by the host that no synchronizer knows about.
#[derive(Debug, Default)]
pub struct ImageryLayerCollection {
    slots: Vec<Option<ImageryLayer>>,
    generation: Vec<u32>,
    free_list: Vec<u32>,
    order: Vec<ImageryLayerId>,
    changes: ChangeLog,
}

impl ImageryLayerCollection {
    /// Creates an empty collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates a detached layer showing `provider`.
    pub fn create(&mut self, provider: ImageryProvider) -> ImageryLayerId {
        let layer = ImageryLayer {
            provider,
            show: true,
            alpha: 1.0,
            revision: 0,
        };
        let idx = if let Some(idx) = self.free_list.pop() {
            self.slots[idx as usize] = Some(layer);
            idx
        } else {
            let idx = u32::try_from(self.slots.len()).expect("imagery layer count fits in u32");
            self.slots.push(Some(layer));
            self.generation.push(0);
            idx
        };
        ImageryLayerId {
            idx,
            generation: self.generation[idx as usize],
        }
    }

    /// Adds a detached layer on top.
    pub fn add(&mut self, id: ImageryLayerId) {
        let top = self.order.len();
        self.add_at(id, top);
    }

    /// Adds a detached layer at `index` (0 is the bottom).
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale, the layer is already in the order, or
    /// `index` is out of bounds.
    pub fn add_at(&mut self, id: ImageryLayerId, index: usize) {
        self.validate(id);
        assert!(!self.contains(id), "{id:?} is already in the collection");
        self.order.insert(index, id);
        self.changes.added(id.idx);
    }

    /// Removes a layer from the order, releasing it if `destroy` is set.
    ///
    /// Returns `false` if the layer was not in the order (a stale handle
    /// also counts as absent).
    pub fn remove(&mut self, id: ImageryLayerId, destroy: bool) -> bool {
        let Some(index) = self.index_of(id) else {
            return false;
        };
        self.order.remove(index);
        self.changes.removed(id.idx);
        if destroy {
            self.destroy(id);
        }
        true
    }

    /// Releases a layer. It is removed from the order first if needed.
    pub fn destroy(&mut self, id: ImageryLayerId) {
        self.validate(id);
        if let Some(index) = self.index_of(id) {
            self.order.remove(index);
        }
        let idx = id.idx as usize;
        self.slots[idx] = None;
        self.generation[idx] += 1;
        self.free_list.push(id.idx);
        self.changes.destroyed(id.idx);
    }

    /// Moves a layer to the top of the draw order.
    ///
    /// Does nothing if the layer is already on top or not in the order.
    pub fn raise_to_top(&mut self, id: ImageryLayerId) {
        let Some(index) = self.index_of(id) else {
            return;
        };
        if index + 1 == self.order.len() {
            return;
        }
        self.order.remove(index);
        self.order.push(id);
        self.changes.mark(id.idx, dirty::ORDER);
    }

    /// Moves `ids` to the top of the draw order, in the given order.
    ///
    /// Equivalent to calling [`raise_to_top`](Self::raise_to_top) for each
    /// id in turn, in one pass over the order: ids not in the order are
    /// skipped and a repeated id ends up at its last position. Only raised
    /// layers whose position changed are marked.
    pub fn raise_all_to_top(&mut self, ids: &[ImageryLayerId]) {
        let before: HashMap<ImageryLayerId, usize> = self
            .order
            .iter()
            .enumerate()
            .map(|(index, &id)| (id, index))
            .collect();
        let mut raised = HashSet::with_capacity(ids.len());
        let mut top: Vec<ImageryLayerId> = ids
            .iter()
            .rev()
            .copied()
            .filter(|id| before.contains_key(id) && raised.insert(*id))
            .collect();
        top.reverse();
        if top.is_empty() {
            return;
        }
        let previous = mem::take(&mut self.order);
        self.order
            .extend(previous.into_iter().filter(|id| !raised.contains(id)));
        let base = self.order.len();
        self.order.extend_from_slice(&top);
        for (offset, id) in top.into_iter().enumerate() {
            if before[&id] != base + offset {
                self.changes.mark(id.idx, dirty::ORDER);
            }
        }
    }

    /// Returns the position of a layer in the draw order.
    #[must_use]
    pub fn index_of(&self, id: ImageryLayerId) -> Option<usize> {
        self.order.iter().position(|&l| l == id)
    }

    /// Returns whether a layer is in the draw order.
    #[must_use]
    pub fn contains(&self, id: ImageryLayerId) -> bool {
        self.index_of(id).is_some()
    }

    /// Returns whether the handle refers to a live (created, not destroyed)
    /// layer.
    #[must_use]
    pub fn is_alive(&self, id: ImageryLayerId) -> bool {
        self.generation.get(id.idx as usize) == Some(&id.generation)
            && self.slots[id.idx as usize].is_some()
    }

    /// Returns the draw order, bottom first.
    #[must_use]
    pub fn layers(&self) -> &[ImageryLayerId] {
        &self.order
    }

    /// Returns the number of layers in the draw order.
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Returns `true` if the draw order is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Returns a live layer.
    #[must_use]
    pub fn get(&self, id: ImageryLayerId) -> &ImageryLayer {
        self.validate(id);
        self.slot(id.idx)
    }

    /// Returns the layer in raw slot `idx`, if live.
    #[must_use]
    pub fn get_at(&self, idx: u32) -> Option<&ImageryLayer> {
        self.slots.get(idx as usize)?.as_ref()
    }

    /// Asks the renderer to reload the layer's tiles.
    pub fn refresh(&mut self, id: ImageryLayerId) {
        self.slot_mut(id).revision += 1;
        self.changes.mark(id.idx, dirty::CONTENT);
    }

    /// Sets the visibility flag.
    pub fn set_show(&mut self, id: ImageryLayerId, show: bool) {
        let layer = self.slot_mut(id);
        if layer.show != show {
            layer.show = show;
            self.changes.mark(id.idx, dirty::SHOW);
        }
    }

    /// Sets the alpha.
    pub fn set_alpha(&mut self, id: ImageryLayerId, alpha: f64) {
        let layer = self.slot_mut(id);
        if layer.alpha != alpha {
            layer.alpha = alpha;
            self.changes.mark(id.idx, dirty::ALPHA);
        }
    }

    /// Drains everything that changed since the previous call.
    pub fn take_changes(&mut self) -> SceneChanges {
        self.changes.take()
    }

    fn slot(&self, idx: u32) -> &ImageryLayer {
        self.slots[idx as usize]
            .as_ref()
            .unwrap_or_else(|| panic!("imagery slot {idx} is empty"))
    }

    fn slot_mut(&mut self, id: ImageryLayerId) -> &mut ImageryLayer {
        self.validate(id);
        self.slots[id.idx as usize]
            .as_mut()
            .unwrap_or_else(|| panic!("imagery slot {} is empty", id.idx))
    }

    /// Panics if the handle is stale.
    fn validate(&self, id: ImageryLayerId) {
        assert!(self.is_alive(id), "stale ImageryLayerId: {id:?}");
    }
}
