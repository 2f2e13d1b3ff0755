// Copyright 2026 the Tandem Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-layer primitive collections.

use std::fmt;

use tandem_core::map::FeatureId;

use super::converter::Primitive;
use crate::dirty::{self, ChangeLog, SceneChanges};

/// A handle to one layer's primitives in a [`PrimitiveCollection`].
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PrimitivesId {
    idx: u32,
    generation: u32,
}

impl PrimitivesId {
    /// Returns the raw slot index, as found in [`SceneChanges`].
    #[inline]
    #[must_use]
    pub const fn index(self) -> u32 {
        self.idx
    }
}

impl fmt::Debug for PrimitivesId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PrimitivesId({}@gen{})", self.idx, self.generation)
    }
}

/// The primitives of one vector layer, at most one per feature.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LayerPrimitives {
    /// Whether the layer is drawn.
    pub show: bool,
    features: Vec<(FeatureId, Primitive)>,
}

impl LayerPrimitives {
    /// Creates an empty, visible set.
    #[must_use]
    pub fn new() -> Self {
        Self {
            show: true,
            features: Vec::new(),
        }
    }

    /// Returns the primitive of a feature.
    #[must_use]
    pub fn get(&self, feature: FeatureId) -> Option<&Primitive> {
        self.features
            .iter()
            .find(|(f, _)| *f == feature)
            .map(|(_, p)| p)
    }

    /// Iterates features and their primitives in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (FeatureId, &Primitive)> {
        self.features.iter().map(|(f, p)| (*f, p))
    }

    /// Returns the number of primitives.
    #[must_use]
    pub fn len(&self) -> usize {
        self.features.len()
    }

    /// Returns `true` if there are no primitives.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Adds the primitive of a feature.
    ///
    /// # Panics
    ///
    /// Panics if the feature already has one; changes are applied as
    /// remove-then-add.
    pub fn insert(&mut self, feature: FeatureId, primitive: Primitive) {
        assert!(
            self.get(feature).is_none(),
            "{feature:?} already has a primitive"
        );
        self.features.push((feature, primitive));
    }

    /// Removes and returns the primitive of a feature.
    pub fn remove(&mut self, feature: FeatureId) -> Option<Primitive> {
        let index = self.features.iter().position(|(f, _)| *f == feature)?;
        Some(self.features.remove(index).1)
    }
}

/// The vector layers shown in the scene.
///
/// Membership order carries no meaning for vector layers, so there is no
/// reordering API.
#[derive(Debug, Default)]
pub struct PrimitiveCollection {
    slots: Vec<Option<LayerPrimitives>>,
    generation: Vec<u32>,
    free_list: Vec<u32>,
    members: Vec<PrimitivesId>,
    changes: ChangeLog,
}

impl PrimitiveCollection {
    /// Creates an empty collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates a detached set of primitives.
    pub fn create(&mut self, primitives: LayerPrimitives) -> PrimitivesId {
        let idx = if let Some(idx) = self.free_list.pop() {
            self.slots[idx as usize] = Some(primitives);
            idx
        } else {
            let idx = u32::try_from(self.slots.len()).expect("primitive set count fits in u32");
            self.slots.push(Some(primitives));
            self.generation.push(0);
            idx
        };
        PrimitivesId {
            idx,
            generation: self.generation[idx as usize],
        }
    }

    /// Makes a set part of the scene.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale or already a member.
    pub fn add(&mut self, id: PrimitivesId) {
        self.validate(id);
        assert!(!self.contains(id), "{id:?} is already in the collection");
        self.members.push(id);
        self.changes.added(id.idx);
    }

    /// Removes a set from the scene, releasing it if `destroy` is set.
    pub fn remove(&mut self, id: PrimitivesId, destroy: bool) -> bool {
        let Some(index) = self.members.iter().position(|&m| m == id) else {
            return false;
        };
        self.members.remove(index);
        self.changes.removed(id.idx);
        if destroy {
            self.destroy(id);
        }
        true
    }

    /// Releases a set, removing it from the scene first if needed.
    pub fn destroy(&mut self, id: PrimitivesId) {
        self.validate(id);
        self.members.retain(|&m| m != id);
        let idx = id.idx as usize;
        self.slots[idx] = None;
        self.generation[idx] += 1;
        self.free_list.push(id.idx);
        self.changes.destroyed(id.idx);
    }

    /// Returns whether a set is part of the scene.
    #[must_use]
    pub fn contains(&self, id: PrimitivesId) -> bool {
        self.members.contains(&id)
    }

    /// Returns whether the handle refers to a live set.
    #[must_use]
    pub fn is_alive(&self, id: PrimitivesId) -> bool {
        self.generation.get(id.idx as usize) == Some(&id.generation)
            && self.slots[id.idx as usize].is_some()
    }

    /// Returns the members, in insertion order.
    #[must_use]
    pub fn members(&self) -> &[PrimitivesId] {
        &self.members
    }

    /// Returns the number of members.
    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Returns `true` if there are no members.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Returns a live set.
    #[must_use]
    pub fn get(&self, id: PrimitivesId) -> &LayerPrimitives {
        self.validate(id);
        self.slots[id.idx as usize]
            .as_ref()
            .unwrap_or_else(|| panic!("primitive slot {} is empty", id.idx))
    }

    /// Sets the visibility of a set.
    pub fn set_show(&mut self, id: PrimitivesId, show: bool) {
        let set = self.slot_mut(id);
        if set.show != show {
            set.show = show;
            self.changes.mark(id.idx, dirty::SHOW);
        }
    }

    /// Adds the primitive of one feature.
    pub fn insert_feature(&mut self, id: PrimitivesId, feature: FeatureId, primitive: Primitive) {
        self.slot_mut(id).insert(feature, primitive);
        self.changes.mark(id.idx, dirty::CONTENT);
    }

    /// Removes the primitive of one feature.
    pub fn remove_feature(&mut self, id: PrimitivesId, feature: FeatureId) -> Option<Primitive> {
        let removed = self.slot_mut(id).remove(feature);
        if removed.is_some() {
            self.changes.mark(id.idx, dirty::CONTENT);
        }
        removed
    }

    /// Drains everything that changed since the previous call.
    pub fn take_changes(&mut self) -> SceneChanges {
        self.changes.take()
    }

    fn slot_mut(&mut self, id: PrimitivesId) -> &mut LayerPrimitives {
        self.validate(id);
        self.slots[id.idx as usize]
            .as_mut()
            .unwrap_or_else(|| panic!("primitive slot {} is empty", id.idx))
    }

    /// Panics if the handle is stale.
    fn validate(&self, id: PrimitivesId) {
        assert!(self.is_alive(id), "stale PrimitivesId: {id:?}");
    }
}
