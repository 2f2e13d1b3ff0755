// Copyright 2026 the Tandem Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The counterpart factory contract.

use alloc::vec;
use alloc::vec::Vec;
use core::fmt::Debug;

use super::state::SynchronizationState;
use crate::error::FactoryError;
use crate::event::{Topic, TreeEvent};
use crate::lineage::LayerWithParents;
use crate::map::{MapTree, NodeId};

/// Target objects created for one node, plus the extra events the factory
/// wants to observe while they are alive.
#[derive(Clone, Debug, PartialEq)]
pub struct Counterparts<C, H> {
    /// The target objects, in insertion order.
    pub objects: Vec<C>,
    /// Factory-owned subscriptions. The synchronizer registers each as a
    /// listener of the node and routes deliveries to
    /// [`CounterpartFactory::on_hook`].
    pub hooks: Vec<(Topic, H)>,
}

impl<C, H> Counterparts<C, H> {
    /// Wraps a list of objects with no hooks.
    #[must_use]
    pub fn new(objects: Vec<C>) -> Self {
        Self {
            objects,
            hooks: Vec::new(),
        }
    }

    /// Wraps a single object with no hooks.
    #[must_use]
    pub fn single(object: C) -> Self {
        Self::new(vec![object])
    }

    /// Adds a hook subscription.
    #[must_use]
    pub fn with_hook(mut self, topic: Topic, hook: H) -> Self {
        self.hooks.push((topic, hook));
        self
    }
}

/// What the synchronizer should do after a hook ran.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum HookEffect {
    /// Nothing further.
    #[default]
    None,
    /// Re-run [`CounterpartFactory::order_layers`].
    Reorder,
    /// Tear down the node's counterparts and create them afresh, with new
    /// hook subscriptions.
    Recreate,
    /// Tear everything down and rebuild from the root.
    Resynchronize,
}

/// Converts source nodes into target objects and manages the target
/// collection.
///
/// The synchronizer owns the association between nodes and counterparts;
/// the factory owns construction, insertion, removal, and destruction.
pub trait CounterpartFactory {
    /// A target-side object. Usually a cheap handle into the target
    /// collection.
    type Counterpart: Clone;

    /// Factory-defined tag attached to a hook subscription.
    type Hook: Copy + Debug;

    /// Tries to create the counterparts of one node.
    ///
    /// `Ok(None)` means the node cannot be represented yet (for example its
    /// source is still loading) and is not an error. For a group, `Ok(None)`
    /// means the group is not represented as a whole and its children are
    /// traversed instead.
    fn create_single_layer_counterparts(
        &mut self,
        tree: &MapTree,
        layer: &LayerWithParents,
    ) -> Result<Option<Counterparts<Self::Counterpart, Self::Hook>>, FactoryError>;

    /// Inserts a counterpart into the target collection.
    fn add_object(&mut self, counterpart: &Self::Counterpart);

    /// Removes one counterpart from the target collection, optionally
    /// destroying it.
    fn remove_single_object(&mut self, counterpart: &Self::Counterpart, destroy: bool);

    /// Removes every counterpart this factory inserted, optionally
    /// destroying them.
    fn remove_all_objects(&mut self, destroy: bool);

    /// Releases a counterpart that is no longer in the target collection.
    fn destroy_object(&mut self, counterpart: Self::Counterpart);

    /// Re-sequences the target collection to mirror the source order.
    fn order_layers(
        &mut self,
        tree: &MapTree,
        root: NodeId,
        state: &SynchronizationState<Self::Counterpart>,
    ) {
        _ = (tree, root, state);
    }

    /// Pushes inherited properties (visibility, opacity) to counterparts.
    ///
    /// Called once before the counterparts are added, and again whenever a
    /// `Visible` or `Opacity` property changes anywhere in the lineage.
    fn update_inherited(
        &mut self,
        tree: &MapTree,
        layer: &LayerWithParents,
        counterparts: &[Self::Counterpart],
    ) {
        _ = (tree, layer, counterparts);
    }

    /// Handles an event delivered to one of the hooks returned from
    /// [`create_single_layer_counterparts`](Self::create_single_layer_counterparts).
    fn on_hook(
        &mut self,
        tree: &MapTree,
        layer: &LayerWithParents,
        hook: Self::Hook,
        event: &TreeEvent,
        counterparts: &[Self::Counterpart],
    ) -> HookEffect {
        _ = (tree, layer, hook, event, counterparts);
        HookEffect::None
    }
}
