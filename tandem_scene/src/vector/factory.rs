// Copyright 2026 the Tandem Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Vector leaves to primitive sets.

use tandem_core::error::FactoryError;
use tandem_core::event::{LayerProperty, Topic, TreeEvent};
use tandem_core::lineage::LayerWithParents;
use tandem_core::map::{FeatureId, LeafKind, MapTree, NodeKind, Source};
use tandem_core::sync::{CounterpartFactory, Counterparts, HookEffect};

use super::collection::{LayerPrimitives, PrimitiveCollection, PrimitivesId};
use super::converter::{FeatureConverter, GeometryConverter};

/// Feature subscriptions of a vector counterpart.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum VectorHook {
    /// A feature was added to the source.
    FeatureAdded,
    /// A feature was removed from the source.
    FeatureRemoved,
    /// A feature's geometry changed.
    FeatureChanged,
    /// The layer points at a different source; the set is rebuilt from it.
    SourceReplaced,
}

/// Materializes vector leaves as primitive sets, one per layer.
///
/// Cluster sources are unwrapped and the wrapped features are drawn
/// directly. Feature edits are applied incrementally; a changed feature is
/// removed and converted again. Vector leaves carry no draw order, so
/// [`CounterpartFactory::order_layers`] is left as a no-op.
#[derive(Debug, Default)]
pub struct VectorFactory<V = GeometryConverter> {
    converter: V,
    primitives: PrimitiveCollection,
}

impl<V: FeatureConverter> VectorFactory<V> {
    /// Creates a factory converting features with `converter`.
    #[must_use]
    pub fn new(converter: V) -> Self {
        Self {
            converter,
            primitives: PrimitiveCollection::new(),
        }
    }

    /// Returns the converter.
    pub fn converter(&self) -> &V {
        &self.converter
    }

    /// Returns the target collection.
    #[must_use]
    pub fn primitives(&self) -> &PrimitiveCollection {
        &self.primitives
    }

    /// Returns the target collection mutably, for draining changes.
    pub fn primitives_mut(&mut self) -> &mut PrimitiveCollection {
        &mut self.primitives
    }

    fn insert(
        &mut self,
        tree: &MapTree,
        layer: &LayerWithParents,
        id: PrimitivesId,
        feature: FeatureId,
    ) {
        if !tree.is_feature_alive(feature) || self.primitives.get(id).get(feature).is_some() {
            return;
        }
        if let Some(primitive) =
            self.converter
                .convert(tree, layer, feature, tree.geometry(feature))
        {
            self.primitives.insert_feature(id, feature, primitive);
        }
    }
}

impl<V: FeatureConverter> CounterpartFactory for VectorFactory<V> {
    type Counterpart = PrimitivesId;
    type Hook = VectorHook;

    fn create_single_layer_counterparts(
        &mut self,
        tree: &MapTree,
        layer: &LayerWithParents,
    ) -> Result<Option<Counterparts<PrimitivesId, VectorHook>>, FactoryError> {
        let node = layer.node;
        if tree.kind(node) != NodeKind::Leaf(LeafKind::Vector) {
            return Ok(None);
        }
        let Some(source) = tree.source_of(node) else {
            return Ok(None);
        };
        let resolved = tree.resolve_source(source);
        let Source::Features(features) = tree.source(resolved) else {
            return Err(FactoryError::Unsupported);
        };

        let mut set = LayerPrimitives::new();
        for &feature in features.features() {
            if let Some(primitive) =
                self.converter
                    .convert(tree, layer, feature, tree.geometry(feature))
            {
                set.insert(feature, primitive);
            }
        }
        let id = self.primitives.create(set);
        Ok(Some(
            Counterparts::single(id)
                .with_hook(Topic::FeatureAdd(resolved), VectorHook::FeatureAdded)
                .with_hook(Topic::FeatureRemove(resolved), VectorHook::FeatureRemoved)
                .with_hook(Topic::FeatureChange(resolved), VectorHook::FeatureChanged)
                .with_hook(
                    Topic::Property(node, LayerProperty::Source),
                    VectorHook::SourceReplaced,
                ),
        ))
    }

    fn add_object(&mut self, id: &PrimitivesId) {
        self.primitives.add(*id);
    }

    fn remove_single_object(&mut self, id: &PrimitivesId, destroy: bool) {
        self.primitives.remove(*id, destroy);
    }

    fn remove_all_objects(&mut self, destroy: bool) {
        for id in self.primitives.members().to_vec() {
            self.primitives.remove(id, destroy);
        }
    }

    fn destroy_object(&mut self, id: PrimitivesId) {
        if self.primitives.is_alive(id) {
            self.primitives.destroy(id);
        }
    }

    fn update_inherited(
        &mut self,
        tree: &MapTree,
        layer: &LayerWithParents,
        counterparts: &[PrimitivesId],
    ) {
        let show = layer.inherited_visible(tree);
        for &id in counterparts {
            self.primitives.set_show(id, show);
        }
    }

    fn on_hook(
        &mut self,
        tree: &MapTree,
        layer: &LayerWithParents,
        hook: VectorHook,
        event: &TreeEvent,
        counterparts: &[PrimitivesId],
    ) -> HookEffect {
        if hook == VectorHook::SourceReplaced {
            return HookEffect::Recreate;
        }
        let feature = match *event {
            TreeEvent::FeatureAdded { feature, .. }
            | TreeEvent::FeatureRemoved { feature, .. }
            | TreeEvent::FeatureChanged { feature, .. } => feature,
            _ => return HookEffect::None,
        };
        for &id in counterparts {
            match hook {
                VectorHook::FeatureAdded => self.insert(tree, layer, id, feature),
                VectorHook::FeatureRemoved => {
                    self.primitives.remove_feature(id, feature);
                }
                VectorHook::FeatureChanged => {
                    self.primitives.remove_feature(id, feature);
                    self.insert(tree, layer, id, feature);
                }
                VectorHook::SourceReplaced => {}
            }
        }
        HookEffect::None
    }
}
