// Copyright 2026 the Tandem Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Raster leaves to imagery layers.

use hashbrown::HashSet;
use tandem_core::error::FactoryError;
use tandem_core::event::{LayerProperty, Topic, TreeEvent};
use tandem_core::lineage::LayerWithParents;
use tandem_core::map::{LeafKind, MapTree, NodeId, NodeKind, Projection, Source, SourceState};
use tandem_core::sync::{
    CounterpartFactory, Counterparts, HookEffect, SynchronizationState, stacking_order,
};

use super::collection::{ImageryLayerCollection, ImageryLayerId, ImageryProvider};
use crate::projection;

/// Configuration for an [`ImageryFactory`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ImageryConfig {
    /// Projection of the map view. Layer extents are expressed in it, and
    /// raster sources without an explicit projection are assumed to use it.
    pub view_projection: Projection,
}

impl ImageryConfig {
    /// A Web Mercator map view.
    #[must_use]
    pub const fn web_mercator() -> Self {
        Self {
            view_projection: Projection::WebMercator,
        }
    }

    /// A geographic (longitude/latitude) map view.
    #[must_use]
    pub const fn geographic() -> Self {
        Self {
            view_projection: Projection::Geographic,
        }
    }
}

impl Default for ImageryConfig {
    fn default() -> Self {
        Self::web_mercator()
    }
}

/// Factory-owned subscriptions of an imagery counterpart.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ImageryHook {
    /// The raster source changed state; reload its tiles.
    Refresh,
    /// The node's extent changed; the provider rectangle is baked in at
    /// creation, so everything is rebuilt.
    Rebuild,
    /// The node points at a different source; the provider is replaced.
    Replace,
}

/// Materializes tile and image leaves as imagery layers.
///
/// Groups are never represented as a whole. Leaves are accepted when their
/// (cluster-unwrapped) source is a ready raster source in a projection the
/// scene supports. Layers the host adds to the collection directly are
/// never touched.
#[derive(Debug, Default)]
pub struct ImageryFactory {
    config: ImageryConfig,
    layers: ImageryLayerCollection,
    owned: HashSet<ImageryLayerId>,
}

impl ImageryFactory {
    /// Creates a factory with an empty collection.
    #[must_use]
    pub fn new(config: ImageryConfig) -> Self {
        Self {
            config,
            layers: ImageryLayerCollection::new(),
            owned: HashSet::new(),
        }
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> ImageryConfig {
        self.config
    }

    /// Returns the target collection.
    #[must_use]
    pub fn layers(&self) -> &ImageryLayerCollection {
        &self.layers
    }

    /// Returns the target collection mutably, for adding foreign layers
    /// and draining changes.
    pub fn layers_mut(&mut self) -> &mut ImageryLayerCollection {
        &mut self.layers
    }

    /// Returns whether this factory created the layer.
    #[must_use]
    pub fn owns(&self, id: ImageryLayerId) -> bool {
        self.owned.contains(&id)
    }
}

impl CounterpartFactory for ImageryFactory {
    type Counterpart = ImageryLayerId;
    type Hook = ImageryHook;

    fn create_single_layer_counterparts(
        &mut self,
        tree: &MapTree,
        layer: &LayerWithParents,
    ) -> Result<Option<Counterparts<ImageryLayerId, ImageryHook>>, FactoryError> {
        let node = layer.node;
        if !matches!(
            tree.kind(node),
            NodeKind::Leaf(LeafKind::Tile | LeafKind::Image)
        ) {
            return Ok(None);
        }
        let Some(source) = tree.source_of(node) else {
            return Ok(None);
        };
        let resolved = tree.resolve_source(source);
        let Source::Raster(raster) = tree.source(resolved) else {
            return Err(FactoryError::Unsupported);
        };
        match raster.state {
            SourceState::Loading => return Ok(None),
            SourceState::Error => return Err(FactoryError::SourceFailed(source)),
            SourceState::Ready => {}
        }
        let projection = raster.projection.unwrap_or(self.config.view_projection);
        if !projection::is_supported(projection) {
            return Err(FactoryError::Unsupported);
        }
        let rectangle = tree
            .extent(node)
            .and_then(|extent| projection::to_degrees(extent, self.config.view_projection));

        let id = self.layers.create(ImageryProvider {
            url: raster.url.clone(),
            projection,
            rectangle,
        });
        Ok(Some(
            Counterparts::single(id)
                .with_hook(Topic::SourceState(resolved), ImageryHook::Refresh)
                .with_hook(
                    Topic::Property(node, LayerProperty::Extent),
                    ImageryHook::Rebuild,
                )
                .with_hook(
                    Topic::Property(node, LayerProperty::Source),
                    ImageryHook::Replace,
                ),
        ))
    }

    fn add_object(&mut self, id: &ImageryLayerId) {
        self.layers.add(*id);
        self.owned.insert(*id);
    }

    fn remove_single_object(&mut self, id: &ImageryLayerId, destroy: bool) {
        self.layers.remove(*id, destroy);
        self.owned.remove(id);
    }

    fn remove_all_objects(&mut self, destroy: bool) {
        for id in self.owned.drain() {
            self.layers.remove(id, destroy);
        }
    }

    fn destroy_object(&mut self, id: ImageryLayerId) {
        if self.layers.is_alive(id) {
            self.layers.destroy(id);
        }
    }

    fn order_layers(
        &mut self,
        tree: &MapTree,
        root: NodeId,
        state: &SynchronizationState<ImageryLayerId>,
    ) {
        let ordered: Vec<ImageryLayerId> = stacking_order(tree, root)
            .into_iter()
            .flat_map(|node| state.counterparts(node).unwrap_or_default())
            .copied()
            .collect();
        self.layers.raise_all_to_top(&ordered);
    }

    fn update_inherited(
        &mut self,
        tree: &MapTree,
        layer: &LayerWithParents,
        counterparts: &[ImageryLayerId],
    ) {
        let show = layer.inherited_visible(tree);
        let alpha = layer.inherited_opacity(tree);
        for &id in counterparts {
            self.layers.set_show(id, show);
            self.layers.set_alpha(id, alpha);
        }
    }

    fn on_hook(
        &mut self,
        _tree: &MapTree,
        _layer: &LayerWithParents,
        hook: ImageryHook,
        _event: &TreeEvent,
        counterparts: &[ImageryLayerId],
    ) -> HookEffect {
        match hook {
            ImageryHook::Refresh => {
                for &id in counterparts {
                    self.layers.refresh(id);
                }
                HookEffect::None
            }
            ImageryHook::Rebuild => HookEffect::Resynchronize,
            ImageryHook::Replace => HookEffect::Recreate,
        }
    }
}
