// Copyright 2026 the Tandem Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Struct-of-arrays layer storage with allocation, collection, property, and
//! source management.

use alloc::vec::Vec;

use kurbo::Rect;

use super::id::{CollectionId, FeatureId, NodeId, SourceId};
use super::source::{FeatureSlot, FeatureSource, Geometry, RasterSource, Source, SourceState};
use crate::event::{Delivery, EventBus, LayerProperty, ListenerKey, SubscriberId, Topic, TreeEvent};

/// What a node is.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// A group whose children live in the given collection.
    Group(CollectionId),
    /// A leaf layer.
    Leaf(LeafKind),
}

/// The flavor of a leaf layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LeafKind {
    /// Tiled raster imagery.
    Tile,
    /// Single-image raster.
    Image,
    /// Vector features rendered client-side.
    Vector,
    /// Vector tiles.
    VectorTile,
}

/// Struct-of-arrays storage for the map layer tree.
///
/// Nodes are addressed by [`NodeId`] handles. Internally, each node occupies
/// a slot in parallel arrays. Destroyed nodes are recycled via a free list,
/// and generation counters prevent stale handle access.
///
/// Every mutation emits [`TreeEvent`]s on the tree's [`EventBus`].
#[derive(Debug)]
pub struct MapTree {
    // -- Nodes --
    pub(crate) kind: Vec<NodeKind>,
    pub(crate) visible: Vec<bool>,
    pub(crate) opacity: Vec<f64>,
    pub(crate) z_index: Vec<Option<f64>>,
    pub(crate) extent: Vec<Option<Rect>>,
    pub(crate) source: Vec<Option<SourceId>>,

    // -- Allocation --
    pub(crate) generation: Vec<u32>,
    pub(crate) free_list: Vec<u32>,
    pub(crate) len: u32,

    // -- Collections --
    pub(crate) collections: Vec<Vec<NodeId>>,

    // -- Sources --
    pub(crate) sources: Vec<Source>,
    pub(crate) features: Vec<FeatureSlot>,
    pub(crate) feature_free_list: Vec<u32>,

    // -- Events --
    pub(crate) bus: EventBus,
}

impl Default for MapTree {
    fn default() -> Self {
        Self::new()
    }
}

impl MapTree {
    /// Creates an empty tree.
    #[must_use]
    pub fn new() -> Self {
        Self {
            kind: Vec::new(),
            visible: Vec::new(),
            opacity: Vec::new(),
            z_index: Vec::new(),
            extent: Vec::new(),
            source: Vec::new(),
            generation: Vec::new(),
            free_list: Vec::new(),
            len: 0,
            collections: Vec::new(),
            sources: Vec::new(),
            features: Vec::new(),
            feature_free_list: Vec::new(),
            bus: EventBus::new(),
        }
    }

    // -- Allocation API --

    /// Creates a group with a fresh, empty child collection.
    pub fn create_group(&mut self) -> NodeId {
        let layers = self.create_collection();
        self.alloc_node(NodeKind::Group(layers))
    }

    /// Creates a leaf layer with no source.
    pub fn create_layer(&mut self, kind: LeafKind) -> NodeId {
        self.alloc_node(NodeKind::Leaf(kind))
    }

    /// Creates a leaf layer already bound to `source`.
    pub fn create_layer_with_source(&mut self, kind: LeafKind, source: SourceId) -> NodeId {
        self.validate_source(source);
        let id = self.alloc_node(NodeKind::Leaf(kind));
        self.source[id.idx as usize] = Some(source);
        id
    }

    /// Destroys a node, freeing its slot for reuse.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale or the node is still a member of any
    /// collection (remove it first).
    pub fn destroy_node(&mut self, id: NodeId) {
        self.validate(id);
        assert!(
            !self.collections.iter().any(|c| c.contains(&id)),
            "cannot destroy a node that is still in a collection"
        );
        let idx = id.idx as usize;
        self.generation[idx] += 1;
        self.free_list.push(id.idx);
    }

    /// Returns whether the given handle refers to a live node.
    #[must_use]
    pub fn is_alive(&self, id: NodeId) -> bool {
        (id.idx < self.len)
            && self.generation[id.idx as usize] == id.generation
            && !self.free_list.contains(&id.idx)
    }

    /// Creates a detached, empty child collection.
    pub fn create_collection(&mut self) -> CollectionId {
        let id = u32::try_from(self.collections.len()).expect("collection count fits in u32");
        self.collections.push(Vec::new());
        CollectionId(id)
    }

    // -- Topology API --

    /// Returns the kind of a node.
    #[must_use]
    pub fn kind(&self, id: NodeId) -> NodeKind {
        self.validate(id);
        self.kind[id.idx as usize]
    }

    /// Returns whether a node is a group.
    #[must_use]
    pub fn is_group(&self, id: NodeId) -> bool {
        matches!(self.kind(id), NodeKind::Group(_))
    }

    /// Returns the child collection of a group.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale or the node is a leaf.
    #[must_use]
    pub fn layers(&self, group: NodeId) -> CollectionId {
        match self.kind(group) {
            NodeKind::Group(layers) => layers,
            NodeKind::Leaf(_) => panic!("{group:?} is not a group"),
        }
    }

    /// Returns the current children of a group, or `None` for a leaf.
    #[must_use]
    pub fn children(&self, id: NodeId) -> Option<&[NodeId]> {
        match self.kind(id) {
            NodeKind::Group(layers) => Some(&self.collections[layers.0 as usize]),
            NodeKind::Leaf(_) => None,
        }
    }

    /// Returns the contents of a collection.
    #[must_use]
    pub fn collection(&self, id: CollectionId) -> &[NodeId] {
        self.validate_collection(id);
        &self.collections[id.0 as usize]
    }

    /// Appends `node` to `collection`.
    pub fn push_layer(&mut self, collection: CollectionId, node: NodeId) {
        let len = self.collection(collection).len();
        self.insert_layer(collection, len, node);
    }

    /// Inserts `node` into `collection` at `index`.
    ///
    /// # Panics
    ///
    /// Panics if a handle is stale or `index` is out of bounds.
    pub fn insert_layer(&mut self, collection: CollectionId, index: usize, node: NodeId) {
        self.validate(node);
        self.validate_collection(collection);
        self.collections[collection.0 as usize].insert(index, node);
        self.bus.emit(TreeEvent::Added { collection, node });
    }

    /// Appends `node` to the children of `group`.
    pub fn add_to_group(&mut self, group: NodeId, node: NodeId) {
        let layers = self.layers(group);
        self.push_layer(layers, node);
    }

    /// Removes the first occurrence of `node` from `collection`.
    ///
    /// Returns `false` (and emits nothing) if the node is not a member.
    pub fn remove_layer(&mut self, collection: CollectionId, node: NodeId) -> bool {
        self.validate_collection(collection);
        let members = &self.collections[collection.0 as usize];
        match members.iter().position(|&n| n == node) {
            Some(index) => {
                self.remove_layer_at(collection, index);
                true
            }
            None => false,
        }
    }

    /// Removes and returns the node at `index` in `collection`.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of bounds.
    pub fn remove_layer_at(&mut self, collection: CollectionId, index: usize) -> NodeId {
        self.validate_collection(collection);
        let node = self.collections[collection.0 as usize].remove(index);
        self.bus.emit(TreeEvent::Removed { collection, node });
        node
    }

    /// Removes `node` from the children of `group`.
    pub fn remove_from_group(&mut self, group: NodeId, node: NodeId) -> bool {
        let layers = self.layers(group);
        self.remove_layer(layers, node)
    }

    /// Moves the node at `from` to position `to` within `collection`.
    ///
    /// Emitted as a removal followed by an insertion, which is how observers
    /// see reorders.
    pub fn move_layer(&mut self, collection: CollectionId, from: usize, to: usize) {
        let node = self.remove_layer_at(collection, from);
        self.insert_layer(collection, to, node);
    }

    /// Swaps the child collection of `group` for `collection`.
    ///
    /// The previous collection stays alive and keeps its contents.
    pub fn set_layers(&mut self, group: NodeId, collection: CollectionId) {
        self.validate_collection(collection);
        let previous = self.layers(group);
        if previous == collection {
            return;
        }
        self.kind[group.idx as usize] = NodeKind::Group(collection);
        self.bus.emit(TreeEvent::LayersReplaced {
            group,
            previous,
            current: collection,
        });
    }

    // -- Property getters --

    /// Returns the visibility flag of a node.
    #[must_use]
    pub fn visible(&self, id: NodeId) -> bool {
        self.validate(id);
        self.visible[id.idx as usize]
    }

    /// Returns the local opacity of a node.
    #[must_use]
    pub fn opacity(&self, id: NodeId) -> f64 {
        self.validate(id);
        self.opacity[id.idx as usize]
    }

    /// Returns the stacking key of a node, if set.
    #[must_use]
    pub fn z_index(&self, id: NodeId) -> Option<f64> {
        self.validate(id);
        self.z_index[id.idx as usize]
    }

    /// Returns the extent of a node, if set.
    #[must_use]
    pub fn extent(&self, id: NodeId) -> Option<Rect> {
        self.validate(id);
        self.extent[id.idx as usize]
    }

    /// Returns the source attached to a node, if any.
    #[must_use]
    pub fn source_of(&self, id: NodeId) -> Option<SourceId> {
        self.validate(id);
        self.source[id.idx as usize]
    }

    // -- Mutation API (emits events) --

    /// Sets the visibility flag of a node.
    pub fn set_visible(&mut self, id: NodeId, visible: bool) {
        self.validate(id);
        self.visible[id.idx as usize] = visible;
        self.property_changed(id, LayerProperty::Visible);
    }

    /// Sets the local opacity of a node.
    pub fn set_opacity(&mut self, id: NodeId, opacity: f64) {
        self.validate(id);
        self.opacity[id.idx as usize] = opacity;
        self.property_changed(id, LayerProperty::Opacity);
    }

    /// Sets (or clears) the stacking key of a node.
    pub fn set_z_index(&mut self, id: NodeId, z_index: Option<f64>) {
        self.validate(id);
        self.z_index[id.idx as usize] = z_index;
        self.property_changed(id, LayerProperty::ZIndex);
    }

    /// Sets (or clears) the extent of a node.
    pub fn set_extent(&mut self, id: NodeId, extent: Option<Rect>) {
        self.validate(id);
        self.extent[id.idx as usize] = extent;
        self.property_changed(id, LayerProperty::Extent);
    }

    /// Attaches (or detaches) a source.
    pub fn set_source(&mut self, id: NodeId, source: Option<SourceId>) {
        self.validate(id);
        if let Some(source) = source {
            self.validate_source(source);
        }
        self.source[id.idx as usize] = source;
        self.property_changed(id, LayerProperty::Source);
    }

    /// Emits a generic change notification for a node without mutating it.
    pub fn touch(&mut self, id: NodeId) {
        self.validate(id);
        self.bus.emit(TreeEvent::Changed { node: id });
    }

    // -- Source API --

    /// Registers a raster source.
    pub fn create_raster_source(&mut self, source: RasterSource) -> SourceId {
        self.alloc_source(Source::Raster(source))
    }

    /// Registers an empty feature source.
    pub fn create_feature_source(&mut self) -> SourceId {
        self.alloc_source(Source::Features(FeatureSource::default()))
    }

    /// Registers a cluster source wrapping `inner`.
    pub fn create_cluster_source(&mut self, inner: SourceId) -> SourceId {
        self.validate_source(inner);
        self.alloc_source(Source::Cluster { inner })
    }

    /// Returns a source.
    #[must_use]
    pub fn source(&self, id: SourceId) -> &Source {
        self.validate_source(id);
        &self.sources[id.0 as usize]
    }

    /// Follows cluster wrappers down to the underlying source.
    #[must_use]
    pub fn resolve_source(&self, id: SourceId) -> SourceId {
        let mut current = id;
        while let Source::Cluster { inner } = self.source(current) {
            current = *inner;
        }
        current
    }

    /// Updates the loading state of a raster source.
    ///
    /// Emits [`TreeEvent::SourceStateChanged`], then [`TreeEvent::Changed`]
    /// on every node that uses the source directly or through a cluster.
    ///
    /// # Panics
    ///
    /// Panics if the source is not a raster source.
    pub fn set_source_state(&mut self, id: SourceId, state: SourceState) {
        match &mut self.sources[id.0 as usize] {
            Source::Raster(raster) => raster.state = state,
            other => panic!("{id:?} is not a raster source: {other:?}"),
        }
        self.bus.emit(TreeEvent::SourceStateChanged { source: id, state });
        self.notify_source_users(id);
    }

    /// Adds a feature to a feature source.
    ///
    /// # Panics
    ///
    /// Panics if `source` is not a feature source.
    pub fn add_feature(&mut self, source: SourceId, geometry: Geometry) -> FeatureId {
        let idx = if let Some(idx) = self.feature_free_list.pop() {
            let slot = &mut self.features[idx as usize];
            slot.owner = source;
            slot.geometry = geometry;
            slot.alive = true;
            idx
        } else {
            let idx = u32::try_from(self.features.len()).expect("feature count fits in u32");
            self.features.push(FeatureSlot {
                owner: source,
                geometry,
                generation: 0,
                alive: true,
            });
            idx
        };
        let feature = FeatureId {
            idx,
            generation: self.features[idx as usize].generation,
        };
        self.feature_source_mut(source).features.push(feature);
        self.bus.emit(TreeEvent::FeatureAdded { source, feature });
        feature
    }

    /// Removes a feature from its source, invalidating the handle.
    pub fn remove_feature(&mut self, feature: FeatureId) {
        self.validate_feature(feature);
        let source = self.features[feature.idx as usize].owner;
        self.feature_source_mut(source)
            .features
            .retain(|&f| f != feature);
        let slot = &mut self.features[feature.idx as usize];
        slot.alive = false;
        slot.generation += 1;
        self.feature_free_list.push(feature.idx);
        self.bus.emit(TreeEvent::FeatureRemoved { source, feature });
    }

    /// Replaces the geometry of a feature.
    pub fn set_geometry(&mut self, feature: FeatureId, geometry: Geometry) {
        self.validate_feature(feature);
        let slot = &mut self.features[feature.idx as usize];
        slot.geometry = geometry;
        let source = slot.owner;
        self.bus.emit(TreeEvent::FeatureChanged { source, feature });
    }

    /// Returns the geometry of a live feature.
    #[must_use]
    pub fn geometry(&self, feature: FeatureId) -> &Geometry {
        self.validate_feature(feature);
        &self.features[feature.idx as usize].geometry
    }

    /// Returns whether the feature handle is live.
    #[must_use]
    pub fn is_feature_alive(&self, feature: FeatureId) -> bool {
        self.features
            .get(feature.idx as usize)
            .is_some_and(|s| s.alive && s.generation == feature.generation)
    }

    // -- Event API --

    /// Registers a new event subscriber.
    pub fn subscribe(&mut self) -> SubscriberId {
        self.bus.subscribe()
    }

    /// Registers a listener for `topic`.
    pub fn listen(&mut self, subscriber: SubscriberId, topic: Topic) -> ListenerKey {
        self.bus.listen(subscriber, topic)
    }

    /// Revokes a listener.
    pub fn unlisten(&mut self, key: ListenerKey) -> bool {
        self.bus.unlisten(key)
    }

    /// Pops the oldest delivery queued for `subscriber`.
    pub fn poll(&mut self, subscriber: SubscriberId) -> Option<Delivery> {
        self.bus.poll(subscriber)
    }

    /// Returns the event bus.
    #[must_use]
    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// Returns the event bus mutably.
    pub fn bus_mut(&mut self) -> &mut EventBus {
        &mut self.bus
    }

    /// Returns the number of live listeners across all subscribers.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.bus.listener_count()
    }

    // -- Internal helpers --

    fn alloc_node(&mut self, kind: NodeKind) -> NodeId {
        let idx = if let Some(idx) = self.free_list.pop() {
            // Reuse a freed slot; the generation was bumped on destroy.
            let i = idx as usize;
            self.kind[i] = kind;
            self.visible[i] = true;
            self.opacity[i] = 1.0;
            self.z_index[i] = None;
            self.extent[i] = None;
            self.source[i] = None;
            idx
        } else {
            let idx = self.len;
            self.len += 1;
            self.kind.push(kind);
            self.visible.push(true);
            self.opacity.push(1.0);
            self.z_index.push(None);
            self.extent.push(None);
            self.source.push(None);
            self.generation.push(0);
            idx
        };
        NodeId {
            idx,
            generation: self.generation[idx as usize],
        }
    }

    fn alloc_source(&mut self, source: Source) -> SourceId {
        let id = u32::try_from(self.sources.len()).expect("source count fits in u32");
        self.sources.push(source);
        SourceId(id)
    }

    fn feature_source_mut(&mut self, id: SourceId) -> &mut FeatureSource {
        match &mut self.sources[id.0 as usize] {
            Source::Features(features) => features,
            other => panic!("{id:?} is not a feature source: {other:?}"),
        }
    }

    fn property_changed(&mut self, node: NodeId, property: LayerProperty) {
        self.bus.emit(TreeEvent::PropertyChanged { node, property });
        self.bus.emit(TreeEvent::Changed { node });
    }

    fn notify_source_users(&mut self, changed: SourceId) {
        let users: Vec<NodeId> = (0..self.len)
            .filter(|idx| !self.free_list.contains(idx))
            .filter_map(|idx| {
                let source = self.source[idx as usize]?;
                let uses = source == changed || self.resolve_source(source) == changed;
                uses.then_some(NodeId {
                    idx,
                    generation: self.generation[idx as usize],
                })
            })
            .collect();
        for node in users {
            self.bus.emit(TreeEvent::Changed { node });
        }
    }

    /// Panics if the handle is stale.
    fn validate(&self, id: NodeId) {
        assert!(
            id.idx < self.len && self.generation[id.idx as usize] == id.generation,
            "stale NodeId: {id:?} (current gen: {})",
            if id.idx < self.len {
                self.generation[id.idx as usize]
            } else {
                u32::MAX
            }
        );
    }

    fn validate_collection(&self, id: CollectionId) {
        assert!(
            (id.0 as usize) < self.collections.len(),
            "unknown {id:?}"
        );
    }

    fn validate_source(&self, id: SourceId) {
        assert!((id.0 as usize) < self.sources.len(), "unknown {id:?}");
    }

    fn validate_feature(&self, id: FeatureId) {
        assert!(self.is_feature_alive(id), "stale FeatureId: {id:?}");
    }
}
