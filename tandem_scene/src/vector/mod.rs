// Copyright 2026 the Tandem Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Vector layer synchronization.
//!
//! Each vector leaf becomes one [`LayerPrimitives`] set holding a primitive
//! per feature. Feature edits on the layer's source are mirrored
//! incrementally and inherited visibility becomes the set's `show` flag.

mod collection;
mod converter;
mod factory;

pub use collection::{LayerPrimitives, PrimitiveCollection, PrimitivesId};
pub use converter::{FeatureConverter, GeometryConverter, Primitive};
pub use factory::{VectorFactory, VectorHook};

use tandem_core::sync::Synchronizer;

/// Synchronizes a map subtree into a [`PrimitiveCollection`].
pub type VectorSynchronizer<V = GeometryConverter> = Synchronizer<VectorFactory<V>>;

#[cfg(test)]
mod tests {
    use kurbo::Point;
    use tandem_core::error::FactoryError;
    use tandem_core::lineage::LayerWithParents;
    use tandem_core::map::{
        FeatureId, Geometry, LeafKind, MapTree, NodeId, RasterSource, SourceId,
    };
    use tandem_core::sync::{NodeState, SyncConfig, Transition};

    use super::*;

    fn vector(tree: &mut MapTree, group: NodeId, source: SourceId) -> NodeId {
        let node = tree.create_layer_with_source(LeafKind::Vector, source);
        tree.add_to_group(group, node);
        node
    }

    fn start<V: FeatureConverter>(
        tree: &mut MapTree,
        root: NodeId,
        factory: VectorFactory<V>,
    ) -> VectorSynchronizer<V> {
        let mut sync = Synchronizer::new(tree, root, factory, SyncConfig::DEFAULT);
        sync.synchronize(tree).expect("no shared nodes");
        sync.check_invariants(tree);
        sync
    }

    fn set_of(sync: &VectorSynchronizer, node: NodeId) -> &LayerPrimitives {
        let id = sync.counterparts(node).expect("registered")[0];
        sync.factory().primitives().get(id)
    }

    #[test]
    fn features_become_primitives() {
        let mut tree = MapTree::new();
        let root = tree.create_group();
        let source = tree.create_feature_source();
        let point = tree.add_feature(source, Geometry::Point(Point::new(1.0, 2.0)));
        let line = tree.add_feature(
            source,
            Geometry::LineString(vec![Point::ZERO, Point::new(1.0, 1.0)]),
        );
        // Degenerate polygons are skipped.
        let sliver = tree.add_feature(source, Geometry::Polygon(vec![Point::ZERO]));
        let node = vector(&mut tree, root, source);
        let sync = start(&mut tree, root, VectorFactory::default());

        let set = set_of(&sync, node);
        assert_eq!(set.len(), 2);
        assert_eq!(
            set.get(point),
            Some(&Primitive::Billboard(Point::new(1.0, 2.0)))
        );
        assert!(matches!(set.get(line), Some(Primitive::Polyline(p)) if p.len() == 2));
        assert!(set.get(sliver).is_none());
        assert_eq!(sync.factory().primitives().len(), 1);
    }

    #[test]
    fn cluster_sources_are_unwrapped() {
        let mut tree = MapTree::new();
        let root = tree.create_group();
        let inner = tree.create_feature_source();
        let feature = tree.add_feature(inner, Geometry::Point(Point::ZERO));
        let cluster = tree.create_cluster_source(inner);
        let node = vector(&mut tree, root, cluster);
        let mut sync = start(&mut tree, root, VectorFactory::default());
        assert!(set_of(&sync, node).get(feature).is_some());

        // Edits land on the wrapped source.
        let added = tree.add_feature(inner, Geometry::Point(Point::new(3.0, 3.0)));
        sync.process(&mut tree).expect("no violations");
        assert_eq!(set_of(&sync, node).len(), 2);
        assert!(set_of(&sync, node).get(added).is_some());
    }

    #[test]
    fn feature_edits_are_mirrored() {
        let mut tree = MapTree::new();
        let root = tree.create_group();
        let source = tree.create_feature_source();
        let a = tree.add_feature(source, Geometry::Point(Point::ZERO));
        let b = tree.add_feature(source, Geometry::Point(Point::ZERO));
        let node = vector(&mut tree, root, source);
        let mut sync = start(&mut tree, root, VectorFactory::default());
        sync.factory_mut().primitives_mut().take_changes();

        tree.set_geometry(a, Geometry::Point(Point::new(5.0, 5.0)));
        tree.remove_feature(b);
        let c = tree.add_feature(source, Geometry::Point(Point::new(7.0, 7.0)));
        sync.process(&mut tree).expect("no violations");

        let set = set_of(&sync, node);
        assert_eq!(set.get(a), Some(&Primitive::Billboard(Point::new(5.0, 5.0))));
        assert!(set.get(b).is_none());
        assert_eq!(set.get(c), Some(&Primitive::Billboard(Point::new(7.0, 7.0))));
        let id = sync.counterparts(node).expect("registered")[0];
        let changes = sync.factory_mut().primitives_mut().take_changes();
        assert_eq!(changes.content, vec![id.index()]);
    }

    #[test]
    fn feature_added_then_removed_in_one_pass_leaves_nothing() {
        let mut tree = MapTree::new();
        let root = tree.create_group();
        let source = tree.create_feature_source();
        let node = vector(&mut tree, root, source);
        let mut sync = start(&mut tree, root, VectorFactory::default());

        let f = tree.add_feature(source, Geometry::Point(Point::ZERO));
        tree.remove_feature(f);
        sync.process(&mut tree).expect("no violations");
        assert!(set_of(&sync, node).is_empty());
    }

    #[test]
    fn visibility_is_inherited() {
        let mut tree = MapTree::new();
        let root = tree.create_group();
        let group = tree.create_group();
        tree.add_to_group(root, group);
        tree.set_visible(group, false);
        let source = tree.create_feature_source();
        let node = vector(&mut tree, group, source);
        let mut sync = start(&mut tree, root, VectorFactory::default());
        assert!(!set_of(&sync, node).show);

        tree.set_visible(group, true);
        sync.process(&mut tree).expect("no violations");
        assert!(set_of(&sync, node).show);
    }

    #[test]
    fn raster_source_on_a_vector_layer_is_unsupported() {
        let mut tree = MapTree::new();
        let root = tree.create_group();
        let source = tree.create_raster_source(RasterSource::new("t"));
        let node = vector(&mut tree, root, source);
        let mut sync = start(&mut tree, root, VectorFactory::default());

        let report = sync.take_report();
        assert!(report.records.iter().any(|r| r.node == node
            && r.transition == Transition::FactoryFailed(FactoryError::Unsupported)));
        assert_eq!(sync.node_state(node), Some(&NodeState::AwaitingRetry));
    }

    #[test]
    fn layer_without_source_registers_once_one_is_set() {
        let mut tree = MapTree::new();
        let root = tree.create_group();
        let node = tree.create_layer(LeafKind::Vector);
        tree.add_to_group(root, node);
        let tiles = tree.create_layer(LeafKind::Tile);
        tree.add_to_group(root, tiles);
        let mut sync = start(&mut tree, root, VectorFactory::default());
        assert_eq!(sync.node_state(node), Some(&NodeState::AwaitingRetry));

        let source = tree.create_feature_source();
        tree.add_feature(source, Geometry::Point(Point::ZERO));
        tree.set_source(node, Some(source));
        sync.process(&mut tree).expect("no violations");
        sync.check_invariants(&tree);
        assert_eq!(set_of(&sync, node).len(), 1);
        assert!(sync.counterparts(tiles).is_none());
    }

    #[test]
    fn switching_sources_follows_the_new_one() {
        let mut tree = MapTree::new();
        let root = tree.create_group();
        let old = tree.create_feature_source();
        let stale = tree.add_feature(old, Geometry::Point(Point::ZERO));
        let fresh = tree.create_feature_source();
        let kept = tree.add_feature(fresh, Geometry::Point(Point::new(1.0, 1.0)));
        let node = vector(&mut tree, root, old);
        let mut sync = start(&mut tree, root, VectorFactory::default());
        let before = sync.counterparts(node).expect("registered")[0];
        let listeners = sync.listener_count();

        tree.set_source(node, Some(fresh));
        sync.process(&mut tree).expect("no violations");
        sync.check_invariants(&tree);
        assert!(!sync.factory().primitives().is_alive(before));
        assert_eq!(sync.listener_count(), listeners);
        let set = set_of(&sync, node);
        assert!(set.get(stale).is_none());
        assert!(set.get(kept).is_some());

        // Edits on the old source no longer reach the layer.
        tree.add_feature(old, Geometry::Point(Point::new(2.0, 2.0)));
        let added = tree.add_feature(fresh, Geometry::Point(Point::new(3.0, 3.0)));
        sync.process(&mut tree).expect("no violations");
        let set = set_of(&sync, node);
        assert_eq!(set.len(), 2);
        assert!(set.get(added).is_some());
        assert_eq!(sync.factory().primitives().len(), 1);
    }

    #[test]
    fn clearing_the_source_defers_the_layer() {
        let mut tree = MapTree::new();
        let root = tree.create_group();
        let source = tree.create_feature_source();
        tree.add_feature(source, Geometry::Point(Point::ZERO));
        let node = vector(&mut tree, root, source);
        let mut sync = start(&mut tree, root, VectorFactory::default());

        tree.set_source(node, None);
        sync.process(&mut tree).expect("no violations");
        sync.check_invariants(&tree);
        assert_eq!(sync.node_state(node), Some(&NodeState::AwaitingRetry));
        assert!(sync.factory().primitives().is_empty());
    }

    #[derive(Default)]
    struct PointsOnly {
        seen: Vec<FeatureId>,
    }

    impl FeatureConverter for PointsOnly {
        fn convert(
            &mut self,
            _tree: &MapTree,
            _layer: &LayerWithParents,
            feature: FeatureId,
            geometry: &Geometry,
        ) -> Option<Primitive> {
            self.seen.push(feature);
            match geometry {
                Geometry::Point(p) => Some(Primitive::Billboard(*p)),
                _ => None,
            }
        }
    }

    #[test]
    fn custom_converter_decides_what_is_drawn() {
        let mut tree = MapTree::new();
        let root = tree.create_group();
        let source = tree.create_feature_source();
        tree.add_feature(source, Geometry::Point(Point::ZERO));
        tree.add_feature(
            source,
            Geometry::Polygon(vec![Point::ZERO, Point::new(1.0, 0.0), Point::new(0.0, 1.0)]),
        );
        let node = vector(&mut tree, root, source);
        let sync = start(&mut tree, root, VectorFactory::new(PointsOnly::default()));

        assert_eq!(sync.factory().converter().seen.len(), 2);
        let id = sync.counterparts(node).expect("registered")[0];
        assert_eq!(sync.factory().primitives().get(id).len(), 1);
    }

    #[test]
    fn removing_the_layer_releases_its_primitives() {
        let mut tree = MapTree::new();
        let root = tree.create_group();
        let source = tree.create_feature_source();
        let node = vector(&mut tree, root, source);
        let mut sync = start(&mut tree, root, VectorFactory::default());
        let id = sync.counterparts(node).expect("registered")[0];

        tree.remove_from_group(root, node);
        sync.process(&mut tree).expect("no violations");
        assert!(!sync.factory().primitives().is_alive(id));
        assert!(sync.factory().primitives().is_empty());

        // The source no longer reaches the released set.
        tree.add_feature(source, Geometry::Point(Point::ZERO));
        sync.process(&mut tree).expect("no violations");
    }
}
