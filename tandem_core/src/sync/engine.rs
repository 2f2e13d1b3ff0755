// Copyright 2026 the Tandem Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The synchronization engine.

use alloc::collections::VecDeque;
use alloc::vec::Vec;
use core::fmt;
use core::mem;

use super::config::{RetryPolicy, SyncConfig};
use super::factory::{CounterpartFactory, Counterparts, HookEffect};
use super::registry::{Handler, ListenerRegistry};
use super::report::{SyncReport, Transition};
use super::state::{GroupListeners, NodeState, SynchronizationState};
use crate::error::SyncError;
use crate::event::{LayerProperty, ListenerKey, SubscriberId, Topic, TreeEvent};
use crate::lineage::LayerWithParents;
use crate::map::{MapTree, NodeId};

/// Keeps a factory's target collection consistent with the subtree under
/// `root`.
///
/// The synchronizer owns one subscriber on the tree's event bus. The host
/// mutates the [`MapTree`] and then calls [`process`](Self::process), which
/// drains this synchronizer's inbox and runs the structural, retry,
/// inheritance, and ordering handlers synchronously.
///
/// # Per-node lifecycle
///
/// ```text
///              visit                  create Ok(Some)
/// unregistered ─────► (group?) ──no──► ───────────────► Registered
///                        │                 │ Ok(None) / Err
///                        │ yes             ▼
///                        │           AwaitingRetry ──Changed──► retry
///                        ▼
///     offered as composite ──declined──► Expanded { children }
/// ```
///
/// Removal returns any state to unregistered.
pub struct Synchronizer<F: CounterpartFactory> {
    root: NodeId,
    factory: F,
    config: SyncConfig,
    subscriber: SubscriberId,
    state: SynchronizationState<F::Counterpart>,
    registry: ListenerRegistry<F::Hook>,
    report: SyncReport,
}

impl<F: CounterpartFactory> fmt::Debug for Synchronizer<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Synchronizer")
            .field("root", &self.root)
            .field("config", &self.config)
            .field("subscriber", &self.subscriber)
            .field("visited", &self.state.counterparts_of.len())
            .field("listeners", &self.registry.len())
            .finish_non_exhaustive()
    }
}

impl<F: CounterpartFactory> Synchronizer<F> {
    /// Creates a synchronizer for the subtree under `root`.
    ///
    /// Nothing is created until [`synchronize`](Self::synchronize) is called.
    ///
    /// # Panics
    ///
    /// Panics if `root` is stale or not a group.
    pub fn new(tree: &mut MapTree, root: NodeId, factory: F, config: SyncConfig) -> Self {
        assert!(tree.is_group(root), "synchronized root must be a group");
        Self {
            root,
            factory,
            config,
            subscriber: tree.subscribe(),
            state: SynchronizationState::default(),
            registry: ListenerRegistry::default(),
            report: SyncReport::default(),
        }
    }

    // -- Public surface --

    /// Tears everything down and rebuilds from the root.
    ///
    /// Returns the first contract violation encountered during traversal
    /// (for example a node reachable twice). The rest of the tree is still
    /// synchronized.
    pub fn synchronize(&mut self, tree: &mut MapTree) -> Result<(), SyncError> {
        self.destroy_all(tree);
        self.report.rebuilds += 1;
        self.add_layers(tree, LayerWithParents::root(self.root))
    }

    /// Removes and destroys all counterparts, revokes every listener, and
    /// forgets every node.
    pub fn destroy_all(&mut self, tree: &mut MapTree) {
        self.factory.remove_all_objects(true);
        tree.bus_mut().release(self.subscriber);
        self.registry.clear();
        self.state.clear();
        self.report.teardowns += 1;
    }

    /// Dispatches every pending delivery for this synchronizer.
    ///
    /// Returns the number of deliveries handled. Deliveries whose listener
    /// was revoked in the meantime are skipped and not counted. Handling
    /// continues past a contract violation; the first one is returned.
    pub fn process(&mut self, tree: &mut MapTree) -> Result<usize, SyncError> {
        let mut handled = 0_usize;
        let mut result = Ok(());
        while let Some(delivery) = tree.poll(self.subscriber) {
            let Some(handler) = self.registry.get(delivery.key) else {
                continue;
            };
            handled += 1;
            self.report.events += 1;
            let outcome = self.dispatch(tree, delivery.key, handler, &delivery.event);
            result = result.and(outcome);
        }
        result.map(|()| handled)
    }

    /// Visits `seed` and everything below it, breadth-first.
    ///
    /// Visited groups get structural listeners. Groups other than the root
    /// are first offered to the factory as composites; declined groups are
    /// expanded into their children. Leaves are created, or armed for retry
    /// when the factory declines. [`CounterpartFactory::order_layers`] runs
    /// once at the end.
    pub fn add_layers(
        &mut self,
        tree: &mut MapTree,
        seed: LayerWithParents,
    ) -> Result<(), SyncError> {
        let mut result = Ok(());
        let mut queue = VecDeque::from([seed]);
        while let Some(layer) = queue.pop_front() {
            let node = layer.node;
            // Added and destroyed before this delivery was handled.
            if !layer.is_alive(tree) {
                continue;
            }
            if self.state.counterparts_of.contains_key(&node) {
                result = result.and(Err(SyncError::AlreadyRegistered(node)));
                continue;
            }
            let Some(children) = tree.children(node).map(<[NodeId]>::to_vec) else {
                self.state.node_listeners.insert(node, Vec::new());
                if !self.try_register(tree, &layer, false) {
                    self.defer(tree, &layer);
                }
                continue;
            };

            if self.state.group_listeners.contains_key(&node) {
                result = result.and(Err(SyncError::AlreadyListening(node)));
                continue;
            }
            self.state.node_listeners.insert(node, Vec::new());
            self.listen_for_group_changes(tree, &layer);

            let is_root = node == self.root;
            if !is_root && self.try_register(tree, &layer, false) {
                continue;
            }
            self.report.record(node, Transition::Expanded);
            queue.extend(children.iter().map(|&c| layer.child(c, is_root)));
            self.state
                .counterparts_of
                .insert(node, NodeState::Expanded { children });
        }
        self.order_layers(tree);
        result
    }

    /// Tears down `node` and, for expanded groups, everything recorded
    /// below it, breadth-first.
    ///
    /// Counterparts are removed from the target and destroyed, node
    /// listeners (including a pending retry) and group listeners are
    /// revoked, then the entries are deleted. The root's structural
    /// listeners survive; only [`destroy_all`](Self::destroy_all) drops
    /// them.
    pub fn remove_layer(&mut self, tree: &mut MapTree, node: NodeId) -> Result<(), SyncError> {
        let mut result = Ok(());
        let mut queue = VecDeque::from([node]);
        while let Some(node) = queue.pop_front() {
            let Some(state) = self.state.counterparts_of.get_mut(&node) else {
                result = result.and(Err(SyncError::NotRegistered(node)));
                continue;
            };
            let state = mem::replace(state, NodeState::AwaitingRetry);
            let destroyed = match state {
                NodeState::Registered(objects) => {
                    let n = objects.len();
                    for object in objects {
                        self.factory.remove_single_object(&object, false);
                        self.factory.destroy_object(object);
                    }
                    n
                }
                NodeState::Expanded { children } => {
                    queue.extend(children);
                    0
                }
                NodeState::AwaitingRetry => 0,
            };
            for key in self.state.node_listeners.remove(&node).unwrap_or_default() {
                self.registry.revoke(tree, key);
            }
            if node != self.root {
                if let Some(group) = self.state.group_listeners.remove(&node) {
                    for key in group.keys() {
                        self.registry.revoke(tree, key);
                    }
                }
            }
            self.state.counterparts_of.remove(&node);
            self.report.record(
                node,
                Transition::Removed {
                    counterparts: destroyed,
                },
            );
        }
        result
    }

    // -- Read API --

    /// Returns the synchronized root.
    #[must_use]
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> SyncConfig {
        self.config
    }

    /// Returns this synchronizer's bus subscriber.
    #[must_use]
    pub fn subscriber(&self) -> SubscriberId {
        self.subscriber
    }

    /// Returns the per-node maps.
    #[must_use]
    pub fn state(&self) -> &SynchronizationState<F::Counterpart> {
        &self.state
    }

    /// Returns the counterparts of a registered node.
    #[must_use]
    pub fn counterparts(&self, node: NodeId) -> Option<&[F::Counterpart]> {
        self.state.counterparts(node)
    }

    /// Returns the lifecycle state of a visited node.
    #[must_use]
    pub fn node_state(&self, node: NodeId) -> Option<&NodeState<F::Counterpart>> {
        self.state.node_state(node)
    }

    /// Iterates the nodes that currently have counterparts.
    pub fn registered_nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.state.registered_nodes()
    }

    /// Returns whether structural listeners are attached to `group`.
    #[must_use]
    pub fn is_listening_group(&self, group: NodeId) -> bool {
        self.state.group_listeners.contains_key(&group)
    }

    /// Returns the number of live listeners owned by this synchronizer.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.registry.len()
    }

    /// Returns the factory.
    #[must_use]
    pub fn factory(&self) -> &F {
        &self.factory
    }

    /// Returns the factory mutably.
    pub fn factory_mut(&mut self) -> &mut F {
        &mut self.factory
    }

    /// Returns and resets the changes accumulated since the last call.
    pub fn take_report(&mut self) -> SyncReport {
        mem::take(&mut self.report)
    }

    /// Asserts the bookkeeping invariants.
    ///
    /// Every visited node has both a state entry and a listener entry, every
    /// visited non-root group has structural listeners and nothing else
    /// does, and every recorded key is live on the bus.
    ///
    /// # Panics
    ///
    /// Panics with a description of the first violation found.
    pub fn check_invariants(&self, tree: &MapTree) {
        let state = &self.state;
        for node in state.counterparts_of.keys() {
            assert!(
                state.node_listeners.contains_key(node),
                "{node:?} has a state entry but no listener entry"
            );
        }
        for node in state.node_listeners.keys() {
            assert!(
                state.counterparts_of.contains_key(node),
                "{node:?} has listeners but no state entry"
            );
        }
        for (&node, node_state) in &state.counterparts_of {
            let is_group = tree.is_alive(node) && tree.is_group(node);
            if is_group && node != self.root {
                assert!(
                    state.group_listeners.contains_key(&node),
                    "visited group {node:?} has no structural listeners"
                );
            }
            if let NodeState::Expanded { children } = node_state {
                for child in children {
                    assert!(
                        state.counterparts_of.contains_key(child),
                        "recorded child {child:?} of {node:?} was never visited"
                    );
                }
            }
        }
        for &group in state.group_listeners.keys() {
            assert!(
                group == self.root || state.counterparts_of.contains_key(&group),
                "{group:?} has structural listeners but was not visited"
            );
        }
        let mut recorded = 0;
        let keys = state
            .node_listeners
            .values()
            .flatten()
            .copied()
            .chain(state.group_listeners.values().flat_map(GroupListeners::keys));
        for key in keys {
            recorded += 1;
            assert!(self.registry.contains(key), "{key:?} has no handler");
            assert!(tree.bus().is_listening(key), "{key:?} is not live on the bus");
        }
        assert_eq!(
            recorded,
            self.registry.len(),
            "handlers exist for keys no node owns"
        );
    }

    // -- Dispatch --

    fn dispatch(
        &mut self,
        tree: &mut MapTree,
        key: ListenerKey,
        handler: Handler<F::Hook>,
        event: &TreeEvent,
    ) -> Result<(), SyncError> {
        // Handlers holding a destroyed node have nothing left to update. Its
        // queued `Removed` delivery tears the entry down.
        if let Some(layer) = handler.layer() {
            if !layer.is_alive(tree) {
                return Ok(());
            }
        }
        match handler {
            Handler::ChildAdded { group } => match *event {
                TreeEvent::Added { node, .. } => self.on_child_added(tree, &group, node),
                _ => Ok(()),
            },
            Handler::ChildRemoved { group } => match *event {
                TreeEvent::Removed { node, .. } => self.on_child_removed(tree, group, node),
                _ => Ok(()),
            },
            Handler::LayersReplaced { group } => self.on_layers_replaced(tree, &group),
            Handler::Retry { layer } => {
                self.retry(tree, key, &layer);
                Ok(())
            }
            Handler::Inherited { layer } => {
                if let Some(NodeState::Registered(objects)) =
                    self.state.counterparts_of.get(&layer.node)
                {
                    self.factory.update_inherited(tree, &layer, objects);
                }
                Ok(())
            }
            Handler::Reorder => {
                self.order_layers(tree);
                Ok(())
            }
            Handler::Hook { layer, hook } => {
                let effect = match self.state.counterparts_of.get(&layer.node) {
                    Some(NodeState::Registered(objects)) => {
                        self.factory.on_hook(tree, &layer, hook, event, objects)
                    }
                    _ => HookEffect::None,
                };
                match effect {
                    HookEffect::None => Ok(()),
                    HookEffect::Reorder => {
                        self.order_layers(tree);
                        Ok(())
                    }
                    HookEffect::Recreate => self
                        .remove_layer(tree, layer.node)
                        .and(self.add_layers(tree, layer)),
                    HookEffect::Resynchronize => self.synchronize(tree),
                }
            }
        }
    }

    fn on_child_added(
        &mut self,
        tree: &mut MapTree,
        group: &LayerWithParents,
        child: NodeId,
    ) -> Result<(), SyncError> {
        // A composite counterpart already stands for the whole subtree.
        if !matches!(
            self.state.counterparts_of.get(&group.node),
            Some(NodeState::Expanded { .. })
        ) {
            return Ok(());
        }
        if self.state.counterparts_of.contains_key(&child) {
            return Err(SyncError::AlreadyRegistered(child));
        }
        let is_root = group.node == self.root;
        let result = self.add_layers(tree, group.child(child, is_root));
        if !self.state.counterparts_of.contains_key(&child) {
            return result;
        }
        if let Some(NodeState::Expanded { children }) =
            self.state.counterparts_of.get_mut(&group.node)
        {
            children.push(child);
        }
        result
    }

    fn on_child_removed(
        &mut self,
        tree: &mut MapTree,
        group: NodeId,
        child: NodeId,
    ) -> Result<(), SyncError> {
        let Some(NodeState::Expanded { children }) = self.state.counterparts_of.get_mut(&group)
        else {
            return Ok(());
        };
        // Duplicate adds were rejected, so a stray remove has nothing to undo.
        let Some(pos) = children.iter().position(|&c| c == child) else {
            return Ok(());
        };
        children.remove(pos);
        self.remove_layer(tree, child)
    }

    fn on_layers_replaced(
        &mut self,
        tree: &mut MapTree,
        group: &LayerWithParents,
    ) -> Result<(), SyncError> {
        let node = group.node;
        let Some(listeners) = self.state.group_listeners.get(&node).copied() else {
            return Ok(());
        };
        for key in listeners.content {
            self.registry.revoke(tree, key);
        }
        let collection = tree.layers(node);
        let content = self.listen_for_content(tree, group);
        self.state.group_listeners.insert(
            node,
            GroupListeners {
                replaced: listeners.replaced,
                content,
                collection,
            },
        );

        let Some(NodeState::Expanded { children }) = self.state.counterparts_of.get(&node) else {
            return Ok(());
        };
        let current = tree.collection(collection);
        let stale: Vec<NodeId> = children
            .iter()
            .filter(|c| !current.contains(c))
            .copied()
            .collect();
        let fresh: Vec<NodeId> = current
            .iter()
            .filter(|c| !children.contains(c))
            .copied()
            .collect();

        let mut result = Ok(());
        for child in stale {
            result = result.and(self.on_child_removed(tree, node, child));
        }
        for child in fresh {
            result = result.and(self.on_child_added(tree, group, child));
        }
        self.order_layers(tree);
        result
    }

    fn retry(&mut self, tree: &mut MapTree, key: ListenerKey, layer: &LayerWithParents) {
        let node = layer.node;
        self.registry.revoke(tree, key);
        if let Some(keys) = self.state.node_listeners.get_mut(&node) {
            keys.retain(|&k| k != key);
        }
        if !matches!(
            self.state.counterparts_of.get(&node),
            Some(NodeState::AwaitingRetry)
        ) {
            return;
        }
        if self.try_register(tree, layer, true) {
            self.order_layers(tree);
        } else if self.config.retry == RetryPolicy::UntilReady {
            self.arm_retry(tree, layer);
        }
    }

    // -- Registration --

    /// Asks the factory for counterparts and registers them.
    ///
    /// Returns `false` if the factory declined or failed.
    fn try_register(&mut self, tree: &mut MapTree, layer: &LayerWithParents, retry: bool) -> bool {
        let created = match self.factory.create_single_layer_counterparts(tree, layer) {
            Ok(created) => created,
            Err(err) => {
                self.report
                    .record(layer.node, Transition::FactoryFailed(err));
                None
            }
        };
        let Some(created) = created else {
            return false;
        };
        let counterparts = self.register(tree, layer, created);
        let transition = if retry {
            Transition::Retried { counterparts }
        } else {
            Transition::Registered { counterparts }
        };
        self.report.record(layer.node, transition);
        true
    }

    fn register(
        &mut self,
        tree: &mut MapTree,
        layer: &LayerWithParents,
        created: Counterparts<F::Counterpart, F::Hook>,
    ) -> usize {
        let node = layer.node;
        let mut keys = Vec::new();
        for n in layer.lineage() {
            for property in [LayerProperty::Visible, LayerProperty::Opacity] {
                keys.push(self.registry.listen(
                    tree,
                    self.subscriber,
                    Topic::Property(n, property),
                    Handler::Inherited {
                        layer: layer.clone(),
                    },
                ));
            }
        }
        keys.push(self.registry.listen(
            tree,
            self.subscriber,
            Topic::Property(node, LayerProperty::ZIndex),
            Handler::Reorder,
        ));
        for (topic, hook) in created.hooks {
            keys.push(self.registry.listen(
                tree,
                self.subscriber,
                topic,
                Handler::Hook {
                    layer: layer.clone(),
                    hook,
                },
            ));
        }
        self.state.node_listeners.entry(node).or_default().extend(keys);

        let objects = created.objects;
        self.factory.update_inherited(tree, layer, &objects);
        for object in &objects {
            self.factory.add_object(object);
        }
        let n = objects.len();
        self.state
            .counterparts_of
            .insert(node, NodeState::Registered(objects));
        n
    }

    fn defer(&mut self, tree: &mut MapTree, layer: &LayerWithParents) {
        self.state
            .counterparts_of
            .insert(layer.node, NodeState::AwaitingRetry);
        self.report.record(layer.node, Transition::Deferred);
        self.arm_retry(tree, layer);
    }

    fn arm_retry(&mut self, tree: &mut MapTree, layer: &LayerWithParents) {
        let key = self.registry.listen(
            tree,
            self.subscriber,
            Topic::Changed(layer.node),
            Handler::Retry {
                layer: layer.clone(),
            },
        );
        self.state
            .node_listeners
            .entry(layer.node)
            .or_default()
            .push(key);
    }

    fn listen_for_group_changes(&mut self, tree: &mut MapTree, group: &LayerWithParents) {
        let replaced = self.registry.listen(
            tree,
            self.subscriber,
            Topic::LayersReplaced(group.node),
            Handler::LayersReplaced {
                group: group.clone(),
            },
        );
        let content = self.listen_for_content(tree, group);
        self.state.group_listeners.insert(
            group.node,
            GroupListeners {
                replaced,
                content,
                collection: tree.layers(group.node),
            },
        );
    }

    fn listen_for_content(
        &mut self,
        tree: &mut MapTree,
        group: &LayerWithParents,
    ) -> [ListenerKey; 2] {
        let collection = tree.layers(group.node);
        let added = self.registry.listen(
            tree,
            self.subscriber,
            Topic::CollectionAdd(collection),
            Handler::ChildAdded {
                group: group.clone(),
            },
        );
        let removed = self.registry.listen(
            tree,
            self.subscriber,
            Topic::CollectionRemove(collection),
            Handler::ChildRemoved { group: group.node },
        );
        [added, removed]
    }

    fn order_layers(&mut self, tree: &MapTree) {
        self.factory.order_layers(tree, self.root, &self.state);
        self.report.reorders += 1;
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec;
    use alloc::vec::Vec;

    use hashbrown::{HashMap, HashSet};

    use super::*;
    use crate::error::FactoryError;
    use crate::map::{CollectionId, LeafKind};
    use crate::sync::stacking_order;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    struct Obj {
        node: NodeId,
        serial: u32,
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    enum MockHook {
        Raise,
        Rebuild,
        Replace,
    }

    /// Records every call and keeps a target list ordered bottom to top.
    #[derive(Debug, Default)]
    struct MockFactory {
        not_ready: HashSet<NodeId>,
        failing: HashSet<NodeId>,
        composite: HashSet<NodeId>,
        hooks: HashMap<NodeId, (Topic, MockHook)>,
        target: Vec<Obj>,
        destroyed: Vec<Obj>,
        created: Vec<NodeId>,
        inherited: HashMap<NodeId, (bool, f64)>,
        hook_calls: Vec<MockHook>,
        remove_all_calls: usize,
        order_calls: usize,
        serial: u32,
    }

    impl CounterpartFactory for MockFactory {
        type Counterpart = Obj;
        type Hook = MockHook;

        fn create_single_layer_counterparts(
            &mut self,
            tree: &MapTree,
            layer: &LayerWithParents,
        ) -> Result<Option<Counterparts<Obj, MockHook>>, FactoryError> {
            let node = layer.node;
            if self.failing.contains(&node) {
                return Err(FactoryError::Unsupported);
            }
            if self.not_ready.contains(&node)
                || (tree.is_group(node) && !self.composite.contains(&node))
            {
                return Ok(None);
            }
            self.serial += 1;
            self.created.push(node);
            let mut created = Counterparts::single(Obj {
                node,
                serial: self.serial,
            });
            if let Some(&(topic, hook)) = self.hooks.get(&node) {
                created = created.with_hook(topic, hook);
            }
            Ok(Some(created))
        }

        fn add_object(&mut self, counterpart: &Obj) {
            self.target.push(*counterpart);
        }

        fn remove_single_object(&mut self, counterpart: &Obj, destroy: bool) {
            self.target.retain(|o| o != counterpart);
            if destroy {
                self.destroyed.push(*counterpart);
            }
        }

        fn remove_all_objects(&mut self, destroy: bool) {
            self.remove_all_calls += 1;
            if destroy {
                self.destroyed.append(&mut self.target);
            }
            self.target.clear();
        }

        fn destroy_object(&mut self, counterpart: Obj) {
            self.destroyed.push(counterpart);
        }

        fn order_layers(&mut self, tree: &MapTree, root: NodeId, state: &SynchronizationState<Obj>) {
            self.order_calls += 1;
            for node in stacking_order(tree, root) {
                for object in state.counterparts(node).unwrap_or_default() {
                    self.target.retain(|o| o != object);
                    self.target.push(*object);
                }
            }
        }

        fn update_inherited(&mut self, tree: &MapTree, layer: &LayerWithParents, _: &[Obj]) {
            self.inherited.insert(
                layer.node,
                (
                    layer.inherited_visible(tree),
                    layer.inherited_opacity(tree),
                ),
            );
        }

        fn on_hook(
            &mut self,
            _: &MapTree,
            _: &LayerWithParents,
            hook: MockHook,
            _: &TreeEvent,
            _: &[Obj],
        ) -> HookEffect {
            self.hook_calls.push(hook);
            match hook {
                MockHook::Raise => HookEffect::Reorder,
                MockHook::Rebuild => HookEffect::Resynchronize,
                MockHook::Replace => HookEffect::Recreate,
            }
        }
    }

    type MockSync = Synchronizer<MockFactory>;

    fn leaf(tree: &mut MapTree, group: NodeId, z: Option<f64>) -> NodeId {
        let node = tree.create_layer(LeafKind::Tile);
        tree.set_z_index(node, z);
        tree.add_to_group(group, node);
        node
    }

    fn setup() -> (MapTree, NodeId) {
        let mut tree = MapTree::new();
        let root = tree.create_group();
        (tree, root)
    }

    fn sync_with(tree: &mut MapTree, root: NodeId, factory: MockFactory) -> MockSync {
        let mut sync = Synchronizer::new(tree, root, factory, SyncConfig::DEFAULT);
        sync.synchronize(tree).expect("tree has no shared nodes");
        sync.check_invariants(tree);
        sync
    }

    fn target_order(sync: &MockSync) -> Vec<NodeId> {
        sync.factory().target.iter().map(|o| o.node).collect()
    }

    fn sorted(nodes: impl Iterator<Item = NodeId>) -> Vec<NodeId> {
        let mut nodes: Vec<_> = nodes.collect();
        nodes.sort();
        nodes
    }

    // -- Structural add / incremental add / removal --

    #[test]
    fn structural_add_orders_by_z_index() {
        let (mut tree, g) = setup();
        let a = leaf(&mut tree, g, Some(0.0));
        let b = leaf(&mut tree, g, Some(1.0));

        let sync = sync_with(&mut tree, g, MockFactory::default());

        assert_eq!(sorted(sync.registered_nodes()), sorted([a, b].into_iter()));
        assert_eq!(target_order(&sync), vec![a, b]);
    }

    #[test]
    fn structural_add_sorts_against_document_order() {
        let (mut tree, g) = setup();
        let b = leaf(&mut tree, g, Some(1.0));
        let a = leaf(&mut tree, g, None);

        let sync = sync_with(&mut tree, g, MockFactory::default());
        assert_eq!(target_order(&sync), vec![a, b]);
    }

    #[test]
    fn incremental_add_registers_only_the_new_node() {
        let (mut tree, g) = setup();
        let a = leaf(&mut tree, g, Some(0.0));
        let b = leaf(&mut tree, g, Some(1.0));
        let mut sync = sync_with(&mut tree, g, MockFactory::default());
        sync.take_report();

        let c = leaf(&mut tree, g, Some(0.5));
        sync.process(&mut tree).expect("no violations");
        sync.check_invariants(&tree);

        let report = sync.take_report();
        assert_eq!(report.registered().collect::<Vec<_>>(), vec![c]);
        assert_eq!(report.reorders, 1);
        assert_eq!(target_order(&sync), vec![a, c, b]);
        assert_eq!(sync.factory().created.len(), 3, "A and B not recreated");
    }

    #[test]
    fn removal_is_isolated() {
        let (mut tree, g) = setup();
        let a = leaf(&mut tree, g, Some(0.0));
        let b = leaf(&mut tree, g, Some(1.0));
        let mut sync = sync_with(&mut tree, g, MockFactory::default());
        let c = leaf(&mut tree, g, Some(0.5));
        sync.process(&mut tree).expect("no violations");
        let a_obj = sync.counterparts(a).expect("A registered")[0];
        let b_obj = sync.counterparts(b).expect("B registered")[0];

        tree.remove_from_group(g, b);
        sync.process(&mut tree).expect("no violations");
        sync.check_invariants(&tree);

        assert!(sync.node_state(b).is_none());
        assert_eq!(sync.factory().destroyed, vec![b_obj]);
        assert_eq!(sync.counterparts(a), Some(&[a_obj][..]));
        assert_eq!(target_order(&sync), vec![a, c]);
    }

    #[test]
    fn removing_expanded_group_tears_down_subtree() {
        let (mut tree, root) = setup();
        let g = tree.create_group();
        tree.add_to_group(root, g);
        let inner = tree.create_group();
        tree.add_to_group(g, inner);
        let a = leaf(&mut tree, g, None);
        let b = leaf(&mut tree, inner, None);
        let mut sync = sync_with(&mut tree, root, MockFactory::default());
        assert!(sync.is_listening_group(inner));
        let before = tree.bus().listener_count_for(sync.subscriber());

        tree.remove_from_group(root, g);
        sync.process(&mut tree).expect("no violations");
        sync.check_invariants(&tree);

        for node in [g, inner, a, b] {
            assert!(sync.node_state(node).is_none(), "{node:?} still tracked");
        }
        assert!(!sync.is_listening_group(g));
        assert!(!sync.is_listening_group(inner));
        assert!(sync.factory().target.is_empty());
        assert_eq!(sync.factory().destroyed.len(), 2);
        assert!(tree.bus().listener_count_for(sync.subscriber()) < before);
        assert_eq!(
            tree.bus().listener_count_for(sync.subscriber()),
            sync.listener_count()
        );
    }

    #[test]
    fn removal_uses_recorded_children_not_the_live_tree() {
        let (mut tree, root) = setup();
        let g = tree.create_group();
        tree.add_to_group(root, g);
        let a = leaf(&mut tree, g, None);
        let mut sync = sync_with(&mut tree, root, MockFactory::default());

        // Detach G first, then empty it; the second event is no longer
        // observed once G's listeners are gone.
        tree.remove_from_group(root, g);
        tree.remove_from_group(g, a);
        sync.process(&mut tree).expect("no violations");
        sync.check_invariants(&tree);

        assert!(sync.node_state(a).is_none());
        assert!(sync.factory().target.is_empty());
    }

    // -- Invariants --

    #[test]
    fn destroy_all_leaves_nothing_behind() {
        let (mut tree, root) = setup();
        let g = tree.create_group();
        tree.add_to_group(root, g);
        let _a = leaf(&mut tree, g, None);
        let pending = leaf(&mut tree, root, None);
        let mut factory = MockFactory::default();
        factory.not_ready.insert(pending);
        let mut sync = sync_with(&mut tree, root, factory);
        let remove_all_before = sync.factory().remove_all_calls;

        sync.destroy_all(&mut tree);
        sync.check_invariants(&tree);

        assert!(sync.state().is_empty());
        assert_eq!(sync.listener_count(), 0);
        assert_eq!(tree.bus().listener_count_for(sync.subscriber()), 0);
        assert_eq!(sync.factory().remove_all_calls, remove_all_before + 1);
        assert!(sync.factory().target.is_empty());

        // Nothing reacts any more.
        tree.touch(pending);
        leaf(&mut tree, root, None);
        assert_eq!(sync.process(&mut tree), Ok(0));
    }

    #[test]
    fn adding_a_registered_node_again_is_rejected() {
        let (mut tree, root) = setup();
        let a = leaf(&mut tree, root, None);
        let mut sync = sync_with(&mut tree, root, MockFactory::default());

        assert_eq!(
            sync.add_layers(&mut tree, LayerWithParents::root(a)),
            Err(SyncError::AlreadyRegistered(a))
        );
        assert_eq!(sync.factory().created, vec![a]);
        assert_eq!(sync.counterparts(a).map(<[Obj]>::len), Some(1));
        sync.check_invariants(&tree);
    }

    #[test]
    fn duplicate_child_event_is_rejected() {
        let (mut tree, root) = setup();
        let a = leaf(&mut tree, root, None);
        let mut sync = sync_with(&mut tree, root, MockFactory::default());

        let layers = tree.layers(root);
        tree.push_layer(layers, a);
        assert_eq!(
            sync.process(&mut tree),
            Err(SyncError::AlreadyRegistered(a))
        );
        assert_eq!(sync.factory().target.len(), 1);
        sync.check_invariants(&tree);
    }

    #[test]
    fn synchronize_reports_shared_nodes_but_finishes() {
        let (mut tree, root) = setup();
        let g1 = tree.create_group();
        let g2 = tree.create_group();
        tree.add_to_group(root, g1);
        tree.add_to_group(root, g2);
        let shared = leaf(&mut tree, g1, None);
        tree.add_to_group(g2, shared);
        let other = leaf(&mut tree, g2, None);

        let mut sync = Synchronizer::new(&mut tree, root, MockFactory::default(), SyncConfig::DEFAULT);
        assert_eq!(
            sync.synchronize(&mut tree),
            Err(SyncError::AlreadyRegistered(shared))
        );
        assert!(sync.counterparts(other).is_some());
        assert_eq!(sync.factory().target.len(), 2);
        sync.check_invariants(&tree);
    }

    #[test]
    fn removing_unknown_node_is_a_contract_violation() {
        let (mut tree, root) = setup();
        let stranger = tree.create_layer(LeafKind::Image);
        let mut sync = sync_with(&mut tree, root, MockFactory::default());
        assert_eq!(
            sync.remove_layer(&mut tree, stranger),
            Err(SyncError::NotRegistered(stranger))
        );
    }

    #[test]
    fn synchronize_twice_is_idempotent() {
        let (mut tree, root) = setup();
        let g = tree.create_group();
        tree.add_to_group(root, g);
        leaf(&mut tree, g, Some(2.0));
        leaf(&mut tree, root, Some(1.0));
        leaf(&mut tree, g, None);
        let mut sync = sync_with(&mut tree, root, MockFactory::default());
        let keys = sorted(sync.state().visited_nodes());
        let order = target_order(&sync);
        let listeners = sync.listener_count();

        sync.synchronize(&mut tree).expect("no violations");
        sync.check_invariants(&tree);

        assert_eq!(sorted(sync.state().visited_nodes()), keys);
        assert_eq!(target_order(&sync), order);
        assert_eq!(sync.listener_count(), listeners);
        assert_eq!(tree.bus().listener_count_for(sync.subscriber()), listeners);
    }

    // -- Deferred readiness --

    #[test]
    fn deferred_node_registers_on_first_change_after_ready() {
        let (mut tree, root) = setup();
        let a = leaf(&mut tree, root, Some(1.0));
        let d = leaf(&mut tree, root, None);
        let mut factory = MockFactory::default();
        factory.not_ready.insert(d);
        let mut sync = sync_with(&mut tree, root, factory);

        assert_eq!(sync.node_state(d), Some(&NodeState::AwaitingRetry));
        assert!(sync.counterparts(d).is_none());
        let orders = sync.factory().order_calls;

        sync.factory_mut().not_ready.remove(&d);
        tree.touch(d);
        sync.process(&mut tree).expect("no violations");
        sync.check_invariants(&tree);

        assert_eq!(sync.counterparts(d).map(<[Obj]>::len), Some(1));
        assert_eq!(sync.factory().order_calls, orders + 1);
        assert_eq!(target_order(&sync), vec![d, a]);

        // The retry was one-shot.
        tree.touch(d);
        sync.process(&mut tree).expect("no violations");
        assert_eq!(sync.factory().created.iter().filter(|&&n| n == d).count(), 1);
    }

    #[test]
    fn deferred_node_keeps_waiting_until_ready() {
        let (mut tree, root) = setup();
        let d = leaf(&mut tree, root, None);
        let mut factory = MockFactory::default();
        factory.not_ready.insert(d);
        let mut sync = sync_with(&mut tree, root, factory);

        tree.touch(d);
        sync.process(&mut tree).expect("no violations");
        sync.check_invariants(&tree);
        assert_eq!(sync.node_state(d), Some(&NodeState::AwaitingRetry));
        assert_eq!(sync.state().node_listeners(d).map(<[_]>::len), Some(1));

        sync.factory_mut().not_ready.remove(&d);
        tree.touch(d);
        sync.process(&mut tree).expect("no violations");
        assert!(sync.counterparts(d).is_some());
        let report = sync.take_report();
        assert!(report.records.iter().any(|r| r.node == d
            && r.transition == Transition::Retried { counterparts: 1 }));
    }

    #[test]
    fn one_shot_policy_parks_the_node() {
        let (mut tree, root) = setup();
        let d = leaf(&mut tree, root, None);
        let mut factory = MockFactory::default();
        factory.not_ready.insert(d);
        let mut sync = Synchronizer::new(&mut tree, root, factory, SyncConfig::one_shot());
        sync.synchronize(&mut tree).expect("no violations");

        tree.touch(d);
        sync.process(&mut tree).expect("no violations");
        sync.check_invariants(&tree);
        assert_eq!(sync.node_state(d), Some(&NodeState::AwaitingRetry));
        assert_eq!(sync.state().node_listeners(d), Some(&[][..]));

        sync.factory_mut().not_ready.remove(&d);
        tree.touch(d);
        sync.process(&mut tree).expect("no violations");
        assert!(sync.counterparts(d).is_none());

        // Removal of a parked node still works.
        tree.remove_from_group(root, d);
        sync.process(&mut tree).expect("no violations");
        assert!(sync.node_state(d).is_none());
    }

    #[test]
    fn removing_pending_node_revokes_its_retry() {
        let (mut tree, root) = setup();
        let d = leaf(&mut tree, root, None);
        let mut factory = MockFactory::default();
        factory.not_ready.insert(d);
        let mut sync = sync_with(&mut tree, root, factory);

        tree.remove_from_group(root, d);
        sync.process(&mut tree).expect("no violations");
        sync.check_invariants(&tree);
        assert!(sync.node_state(d).is_none());

        sync.factory_mut().not_ready.remove(&d);
        tree.touch(d);
        assert_eq!(sync.process(&mut tree), Ok(0));
        assert!(sync.factory().created.is_empty());
    }

    #[test]
    fn factory_failure_is_treated_as_not_ready() {
        let (mut tree, root) = setup();
        let f = leaf(&mut tree, root, None);
        let mut factory = MockFactory::default();
        factory.failing.insert(f);
        let mut sync = sync_with(&mut tree, root, factory);

        assert_eq!(sync.node_state(f), Some(&NodeState::AwaitingRetry));
        let report = sync.take_report();
        assert!(report.records.contains(&crate::sync::LifecycleRecord {
            node: f,
            transition: Transition::FactoryFailed(FactoryError::Unsupported),
        }));

        sync.factory_mut().failing.remove(&f);
        tree.touch(f);
        sync.process(&mut tree).expect("no violations");
        assert!(sync.counterparts(f).is_some());
    }

    // -- Collection swap --

    #[test]
    fn collection_swap_moves_listeners_to_new_collection() {
        let (mut tree, root) = setup();
        let g = tree.create_group();
        tree.add_to_group(root, g);
        let mut sync = sync_with(&mut tree, root, MockFactory::default());
        let old = tree.layers(g);
        let new = tree.create_collection();

        tree.set_layers(g, new);
        sync.process(&mut tree).expect("no violations");
        sync.check_invariants(&tree);
        assert_eq!(
            sync.state().group_listeners(g).map(GroupListeners::collection),
            Some(new)
        );

        let x = tree.create_layer(LeafKind::Tile);
        tree.push_layer(new, x);
        sync.process(&mut tree).expect("no violations");
        assert!(sync.counterparts(x).is_some());

        let y = tree.create_layer(LeafKind::Tile);
        tree.push_layer(old, y);
        assert_eq!(sync.process(&mut tree), Ok(0));
        assert!(sync.node_state(y).is_none());
        sync.check_invariants(&tree);
    }

    #[test]
    fn collection_swap_reconciles_children() {
        let (mut tree, root) = setup();
        let g = tree.create_group();
        tree.add_to_group(root, g);
        let kept = leaf(&mut tree, g, Some(1.0));
        let dropped = leaf(&mut tree, g, None);
        let mut sync = sync_with(&mut tree, root, MockFactory::default());

        let new: CollectionId = tree.create_collection();
        let added = tree.create_layer(LeafKind::Image);
        tree.push_layer(new, kept);
        tree.push_layer(new, added);
        tree.set_layers(g, new);
        sync.process(&mut tree).expect("no violations");
        sync.check_invariants(&tree);

        assert!(sync.node_state(dropped).is_none());
        assert!(sync.counterparts(added).is_some());
        assert_eq!(sync.factory().created.iter().filter(|&&n| n == kept).count(), 1);
        assert_eq!(target_order(&sync), vec![added, kept]);
    }

    #[test]
    fn root_collection_swap_is_followed() {
        let (mut tree, root) = setup();
        let a = leaf(&mut tree, root, None);
        let mut sync = sync_with(&mut tree, root, MockFactory::default());

        let new = tree.create_collection();
        tree.set_layers(root, new);
        let b = tree.create_layer(LeafKind::Tile);
        tree.push_layer(new, b);
        sync.process(&mut tree).expect("no violations");
        sync.check_invariants(&tree);

        assert!(sync.node_state(a).is_none());
        assert!(sync.counterparts(b).is_some());
    }

    // -- Groups --

    #[test]
    fn composite_group_hides_its_children() {
        let (mut tree, root) = setup();
        let g = tree.create_group();
        tree.add_to_group(root, g);
        let inside = leaf(&mut tree, g, None);
        let mut factory = MockFactory::default();
        factory.composite.insert(g);
        let mut sync = sync_with(&mut tree, root, factory);

        assert!(sync.counterparts(g).is_some());
        assert!(sync.node_state(inside).is_none());
        assert!(sync.is_listening_group(g));

        leaf(&mut tree, g, None);
        tree.remove_from_group(g, inside);
        sync.process(&mut tree).expect("no violations");
        assert_eq!(target_order(&sync), vec![g]);
        sync.check_invariants(&tree);
    }

    #[test]
    fn nested_nodes_inherit_from_their_ancestors() {
        let (mut tree, root) = setup();
        let outer = tree.create_group();
        tree.add_to_group(root, outer);
        let inner = tree.create_group();
        tree.add_to_group(outer, inner);
        let a = leaf(&mut tree, inner, None);
        tree.set_opacity(outer, 0.5);
        tree.set_opacity(inner, 0.5);
        let mut sync = sync_with(&mut tree, root, MockFactory::default());
        assert_eq!(sync.factory().inherited[&a], (true, 0.25));

        tree.set_visible(outer, false);
        sync.process(&mut tree).expect("no violations");
        assert_eq!(sync.factory().inherited[&a], (false, 0.25));

        // Incrementally added nodes get the full chain too.
        let b = leaf(&mut tree, inner, None);
        sync.process(&mut tree).expect("no violations");
        assert_eq!(sync.factory().inherited[&b], (false, 0.25));
        tree.set_opacity(outer, 1.0);
        sync.process(&mut tree).expect("no violations");
        assert_eq!(sync.factory().inherited[&b], (false, 0.5));
        sync.check_invariants(&tree);
    }

    #[test]
    fn root_properties_are_not_inherited() {
        let (mut tree, root) = setup();
        tree.set_opacity(root, 0.1);
        let a = leaf(&mut tree, root, None);
        let sync = sync_with(&mut tree, root, MockFactory::default());
        assert_eq!(sync.factory().inherited[&a], (true, 1.0));
    }

    // -- Ordering and hooks --

    #[test]
    fn z_index_change_reorders() {
        let (mut tree, root) = setup();
        let a = leaf(&mut tree, root, None);
        let b = leaf(&mut tree, root, None);
        let mut sync = sync_with(&mut tree, root, MockFactory::default());
        assert_eq!(target_order(&sync), vec![a, b]);

        tree.set_z_index(a, Some(3.0));
        sync.process(&mut tree).expect("no violations");
        assert_eq!(target_order(&sync), vec![b, a]);
    }

    #[test]
    fn moving_a_layer_reorders_without_recreating_others() {
        let (mut tree, root) = setup();
        let a = leaf(&mut tree, root, None);
        let b = leaf(&mut tree, root, None);
        let mut sync = sync_with(&mut tree, root, MockFactory::default());

        let layers = tree.layers(root);
        tree.move_layer(layers, 0, 1);
        sync.process(&mut tree).expect("no violations");
        sync.check_invariants(&tree);

        assert_eq!(target_order(&sync), vec![b, a]);
        assert_eq!(sync.factory().created, vec![a, b, a]);
    }

    #[test]
    fn hook_effects_are_applied() {
        let (mut tree, root) = setup();
        let a = tree.create_layer(LeafKind::Vector);
        let b = tree.create_layer(LeafKind::Vector);
        let mut factory = MockFactory::default();
        factory
            .hooks
            .insert(a, (Topic::Property(a, LayerProperty::Extent), MockHook::Raise));
        factory
            .hooks
            .insert(b, (Topic::Property(b, LayerProperty::Extent), MockHook::Rebuild));
        tree.add_to_group(root, a);
        tree.add_to_group(root, b);
        let mut sync = sync_with(&mut tree, root, factory);
        sync.take_report();

        tree.set_extent(a, Some(kurbo::Rect::new(0.0, 0.0, 1.0, 1.0)));
        sync.process(&mut tree).expect("no violations");
        assert_eq!(sync.take_report().reorders, 1);

        tree.set_extent(b, None);
        sync.process(&mut tree).expect("no violations");
        let report = sync.take_report();
        assert_eq!(report.rebuilds, 1);
        assert_eq!(report.teardowns, 1);
        assert_eq!(sync.factory().hook_calls, vec![MockHook::Raise, MockHook::Rebuild]);
        assert_eq!(target_order(&sync), vec![a, b]);
        sync.check_invariants(&tree);
    }

    #[test]
    fn recreate_replaces_only_the_hooked_node() {
        let (mut tree, root) = setup();
        let a = leaf(&mut tree, root, Some(2.0));
        let mut factory = MockFactory::default();
        let b = tree.create_layer(LeafKind::Vector);
        factory
            .hooks
            .insert(b, (Topic::Property(b, LayerProperty::Extent), MockHook::Replace));
        tree.add_to_group(root, b);
        let c = leaf(&mut tree, root, None);
        let mut sync = sync_with(&mut tree, root, factory);
        let before = sync.counterparts(b).expect("registered")[0];
        let listeners = sync.listener_count();

        tree.set_extent(b, Some(kurbo::Rect::new(0.0, 0.0, 1.0, 1.0)));
        sync.process(&mut tree).expect("no violations");
        sync.check_invariants(&tree);

        let after = sync.counterparts(b).expect("registered")[0];
        assert_ne!(before, after);
        assert_eq!(sync.factory().destroyed, vec![before]);
        assert_eq!(sync.factory().created, vec![a, b, c, b]);
        assert_eq!(target_order(&sync), vec![b, c, a]);
        assert_eq!(sync.listener_count(), listeners);

        // The fresh subscription still fires.
        tree.set_extent(b, None);
        sync.process(&mut tree).expect("no violations");
        assert_eq!(sync.factory().hook_calls, vec![MockHook::Replace, MockHook::Replace]);
        sync.check_invariants(&tree);
    }

    #[test]
    fn two_synchronizers_share_one_tree() {
        let (mut tree, root) = setup();
        let a = leaf(&mut tree, root, None);
        let mut first = sync_with(&mut tree, root, MockFactory::default());
        let mut second = sync_with(&mut tree, root, MockFactory::default());

        let b = leaf(&mut tree, root, None);
        first.process(&mut tree).expect("no violations");
        second.process(&mut tree).expect("no violations");

        assert_eq!(target_order(&first), vec![a, b]);
        assert_eq!(target_order(&second), vec![a, b]);

        first.destroy_all(&mut tree);
        assert_eq!(
            tree.bus().listener_count_for(second.subscriber()),
            second.listener_count()
        );
        second.check_invariants(&tree);
    }

    // -- Destroyed before processing --

    fn detach_and_destroy(tree: &mut MapTree, group: NodeId, node: NodeId) {
        assert!(tree.remove_from_group(group, node), "node was a child");
        tree.destroy_node(node);
    }

    #[test]
    fn child_added_then_destroyed_is_skipped() {
        let (mut tree, root) = setup();
        let mut sync = sync_with(&mut tree, root, MockFactory::default());
        let listeners = sync.listener_count();

        let a = leaf(&mut tree, root, None);
        detach_and_destroy(&mut tree, root, a);
        sync.process(&mut tree).expect("no violations");

        assert!(sync.node_state(a).is_none());
        assert!(sync.factory().created.is_empty());
        assert_eq!(sync.listener_count(), listeners);
        sync.check_invariants(&tree);
    }

    #[test]
    fn inherited_change_on_destroyed_node_is_skipped() {
        let (mut tree, root) = setup();
        let a = leaf(&mut tree, root, None);
        let b = leaf(&mut tree, root, None);
        let mut sync = sync_with(&mut tree, root, MockFactory::default());
        let obj = sync.counterparts(a).expect("registered")[0];

        tree.set_opacity(a, 0.5);
        tree.set_visible(a, false);
        detach_and_destroy(&mut tree, root, a);
        sync.process(&mut tree).expect("no violations");

        assert!(sync.node_state(a).is_none());
        assert_eq!(sync.factory().inherited[&a], (true, 1.0));
        assert!(sync.factory().destroyed.contains(&obj));
        assert_eq!(target_order(&sync), vec![b]);
        sync.check_invariants(&tree);
    }

    #[test]
    fn hook_and_retry_on_destroyed_nodes_are_skipped() {
        let (mut tree, root) = setup();
        let a = leaf(&mut tree, root, None);
        let d = leaf(&mut tree, root, None);
        let mut factory = MockFactory::default();
        factory
            .hooks
            .insert(a, (Topic::Changed(a), MockHook::Rebuild));
        factory.not_ready.insert(d);
        let mut sync = sync_with(&mut tree, root, factory);

        sync.factory_mut().not_ready.remove(&d);
        tree.touch(a);
        tree.touch(d);
        detach_and_destroy(&mut tree, root, a);
        detach_and_destroy(&mut tree, root, d);
        sync.process(&mut tree).expect("no violations");

        assert!(sync.factory().hook_calls.is_empty());
        assert_eq!(sync.factory().created, vec![a]);
        assert!(sync.registered_nodes().next().is_none());
        assert_eq!(sync.take_report().rebuilds, 1, "only the initial one");
        sync.check_invariants(&tree);
    }

    #[test]
    fn additions_under_a_destroyed_group_are_skipped() {
        let (mut tree, root) = setup();
        let g = tree.create_group();
        tree.add_to_group(root, g);
        let mut sync = sync_with(&mut tree, root, MockFactory::default());

        let a = leaf(&mut tree, g, None);
        detach_and_destroy(&mut tree, root, g);
        sync.process(&mut tree).expect("no violations");

        assert!(sync.node_state(g).is_none());
        assert!(sync.node_state(a).is_none());
        assert!(!sync.is_listening_group(g));
        assert_eq!(
            tree.bus().listener_count_for(sync.subscriber()),
            sync.listener_count()
        );
        sync.check_invariants(&tree);
    }
}
