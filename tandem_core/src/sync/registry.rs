// Copyright 2026 the Tandem Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Listener key to handler table.
//!
//! The tree's bus only knows topics and keys. What a delivery *means* to the
//! synchronizer lives here, keyed by the [`ListenerKey`] the bus handed out.
//! Revoking a key drops its handler, so late deliveries for it are ignored.

use hashbrown::HashMap;

use crate::event::{ListenerKey, SubscriberId, Topic};
use crate::lineage::LayerWithParents;
use crate::map::{MapTree, NodeId};

/// What to do when a listener fires.
#[derive(Clone, Debug)]
pub(crate) enum Handler<H> {
    /// A node was added to the group's current collection.
    ChildAdded { group: LayerWithParents },
    /// A node was removed from the group's current collection.
    ChildRemoved { group: NodeId },
    /// The group's collection was swapped.
    LayersReplaced { group: LayerWithParents },
    /// One-shot creation retry.
    Retry { layer: LayerWithParents },
    /// Visibility or opacity changed somewhere in the lineage of `layer`.
    Inherited { layer: LayerWithParents },
    /// A stacking key changed.
    Reorder,
    /// Factory-owned subscription.
    Hook { layer: LayerWithParents, hook: H },
}

impl<H> Handler<H> {
    /// Returns the lineage the handler reads from the tree, if any.
    pub(crate) fn layer(&self) -> Option<&LayerWithParents> {
        match self {
            Self::ChildAdded { group } | Self::LayersReplaced { group } => Some(group),
            Self::Retry { layer } | Self::Inherited { layer } | Self::Hook { layer, .. } => {
                Some(layer)
            }
            Self::ChildRemoved { .. } | Self::Reorder => None,
        }
    }
}

#[derive(Debug)]
pub(crate) struct ListenerRegistry<H> {
    handlers: HashMap<ListenerKey, Handler<H>>,
}

impl<H> Default for ListenerRegistry<H> {
    fn default() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }
}

impl<H: Clone> ListenerRegistry<H> {
    pub(crate) fn listen(
        &mut self,
        tree: &mut MapTree,
        subscriber: SubscriberId,
        topic: Topic,
        handler: Handler<H>,
    ) -> ListenerKey {
        let key = tree.listen(subscriber, topic);
        self.handlers.insert(key, handler);
        key
    }

    pub(crate) fn revoke(&mut self, tree: &mut MapTree, key: ListenerKey) {
        self.handlers.remove(&key);
        tree.unlisten(key);
    }

    pub(crate) fn get(&self, key: ListenerKey) -> Option<Handler<H>> {
        self.handlers.get(&key).cloned()
    }

    pub(crate) fn contains(&self, key: ListenerKey) -> bool {
        self.handlers.contains_key(&key)
    }

    pub(crate) fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Forgets every handler. The caller revokes the bus side.
    pub(crate) fn clear(&mut self) {
        self.handlers.clear();
    }
}
