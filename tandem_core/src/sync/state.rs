// Copyright 2026 the Tandem Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-node synchronization state.

use alloc::vec::Vec;

use hashbrown::HashMap;

use crate::event::ListenerKey;
use crate::map::{CollectionId, NodeId};

/// Where a visited node stands.
///
/// Absence from [`SynchronizationState`] is the "unregistered" state.
#[derive(Clone, Debug, PartialEq)]
pub enum NodeState<C> {
    /// A group that is not represented as a whole; its children (as seen
    /// when they were visited) are registered individually.
    Expanded {
        /// Children recorded during traversal and incremental adds.
        children: Vec<NodeId>,
    },
    /// Creation failed or was declined; waiting for a change event.
    AwaitingRetry,
    /// Represented by these counterparts.
    Registered(Vec<C>),
}

impl<C> NodeState<C> {
    /// Returns the counterparts, if registered.
    #[must_use]
    pub fn counterparts(&self) -> Option<&[C]> {
        match self {
            Self::Registered(objects) => Some(objects),
            _ => None,
        }
    }
}

/// Structural subscriptions of one group.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GroupListeners {
    /// Fires when the group's child collection is swapped.
    pub(crate) replaced: ListenerKey,
    /// `Added` and `Removed` on `collection`.
    pub(crate) content: [ListenerKey; 2],
    /// The collection the content listeners are attached to.
    pub(crate) collection: CollectionId,
}

impl GroupListeners {
    /// Returns the collection the content subscriptions watch.
    #[must_use]
    pub fn collection(&self) -> CollectionId {
        self.collection
    }

    /// Iterates all three listener keys.
    pub fn keys(&self) -> impl Iterator<Item = ListenerKey> {
        core::iter::once(self.replaced).chain(self.content)
    }
}

/// The three maps the synchronizer keeps, keyed by node identity.
///
/// Every visited node has an entry in both `counterparts_of` and
/// `node_listeners`. Visited groups additionally have `group_listeners`.
#[derive(Clone, Debug)]
pub struct SynchronizationState<C> {
    pub(crate) counterparts_of: HashMap<NodeId, NodeState<C>>,
    pub(crate) node_listeners: HashMap<NodeId, Vec<ListenerKey>>,
    pub(crate) group_listeners: HashMap<NodeId, GroupListeners>,
}

impl<C> Default for SynchronizationState<C> {
    fn default() -> Self {
        Self {
            counterparts_of: HashMap::new(),
            node_listeners: HashMap::new(),
            group_listeners: HashMap::new(),
        }
    }
}

impl<C> SynchronizationState<C> {
    /// Returns the state of a visited node.
    #[must_use]
    pub fn node_state(&self, node: NodeId) -> Option<&NodeState<C>> {
        self.counterparts_of.get(&node)
    }

    /// Returns the counterparts of a registered node.
    #[must_use]
    pub fn counterparts(&self, node: NodeId) -> Option<&[C]> {
        self.counterparts_of.get(&node)?.counterparts()
    }

    /// Returns the node listener keys of a visited node.
    #[must_use]
    pub fn node_listeners(&self, node: NodeId) -> Option<&[ListenerKey]> {
        self.node_listeners.get(&node).map(Vec::as_slice)
    }

    /// Returns the structural listeners of a group.
    #[must_use]
    pub fn group_listeners(&self, group: NodeId) -> Option<&GroupListeners> {
        self.group_listeners.get(&group)
    }

    /// Iterates the nodes that currently have counterparts.
    pub fn registered_nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.counterparts_of
            .iter()
            .filter(|(_, s)| matches!(s, NodeState::Registered(_)))
            .map(|(&n, _)| n)
    }

    /// Iterates every visited node, in no particular order.
    pub fn visited_nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.counterparts_of.keys().copied()
    }

    /// Returns `true` if no node has been visited.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.counterparts_of.is_empty()
            && self.node_listeners.is_empty()
            && self.group_listeners.is_empty()
    }

    pub(crate) fn clear(&mut self) {
        self.counterparts_of.clear();
        self.node_listeners.clear();
        self.group_listeners.clear();
    }
}
