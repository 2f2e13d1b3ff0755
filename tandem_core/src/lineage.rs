// Copyright 2026 the Tandem Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A layer paired with its ancestor chain.

use alloc::vec::Vec;

use crate::map::{MapTree, NodeId};

/// A node together with the groups above it, nearest first.
///
/// The synchronized root is never part of `parents`: direct children of the
/// root have an empty chain. Inherited properties are computed over
/// [`lineage`](Self::lineage), i.e. `[node, ...parents]`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct LayerWithParents {
    /// The layer itself.
    pub node: NodeId,
    /// Ancestor groups, nearest first.
    pub parents: Vec<NodeId>,
}

impl LayerWithParents {
    /// A node with no ancestors.
    #[must_use]
    pub fn root(node: NodeId) -> Self {
        Self {
            node,
            parents: Vec::new(),
        }
    }

    /// Returns the lineage entry for `child` directly below this node.
    ///
    /// When `self` is the synchronized root the child gets an empty chain;
    /// otherwise it gets `[self.node, ...self.parents]`.
    #[must_use]
    pub fn child(&self, child: NodeId, self_is_root: bool) -> Self {
        let parents = if self_is_root {
            Vec::new()
        } else {
            let mut parents = Vec::with_capacity(self.parents.len() + 1);
            parents.push(self.node);
            parents.extend_from_slice(&self.parents);
            parents
        };
        Self {
            node: child,
            parents,
        }
    }

    /// Iterates `[node, ...parents]`.
    pub fn lineage(&self) -> impl Iterator<Item = NodeId> + '_ {
        core::iter::once(self.node).chain(self.parents.iter().copied())
    }

    /// Returns `true` if the node and every ancestor are still live.
    ///
    /// Deliveries are queued, so a lineage captured earlier may name nodes
    /// the host has destroyed since.
    #[must_use]
    pub fn is_alive(&self, tree: &MapTree) -> bool {
        self.lineage().all(|n| tree.is_alive(n))
    }

    /// Returns `true` if the node and every ancestor are visible.
    #[must_use]
    pub fn inherited_visible(&self, tree: &MapTree) -> bool {
        self.lineage().all(|n| tree.visible(n))
    }

    /// Returns the product of the opacities of the node and its ancestors.
    #[must_use]
    pub fn inherited_opacity(&self, tree: &MapTree) -> f64 {
        self.lineage().map(|n| tree.opacity(n)).product()
    }
}
