// Copyright 2026 the Tandem Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tree traversal utilities.

use alloc::vec::Vec;

use super::id::NodeId;
use super::tree::MapTree;

/// A pre-order (document order) iterator over a subtree.
///
/// Parents are yielded before their children and children left-to-right.
/// The starting node is yielded first. Created by [`MapTree::document_order`].
#[derive(Debug)]
pub struct DocumentOrder<'a> {
    tree: &'a MapTree,
    stack: Vec<NodeId>,
}

impl<'a> DocumentOrder<'a> {
    pub(crate) fn new(tree: &'a MapTree, start: NodeId) -> Self {
        Self {
            tree,
            stack: alloc::vec![start],
        }
    }
}

impl Iterator for DocumentOrder<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let node = self.stack.pop()?;
        if let Some(children) = self.tree.children(node) {
            self.stack.extend(children.iter().rev().copied());
        }
        Some(node)
    }
}

impl MapTree {
    /// Returns a pre-order iterator over `start` and all of its descendants.
    #[must_use]
    pub fn document_order(&self, start: NodeId) -> DocumentOrder<'_> {
        DocumentOrder::new(self, start)
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec;
    use alloc::vec::Vec;

    use crate::map::{LeafKind, MapTree};

    #[test]
    fn parents_precede_children_left_to_right() {
        let mut tree = MapTree::new();
        let root = tree.create_group();
        let g = tree.create_group();
        let a = tree.create_layer(LeafKind::Tile);
        let b = tree.create_layer(LeafKind::Tile);
        let c = tree.create_layer(LeafKind::Tile);
        tree.add_to_group(root, a);
        tree.add_to_group(root, g);
        tree.add_to_group(g, b);
        tree.add_to_group(root, c);

        let order: Vec<_> = tree.document_order(root).collect();
        assert_eq!(order, vec![root, a, g, b, c]);
    }

    #[test]
    fn leaf_yields_only_itself() {
        let mut tree = MapTree::new();
        let a = tree.create_layer(LeafKind::Image);
        assert_eq!(tree.document_order(a).collect::<Vec<_>>(), vec![a]);
    }
}
