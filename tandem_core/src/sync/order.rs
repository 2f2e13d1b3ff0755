// Copyright 2026 the Tandem Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Effective stacking order of the source tree.

use alloc::vec::Vec;

use crate::map::{MapTree, NodeId};

/// Returns every node under `root` (inclusive) in effective stacking order,
/// bottom first.
///
/// The tree is flattened in document order, then stably sorted by
/// `z_index` (unset counts as `0`). Equal keys keep document order.
///
/// Raising each node's counterparts to the top of the target collection in
/// this order reproduces it there: every raise only pushes later nodes
/// above earlier ones.
#[must_use]
pub fn stacking_order(tree: &MapTree, root: NodeId) -> Vec<NodeId> {
    let mut nodes: Vec<(f64, NodeId)> = tree
        .document_order(root)
        .map(|n| (tree.z_index(n).unwrap_or(0.0), n))
        .collect();
    nodes.sort_by(|a, b| a.0.total_cmp(&b.0));
    nodes.into_iter().map(|(_, n)| n).collect()
}
