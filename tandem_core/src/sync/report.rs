// Copyright 2026 the Tandem Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Accumulated lifecycle changes between two reads.

use alloc::vec::Vec;

use crate::error::FactoryError;
use crate::map::NodeId;

/// One lifecycle transition of one node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Transition {
    /// A group was traversed into rather than represented as a whole.
    Expanded,
    /// Counterparts were created during traversal.
    Registered {
        /// Number of counterparts.
        counterparts: usize,
    },
    /// Creation was declined; a retry is pending (or parked).
    Deferred,
    /// A retry succeeded.
    Retried {
        /// Number of counterparts.
        counterparts: usize,
    },
    /// The factory failed; handled like a decline.
    FactoryFailed(FactoryError),
    /// The node's entry was torn down.
    Removed {
        /// Number of counterparts destroyed.
        counterparts: usize,
    },
}

/// A [`Transition`] tagged with its node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct LifecycleRecord {
    /// The node.
    pub node: NodeId,
    /// What happened to it.
    pub transition: Transition,
}

/// Changes accumulated by a [`Synchronizer`](super::Synchronizer) since the
/// last [`take_report`](super::Synchronizer::take_report).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Lifecycle transitions in the order they happened.
    pub records: Vec<LifecycleRecord>,
    /// Number of `order_layers` calls.
    pub reorders: u32,
    /// Number of full rebuilds (`synchronize`).
    pub rebuilds: u32,
    /// Number of full teardowns (`destroy_all`).
    pub teardowns: u32,
    /// Number of deliveries dispatched to a live handler.
    pub events: u32,
}

impl SyncReport {
    /// Returns `true` if nothing happened.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
            && self.reorders == 0
            && self.rebuilds == 0
            && self.teardowns == 0
            && self.events == 0
    }

    /// Iterates the nodes that gained counterparts, by traversal or retry.
    pub fn registered(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.records.iter().filter_map(|r| match r.transition {
            Transition::Registered { .. } | Transition::Retried { .. } => Some(r.node),
            _ => None,
        })
    }

    /// Iterates the nodes whose entries were torn down.
    pub fn removed(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.records.iter().filter_map(|r| match r.transition {
            Transition::Removed { .. } => Some(r.node),
            _ => None,
        })
    }

    pub(crate) fn record(&mut self, node: NodeId, transition: Transition) {
        self.records.push(LifecycleRecord { node, transition });
    }
}
