// Copyright 2026 the Tandem Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Error types.

use core::fmt;

use crate::map::{NodeId, SourceId};

/// Contract violations detected by the synchronizer.
///
/// These indicate a broken traversal guarantee (a node reachable twice, a
/// removal for a node that was never added) rather than a transient
/// condition. The synchronizer finishes the rest of the pass before
/// reporting the first violation it saw.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SyncError {
    /// The node already has a registration entry.
    AlreadyRegistered(NodeId),
    /// Structural listeners are already attached to this group.
    AlreadyListening(NodeId),
    /// A removal was requested for a node with no registration entry.
    NotRegistered(NodeId),
}

impl fmt::Display for SyncError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyRegistered(node) => write!(f, "{node:?} is already registered"),
            Self::AlreadyListening(node) => {
                write!(f, "{node:?} already has structural listeners")
            }
            Self::NotRegistered(node) => write!(f, "{node:?} is not registered"),
        }
    }
}

impl core::error::Error for SyncError {}

/// Failures reported by a [`CounterpartFactory`](crate::sync::CounterpartFactory).
///
/// The synchronizer treats these exactly like "not ready yet": the node is
/// left unregistered and a leaf gets a retry armed. They are surfaced only
/// through the [`SyncReport`](crate::sync::SyncReport).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FactoryError {
    /// The layer's data source is in an error state.
    SourceFailed(SourceId),
    /// The layer uses a configuration the factory cannot represent.
    Unsupported,
}

impl fmt::Display for FactoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SourceFailed(source) => write!(f, "{source:?} failed to load"),
            Self::Unsupported => f.write_str("layer configuration is not supported"),
        }
    }
}

impl core::error::Error for FactoryError {}

#[cfg(test)]
mod tests {
    use alloc::string::ToString;

    use super::*;

    #[test]
    fn display_names_the_node() {
        let node = NodeId {
            idx: 3,
            generation: 1,
        };
        assert_eq!(
            SyncError::AlreadyRegistered(node).to_string(),
            "NodeId(3@gen1) is already registered"
        );
        assert_eq!(
            FactoryError::SourceFailed(SourceId(2)).to_string(),
            "SourceId(2) failed to load"
        );
    }
}
