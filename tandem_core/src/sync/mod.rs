// Copyright 2026 the Tandem Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Generic counterpart synchronization.
//!
//! A [`Synchronizer`] walks the subtree under a root group and asks a
//! [`CounterpartFactory`] to materialize each node in some target
//! collection. It then follows the tree through its event bus: structural
//! changes add and remove subtrees, property changes push inherited
//! visibility and opacity, stacking changes re-run
//! [`order_layers`](CounterpartFactory::order_layers), and nodes whose
//! sources were not ready get a one-shot retry on their next change.
//!
//! Bookkeeping lives in [`SynchronizationState`]: an explicit
//! [`NodeState`] per visited node, the node's revocable listener keys, and
//! the structural listeners of each visited group.

mod config;
mod engine;
mod factory;
mod order;
mod registry;
mod report;
mod state;

pub use config::{RetryPolicy, SyncConfig};
pub use engine::Synchronizer;
pub use factory::{CounterpartFactory, Counterparts, HookEffect};
pub use order::stacking_order;
pub use report::{LifecycleRecord, SyncReport, Transition};
pub use state::{GroupListeners, NodeState, SynchronizationState};
