// Copyright 2026 the Tandem Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Synchronizer configuration.

/// What happens when a retried creation is still not ready.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum RetryPolicy {
    /// Arm a fresh one-shot retry on every failed attempt, so the node keeps
    /// waiting for its next change event.
    #[default]
    UntilReady,
    /// Retry once. A node that is still not ready stays parked in
    /// [`NodeState::AwaitingRetry`](super::NodeState::AwaitingRetry) with no
    /// listeners until it is removed or the tree is resynchronized.
    OneShot,
}

/// Configuration for a [`Synchronizer`](super::Synchronizer).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SyncConfig {
    /// Policy for nodes whose counterparts could not be created yet.
    pub retry: RetryPolicy,
}

impl SyncConfig {
    /// Keeps retrying not-ready nodes on every change event.
    pub const DEFAULT: Self = Self {
        retry: RetryPolicy::UntilReady,
    };

    /// Retries each not-ready node exactly once.
    #[must_use]
    pub const fn one_shot() -> Self {
        Self {
            retry: RetryPolicy::OneShot,
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}
