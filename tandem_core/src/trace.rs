// Copyright 2026 the Tandem Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tracing and diagnostics for synchronization passes.
//!
//! This module provides a [`TraceSink`] trait with per-event methods. All
//! method bodies default to no-ops, so implementing only the events you care
//! about is fine.
//!
//! [`Tracer`] wraps an optional `&mut dyn TraceSink`. When the `trace` feature
//! is **off**, every `Tracer` method compiles to nothing (zero overhead). When
//! **on**, each method performs a single `Option` branch before dispatching.
//!
//! The synchronizer itself does not hold a sink. It accumulates a
//! [`SyncReport`] which the host drains with
//! [`Synchronizer::take_report`](crate::sync::Synchronizer::take_report) and
//! forwards with [`Tracer::report`].
//!
//! # Crate features
//!
//! - `trace`: enables the `Tracer` method bodies (one branch per call).

use crate::map::NodeId;
use crate::sync::{SyncReport, Transition};

// ---------------------------------------------------------------------------
// Event structs
// ---------------------------------------------------------------------------

/// One node changed lifecycle state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LifecycleEvent {
    /// Host-assigned pass counter.
    pub sequence: u64,
    /// The node.
    pub node: NodeId,
    /// What happened.
    pub transition: Transition,
}

/// Totals for one drained [`SyncReport`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PassSummary {
    /// Host-assigned pass counter.
    pub sequence: u64,
    /// Nodes that gained counterparts, by traversal or retry.
    pub registered: u32,
    /// Nodes whose creation was deferred.
    pub deferred: u32,
    /// Factory failures.
    pub failed: u32,
    /// Nodes torn down.
    pub removed: u32,
    /// Groups traversed into.
    pub expanded: u32,
    /// `order_layers` calls.
    pub reorders: u32,
    /// Full rebuilds.
    pub rebuilds: u32,
    /// Full teardowns.
    pub teardowns: u32,
    /// Deliveries handled.
    pub events: u32,
}

impl PassSummary {
    /// Tallies a report.
    #[must_use]
    pub fn from_report(sequence: u64, report: &SyncReport) -> Self {
        let mut summary = Self {
            sequence,
            reorders: report.reorders,
            rebuilds: report.rebuilds,
            teardowns: report.teardowns,
            events: report.events,
            ..Self::default()
        };
        for record in &report.records {
            let slot = match record.transition {
                Transition::Expanded => &mut summary.expanded,
                Transition::Registered { .. } | Transition::Retried { .. } => {
                    &mut summary.registered
                }
                Transition::Deferred => &mut summary.deferred,
                Transition::FactoryFailed(_) => &mut summary.failed,
                Transition::Removed { .. } => &mut summary.removed,
            };
            *slot += 1;
        }
        summary
    }
}

// ---------------------------------------------------------------------------
// TraceSink trait
// ---------------------------------------------------------------------------

/// Receives trace events from synchronization passes.
///
/// All methods have default no-op implementations, so you only need to
/// override the events you care about.
pub trait TraceSink {
    /// Called once per lifecycle transition.
    fn on_lifecycle(&mut self, e: &LifecycleEvent) {
        _ = e;
    }

    /// Called once per drained report, after its lifecycle events.
    fn on_pass(&mut self, s: &PassSummary) {
        _ = s;
    }
}

// ---------------------------------------------------------------------------
// NoopSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that discards all events.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

impl TraceSink for NoopSink {}

// ---------------------------------------------------------------------------
// Tracer wrapper
// ---------------------------------------------------------------------------

/// Thin wrapper around an optional [`TraceSink`].
///
/// When the `trace` feature is **off**, every method compiles to nothing. When
/// **on**, each method checks the inner `Option` (one branch) before
/// dispatching to the sink.
pub struct Tracer<'a> {
    #[cfg(feature = "trace")]
    sink: Option<&'a mut dyn TraceSink>,
    #[cfg(not(feature = "trace"))]
    _marker: core::marker::PhantomData<&'a mut dyn TraceSink>,
}

impl core::fmt::Debug for Tracer<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Tracer").finish_non_exhaustive()
    }
}

impl<'a> Tracer<'a> {
    /// Creates a tracer that dispatches to the given sink.
    #[inline]
    #[must_use]
    pub fn new(sink: &'a mut dyn TraceSink) -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: Some(sink) }
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = sink;
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    /// Creates a tracer that discards all events.
    #[inline]
    #[must_use]
    pub fn none() -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: None }
        }
        #[cfg(not(feature = "trace"))]
        {
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    /// Emits a [`LifecycleEvent`].
    #[inline]
    pub fn lifecycle(&mut self, e: &LifecycleEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_lifecycle(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`PassSummary`].
    #[inline]
    pub fn pass(&mut self, s: &PassSummary) {
        #[cfg(feature = "trace")]
        if let Some(sink) = &mut self.sink {
            sink.on_pass(s);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = s;
        }
    }

    /// Emits one [`LifecycleEvent`] per record, then the [`PassSummary`].
    #[inline]
    pub fn report(&mut self, sequence: u64, report: &SyncReport) {
        #[cfg(feature = "trace")]
        if self.sink.is_some() {
            for record in &report.records {
                self.lifecycle(&LifecycleEvent {
                    sequence,
                    node: record.node,
                    transition: record.transition,
                });
            }
            self.pass(&PassSummary::from_report(sequence, report));
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = (sequence, report);
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FactoryError;
    use crate::sync::LifecycleRecord;

    fn node(idx: u32) -> NodeId {
        NodeId { idx, generation: 0 }
    }

    fn sample_report() -> SyncReport {
        let mut report = SyncReport {
            reorders: 2,
            rebuilds: 1,
            teardowns: 1,
            events: 4,
            ..SyncReport::default()
        };
        for (idx, transition) in [
            (0, Transition::Expanded),
            (1, Transition::Registered { counterparts: 1 }),
            (2, Transition::FactoryFailed(FactoryError::Unsupported)),
            (2, Transition::Deferred),
            (2, Transition::Retried { counterparts: 2 }),
            (1, Transition::Removed { counterparts: 1 }),
        ] {
            report.records.push(LifecycleRecord {
                node: node(idx),
                transition,
            });
        }
        report
    }

    #[test]
    fn summary_tallies_transitions() {
        let s = PassSummary::from_report(9, &sample_report());
        assert_eq!(s.sequence, 9);
        assert_eq!(s.expanded, 1);
        assert_eq!(s.registered, 2);
        assert_eq!(s.failed, 1);
        assert_eq!(s.deferred, 1);
        assert_eq!(s.removed, 1);
        assert_eq!(s.reorders, 2);
        assert_eq!(s.events, 4);
    }

    #[test]
    fn noop_sink_compiles() {
        let mut sink = NoopSink;
        sink.on_lifecycle(&LifecycleEvent {
            sequence: 0,
            node: node(0),
            transition: Transition::Deferred,
        });
        sink.on_pass(&PassSummary::default());
    }

    #[test]
    fn tracer_none_does_nothing() {
        let mut tracer = Tracer::none();
        tracer.report(0, &sample_report());
        tracer.pass(&PassSummary::default());
    }

    #[cfg(feature = "trace")]
    #[test]
    fn tracer_dispatches_to_sink() {
        use alloc::vec::Vec;

        struct RecordingSink {
            nodes: Vec<u32>,
            passes: Vec<u64>,
        }
        impl TraceSink for RecordingSink {
            fn on_lifecycle(&mut self, e: &LifecycleEvent) {
                self.nodes.push(e.node.index());
            }
            fn on_pass(&mut self, s: &PassSummary) {
                self.passes.push(s.sequence);
            }
        }

        let mut sink = RecordingSink {
            nodes: Vec::new(),
            passes: Vec::new(),
        };
        let mut tracer = Tracer::new(&mut sink);
        tracer.report(3, &sample_report());
        drop(tracer);
        assert_eq!(sink.nodes, &[0, 1, 2, 2, 2, 1]);
        assert_eq!(sink.passes, &[3]);
    }
}
