// Copyright 2026 the Tandem Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Compact binary event recording and decoding.
//!
//! [`RecorderSink`] implements [`TraceSink`] and encodes events into a
//! `Vec<u8>` as fixed-size little-endian records. [`decode`] reads them back
//! as an iterator of [`RecordedEvent`].
//!
//! Node and source handles cannot be rebuilt outside the tree that issued
//! them, so decoded events carry their raw index and generation.

use tandem_core::error::FactoryError;
use tandem_core::sync::Transition;
use tandem_core::trace::{LifecycleEvent, PassSummary, TraceSink};

// ---------------------------------------------------------------------------
// Event type discriminants
// ---------------------------------------------------------------------------

const TAG_LIFECYCLE: u8 = 1;
const TAG_PASS: u8 = 2;

const KIND_EXPANDED: u8 = 0;
const KIND_REGISTERED: u8 = 1;
const KIND_DEFERRED: u8 = 2;
const KIND_RETRIED: u8 = 3;
const KIND_SOURCE_FAILED: u8 = 4;
const KIND_UNSUPPORTED: u8 = 5;
const KIND_REMOVED: u8 = 6;

// ---------------------------------------------------------------------------
// RecorderSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that encodes events into a compact binary buffer.
#[derive(Debug, Default)]
pub struct RecorderSink {
    buf: Vec<u8>,
}

impl RecorderSink {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a view of the recorded bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Consumes the recorder and returns the recorded bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    // -- encoding helpers --------------------------------------------------

    fn write_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    fn write_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_u64(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    /// Counts are capped at `u32::MAX`.
    fn write_count(&mut self, n: usize) {
        self.write_u32(u32::try_from(n).unwrap_or(u32::MAX));
    }

    fn write_transition(&mut self, t: Transition) {
        match t {
            Transition::Expanded => {
                self.write_u8(KIND_EXPANDED);
                self.write_u32(0);
            }
            Transition::Registered { counterparts } => {
                self.write_u8(KIND_REGISTERED);
                self.write_count(counterparts);
            }
            Transition::Deferred => {
                self.write_u8(KIND_DEFERRED);
                self.write_u32(0);
            }
            Transition::Retried { counterparts } => {
                self.write_u8(KIND_RETRIED);
                self.write_count(counterparts);
            }
            Transition::FactoryFailed(FactoryError::SourceFailed(source)) => {
                self.write_u8(KIND_SOURCE_FAILED);
                self.write_u32(source.index());
            }
            Transition::FactoryFailed(FactoryError::Unsupported) => {
                self.write_u8(KIND_UNSUPPORTED);
                self.write_u32(0);
            }
            Transition::Removed { counterparts } => {
                self.write_u8(KIND_REMOVED);
                self.write_count(counterparts);
            }
        }
    }
}

impl TraceSink for RecorderSink {
    fn on_lifecycle(&mut self, e: &LifecycleEvent) {
        self.write_u8(TAG_LIFECYCLE);
        self.write_u64(e.sequence);
        self.write_u32(e.node.index());
        self.write_u32(e.node.generation());
        self.write_transition(e.transition);
    }

    fn on_pass(&mut self, s: &PassSummary) {
        self.write_u8(TAG_PASS);
        self.write_u64(s.sequence);
        for v in [
            s.registered,
            s.deferred,
            s.failed,
            s.removed,
            s.expanded,
            s.reorders,
            s.rebuilds,
            s.teardowns,
            s.events,
        ] {
            self.write_u32(v);
        }
    }
}

// ---------------------------------------------------------------------------
// Decoder
// ---------------------------------------------------------------------------

/// A [`Transition`] with raw handles.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecordedTransition {
    /// See [`Transition::Expanded`].
    Expanded,
    /// See [`Transition::Registered`].
    Registered {
        /// Number of counterparts.
        counterparts: u32,
    },
    /// See [`Transition::Deferred`].
    Deferred,
    /// See [`Transition::Retried`].
    Retried {
        /// Number of counterparts.
        counterparts: u32,
    },
    /// [`FactoryError::SourceFailed`] for the source at this raw index.
    SourceFailed {
        /// Raw source index.
        source: u32,
    },
    /// [`FactoryError::Unsupported`].
    Unsupported,
    /// See [`Transition::Removed`].
    Removed {
        /// Number of counterparts destroyed.
        counterparts: u32,
    },
}

impl RecordedTransition {
    /// Returns a short lowercase label.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Expanded => "expanded",
            Self::Registered { .. } => "registered",
            Self::Deferred => "deferred",
            Self::Retried { .. } => "retried",
            Self::SourceFailed { .. } => "source-failed",
            Self::Unsupported => "unsupported",
            Self::Removed { .. } => "removed",
        }
    }
}

/// A decoded event from a binary recording.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RecordedEvent {
    /// A [`LifecycleEvent`].
    Lifecycle {
        /// Pass counter.
        sequence: u64,
        /// Raw node index.
        node: u32,
        /// Node generation.
        generation: u32,
        /// What happened.
        transition: RecordedTransition,
    },
    /// A [`PassSummary`].
    Pass(PassSummary),
}

/// Decodes a byte slice produced by [`RecorderSink`] into an iterator of
/// [`RecordedEvent`].
pub fn decode(bytes: &[u8]) -> DecodeIter<'_> {
    DecodeIter {
        data: bytes,
        pos: 0,
    }
}

/// Iterator over decoded events.
#[derive(Debug)]
pub struct DecodeIter<'a> {
    data: &'a [u8],
    pos: usize,
}

impl DecodeIter<'_> {
    fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn read_u8(&mut self) -> Option<u8> {
        if self.remaining() < 1 {
            return None;
        }
        let v = self.data[self.pos];
        self.pos += 1;
        Some(v)
    }

    fn read_u32(&mut self) -> Option<u32> {
        if self.remaining() < 4 {
            return None;
        }
        let v = u32::from_le_bytes(self.data[self.pos..self.pos + 4].try_into().ok()?);
        self.pos += 4;
        Some(v)
    }

    fn read_u64(&mut self) -> Option<u64> {
        if self.remaining() < 8 {
            return None;
        }
        let v = u64::from_le_bytes(self.data[self.pos..self.pos + 8].try_into().ok()?);
        self.pos += 8;
        Some(v)
    }

    fn read_transition(&mut self) -> Option<RecordedTransition> {
        let kind = self.read_u8()?;
        let payload = self.read_u32()?;
        Some(match kind {
            KIND_EXPANDED => RecordedTransition::Expanded,
            KIND_REGISTERED => RecordedTransition::Registered {
                counterparts: payload,
            },
            KIND_DEFERRED => RecordedTransition::Deferred,
            KIND_RETRIED => RecordedTransition::Retried {
                counterparts: payload,
            },
            KIND_SOURCE_FAILED => RecordedTransition::SourceFailed { source: payload },
            KIND_UNSUPPORTED => RecordedTransition::Unsupported,
            KIND_REMOVED => RecordedTransition::Removed {
                counterparts: payload,
            },
            _ => return None,
        })
    }

    fn decode_lifecycle(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::Lifecycle {
            sequence: self.read_u64()?,
            node: self.read_u32()?,
            generation: self.read_u32()?,
            transition: self.read_transition()?,
        })
    }

    fn decode_pass(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::Pass(PassSummary {
            sequence: self.read_u64()?,
            registered: self.read_u32()?,
            deferred: self.read_u32()?,
            failed: self.read_u32()?,
            removed: self.read_u32()?,
            expanded: self.read_u32()?,
            reorders: self.read_u32()?,
            rebuilds: self.read_u32()?,
            teardowns: self.read_u32()?,
            events: self.read_u32()?,
        }))
    }
}

impl Iterator for DecodeIter<'_> {
    type Item = RecordedEvent;

    fn next(&mut self) -> Option<Self::Item> {
        match self.read_u8()? {
            TAG_LIFECYCLE => self.decode_lifecycle(),
            TAG_PASS => self.decode_pass(),
            _ => None, // unknown tag, stop
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use tandem_core::map::{LeafKind, MapTree, RasterSource, SourceState};

    use super::*;

    #[test]
    fn lifecycle_events_keep_raw_handles() {
        let mut tree = MapTree::new();
        let source =
            tree.create_raster_source(RasterSource::new("t").with_state(SourceState::Error));
        let old = tree.create_layer(LeafKind::Tile);
        tree.destroy_node(old);
        let node = tree.create_layer(LeafKind::Tile);

        let mut rec = RecorderSink::new();
        rec.on_lifecycle(&LifecycleEvent {
            sequence: 4,
            node,
            transition: Transition::FactoryFailed(FactoryError::SourceFailed(source)),
        });
        rec.on_lifecycle(&LifecycleEvent {
            sequence: 4,
            node,
            transition: Transition::Registered { counterparts: 3 },
        });

        let events: Vec<_> = decode(rec.as_bytes()).collect();
        assert_eq!(
            events,
            [
                RecordedEvent::Lifecycle {
                    sequence: 4,
                    node: node.index(),
                    generation: node.generation(),
                    transition: RecordedTransition::SourceFailed {
                        source: source.index()
                    },
                },
                RecordedEvent::Lifecycle {
                    sequence: 4,
                    node: node.index(),
                    generation: node.generation(),
                    transition: RecordedTransition::Registered { counterparts: 3 },
                },
            ]
        );
        assert_eq!(node.generation(), 1, "slot was reused");
    }

    #[test]
    fn pass_summary_survives_recording() {
        let summary = PassSummary {
            sequence: 12,
            registered: 3,
            deferred: 1,
            reorders: 2,
            events: 9,
            ..PassSummary::default()
        };
        let mut rec = RecorderSink::new();
        rec.on_pass(&summary);
        let events: Vec<_> = decode(&rec.into_bytes()).collect();
        assert_eq!(events, [RecordedEvent::Pass(summary)]);
    }

    #[test]
    fn truncated_record_stops_decoding() {
        let mut rec = RecorderSink::new();
        rec.on_pass(&PassSummary::default());
        rec.on_pass(&PassSummary::default());
        let bytes = rec.as_bytes();
        let events: Vec<_> = decode(&bytes[..bytes.len() - 1]).collect();
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn empty_buffer_decodes_to_nothing() {
        let events: Vec<_> = decode(&[]).collect();
        assert!(events.is_empty());
    }
}
