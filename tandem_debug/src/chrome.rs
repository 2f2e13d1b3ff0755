// Copyright 2026 the Tandem Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Chrome Trace Event Format exporter.
//!
//! [`export`] reads recorded bytes from a [`RecorderSink`](super::recorder::RecorderSink)
//! and writes [Chrome Trace Event Format][spec] JSON to the given writer.
//!
//! Synchronization has no wall clock, so the pass sequence number is used as
//! the timestamp: one pass per microsecond. Lifecycle transitions land on one
//! track per node and pass totals become counter tracks.
//!
//! [spec]: https://docs.google.com/document/d/1CvAClvFfyA5R-PhYUmn5OOQtYMH4h6I0nSsKchNAySU

use std::io::{self, Write};

use serde_json::{Value, json};

use crate::recorder::{RecordedEvent, RecordedTransition, decode};

/// Exports recorded events as Chrome Trace Event Format JSON.
///
/// The output is a complete JSON array of trace event objects, suitable for
/// loading into `chrome://tracing` or [Perfetto](https://ui.perfetto.dev/).
pub fn export(bytes: &[u8], writer: &mut dyn Write) -> io::Result<()> {
    let mut events: Vec<Value> = Vec::new();

    for recorded in decode(bytes) {
        match recorded {
            RecordedEvent::Lifecycle {
                sequence,
                node,
                generation,
                transition,
            } => {
                let count = match transition {
                    RecordedTransition::Registered { counterparts }
                    | RecordedTransition::Retried { counterparts }
                    | RecordedTransition::Removed { counterparts } => Some(counterparts),
                    _ => None,
                };
                let source = match transition {
                    RecordedTransition::SourceFailed { source } => Some(source),
                    _ => None,
                };
                events.push(json!({
                    "ph": "i",
                    "name": transition.name(),
                    "cat": "Lifecycle",
                    "ts": sequence,
                    "pid": 0,
                    "tid": node,
                    "s": "t",
                    "args": {
                        "generation": generation,
                        "counterparts": count,
                        "source": source,
                    }
                }));
            }
            RecordedEvent::Pass(s) => {
                events.push(json!({
                    "ph": "C",
                    "name": "Lifecycle",
                    "cat": "Pass",
                    "ts": s.sequence,
                    "pid": 0,
                    "args": {
                        "registered": s.registered,
                        "deferred": s.deferred,
                        "failed": s.failed,
                        "removed": s.removed,
                    }
                }));
                events.push(json!({
                    "ph": "C",
                    "name": "Work",
                    "cat": "Pass",
                    "ts": s.sequence,
                    "pid": 0,
                    "args": {
                        "events": s.events,
                        "reorders": s.reorders,
                        "rebuilds": s.rebuilds,
                        "teardowns": s.teardowns,
                    }
                }));
            }
        }
    }

    serde_json::to_writer_pretty(writer, &events)?;
    Ok(())
}
