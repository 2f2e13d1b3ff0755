// Copyright 2026 the Tandem Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Human-readable trace output.
//!
//! [`PrettyPrintSink`] implements [`TraceSink`] and writes one line per event
//! to a [`Write`](std::io::Write) destination (default: stderr).

use std::io::Write;

use tandem_core::error::FactoryError;
use tandem_core::sync::Transition;
use tandem_core::trace::{LifecycleEvent, PassSummary, TraceSink};

/// Writes human-readable trace lines to a [`Write`](std::io::Write) destination.
pub struct PrettyPrintSink<W: Write = Box<dyn Write>> {
    writer: W,
}

impl<W: Write> std::fmt::Debug for PrettyPrintSink<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrettyPrintSink").finish_non_exhaustive()
    }
}

impl PrettyPrintSink {
    /// Creates a sink that writes to stderr.
    #[must_use]
    pub fn stderr() -> Self {
        Self {
            writer: Box::new(std::io::stderr()),
        }
    }

    /// Creates a sink that writes to a boxed writer.
    #[must_use]
    pub fn new(writer: Box<dyn Write>) -> Self {
        Self { writer }
    }
}

impl<W: Write> PrettyPrintSink<W> {
    /// Creates a sink that writes to the given destination.
    #[must_use]
    pub fn with_writer(writer: W) -> Self {
        Self { writer }
    }

    /// Consumes the sink and returns the destination.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

fn describe(t: Transition) -> String {
    match t {
        Transition::Expanded => "expanded".into(),
        Transition::Registered { counterparts } => format!("registered n={counterparts}"),
        Transition::Deferred => "deferred".into(),
        Transition::Retried { counterparts } => format!("retried n={counterparts}"),
        Transition::FactoryFailed(FactoryError::SourceFailed(source)) => {
            format!("FAILED source={}", source.index())
        }
        Transition::FactoryFailed(FactoryError::Unsupported) => "FAILED unsupported".into(),
        Transition::Removed { counterparts } => format!("removed n={counterparts}"),
    }
}

impl<W: Write> TraceSink for PrettyPrintSink<W> {
    fn on_lifecycle(&mut self, e: &LifecycleEvent) {
        let _ = writeln!(
            self.writer,
            "[node] pass={} {:?} {}",
            e.sequence,
            e.node,
            describe(e.transition),
        );
    }

    fn on_pass(&mut self, s: &PassSummary) {
        let _ = writeln!(
            self.writer,
            "[pass] seq={} events={} registered={} deferred={} failed={} removed={} \
             reorders={} rebuilds={} teardowns={}",
            s.sequence,
            s.events,
            s.registered,
            s.deferred,
            s.failed,
            s.removed,
            s.reorders,
            s.rebuilds,
            s.teardowns,
        );
    }
}

#[cfg(test)]
mod tests {
    use tandem_core::map::MapTree;

    use super::*;

    #[test]
    fn pretty_print_lifecycle() {
        let mut tree = MapTree::new();
        let node = tree.create_group();
        let mut sink = PrettyPrintSink::with_writer(Vec::<u8>::new());
        sink.on_lifecycle(&LifecycleEvent {
            sequence: 2,
            node,
            transition: Transition::FactoryFailed(FactoryError::Unsupported),
        });
        let output = String::from_utf8(sink.into_inner()).unwrap();
        assert!(output.starts_with("[node] pass=2"), "got: {output}");
        assert!(output.contains("FAILED unsupported"), "got: {output}");
    }

    #[test]
    fn pretty_print_pass() {
        let mut sink = PrettyPrintSink::with_writer(Vec::<u8>::new());
        sink.on_pass(&PassSummary {
            sequence: 1,
            registered: 4,
            ..PassSummary::default()
        });
        let output = String::from_utf8(sink.into_inner()).unwrap();
        assert!(output.contains("registered=4"), "got: {output}");
        assert_eq!(output.lines().count(), 1);
    }
}
