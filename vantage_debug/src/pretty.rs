// Copyright 2026 the Vantage Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Human-readable trace output.
//!
//! [`PrettyPrintSink`] implements [`TraceSink`] and writes one line per event
//! to a [`Write`](std::io::Write) destination (default: stderr). Host times
//! are printed in milliseconds, the unit browsers report them in.

use std::io::Write;

use vantage_core::time::{Duration, HostTime};
use vantage_core::trace::{
    DegradedEvent, FrameDispatchEvent, FrameSkippedEvent, IntersectionBatchEvent, LoopStateEvent,
    MountTransitionEvent, ObserverCreatedEvent, ScrollBroadcastEvent, SubscriberFaultEvent,
    TraceSink,
};

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

    /// Consumes the sink and returns its destination.
    #[must_use]
    pub fn into_inner(self) -> W {
        self.writer
    }
}

fn ms(t: HostTime) -> f64 {
    t.as_millis_f64()
}

fn span_ms(d: Duration) -> f64 {
    d.as_millis_f64()
}

impl<W: Write> TraceSink for PrettyPrintSink<W> {
    fn on_loop_state(&mut self, e: &LoopStateEvent) {
        let state = if e.running { "start" } else { "stop" };
        let _ = writeln!(
            self.writer,
            "[loop:{state}] {} subscribers={}",
            e.origin.as_str(),
            e.subscribers,
        );
    }

    fn on_frame_dispatch(&mut self, e: &FrameDispatchEvent) {
        let _ = writeln!(
            self.writer,
            "[frame] index={} now={:.1}ms delta={:.1}ms subscribers={}",
            e.frame_index,
            ms(e.now),
            span_ms(e.delta),
            e.subscribers,
        );
    }

    fn on_frame_skipped(&mut self, e: &FrameSkippedEvent) {
        let _ = writeln!(
            self.writer,
            "[frame:skip] now={:.1}ms elapsed={:.1}ms interval={:.1}ms",
            ms(e.now),
            span_ms(e.elapsed),
            span_ms(e.interval),
        );
    }

    fn on_subscriber_fault(&mut self, e: &SubscriberFaultEvent<'_>) {
        let _ = writeln!(
            self.writer,
            "[fault] {} subscriber={} {}",
            e.origin.as_str(),
            e.subscriber,
            e.error,
        );
    }

    fn on_observer_created(&mut self, e: &ObserverCreatedEvent<'_>) {
        let _ = writeln!(
            self.writer,
            "[observer:new] {} pooled={}",
            e.key, e.pooled,
        );
    }

    fn on_intersection_batch(&mut self, e: &IntersectionBatchEvent<'_>) {
        let _ = writeln!(
            self.writer,
            "[observer:batch] {} entries={} delivered={}",
            e.key, e.entries, e.delivered,
        );
    }

    fn on_scroll_broadcast(&mut self, e: &ScrollBroadcastEvent) {
        let _ = writeln!(
            self.writer,
            "[scroll] y={:.1} coalesced={} subscribers={}",
            e.position, e.coalesced, e.subscribers,
        );
    }

    fn on_degraded(&mut self, e: &DegradedEvent) {
        let _ = writeln!(
            self.writer,
            "[degraded] {} missing={}",
            e.origin.as_str(),
            e.api,
        );
    }

    fn on_mount_transition(&mut self, e: &MountTransitionEvent<'_>) {
        let _ = writeln!(
            self.writer,
            "[mount] {} {} -> {} at {:.1}ms",
            e.component,
            e.from.as_str(),
            e.to.as_str(),
            ms(e.at),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vantage_core::error::{CallbackError, Origin};
    use vantage_core::gate::MountPhase;

    fn render(f: impl FnOnce(&mut PrettyPrintSink<Vec<u8>>)) -> String {
        let mut sink = PrettyPrintSink::with_writer(Vec::<u8>::new());
        f(&mut sink);
        String::from_utf8(sink.into_inner()).unwrap()
    }

    #[test]
    fn pretty_print_frame() {
        let output = render(|sink| {
            sink.on_frame_dispatch(&FrameDispatchEvent {
                frame_index: 3,
                now: HostTime(50_000),
                delta: Duration(16_667),
                subscribers: 2,
            });
        });
        assert!(output.contains("[frame]"), "got: {output}");
        assert!(output.contains("index=3"), "got: {output}");
        assert!(output.contains("now=50.0ms"), "got: {output}");
    }

    #[test]
    fn pretty_print_fault_and_mount() {
        let output = render(|sink| {
            sink.on_subscriber_fault(&SubscriberFaultEvent {
                origin: Origin::Frame,
                subscriber: "parallax",
                error: &CallbackError::msg("bad transform"),
            });
            sink.on_mount_transition(&MountTransitionEvent {
                component: "MoonScene",
                from: MountPhase::Waiting,
                to: MountPhase::Triggered,
                at: HostTime(1_000),
            });
        });
        let lines: Vec<_> = output.lines().collect();
        assert_eq!(lines.len(), 2, "got: {output}");
        assert!(lines[0].starts_with("[fault] frame subscriber=parallax"), "got: {output}");
        assert!(lines[0].contains("bad transform"), "got: {output}");
        assert!(lines[1].contains("MoonScene"), "got: {output}");
    }
}
