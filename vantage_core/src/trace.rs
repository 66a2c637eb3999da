// Copyright 2026 the Vantage Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tracing and diagnostics for the observation and frame services.
//!
//! This module provides a [`TraceSink`] trait with per-event methods that the
//! services call at interesting points. All method bodies default to no-ops,
//! so implementing only the events you care about is fine.
//!
//! [`Tracer`] is a cheap clonable handle around an optional shared sink. When
//! the `trace` feature is **off**, every `Tracer` method compiles to nothing.
//! When **on**, each method performs a single `Option` branch before
//! dispatching. A sink that is already busy (a re-entrant event emitted from
//! inside another event) drops the nested event instead of panicking.
//!
//! Human-readable warnings go through the `log` facade regardless of this
//! feature; trace events are the structured, machine-readable channel.
//!
//! # Crate features
//!
//! - `trace`: enables the `Tracer` method bodies.

use alloc::rc::Rc;
use core::cell::RefCell;

use crate::error::{CallbackError, Origin};
use crate::gate::MountPhase;
use crate::time::{Duration, HostTime};

// ---------------------------------------------------------------------------
// Event structs
// ---------------------------------------------------------------------------

/// Emitted when a frame or scroll loop starts or stops.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LoopStateEvent {
    /// Which service owns the loop.
    pub origin: Origin,
    /// Whether the loop is now running.
    pub running: bool,
    /// Live subscribers at the time of the change.
    pub subscribers: usize,
}

/// Emitted when the frame scheduler dispatches a tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameDispatchEvent {
    /// Dispatched-tick counter.
    pub frame_index: u64,
    /// Host time of the animation frame.
    pub now: HostTime,
    /// Time since the previous dispatch.
    pub delta: Duration,
    /// Subscribers invoked.
    pub subscribers: usize,
}

/// Emitted when the frame scheduler throttles an animation frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameSkippedEvent {
    /// Host time of the skipped frame.
    pub now: HostTime,
    /// Time since the last dispatch.
    pub elapsed: Duration,
    /// Target interval the scheduler is throttled to.
    pub interval: Duration,
}

/// Emitted when a subscriber callback reports an error.
#[derive(Clone, Copy, Debug)]
pub struct SubscriberFaultEvent<'a> {
    /// Service that caught the fault.
    pub origin: Origin,
    /// Identifier of the faulting subscriber.
    pub subscriber: &'a str,
    /// The reported error.
    pub error: &'a CallbackError,
}

/// Emitted when the registry creates a new pooled platform observer.
#[derive(Clone, Copy, Debug)]
pub struct ObserverCreatedEvent<'a> {
    /// Canonical options key.
    pub key: &'a str,
    /// Pooled observers after the creation.
    pub pooled: usize,
}

/// Emitted after the registry fans out one platform batch.
#[derive(Clone, Copy, Debug)]
pub struct IntersectionBatchEvent<'a> {
    /// Canonical options key of the reporting observer.
    pub key: &'a str,
    /// Entries in the platform batch.
    pub entries: usize,
    /// Callbacks invoked.
    pub delivered: usize,
}

/// Emitted when the scroll broadcaster publishes a position.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScrollBroadcastEvent {
    /// Published vertical offset.
    pub position: f64,
    /// Scroll events folded into this broadcast.
    pub coalesced: u32,
    /// Subscribers invoked.
    pub subscribers: usize,
}

/// Emitted when a service falls back because the host lacks an API.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DegradedEvent {
    /// Service that degraded.
    pub origin: Origin,
    /// Name of the missing or failing API.
    pub api: &'static str,
}

/// Emitted when a lazy slot changes phase.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MountTransitionEvent<'a> {
    /// Component the slot renders.
    pub component: &'a str,
    /// Phase before the transition.
    pub from: MountPhase,
    /// Phase after the transition.
    pub to: MountPhase,
    /// Host time of the transition.
    pub at: HostTime,
}

// ---------------------------------------------------------------------------
// TraceSink trait
// ---------------------------------------------------------------------------

/// Receives trace events from the services.
///
/// All methods have default no-op implementations, so you only need to
/// override the events you care about.
pub trait TraceSink {
    /// Called when a loop starts or stops.
    fn on_loop_state(&mut self, e: &LoopStateEvent) {
        _ = e;
    }

    /// Called when a frame tick is dispatched.
    fn on_frame_dispatch(&mut self, e: &FrameDispatchEvent) {
        _ = e;
    }

    /// Called when a frame is throttled.
    fn on_frame_skipped(&mut self, e: &FrameSkippedEvent) {
        _ = e;
    }

    /// Called when a subscriber reports a fault.
    fn on_subscriber_fault(&mut self, e: &SubscriberFaultEvent<'_>) {
        _ = e;
    }

    /// Called when a pooled observer is created.
    fn on_observer_created(&mut self, e: &ObserverCreatedEvent<'_>) {
        _ = e;
    }

    /// Called after an intersection batch is fanned out.
    fn on_intersection_batch(&mut self, e: &IntersectionBatchEvent<'_>) {
        _ = e;
    }

    /// Called when a scroll position is broadcast.
    fn on_scroll_broadcast(&mut self, e: &ScrollBroadcastEvent) {
        _ = e;
    }

    /// Called when a service degrades.
    fn on_degraded(&mut self, e: &DegradedEvent) {
        _ = e;
    }

    /// Called when a lazy slot changes phase.
    fn on_mount_transition(&mut self, e: &MountTransitionEvent<'_>) {
        _ = e;
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
// Tracer handle
// ---------------------------------------------------------------------------

/// Shared trace sink as stored by [`Tracer`].
pub type SharedSink = Rc<RefCell<dyn TraceSink>>;

/// Clonable handle around an optional shared [`TraceSink`].
#[derive(Clone, Default)]
pub struct Tracer {
    #[cfg(feature = "trace")]
    sink: Option<SharedSink>,
}

impl core::fmt::Debug for Tracer {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Tracer").finish_non_exhaustive()
    }
}

macro_rules! emit {
    ($self:ident, $method:ident, $e:expr) => {{
        #[cfg(feature = "trace")]
        if let Some(sink) = &$self.sink
            && let Ok(mut sink) = sink.try_borrow_mut()
        {
            sink.$method($e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = $e;
        }
    }};
}

impl Tracer {
    /// Creates a tracer that dispatches to `sink`.
    #[inline]
    #[must_use]
    pub fn new(sink: SharedSink) -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: Some(sink) }
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = sink;
            Self {}
        }
    }

    /// Creates a tracer that discards all events.
    #[inline]
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    /// Emits a [`LoopStateEvent`].
    #[inline]
    pub fn loop_state(&self, e: &LoopStateEvent) {
        emit!(self, on_loop_state, e);
    }

    /// Emits a [`FrameDispatchEvent`].
    #[inline]
    pub fn frame_dispatch(&self, e: &FrameDispatchEvent) {
        emit!(self, on_frame_dispatch, e);
    }

    /// Emits a [`FrameSkippedEvent`].
    #[inline]
    pub fn frame_skipped(&self, e: &FrameSkippedEvent) {
        emit!(self, on_frame_skipped, e);
    }

    /// Emits a [`SubscriberFaultEvent`].
    #[inline]
    pub fn subscriber_fault(&self, e: &SubscriberFaultEvent<'_>) {
        emit!(self, on_subscriber_fault, e);
    }

    /// Emits an [`ObserverCreatedEvent`].
    #[inline]
    pub fn observer_created(&self, e: &ObserverCreatedEvent<'_>) {
        emit!(self, on_observer_created, e);
    }

    /// Emits an [`IntersectionBatchEvent`].
    #[inline]
    pub fn intersection_batch(&self, e: &IntersectionBatchEvent<'_>) {
        emit!(self, on_intersection_batch, e);
    }

    /// Emits a [`ScrollBroadcastEvent`].
    #[inline]
    pub fn scroll_broadcast(&self, e: &ScrollBroadcastEvent) {
        emit!(self, on_scroll_broadcast, e);
    }

    /// Emits a [`DegradedEvent`].
    #[inline]
    pub fn degraded(&self, e: &DegradedEvent) {
        emit!(self, on_degraded, e);
    }

    /// Emits a [`MountTransitionEvent`].
    #[inline]
    pub fn mount_transition(&self, e: &MountTransitionEvent<'_>) {
        emit!(self, on_mount_transition, e);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn noop_sink_accepts_everything() {
        let mut sink = NoopSink;
        sink.on_loop_state(&LoopStateEvent {
            origin: Origin::Frame,
            running: true,
            subscribers: 1,
        });
        sink.on_scroll_broadcast(&ScrollBroadcastEvent {
            position: 120.0,
            coalesced: 3,
            subscribers: 2,
        });
        sink.on_degraded(&DegradedEvent {
            origin: Origin::Observer,
            api: "IntersectionObserver",
        });
    }

    #[test]
    fn tracer_none_does_nothing() {
        let tracer = Tracer::none();
        tracer.frame_dispatch(&FrameDispatchEvent {
            frame_index: 0,
            now: HostTime(16_000),
            delta: Duration::ZERO,
            subscribers: 0,
        });
    }

    #[cfg(feature = "trace")]
    #[test]
    fn tracer_dispatches_to_shared_sink() {
        use alloc::vec::Vec;

        #[derive(Default)]
        struct RecordingSink {
            frames: Vec<u64>,
        }
        impl TraceSink for RecordingSink {
            fn on_frame_dispatch(&mut self, e: &FrameDispatchEvent) {
                self.frames.push(e.frame_index);
            }
        }

        let sink = Rc::new(RefCell::new(RecordingSink::default()));
        let tracer = Tracer::new(sink.clone());
        let copy = tracer.clone();
        for frame_index in [4, 5] {
            copy.frame_dispatch(&FrameDispatchEvent {
                frame_index,
                now: HostTime(0),
                delta: Duration::ZERO,
                subscribers: 1,
            });
        }
        assert_eq!(sink.borrow().frames, &[4, 5]);
    }
}
