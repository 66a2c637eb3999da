// Copyright 2026 the Vantage Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Compact binary event recording and decoding.
//!
//! [`RecorderSink`] implements [`TraceSink`] and encodes events into a
//! `Vec<u8>` as little-endian records. [`decode`] reads them back as an
//! iterator of [`RecordedEvent`].
//!
//! Borrowed strings (subscriber ids, observer keys, component names, error
//! messages) are stored length-prefixed and decode to owned `String`s.
//! Counts are stored as `u32`, saturating.

use vantage_core::error::Origin;
use vantage_core::gate::MountPhase;
use vantage_core::time::{Duration, HostTime};
use vantage_core::trace::{
    DegradedEvent, FrameDispatchEvent, FrameSkippedEvent, IntersectionBatchEvent, LoopStateEvent,
    MountTransitionEvent, ObserverCreatedEvent, ScrollBroadcastEvent, SubscriberFaultEvent,
    TraceSink,
};

// ---------------------------------------------------------------------------
// Event type discriminants
// ---------------------------------------------------------------------------

const TAG_LOOP_STATE: u8 = 1;
const TAG_FRAME_DISPATCH: u8 = 2;
const TAG_FRAME_SKIPPED: u8 = 3;
const TAG_SUBSCRIBER_FAULT: u8 = 4;
const TAG_OBSERVER_CREATED: u8 = 5;
const TAG_INTERSECTION_BATCH: u8 = 6;
const TAG_SCROLL_BROADCAST: u8 = 7;
const TAG_DEGRADED: u8 = 8;
const TAG_MOUNT_TRANSITION: u8 = 9;

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

    fn write_f64(&mut self, v: f64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_count(&mut self, v: usize) {
        self.write_u32(u32::try_from(v).unwrap_or(u32::MAX));
    }

    fn write_str(&mut self, s: &str) {
        let len = s.len().min(u32::MAX as usize);
        self.write_count(len);
        self.buf.extend_from_slice(&s.as_bytes()[..len]);
    }

    fn write_origin(&mut self, origin: Origin) {
        self.write_u8(match origin {
            Origin::Observer => 0,
            Origin::Frame => 1,
            Origin::Scroll => 2,
            Origin::Mount => 3,
        });
    }

    fn write_phase(&mut self, phase: MountPhase) {
        self.write_u8(match phase {
            MountPhase::Waiting => 0,
            MountPhase::Triggered => 1,
            MountPhase::Mounted => 2,
            MountPhase::UnmountedAfterExit => 3,
        });
    }
}

impl TraceSink for RecorderSink {
    fn on_loop_state(&mut self, e: &LoopStateEvent) {
        self.write_u8(TAG_LOOP_STATE);
        self.write_origin(e.origin);
        self.write_u8(u8::from(e.running));
        self.write_count(e.subscribers);
    }

    fn on_frame_dispatch(&mut self, e: &FrameDispatchEvent) {
        self.write_u8(TAG_FRAME_DISPATCH);
        self.write_u64(e.frame_index);
        self.write_u64(e.now.ticks());
        self.write_u64(e.delta.ticks());
        self.write_count(e.subscribers);
    }

    fn on_frame_skipped(&mut self, e: &FrameSkippedEvent) {
        self.write_u8(TAG_FRAME_SKIPPED);
        self.write_u64(e.now.ticks());
        self.write_u64(e.elapsed.ticks());
        self.write_u64(e.interval.ticks());
    }

    fn on_subscriber_fault(&mut self, e: &SubscriberFaultEvent<'_>) {
        self.write_u8(TAG_SUBSCRIBER_FAULT);
        self.write_origin(e.origin);
        self.write_str(e.subscriber);
        self.write_str(&e.error.to_string());
    }

    fn on_observer_created(&mut self, e: &ObserverCreatedEvent<'_>) {
        self.write_u8(TAG_OBSERVER_CREATED);
        self.write_str(e.key);
        self.write_count(e.pooled);
    }

    fn on_intersection_batch(&mut self, e: &IntersectionBatchEvent<'_>) {
        self.write_u8(TAG_INTERSECTION_BATCH);
        self.write_str(e.key);
        self.write_count(e.entries);
        self.write_count(e.delivered);
    }

    fn on_scroll_broadcast(&mut self, e: &ScrollBroadcastEvent) {
        self.write_u8(TAG_SCROLL_BROADCAST);
        self.write_f64(e.position);
        self.write_u32(e.coalesced);
        self.write_count(e.subscribers);
    }

    fn on_degraded(&mut self, e: &DegradedEvent) {
        self.write_u8(TAG_DEGRADED);
        self.write_origin(e.origin);
        self.write_str(e.api);
    }

    fn on_mount_transition(&mut self, e: &MountTransitionEvent<'_>) {
        self.write_u8(TAG_MOUNT_TRANSITION);
        self.write_str(e.component);
        self.write_phase(e.from);
        self.write_phase(e.to);
        self.write_u64(e.at.ticks());
    }
}

// ---------------------------------------------------------------------------
// Decoder
// ---------------------------------------------------------------------------

/// A decoded event from a binary recording.
#[derive(Clone, Debug, PartialEq)]
pub enum RecordedEvent {
    /// A [`LoopStateEvent`].
    LoopState(LoopStateEvent),
    /// A [`FrameDispatchEvent`].
    FrameDispatch(FrameDispatchEvent),
    /// A [`FrameSkippedEvent`].
    FrameSkipped(FrameSkippedEvent),
    /// A [`SubscriberFaultEvent`] with its error rendered to text.
    SubscriberFault {
        /// Service that caught the fault.
        origin: Origin,
        /// Identifier of the faulting subscriber.
        subscriber: String,
        /// The error's display text.
        message: String,
    },
    /// An [`ObserverCreatedEvent`].
    ObserverCreated {
        /// Canonical options key.
        key: String,
        /// Pooled observers after the creation.
        pooled: u32,
    },
    /// An [`IntersectionBatchEvent`].
    IntersectionBatch {
        /// Canonical options key.
        key: String,
        /// Entries in the platform batch.
        entries: u32,
        /// Callbacks invoked.
        delivered: u32,
    },
    /// A [`ScrollBroadcastEvent`].
    ScrollBroadcast(ScrollBroadcastEvent),
    /// A [`DegradedEvent`].
    Degraded {
        /// Service that degraded.
        origin: Origin,
        /// Name of the missing or failing API.
        api: String,
    },
    /// A [`MountTransitionEvent`].
    MountTransition {
        /// Component the slot renders.
        component: String,
        /// Phase before the transition.
        from: MountPhase,
        /// Phase after the transition.
        to: MountPhase,
        /// Host time of the transition.
        at: HostTime,
    },
}

impl RecordedEvent {
    /// Host time carried by the event, if it has one.
    #[must_use]
    pub fn timestamp(&self) -> Option<HostTime> {
        match self {
            Self::FrameDispatch(e) => Some(e.now),
            Self::FrameSkipped(e) => Some(e.now),
            Self::MountTransition { at, .. } => Some(*at),
            _ => None,
        }
    }
}

/// Decodes a byte slice produced by [`RecorderSink`] into an iterator of
/// [`RecordedEvent`].
///
/// Iteration stops at the first unknown tag or truncated record.
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
    fn take(&mut self, n: usize) -> Option<&[u8]> {
        let end = self.pos.checked_add(n)?;
        let bytes = self.data.get(self.pos..end)?;
        self.pos = end;
        Some(bytes)
    }

    fn read_u8(&mut self) -> Option<u8> {
        Some(self.take(1)?[0])
    }

    fn read_u32(&mut self) -> Option<u32> {
        Some(u32::from_le_bytes(self.take(4)?.try_into().ok()?))
    }

    fn read_u64(&mut self) -> Option<u64> {
        Some(u64::from_le_bytes(self.take(8)?.try_into().ok()?))
    }

    fn read_f64(&mut self) -> Option<f64> {
        Some(f64::from_le_bytes(self.take(8)?.try_into().ok()?))
    }

    fn read_count(&mut self) -> Option<usize> {
        usize::try_from(self.read_u32()?).ok()
    }

    fn read_string(&mut self) -> Option<String> {
        let len = self.read_count()?;
        let bytes = self.take(len)?;
        Some(String::from_utf8_lossy(bytes).into_owned())
    }

    fn read_origin(&mut self) -> Option<Origin> {
        Some(match self.read_u8()? {
            0 => Origin::Observer,
            1 => Origin::Frame,
            2 => Origin::Scroll,
            3 => Origin::Mount,
            _ => return None,
        })
    }

    fn read_phase(&mut self) -> Option<MountPhase> {
        Some(match self.read_u8()? {
            0 => MountPhase::Waiting,
            1 => MountPhase::Triggered,
            2 => MountPhase::Mounted,
            3 => MountPhase::UnmountedAfterExit,
            _ => return None,
        })
    }

    fn decode_loop_state(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::LoopState(LoopStateEvent {
            origin: self.read_origin()?,
            running: self.read_u8()? != 0,
            subscribers: self.read_count()?,
        }))
    }

    fn decode_frame_dispatch(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::FrameDispatch(FrameDispatchEvent {
            frame_index: self.read_u64()?,
            now: HostTime(self.read_u64()?),
            delta: Duration(self.read_u64()?),
            subscribers: self.read_count()?,
        }))
    }

    fn decode_frame_skipped(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::FrameSkipped(FrameSkippedEvent {
            now: HostTime(self.read_u64()?),
            elapsed: Duration(self.read_u64()?),
            interval: Duration(self.read_u64()?),
        }))
    }

    fn decode_subscriber_fault(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::SubscriberFault {
            origin: self.read_origin()?,
            subscriber: self.read_string()?,
            message: self.read_string()?,
        })
    }

    fn decode_observer_created(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::ObserverCreated {
            key: self.read_string()?,
            pooled: self.read_u32()?,
        })
    }

    fn decode_intersection_batch(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::IntersectionBatch {
            key: self.read_string()?,
            entries: self.read_u32()?,
            delivered: self.read_u32()?,
        })
    }

    fn decode_scroll_broadcast(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::ScrollBroadcast(ScrollBroadcastEvent {
            position: self.read_f64()?,
            coalesced: self.read_u32()?,
            subscribers: self.read_count()?,
        }))
    }

    fn decode_degraded(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::Degraded {
            origin: self.read_origin()?,
            api: self.read_string()?,
        })
    }

    fn decode_mount_transition(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::MountTransition {
            component: self.read_string()?,
            from: self.read_phase()?,
            to: self.read_phase()?,
            at: HostTime(self.read_u64()?),
        })
    }
}

impl Iterator for DecodeIter<'_> {
    type Item = RecordedEvent;

    fn next(&mut self) -> Option<Self::Item> {
        let tag = self.read_u8()?;
        match tag {
            TAG_LOOP_STATE => self.decode_loop_state(),
            TAG_FRAME_DISPATCH => self.decode_frame_dispatch(),
            TAG_FRAME_SKIPPED => self.decode_frame_skipped(),
            TAG_SUBSCRIBER_FAULT => self.decode_subscriber_fault(),
            TAG_OBSERVER_CREATED => self.decode_observer_created(),
            TAG_INTERSECTION_BATCH => self.decode_intersection_batch(),
            TAG_SCROLL_BROADCAST => self.decode_scroll_broadcast(),
            TAG_DEGRADED => self.decode_degraded(),
            TAG_MOUNT_TRANSITION => self.decode_mount_transition(),
            _ => None, // unknown tag → stop iteration
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;
    use vantage_core::device::{PerformanceTier, StaticDevice};
    use vantage_core::error::{CallbackError, CallbackResult};
    use vantage_core::headless::{
        HeadlessElement, HeadlessFrames, HeadlessIntersection, HeadlessScroll, HeadlessTimers,
    };
    use vantage_core::observer::{IntersectionSnapshot, ObserverOptions};
    use vantage_core::scheduler::Priority;
    use vantage_core::services::{Platform, Services, ServicesConfig};
    use vantage_core::timing::FrameTick;
    use vantage_core::trace::Tracer;

    #[test]
    fn records_mixed_events_in_order() {
        let mut rec = RecorderSink::new();
        rec.on_loop_state(&LoopStateEvent {
            origin: Origin::Frame,
            running: true,
            subscribers: 2,
        });
        rec.on_subscriber_fault(&SubscriberFaultEvent {
            origin: Origin::Scroll,
            subscriber: "scroll#3",
            error: &CallbackError::msg("boom"),
        });
        rec.on_mount_transition(&MountTransitionEvent {
            component: "PlanetScene",
            from: MountPhase::Triggered,
            to: MountPhase::Mounted,
            at: HostTime(48_000),
        });

        let events: Vec<_> = decode(rec.as_bytes()).collect();
        assert_eq!(events.len(), 3);
        assert_eq!(
            events[0],
            RecordedEvent::LoopState(LoopStateEvent {
                origin: Origin::Frame,
                running: true,
                subscribers: 2,
            })
        );
        match &events[1] {
            RecordedEvent::SubscriberFault {
                origin,
                subscriber,
                message,
            } => {
                assert_eq!(*origin, Origin::Scroll);
                assert_eq!(subscriber, "scroll#3");
                assert!(message.contains("boom"), "got: {message}");
            }
            other => panic!("expected SubscriberFault, got {other:?}"),
        }
        assert_eq!(events[2].timestamp(), Some(HostTime(48_000)));
    }

    #[test]
    fn truncated_recording_stops_cleanly() {
        let mut rec = RecorderSink::new();
        rec.on_frame_dispatch(&FrameDispatchEvent {
            frame_index: 1,
            now: HostTime(16_000),
            delta: Duration(16_000),
            subscribers: 1,
        });
        rec.on_observer_created(&ObserverCreatedEvent {
            key: "margin=0px 0px 0px 0px;threshold=0;root=viewport",
            pooled: 1,
        });
        let bytes = rec.into_bytes();

        let events: Vec<_> = decode(&bytes[..bytes.len() - 3]).collect();
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], RecordedEvent::FrameDispatch(_)));
    }

    #[test]
    fn unknown_tag_ends_decoding() {
        let events: Vec<_> = decode(&[0xff, 1, 2, 3]).collect();
        assert!(events.is_empty());
        let events: Vec<_> = decode(&[]).collect();
        assert!(events.is_empty());
    }

    #[test]
    fn records_a_live_session() {
        let recorder = Rc::new(RefCell::new(RecorderSink::new()));
        let intersection = HeadlessIntersection::new();
        let frames = HeadlessFrames::new();
        let services = Services::init(
            Platform {
                intersection: intersection.clone(),
                frames: Rc::new(frames.clone()),
                scroll: HeadlessScroll::new(),
                timers: Rc::new(HeadlessTimers::new()),
                device: Rc::new(StaticDevice::new(PerformanceTier::High)),
            },
            ServicesConfig::web(),
            Tracer::new(recorder.clone()),
        );

        let _spin = services.frame_subscribe("spin", |_: &FrameTick| Ok(()), Priority::Normal);
        let _fail = services.frame_subscribe(
            "fail",
            |_: &FrameTick| -> CallbackResult { Err(CallbackError::msg("nope")) },
            Priority::Low,
        );
        let _watch = services.observe(
            HeadlessElement(1),
            &ObserverOptions::new(),
            |_: &IntersectionSnapshot<HeadlessElement>| Ok(()),
        );
        frames.run_frame(0.0);
        intersection.set_intersecting(&[HeadlessElement(1)], true);

        let recorder = recorder.borrow();
        let events: Vec<_> = decode(recorder.as_bytes()).collect();
        assert!(
            events
                .iter()
                .any(|e| matches!(e, RecordedEvent::LoopState(s) if s.running)),
            "got: {events:?}"
        );
        assert!(
            events.iter().any(|e| matches!(
                e,
                RecordedEvent::SubscriberFault { subscriber, .. } if subscriber == "fail"
            )),
            "got: {events:?}"
        );
        assert!(
            events
                .iter()
                .any(|e| matches!(e, RecordedEvent::FrameDispatch(d) if d.subscribers == 2)),
            "got: {events:?}"
        );
        assert!(
            events.iter().any(|e| matches!(
                e,
                RecordedEvent::IntersectionBatch {
                    entries: 1,
                    delivered: 1,
                    ..
                }
            )),
            "got: {events:?}"
        );
    }
}
