// Copyright 2026 the Vantage Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! One animation-frame loop for everything that animates.
//!
//! Components that need per-frame work subscribe to the [`FrameScheduler`]
//! instead of driving their own `requestAnimationFrame` loop. The scheduler
//! owns a single loop that:
//!
//! 1. starts lazily on the first subscription and stops when the last one is
//!    disposed,
//! 2. throttles dispatch to a device-dependent interval, while still
//!    requesting every animation frame,
//! 3. invokes subscribers grouped by [`Priority`] in the fixed order
//!    critical, high, normal, low, and
//! 4. contains subscriber faults so one failing callback never stops the
//!    loop.
//!
//! Each dispatch iterates over a snapshot of the subscriber set, so
//! subscribing or disposing from inside a callback is safe. Changes made
//! during a tick take effect on the next one.

use alloc::boxed::Box;
use alloc::rc::{Rc, Weak};
use alloc::vec::Vec;
use core::cell::RefCell;
use core::fmt;

use crate::backend::{AnimationFrames, FrameRequestId};
use crate::device::DeviceCapabilities;
use crate::error::{CallbackResult, Origin, isolate, report_fault};
use crate::subscription::Subscription;
use crate::time::{Duration, HostTime};
use crate::timing::FrameTick;
use crate::trace::{
    DegradedEvent, FrameDispatchEvent, FrameSkippedEvent, LoopStateEvent, SubscriberFaultEvent,
    Tracer,
};

/// Animation-frame timestamps jitter by a fraction of a millisecond. Frames
/// that arrive this much early still count as due.
const FRAME_SLACK: Duration = Duration(1_000);

/// Dispatch group of a frame subscriber.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Priority {
    /// Input-coupled work that must not lag.
    Critical,
    /// Visible foreground animation.
    High,
    /// Everything else.
    #[default]
    Normal,
    /// Decorative work that can run last.
    Low,
}

impl Priority {
    /// Dispatch order within a tick.
    pub const ORDER: [Self; 4] = [Self::Critical, Self::High, Self::Normal, Self::Low];

    const fn index(self) -> usize {
        match self {
            Self::Critical => 0,
            Self::High => 1,
            Self::Normal => 2,
            Self::Low => 3,
        }
    }

    /// Lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::High => "high",
            Self::Normal => "normal",
            Self::Low => "low",
        }
    }
}

/// Frame-rate targets for the [`FrameScheduler`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Dispatch rate on unconstrained devices.
    pub target_fps: u32,
    /// Dispatch rate on constrained devices.
    pub constrained_fps: u32,
}

impl SchedulerConfig {
    /// Default configuration for browsers: 60 fps, or 15 fps on constrained
    /// devices.
    #[must_use]
    pub const fn web() -> Self {
        Self {
            target_fps: 60,
            constrained_fps: 15,
        }
    }

    /// The dispatch interval for `device`.
    #[must_use]
    pub fn interval_for(&self, device: &dyn DeviceCapabilities) -> Duration {
        let fps = if device.is_constrained() {
            self.constrained_fps
        } else {
            self.target_fps
        };
        Duration::frame_interval(fps)
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self::web()
    }
}

type SharedTickCallback = Rc<RefCell<dyn FnMut(&FrameTick) -> CallbackResult>>;

/// Multiplexes one animation-frame loop to many prioritized subscribers.
///
/// Cloning yields another handle to the same scheduler.
#[derive(Clone)]
pub struct FrameScheduler {
    inner: Rc<SchedulerInner>,
}

struct SchedulerInner {
    frames: Rc<dyn AnimationFrames>,
    tracer: Tracer,
    state: RefCell<SchedulerState>,
}

struct SchedulerState {
    interval: Duration,
    buckets: [Vec<Entry>; 4],
    next_generation: u64,
    pending: Option<FrameRequestId>,
    running: bool,
    paused: bool,
    destroyed: bool,
    /// Time of the last dispatch; the throttle measures from here.
    anchor: Option<HostTime>,
    last_tick: Option<HostTime>,
    frame_index: u64,
}

struct Entry {
    id: Rc<str>,
    generation: u64,
    callback: SharedTickCallback,
}

impl SchedulerState {
    fn subscriber_count(&self) -> usize {
        self.buckets.iter().map(Vec::len).sum()
    }

    fn take_entry(&mut self, id: &str) -> Option<Entry> {
        self.buckets.iter_mut().find_map(|bucket| {
            let index = bucket.iter().position(|entry| &*entry.id == id)?;
            Some(bucket.remove(index))
        })
    }
}

impl FrameScheduler {
    /// Creates a stopped scheduler whose interval is chosen from `device`.
    #[must_use]
    pub fn new(
        frames: Rc<dyn AnimationFrames>,
        device: &dyn DeviceCapabilities,
        config: SchedulerConfig,
        tracer: Tracer,
    ) -> Self {
        Self {
            inner: Rc::new(SchedulerInner {
                frames,
                tracer,
                state: RefCell::new(SchedulerState {
                    interval: config.interval_for(device),
                    buckets: Default::default(),
                    next_generation: 0,
                    pending: None,
                    running: false,
                    paused: false,
                    destroyed: false,
                    anchor: None,
                    last_tick: None,
                    frame_index: 0,
                }),
            }),
        }
    }

    /// Registers `callback` under `id` at `priority`.
    ///
    /// Subscribing again with an `id` that is already registered replaces
    /// the previous callback and priority; the previous subscription handle
    /// becomes a no-op. The loop starts if it was stopped.
    ///
    /// After [`destroy`](Self::destroy) this returns an inert subscription.
    pub fn subscribe<F>(
        &self,
        id: impl Into<Rc<str>>,
        callback: F,
        priority: Priority,
    ) -> Subscription
    where
        F: FnMut(&FrameTick) -> CallbackResult + 'static,
    {
        let id: Rc<str> = id.into();
        let (generation, replaced) = {
            let mut state = self.inner.state.borrow_mut();
            if state.destroyed {
                log::debug!("vantage: frame subscription `{id}` after destroy ignored");
                return Subscription::inert();
            }
            let replaced = state.take_entry(&id);
            let generation = state.next_generation;
            state.next_generation += 1;
            state.buckets[priority.index()].push(Entry {
                id: Rc::clone(&id),
                generation,
                callback: Rc::new(RefCell::new(callback)),
            });
            (generation, replaced)
        };
        drop(replaced);

        self.inner.start();

        let weak = Rc::downgrade(&self.inner);
        Subscription::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.release(&id, generation);
            }
        })
    }

    /// Number of live subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner.state.borrow().subscriber_count()
    }

    /// Whether the loop is running, i.e. has at least one subscriber.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.inner.state.borrow().running
    }

    /// Whether dispatch is paused.
    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.inner.state.borrow().paused
    }

    /// The throttle interval chosen at construction.
    #[must_use]
    pub fn interval(&self) -> Duration {
        self.inner.state.borrow().interval
    }

    /// Pauses or resumes dispatch, e.g. when the page is hidden.
    ///
    /// Pausing cancels the pending frame but keeps every subscription.
    /// The first tick after resuming reports a zero `delta`.
    pub fn set_paused(&self, paused: bool) {
        let cancelled = {
            let mut state = self.inner.state.borrow_mut();
            if state.paused == paused {
                return;
            }
            state.paused = paused;
            if paused {
                state.pending.take()
            } else {
                state.anchor = None;
                state.last_tick = None;
                None
            }
        };
        if let Some(id) = cancelled {
            self.inner.frames.cancel(id);
        }
        if !paused {
            self.inner.request_frame();
        }
    }

    /// Cancels the in-flight frame and drops every subscription.
    ///
    /// Later subscriptions are ignored.
    pub fn destroy(&self) {
        let (buckets, pending, was_running) = {
            let mut state = self.inner.state.borrow_mut();
            state.destroyed = true;
            let was_running = core::mem::replace(&mut state.running, false);
            (
                core::mem::take(&mut state.buckets),
                state.pending.take(),
                was_running,
            )
        };
        if let Some(id) = pending {
            self.inner.frames.cancel(id);
        }
        if was_running {
            self.inner.tracer.loop_state(&LoopStateEvent {
                origin: Origin::Frame,
                running: false,
                subscribers: 0,
            });
        }
        drop(buckets);
    }
}

impl fmt::Debug for FrameScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.borrow();
        f.debug_struct("FrameScheduler")
            .field("interval", &state.interval)
            .field("subscribers", &state.subscriber_count())
            .field("running", &state.running)
            .field("paused", &state.paused)
            .finish_non_exhaustive()
    }
}

impl SchedulerInner {
    /// Moves the loop to running. A no-op when already running.
    fn start(self: &Rc<Self>) {
        let subscribers = {
            let mut state = self.state.borrow_mut();
            if state.running {
                return;
            }
            state.running = true;
            state.anchor = None;
            state.last_tick = None;
            state.frame_index = 0;
            state.subscriber_count()
        };
        log::debug!("vantage: frame loop started");
        self.tracer.loop_state(&LoopStateEvent {
            origin: Origin::Frame,
            running: true,
            subscribers,
        });
        if !self.frames.is_supported() {
            log::info!("vantage: animation frames unavailable; frame subscribers will not tick");
            self.tracer.degraded(&DegradedEvent {
                origin: Origin::Frame,
                api: "requestAnimationFrame",
            });
            return;
        }
        self.request_frame();
    }

    /// Requests the next animation frame unless one is pending or the loop
    /// is stopped or paused.
    fn request_frame(self: &Rc<Self>) {
        {
            let state = self.state.borrow();
            if state.pending.is_some() || !state.running || state.paused {
                return;
            }
        }
        if !self.frames.is_supported() {
            return;
        }
        let weak: Weak<Self> = Rc::downgrade(self);
        let id = self.frames.request(Box::new(move |now| {
            if let Some(inner) = weak.upgrade() {
                inner.on_frame(now);
            }
        }));
        self.state.borrow_mut().pending = Some(id);
    }

    fn on_frame(self: &Rc<Self>, now: HostTime) {
        let due = {
            let mut state = self.state.borrow_mut();
            state.pending = None;
            if !state.running || state.paused {
                return;
            }
            match state.anchor {
                Some(anchor) => {
                    let elapsed = now.saturating_duration_since(anchor);
                    if elapsed + FRAME_SLACK < state.interval {
                        Err(FrameSkippedEvent {
                            now,
                            elapsed,
                            interval: state.interval,
                        })
                    } else {
                        state.anchor = Some(now);
                        Ok(())
                    }
                }
                None => {
                    state.anchor = Some(now);
                    Ok(())
                }
            }
        };

        match due {
            Ok(()) => self.dispatch(now),
            Err(skipped) => self.tracer.frame_skipped(&skipped),
        }

        self.request_frame();
    }

    fn dispatch(&self, now: HostTime) {
        let (tick, snapshot) = {
            let mut state = self.state.borrow_mut();
            let delta = state
                .last_tick
                .map_or(Duration::ZERO, |last| now.saturating_duration_since(last));
            let tick = FrameTick {
                now,
                frame_index: state.frame_index,
                delta,
            };
            state.frame_index += 1;
            state.last_tick = Some(now);
            let snapshot: Vec<(Rc<str>, SharedTickCallback)> = Priority::ORDER
                .iter()
                .flat_map(|priority| state.buckets[priority.index()].iter())
                .map(|entry| (Rc::clone(&entry.id), Rc::clone(&entry.callback)))
                .collect();
            (tick, snapshot)
        };

        self.tracer.frame_dispatch(&FrameDispatchEvent {
            frame_index: tick.frame_index,
            now,
            delta: tick.delta,
            subscribers: snapshot.len(),
        });

        for (id, callback) in &snapshot {
            let Ok(mut callback) = callback.try_borrow_mut() else {
                continue;
            };
            if let Err(error) = isolate(|| callback(&tick)) {
                report_fault(Origin::Frame, id, &error);
                self.tracer.subscriber_fault(&SubscriberFaultEvent {
                    origin: Origin::Frame,
                    subscriber: id,
                    error: &error,
                });
            }
        }
    }

    fn release(&self, id: &str, generation: u64) {
        let (removed, cancelled, stopped) = {
            let mut state = self.state.borrow_mut();
            let live = state
                .buckets
                .iter()
                .flatten()
                .any(|entry| &*entry.id == id && entry.generation == generation);
            if !live {
                return;
            }
            let removed = state.take_entry(id);
            if state.subscriber_count() == 0 && state.running {
                state.running = false;
                (removed, state.pending.take(), true)
            } else {
                (removed, None, false)
            }
        };
        if let Some(request) = cancelled {
            self.frames.cancel(request);
        }
        if stopped {
            log::debug!("vantage: frame loop stopped");
            self.tracer.loop_state(&LoopStateEvent {
                origin: Origin::Frame,
                running: false,
                subscribers: 0,
            });
        }
        drop(removed);
    }
}
