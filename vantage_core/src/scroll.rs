// Copyright 2026 the Vantage Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Single scroll listener, broadcast once per animation frame.
//!
//! The [`ScrollBroadcaster`] installs the host scroll listener when its first
//! subscriber arrives and removes it when the last one leaves. Scroll events
//! only record the latest offset and request an animation frame; the frame
//! callback publishes one [`ScrollSample`] to every subscriber. However many
//! scroll events land within a frame, subscribers see at most one broadcast,
//! carrying the last position.
//!
//! On constrained devices the broadcaster can be disabled outright (see
//! [`ScrollConfig::disable_on_constrained`]): subscriptions are inert and the
//! position reads as zero.

use alloc::boxed::Box;
use alloc::format;
use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cell::RefCell;
use core::fmt;

use crate::backend::{AnimationFrames, FrameRequestId, ScrollSource};
use crate::device::DeviceCapabilities;
use crate::error::{CallbackResult, Origin, isolate, report_fault};
use crate::subscription::Subscription;
use crate::trace::{
    DegradedEvent, LoopStateEvent, ScrollBroadcastEvent, SubscriberFaultEvent, Tracer,
};

/// Scroll broadcaster policy.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScrollConfig {
    /// Turn the broadcaster into a no-op on constrained devices.
    pub disable_on_constrained: bool,
}

impl Default for ScrollConfig {
    fn default() -> Self {
        Self {
            disable_on_constrained: true,
        }
    }
}

/// Which way the page moved since the previous broadcast.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ScrollDirection {
    /// Towards the top of the page.
    Up,
    /// Towards the bottom of the page.
    Down,
    /// No movement.
    Idle,
}

/// One broadcast scroll position.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScrollSample {
    /// Vertical offset in CSS pixels.
    pub position: f64,
    /// Change since the previous broadcast.
    pub delta: f64,
    /// Sign of `delta`.
    pub direction: ScrollDirection,
}

impl ScrollSample {
    fn between(previous: f64, position: f64) -> Self {
        let delta = position - previous;
        let direction = if delta > 0.0 {
            ScrollDirection::Down
        } else if delta < 0.0 {
            ScrollDirection::Up
        } else {
            ScrollDirection::Idle
        };
        Self {
            position,
            delta,
            direction,
        }
    }
}

type SharedScrollCallback = Rc<RefCell<dyn FnMut(&ScrollSample) -> CallbackResult>>;

/// Shares one scroll listener among any number of subscribers.
///
/// Cloning yields another handle to the same broadcaster.
#[derive(Clone)]
pub struct ScrollBroadcaster {
    inner: Rc<ScrollInner>,
}

struct ScrollInner {
    source: RefCell<Box<dyn ScrollSource>>,
    frames: Rc<dyn AnimationFrames>,
    tracer: Tracer,
    disabled: bool,
    state: RefCell<ScrollState>,
}

#[derive(Default)]
struct ScrollState {
    subscribers: Vec<(u64, SharedScrollCallback)>,
    next_token: u64,
    attached: bool,
    latest: f64,
    broadcast: f64,
    coalesced: u32,
    pending: Option<FrameRequestId>,
    destroyed: bool,
}

impl ScrollBroadcaster {
    /// Creates a broadcaster over `source`, coalescing with `frames`.
    ///
    /// Nothing is attached until the first [`subscribe`](Self::subscribe).
    #[must_use]
    pub fn new(
        source: impl ScrollSource + 'static,
        frames: Rc<dyn AnimationFrames>,
        device: &dyn DeviceCapabilities,
        config: ScrollConfig,
        tracer: Tracer,
    ) -> Self {
        let disabled = config.disable_on_constrained && device.is_constrained();
        if disabled {
            log::debug!("vantage: scroll broadcasting disabled on a constrained device");
        }
        Self {
            inner: Rc::new(ScrollInner {
                source: RefCell::new(Box::new(source)),
                frames,
                tracer,
                disabled,
                state: RefCell::new(ScrollState::default()),
            }),
        }
    }

    /// Registers `callback` for coalesced scroll samples.
    ///
    /// Returns an inert subscription when the broadcaster is disabled or
    /// destroyed.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: FnMut(&ScrollSample) -> CallbackResult + 'static,
    {
        if self.inner.disabled {
            return Subscription::inert();
        }
        let (token, first) = {
            let mut state = self.inner.state.borrow_mut();
            if state.destroyed {
                return Subscription::inert();
            }
            let token = state.next_token;
            state.next_token += 1;
            state.subscribers.push((token, Rc::new(RefCell::new(callback))));
            (token, !state.attached)
        };
        if first {
            self.inner.attach();
        }

        let weak = Rc::downgrade(&self.inner);
        Subscription::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.release(token);
            }
        })
    }

    /// The last known vertical offset.
    ///
    /// Zero before the listener has attached and always zero while disabled.
    #[must_use]
    pub fn position(&self) -> f64 {
        if self.inner.disabled {
            return 0.0;
        }
        self.inner.state.borrow().latest
    }

    /// Number of live subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner.state.borrow().subscribers.len()
    }

    /// Whether the host listener is installed.
    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.inner.state.borrow().attached
    }

    /// Whether the device policy turned the broadcaster off.
    #[must_use]
    pub fn is_disabled(&self) -> bool {
        self.inner.disabled
    }

    /// Detaches the listener, cancels the pending frame and drops every
    /// subscriber. Later subscriptions are inert.
    pub fn destroy(&self) {
        let subscribers = {
            let mut state = self.inner.state.borrow_mut();
            state.destroyed = true;
            core::mem::take(&mut state.subscribers)
        };
        self.inner.detach();
        drop(subscribers);
    }
}

impl fmt::Debug for ScrollBroadcaster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.borrow();
        f.debug_struct("ScrollBroadcaster")
            .field("disabled", &self.inner.disabled)
            .field("attached", &state.attached)
            .field("subscribers", &state.subscribers.len())
            .field("position", &state.latest)
            .finish_non_exhaustive()
    }
}

impl ScrollInner {
    fn attach(self: &Rc<Self>) {
        let weak = Rc::downgrade(self);
        let result = self
            .source
            .borrow_mut()
            .attach(Box::new(move |position| {
                if let Some(inner) = weak.upgrade() {
                    inner.on_scroll(position);
                }
            }));
        match result {
            Ok(()) => {
                let position = self.source.borrow().position();
                let subscribers = {
                    let mut state = self.state.borrow_mut();
                    state.attached = true;
                    state.latest = position;
                    state.broadcast = position;
                    state.subscribers.len()
                };
                log::debug!("vantage: scroll listener attached");
                self.tracer.loop_state(&LoopStateEvent {
                    origin: Origin::Scroll,
                    running: true,
                    subscribers,
                });
            }
            Err(error) => {
                log::info!("vantage: scroll listener unavailable ({error})");
                self.tracer.degraded(&DegradedEvent {
                    origin: Origin::Scroll,
                    api: "scroll",
                });
            }
        }
    }

    /// Removes the host listener and cancels any pending broadcast.
    fn detach(&self) {
        let pending = {
            let mut state = self.state.borrow_mut();
            if !state.attached {
                return;
            }
            state.attached = false;
            state.coalesced = 0;
            state.pending.take()
        };
        if let Some(id) = pending {
            self.frames.cancel(id);
        }
        self.source.borrow_mut().detach();
        log::debug!("vantage: scroll listener detached");
        self.tracer.loop_state(&LoopStateEvent {
            origin: Origin::Scroll,
            running: false,
            subscribers: 0,
        });
    }

    fn on_scroll(self: &Rc<Self>, position: f64) {
        let request = {
            let mut state = self.state.borrow_mut();
            if !state.attached {
                return;
            }
            state.latest = position;
            state.coalesced = state.coalesced.saturating_add(1);
            state.pending.is_none()
        };
        if !request {
            return;
        }
        if !self.frames.is_supported() {
            // Without animation frames there is nothing to coalesce with.
            self.broadcast();
            return;
        }
        let weak = Rc::downgrade(self);
        let id = self.frames.request(Box::new(move |_| {
            if let Some(inner) = weak.upgrade() {
                inner.broadcast();
            }
        }));
        self.state.borrow_mut().pending = Some(id);
    }

    fn broadcast(&self) {
        let (sample, coalesced, snapshot) = {
            let mut state = self.state.borrow_mut();
            state.pending = None;
            if !state.attached {
                return;
            }
            let sample = ScrollSample::between(state.broadcast, state.latest);
            state.broadcast = state.latest;
            let coalesced = core::mem::take(&mut state.coalesced);
            let snapshot: Vec<(u64, SharedScrollCallback)> = state
                .subscribers
                .iter()
                .map(|(token, callback)| (*token, Rc::clone(callback)))
                .collect();
            (sample, coalesced, snapshot)
        };

        self.tracer.scroll_broadcast(&ScrollBroadcastEvent {
            position: sample.position,
            coalesced,
            subscribers: snapshot.len(),
        });

        for (token, callback) in &snapshot {
            let Ok(mut callback) = callback.try_borrow_mut() else {
                continue;
            };
            if let Err(error) = isolate(|| callback(&sample)) {
                let subscriber = format!("scroll#{token}");
                report_fault(Origin::Scroll, &subscriber, &error);
                self.tracer.subscriber_fault(&SubscriberFaultEvent {
                    origin: Origin::Scroll,
                    subscriber: &subscriber,
                    error: &error,
                });
            }
        }
    }

    fn release(&self, token: u64) {
        let (removed, last) = {
            let mut state = self.state.borrow_mut();
            let Some(index) = state.subscribers.iter().position(|(t, _)| *t == token) else {
                return;
            };
            let removed = state.subscribers.remove(index);
            (removed, state.subscribers.is_empty())
        };
        if last {
            self.detach();
        }
        drop(removed);
    }
}
