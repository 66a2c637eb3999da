// Copyright 2026 the Vantage Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Manually pumped animation frames.

use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cell::RefCell;
use core::fmt;

use crate::backend::{AnimationFrames, FrameCallback, FrameRequestId};
use crate::time::HostTime;

/// [`AnimationFrames`] whose frames fire only from [`run_frame`](Self::run_frame).
#[derive(Clone)]
pub struct HeadlessFrames {
    inner: Rc<RefCell<FramesState>>,
}

struct FramesState {
    supported: bool,
    next_id: u64,
    pending: Vec<(FrameRequestId, FrameCallback)>,
    requested: u64,
    cancelled: u64,
}

impl HeadlessFrames {
    /// Creates a frame source that accepts requests.
    #[must_use]
    pub fn new() -> Self {
        Self::with_support(true)
    }

    /// Creates a frame source that reports itself unsupported.
    #[must_use]
    pub fn unsupported() -> Self {
        Self::with_support(false)
    }

    fn with_support(supported: bool) -> Self {
        Self {
            inner: Rc::new(RefCell::new(FramesState {
                supported,
                next_id: 1,
                pending: Vec::new(),
                requested: 0,
                cancelled: 0,
            })),
        }
    }

    /// Requests waiting for the next frame.
    ///
    /// A single frame loop keeps this at most one.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.inner.borrow().pending.len()
    }

    /// Requests made over the source's lifetime.
    #[must_use]
    pub fn requested_count(&self) -> u64 {
        self.inner.borrow().requested
    }

    /// Pending requests cancelled over the source's lifetime.
    #[must_use]
    pub fn cancelled_count(&self) -> u64 {
        self.inner.borrow().cancelled
    }

    /// Fires every pending request with a `DOMHighResTimeStamp` of
    /// `timestamp_ms`. Requests made while firing wait for the next call.
    ///
    /// Returns the number of callbacks run.
    pub fn run_frame(&self, timestamp_ms: f64) -> usize {
        let due = core::mem::take(&mut self.inner.borrow_mut().pending);
        let now = HostTime::from_millis_f64(timestamp_ms);
        let count = due.len();
        for (_, callback) in due {
            callback(now);
        }
        count
    }

    /// Runs `count` frames spaced `interval_ms` apart, starting at
    /// `start_ms`.
    pub fn run_frames(&self, start_ms: f64, interval_ms: f64, count: u32) {
        for i in 0..count {
            self.run_frame(start_ms + f64::from(i) * interval_ms);
        }
    }
}

impl Default for HeadlessFrames {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for HeadlessFrames {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.borrow();
        f.debug_struct("HeadlessFrames")
            .field("supported", &state.supported)
            .field("pending", &state.pending.len())
            .field("requested", &state.requested)
            .finish_non_exhaustive()
    }
}

impl AnimationFrames for HeadlessFrames {
    fn is_supported(&self) -> bool {
        self.inner.borrow().supported
    }

    fn request(&self, callback: FrameCallback) -> FrameRequestId {
        let mut state = self.inner.borrow_mut();
        let id = FrameRequestId(state.next_id);
        state.next_id += 1;
        state.requested += 1;
        state.pending.push((id, callback));
        id
    }

    fn cancel(&self, id: FrameRequestId) {
        let removed = {
            let mut state = self.inner.borrow_mut();
            let index = state.pending.iter().position(|(pending, _)| *pending == id);
            let removed = index.map(|index| state.pending.remove(index));
            if removed.is_some() {
                state.cancelled += 1;
            }
            removed
        };
        // Dropped callbacks may own subscriptions; drop them unborrowed.
        drop(removed);
    }
}
