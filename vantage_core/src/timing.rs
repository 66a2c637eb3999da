// Copyright 2026 the Vantage Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! What frame subscribers receive.

use crate::time::{Duration, HostTime};

/// One dispatched frame.
///
/// Produced by the [`FrameScheduler`](crate::scheduler::FrameScheduler) for
/// every animation frame that passes its throttle. Frames skipped by the
/// throttle do not produce a tick and do not advance `frame_index`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FrameTick {
    /// Host time of the animation frame.
    pub now: HostTime,
    /// Dispatched-tick counter, starting at 0 each time the loop starts.
    pub frame_index: u64,
    /// Time since the previous dispatched tick; zero for the first tick.
    pub delta: Duration,
}

impl FrameTick {
    /// The frame time as a `DOMHighResTimeStamp` in milliseconds.
    #[must_use]
    pub fn timestamp_ms(&self) -> f64 {
        self.now.as_millis_f64()
    }
}
