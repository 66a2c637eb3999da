// Copyright 2026 the Vantage Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! `setTimeout` timers and the `performance.now()` clock.

use alloc::boxed::Box;
use alloc::collections::BTreeMap;
use alloc::rc::Rc;
use core::cell::RefCell;

use wasm_bindgen::closure::Closure;
use wasm_bindgen::prelude::*;

use vantage_core::backend::{TimerId, Timers};
use vantage_core::time::{Duration, HostTime};

#[wasm_bindgen]
extern "C" {
    // The third argument is passed through to the handler, so one closure
    // serves every timeout.
    #[wasm_bindgen(js_name = "setTimeout")]
    fn set_timeout_with_id(handler: &JsValue, timeout_ms: i32, id: f64) -> i32;

    #[wasm_bindgen(js_name = "clearTimeout")]
    fn clear_timeout(handle: i32);
}

/// [`Timers`] over `setTimeout` and `performance.now()`.
pub struct WebTimers {
    state: Rc<RefCell<TimerState>>,
    closure: Closure<dyn FnMut(f64)>,
}

#[derive(Default)]
struct TimerState {
    next_id: u64,
    pending: BTreeMap<TimerId, (i32, Box<dyn FnOnce()>)>,
}

impl WebTimers {
    /// Creates a timer source with nothing scheduled.
    #[must_use]
    pub fn new() -> Self {
        let state: Rc<RefCell<TimerState>> = Rc::default();
        let weak = Rc::downgrade(&state);
        let closure = Closure::wrap(Box::new(move |id: f64| {
            let Some(state) = weak.upgrade() else {
                return;
            };
            let Some(id) = timer_id_from_js(id) else {
                return;
            };
            let due = state.borrow_mut().pending.remove(&id);
            if let Some((_, callback)) = due {
                callback();
            }
        }) as Box<dyn FnMut(f64)>);
        Self { state, closure }
    }
}

/// Timeout in whole milliseconds, as `setTimeout` expects.
pub(crate) fn timeout_millis(delay: Duration) -> i32 {
    i32::try_from(delay.as_millis_ceil_u32()).unwrap_or(i32::MAX)
}

/// Recovers a [`TimerId`] passed through JavaScript as a number.
pub(crate) fn timer_id_from_js(value: f64) -> Option<TimerId> {
    if !value.is_finite() || value < 0.0 {
        return None;
    }
    #[expect(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        reason = "non-negative and checked for an exact round trip below"
    )]
    let id = value as u64;
    (id as f64 == value).then_some(TimerId(id))
}

impl Default for WebTimers {
    fn default() -> Self {
        Self::new()
    }
}

impl Timers for WebTimers {
    fn now(&self) -> HostTime {
        crate::now()
    }

    fn set_timeout(&self, delay: Duration, callback: Box<dyn FnOnce()>) -> TimerId {
        let mut state = self.state.borrow_mut();
        let id = TimerId(state.next_id);
        state.next_id += 1;
        // Ids stay far below 2^53 over a page's lifetime.
        let js_id = id.0 as f64;
        let handle = set_timeout_with_id(
            self.closure.as_ref().unchecked_ref(),
            timeout_millis(delay),
            js_id,
        );
        state.pending.insert(id, (handle, callback));
        id
    }

    fn clear_timeout(&self, id: TimerId) {
        let removed = self.state.borrow_mut().pending.remove(&id);
        if let Some((handle, callback)) = removed {
            clear_timeout(handle);
            drop(callback);
        }
    }
}

impl Drop for WebTimers {
    fn drop(&mut self) {
        let pending = core::mem::take(&mut self.state.borrow_mut().pending);
        for (handle, _) in pending.values() {
            clear_timeout(*handle);
        }
    }
}

impl core::fmt::Debug for WebTimers {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("WebTimers")
            .field("pending", &self.state.borrow().pending.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeouts_round_up_to_whole_milliseconds() {
        assert_eq!(timeout_millis(Duration(0)), 0);
        assert_eq!(timeout_millis(Duration(1)), 1);
        assert_eq!(timeout_millis(Duration::from_millis(250)), 250);
        assert_eq!(timeout_millis(Duration(u64::MAX)), i32::MAX);
    }

    #[test]
    fn timer_ids_survive_the_js_round_trip() {
        assert_eq!(timer_id_from_js(7.0), Some(TimerId(7)));
        assert_eq!(timer_id_from_js(-1.0), None);
        assert_eq!(timer_id_from_js(1.5), None);
        assert_eq!(timer_id_from_js(f64::NAN), None);
    }
}
