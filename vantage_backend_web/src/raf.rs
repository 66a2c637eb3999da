// Copyright 2026 the Vantage Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! `requestAnimationFrame` frame source.
//!
//! [`RafFrames`] multiplexes every pending request onto a single browser
//! frame callback. Each callback receives a [`DOMHighResTimeStamp`][mdn]
//! (milliseconds from `performance.now()`), converted to microsecond
//! [`HostTime`] ticks.
//!
//! [mdn]: https://developer.mozilla.org/en-US/docs/Web/API/DOMHighResTimeStamp

use alloc::boxed::Box;
use alloc::rc::{Rc, Weak};
use alloc::vec::Vec;
use core::cell::RefCell;

use wasm_bindgen::closure::Closure;
use wasm_bindgen::prelude::*;

use vantage_core::backend::{AnimationFrames, FrameCallback, FrameRequestId};
use vantage_core::time::HostTime;

// Direct global bindings instead of `web_sys::Window` methods: avoids
// fetching (and unwrapping) the Window/Performance objects on every frame.
#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(js_namespace = performance, js_name = "now")]
    pub(crate) fn performance_now() -> f64;

    #[wasm_bindgen(js_name = "requestAnimationFrame")]
    fn request_animation_frame(callback: &JsValue) -> i32;

    #[wasm_bindgen(js_name = "cancelAnimationFrame")]
    fn cancel_animation_frame(id: i32);
}

type RafClosure = Closure<dyn FnMut(f64)>;

/// [`AnimationFrames`] over `window.requestAnimationFrame`.
pub struct RafFrames {
    inner: Rc<RafInner>,
}

struct RafInner {
    supported: bool,

    /// The JS closure registered with `requestAnimationFrame`.
    ///
    /// Created once and re-registered whenever a request is pending. It holds
    /// a weak reference back to this struct.
    closure: RefCell<Option<RafClosure>>,

    state: RefCell<RafState>,
}

struct RafState {
    next_id: u64,
    pending: Vec<(FrameRequestId, FrameCallback)>,
    /// Browser handle of the outstanding frame, if any.
    handle: Option<i32>,
}

impl RafFrames {
    /// Creates a frame source. Nothing is requested until the first
    /// [`request`](AnimationFrames::request).
    #[must_use]
    pub fn new() -> Self {
        let inner = Rc::new(RafInner {
            supported: crate::has_global("requestAnimationFrame"),
            closure: RefCell::new(None),
            state: RefCell::new(RafState {
                next_id: 1,
                pending: Vec::new(),
                handle: None,
            }),
        });
        let weak: Weak<RafInner> = Rc::downgrade(&inner);
        let closure = Closure::wrap(Box::new(move |timestamp_ms: f64| {
            if let Some(inner) = weak.upgrade() {
                inner.fire(timestamp_ms);
            }
        }) as Box<dyn FnMut(f64)>);
        *inner.closure.borrow_mut() = Some(closure);
        Self { inner }
    }
}

impl RafInner {
    fn fire(&self, timestamp_ms: f64) {
        let due = {
            let mut state = self.state.borrow_mut();
            state.handle = None;
            core::mem::take(&mut state.pending)
        };
        let now = HostTime::from_millis_f64(timestamp_ms);
        for (_, callback) in due {
            callback(now);
        }
    }

    fn schedule(&self) {
        let mut state = self.state.borrow_mut();
        if state.handle.is_some() || state.pending.is_empty() {
            return;
        }
        if let Some(ref closure) = *self.closure.borrow() {
            state.handle = Some(request_animation_frame(closure.as_ref().unchecked_ref()));
        }
    }
}

impl Default for RafFrames {
    fn default() -> Self {
        Self::new()
    }
}

impl AnimationFrames for RafFrames {
    fn is_supported(&self) -> bool {
        self.inner.supported
    }

    fn request(&self, callback: FrameCallback) -> FrameRequestId {
        let id = {
            let mut state = self.inner.state.borrow_mut();
            let id = FrameRequestId(state.next_id);
            state.next_id += 1;
            state.pending.push((id, callback));
            id
        };
        self.inner.schedule();
        id
    }

    fn cancel(&self, id: FrameRequestId) {
        let removed = {
            let mut state = self.inner.state.borrow_mut();
            let index = state.pending.iter().position(|(pending, _)| *pending == id);
            let removed = index.map(|index| state.pending.remove(index));
            if state.pending.is_empty()
                && let Some(handle) = state.handle.take()
            {
                cancel_animation_frame(handle);
            }
            removed
        };
        drop(removed);
    }
}

impl Drop for RafFrames {
    fn drop(&mut self) {
        if let Some(handle) = self.inner.state.borrow_mut().handle.take() {
            cancel_animation_frame(handle);
        }
        // Drop the JS closure so it doesn't leak.
        self.inner.closure.borrow_mut().take();
    }
}

impl core::fmt::Debug for RafFrames {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let state = self.inner.state.borrow();
        f.debug_struct("RafFrames")
            .field("supported", &self.inner.supported)
            .field("pending", &state.pending.len())
            .field("handle", &state.handle)
            .finish_non_exhaustive()
    }
}
