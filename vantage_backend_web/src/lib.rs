// Copyright 2026 the Vantage Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Web backend for vantage.
//!
//! This crate implements the `vantage_core` platform traits over browser
//! APIs:
//!
//! - [`DomIntersection`]: `IntersectionObserver`, with element identity in a
//!   `WeakMap`
//! - [`RafFrames`]: `requestAnimationFrame`
//! - [`WindowScroll`]: a passive `scroll` listener on `window`
//! - [`WebTimers`]: `setTimeout` and `performance.now()`
//! - [`BrowserDevice`]: tier detection from `navigator` and `window`
//!
//! [`init`] wires them into a [`Services`] instance. Missing APIs are
//! detected once; the services then take their degrade paths instead of
//! failing.

#![no_std]

extern crate alloc;

mod device;
mod intersection;
mod raf;
mod scroll;
mod timers;

pub use device::BrowserDevice;
pub use intersection::{DomIntersection, DomObserver};
pub use raf::RafFrames;
pub use scroll::WindowScroll;
pub use timers::WebTimers;

use alloc::rc::Rc;

use wasm_bindgen::JsValue;

use vantage_core::services::{Platform, Services, ServicesConfig};
use vantage_core::time::HostTime;
use vantage_core::trace::Tracer;

/// Returns the current host time from `performance.now()`.
///
/// The returned [`HostTime`] is in microsecond ticks.
#[must_use]
pub fn now() -> HostTime {
    HostTime::from_millis_f64(raf::performance_now())
}

/// Builds the browser [`Platform`].
#[must_use]
pub fn platform() -> Platform<DomIntersection, WindowScroll> {
    Platform {
        intersection: DomIntersection::new(),
        frames: Rc::new(RafFrames::new()),
        scroll: WindowScroll::new(),
        timers: Rc::new(WebTimers::new()),
        device: Rc::new(BrowserDevice::detect()),
    }
}

/// Builds the services over the browser platform.
///
/// Call once at startup and keep the result for the life of the page.
#[must_use]
pub fn init(config: ServicesConfig, tracer: Tracer) -> Services<DomIntersection> {
    Services::init(platform(), config, tracer)
}

/// Whether `name` exists on the global object.
pub(crate) fn has_global(name: &str) -> bool {
    js_sys::Reflect::has(&js_sys::global(), &JsValue::from_str(name)).unwrap_or(false)
}
