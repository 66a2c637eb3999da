// Copyright 2026 the Vantage Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The window's passive scroll listener.

use alloc::boxed::Box;

use js_sys::{Object, Reflect};
use wasm_bindgen::closure::Closure;
use wasm_bindgen::prelude::*;

use vantage_core::backend::{PlatformError, ScrollSource};

#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(js_name = "addEventListener", catch)]
    fn add_window_listener(kind: &str, listener: &JsValue, options: &JsValue)
    -> Result<(), JsValue>;

    #[wasm_bindgen(js_name = "removeEventListener")]
    fn remove_window_listener(kind: &str, listener: &JsValue);
}

type ScrollClosure = Closure<dyn FnMut()>;

/// [`ScrollSource`] over `window`'s `scroll` event.
#[derive(Default)]
pub struct WindowScroll {
    listener: Option<ScrollClosure>,
    /// The last detached listener. Detaching can happen from inside the
    /// listener itself, so it is freed on the next attach or detach.
    retired: Option<ScrollClosure>,
}

impl WindowScroll {
    /// Creates a detached scroll source.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

/// `window.scrollY`, or zero without a window.
pub(crate) fn scroll_y() -> f64 {
    web_sys::window()
        .and_then(|window| window.scroll_y().ok())
        .unwrap_or(0.0)
}

fn passive_options() -> Result<JsValue, JsValue> {
    let options = Object::new();
    Reflect::set(&options, &JsValue::from_str("passive"), &JsValue::TRUE)?;
    Ok(options.into())
}

impl ScrollSource for WindowScroll {
    fn attach(&mut self, mut on_scroll: Box<dyn FnMut(f64)>) -> Result<(), PlatformError> {
        if web_sys::window().is_none() {
            return Err(PlatformError::Unsupported { api: "window" });
        }
        self.retired = None;
        let closure = Closure::wrap(Box::new(move || on_scroll(scroll_y())) as Box<dyn FnMut()>);
        let rejected = |error: JsValue| PlatformError::Rejected {
            reason: error
                .as_string()
                .unwrap_or_else(|| alloc::format!("{error:?}")),
        };
        let options = passive_options().map_err(rejected)?;
        add_window_listener("scroll", closure.as_ref(), &options).map_err(rejected)?;
        log::debug!("vantage: window scroll listener attached");
        self.listener = Some(closure);
        Ok(())
    }

    fn detach(&mut self) {
        if let Some(closure) = self.listener.take() {
            remove_window_listener("scroll", closure.as_ref());
            log::debug!("vantage: window scroll listener detached");
            self.retired = Some(closure);
        }
    }

    fn position(&self) -> f64 {
        scroll_y()
    }
}

impl Drop for WindowScroll {
    fn drop(&mut self) {
        self.detach();
    }
}

impl core::fmt::Debug for WindowScroll {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("WindowScroll")
            .field("attached", &self.listener.is_some())
            .finish_non_exhaustive()
    }
}
