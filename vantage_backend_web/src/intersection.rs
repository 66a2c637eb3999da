// Copyright 2026 the Vantage Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! `IntersectionObserver` platform.
//!
//! Element identity lives in a JS `WeakMap` owned by the platform, so ids
//! never leak into the DOM and disappear with their elements.

use alloc::boxed::Box;
use alloc::string::ToString;
use alloc::vec::Vec;
use core::cell::RefCell;

use js_sys::{Array, Object, Reflect, WeakMap};
use kurbo::Rect;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::prelude::*;
use web_sys::{Element, IntersectionObserver, IntersectionObserverEntry, IntersectionObserverInit};

use vantage_core::backend::{BatchCallback, ElementId, IntersectionPlatform, PlatformError};
use vantage_core::observer::{IntersectionSnapshot, ObserverOptions};

type BatchClosure = Closure<dyn FnMut(Array)>;

/// [`IntersectionPlatform`] over the browser's `IntersectionObserver`.
pub struct DomIntersection {
    supported: bool,
    ids: WeakMap,
    next_id: u64,
    /// Closures of disconnected observers. A batch callback may disconnect
    /// its own observer, so they live as long as the platform.
    retired: Vec<BatchClosure>,
}

/// A live `IntersectionObserver` and the closure it calls.
pub struct DomObserver {
    observer: IntersectionObserver,
    closure: RefCell<Option<BatchClosure>>,
}

impl core::fmt::Debug for DomObserver {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("DomObserver")
            .field("connected", &self.closure.borrow().is_some())
            .finish_non_exhaustive()
    }
}

impl DomIntersection {
    /// Creates the platform, probing for `IntersectionObserver` once.
    #[must_use]
    pub fn new() -> Self {
        Self {
            supported: crate::has_global("IntersectionObserver"),
            ids: WeakMap::new(),
            next_id: 0,
            retired: Vec::new(),
        }
    }
}

impl Default for DomIntersection {
    fn default() -> Self {
        Self::new()
    }
}

fn snapshot(entry: &IntersectionObserverEntry) -> IntersectionSnapshot<Element> {
    let rect = entry.bounding_client_rect();
    IntersectionSnapshot {
        is_intersecting: entry.is_intersecting(),
        intersection_ratio: entry.intersection_ratio(),
        bounding_client_rect: Rect::new(rect.left(), rect.top(), rect.right(), rect.bottom()),
        target: entry.target(),
    }
}

/// Builds the `IntersectionObserverInit` dictionary.
fn init_dictionary(
    options: &ObserverOptions<Element>,
) -> Result<IntersectionObserverInit, JsValue> {
    let init = Object::new();
    Reflect::set(
        &init,
        &JsValue::from_str("rootMargin"),
        &JsValue::from_str(&options.root_margin.to_string()),
    )?;
    let thresholds: Array = options
        .thresholds
        .as_slice()
        .iter()
        .map(|&t| JsValue::from_f64(t))
        .collect();
    Reflect::set(&init, &JsValue::from_str("threshold"), &thresholds)?;
    if let Some(root) = &options.root {
        Reflect::set(&init, &JsValue::from_str("root"), root)?;
    }
    Ok(init.unchecked_into())
}

fn rejected(error: &JsValue) -> PlatformError {
    PlatformError::Rejected {
        reason: error
            .as_string()
            .unwrap_or_else(|| alloc::format!("{error:?}")),
    }
}

impl IntersectionPlatform for DomIntersection {
    type Element = Element;
    type Observer = DomObserver;

    fn identify(&mut self, element: &Element) -> ElementId {
        let key: &Object = element.as_ref();
        if let Some(id) = self.ids.get(key).as_f64() {
            #[expect(
                clippy::cast_possible_truncation,
                clippy::cast_sign_loss,
                reason = "the map only holds ids we stored as whole numbers"
            )]
            let id = id as u64;
            return ElementId(id);
        }
        let id = self.next_id;
        self.next_id += 1;
        // Ids stay far below 2^53 over a page's lifetime.
        self.ids.set(key, &JsValue::from_f64(id as f64));
        ElementId(id)
    }

    fn create_observer(
        &mut self,
        options: &ObserverOptions<Element>,
        mut on_batch: BatchCallback<Element>,
    ) -> Result<DomObserver, PlatformError> {
        if !self.supported {
            return Err(PlatformError::Unsupported {
                api: "IntersectionObserver",
            });
        }
        let init = init_dictionary(options).map_err(|e| rejected(&e))?;
        let closure = Closure::wrap(Box::new(move |entries: Array| {
            let snapshots: Vec<_> = entries
                .iter()
                .map(|entry| snapshot(entry.unchecked_ref()))
                .collect();
            on_batch(&snapshots);
        }) as Box<dyn FnMut(Array)>);
        let observer =
            IntersectionObserver::new_with_options(closure.as_ref().unchecked_ref(), &init)
                .map_err(|e| rejected(&e))?;
        Ok(DomObserver {
            observer,
            closure: RefCell::new(Some(closure)),
        })
    }

    fn observe(&mut self, observer: &DomObserver, element: &Element) {
        observer.observer.observe(element);
    }

    fn unobserve(&mut self, observer: &DomObserver, element: &Element) {
        observer.observer.unobserve(element);
    }

    fn disconnect(&mut self, observer: &DomObserver) {
        observer.observer.disconnect();
        if let Some(closure) = observer.closure.borrow_mut().take() {
            self.retired.push(closure);
        }
    }
}

impl core::fmt::Debug for DomIntersection {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("DomIntersection")
            .field("supported", &self.supported)
            .field("identified", &self.next_id)
            .finish_non_exhaustive()
    }
}
