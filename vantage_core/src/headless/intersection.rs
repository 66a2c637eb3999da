// Copyright 2026 the Vantage Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Simulated intersection observers.

use alloc::collections::{BTreeMap, BTreeSet};
use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cell::RefCell;
use core::fmt;

use kurbo::Rect;

use crate::backend::{BatchCallback, ElementId, IntersectionPlatform, PlatformError};
use crate::observer::{IntersectionSnapshot, ObserverOptions, RootMargin};

/// Element handle understood by [`HeadlessIntersection`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HeadlessElement(pub u32);

/// Observer handle issued by [`HeadlessIntersection`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HeadlessObserver(usize);

/// Intersection platform driven by explicit calls or by simple geometry.
///
/// Two ways to produce batches:
///
/// - [`set_intersecting`](Self::set_intersecting) and
///   [`deliver`](Self::deliver) report a state directly to every observer
///   watching the targets.
/// - [`place`](Self::place), [`scroll_to`](Self::scroll_to) and
///   [`set_viewport`](Self::set_viewport) lay elements out and report each
///   observer's view of them, honouring its root margin. Like the browser,
///   only changes in `is_intersecting` are reported.
///
/// As with a browser observer, a newly watched element that has been laid
/// out gets its initial state reported asynchronously: on the next call to
/// any of the driving methods above, before that call's own changes.
#[derive(Clone)]
pub struct HeadlessIntersection {
    inner: Rc<RefCell<IntersectionState>>,
}

struct IntersectionState {
    supported: bool,
    viewport: Rect,
    layout: BTreeMap<HeadlessElement, Rect>,
    observers: Vec<SimObserver>,
    unobserve_calls: usize,
}

struct SimObserver {
    root_margin: RootMargin,
    on_batch: Rc<RefCell<BatchCallback<HeadlessElement>>>,
    watched: BTreeSet<HeadlessElement>,
    reported: BTreeMap<HeadlessElement, bool>,
    connected: bool,
}

impl HeadlessIntersection {
    /// Default viewport used until [`set_viewport`](Self::set_viewport).
    pub const DEFAULT_VIEWPORT: Rect = Rect::new(0.0, 0.0, 1280.0, 800.0);

    /// Creates a platform that supports observers.
    #[must_use]
    pub fn new() -> Self {
        Self::with_support(true)
    }

    /// Creates a platform whose observer creation always fails.
    #[must_use]
    pub fn unsupported() -> Self {
        Self::with_support(false)
    }

    fn with_support(supported: bool) -> Self {
        Self {
            inner: Rc::new(RefCell::new(IntersectionState {
                supported,
                viewport: Self::DEFAULT_VIEWPORT,
                layout: BTreeMap::new(),
                observers: Vec::new(),
                unobserve_calls: 0,
            })),
        }
    }

    /// Observers created over the platform's lifetime.
    #[must_use]
    pub fn created_count(&self) -> usize {
        self.inner.borrow().observers.len()
    }

    /// Observers not yet disconnected.
    #[must_use]
    pub fn live_observer_count(&self) -> usize {
        self.inner
            .borrow()
            .observers
            .iter()
            .filter(|o| o.connected)
            .count()
    }

    /// Calls to [`IntersectionPlatform::unobserve`] so far.
    #[must_use]
    pub fn unobserve_count(&self) -> usize {
        self.inner.borrow().unobserve_calls
    }

    /// Whether any live observer watches `element`.
    #[must_use]
    pub fn is_watched(&self, element: HeadlessElement) -> bool {
        self.inner
            .borrow()
            .observers
            .iter()
            .any(|o| o.connected && o.watched.contains(&element))
    }

    /// Root margins of every observer created, in creation order.
    #[must_use]
    pub fn root_margins(&self) -> Vec<RootMargin> {
        self.inner
            .borrow()
            .observers
            .iter()
            .map(|o| o.root_margin)
            .collect()
    }

    /// Reports `is_intersecting` for `targets` to every observer watching
    /// them, one batch per observer.
    pub fn set_intersecting(&self, targets: &[HeadlessElement], is_intersecting: bool) {
        let snapshots: Vec<_> = targets
            .iter()
            .map(|&target| IntersectionSnapshot {
                is_intersecting,
                intersection_ratio: if is_intersecting { 1.0 } else { 0.0 },
                bounding_client_rect: Rect::ZERO,
                target,
            })
            .collect();
        self.deliver(&snapshots);
    }

    /// Delivers `snapshots` as one batch to every observer watching at least
    /// one of their targets. Each observer only sees its own targets.
    pub fn deliver(&self, snapshots: &[IntersectionSnapshot<HeadlessElement>]) {
        self.report(true);
        let batches: Vec<_> = {
            let state = self.inner.borrow();
            state
                .observers
                .iter()
                .filter(|o| o.connected)
                .filter_map(|o| {
                    let batch: Vec<_> = snapshots
                        .iter()
                        .filter(|s| o.watched.contains(&s.target))
                        .cloned()
                        .collect();
                    (!batch.is_empty()).then(|| (Rc::clone(&o.on_batch), batch))
                })
                .collect()
        };
        run_batches(batches);
    }

    /// Lays `element` out at `rect` (document coordinates) and reports any
    /// resulting changes.
    pub fn place(&self, element: HeadlessElement, rect: Rect) {
        self.inner.borrow_mut().layout.insert(element, rect);
        self.refresh();
    }

    /// Replaces the viewport rectangle and reports any resulting changes.
    pub fn set_viewport(&self, viewport: Rect) {
        self.inner.borrow_mut().viewport = viewport;
        self.refresh();
    }

    /// Scrolls the viewport vertically to `y` and reports any resulting
    /// changes.
    pub fn scroll_to(&self, y: f64) {
        {
            let mut state = self.inner.borrow_mut();
            let height = state.viewport.height();
            state.viewport = Rect::new(state.viewport.x0, y, state.viewport.x1, y + height);
        }
        self.refresh();
    }

    /// Recomputes every placed, watched element against every observer and
    /// reports changes in `is_intersecting`.
    pub fn refresh(&self) {
        self.report(false);
    }

    /// Reports geometry changes; with `initial_only`, only for elements the
    /// observer has not reported yet.
    fn report(&self, initial_only: bool) {
        let batches: Vec<_> = {
            let mut state = self.inner.borrow_mut();
            let state = &mut *state;
            let viewport = state.viewport;
            let layout = &state.layout;
            state
                .observers
                .iter_mut()
                .filter(|o| o.connected)
                .filter_map(|o| {
                    let root = expand(viewport, &o.root_margin);
                    let mut batch = Vec::new();
                    for target in &o.watched {
                        let Some(rect) = layout.get(target) else {
                            continue;
                        };
                        if initial_only && o.reported.contains_key(target) {
                            continue;
                        }
                        let snapshot = geometry_snapshot(*target, *rect, root, viewport);
                        if o.reported.get(target) != Some(&snapshot.is_intersecting) {
                            o.reported.insert(*target, snapshot.is_intersecting);
                            batch.push(snapshot);
                        }
                    }
                    (!batch.is_empty()).then(|| (Rc::clone(&o.on_batch), batch))
                })
                .collect()
        };
        run_batches(batches);
    }
}

impl Default for HeadlessIntersection {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for HeadlessIntersection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.borrow();
        f.debug_struct("HeadlessIntersection")
            .field("supported", &state.supported)
            .field("viewport", &state.viewport)
            .field("observers", &state.observers.len())
            .finish_non_exhaustive()
    }
}

type Batch = (
    Rc<RefCell<BatchCallback<HeadlessElement>>>,
    Vec<IntersectionSnapshot<HeadlessElement>>,
);

fn run_batches(batches: Vec<Batch>) {
    for (on_batch, batch) in batches {
        if let Ok(mut on_batch) = on_batch.try_borrow_mut() {
            on_batch(&batch);
        }
    }
}

/// Expands `viewport` by `margin`; percentages resolve per axis.
fn expand(viewport: Rect, margin: &RootMargin) -> Rect {
    let (w, h) = (viewport.width(), viewport.height());
    Rect::new(
        viewport.x0 - margin.left.resolve(w),
        viewport.y0 - margin.top.resolve(h),
        viewport.x1 + margin.right.resolve(w),
        viewport.y1 + margin.bottom.resolve(h),
    )
}

fn geometry_snapshot(
    target: HeadlessElement,
    rect: Rect,
    root: Rect,
    viewport: Rect,
) -> IntersectionSnapshot<HeadlessElement> {
    let overlap = rect.intersect(root);
    let is_intersecting = overlap.width() > 0.0 && overlap.height() > 0.0;
    let area = rect.area();
    let intersection_ratio = if area > 0.0 {
        (overlap.area() / area).clamp(0.0, 1.0)
    } else if is_intersecting {
        1.0
    } else {
        0.0
    };
    IntersectionSnapshot {
        is_intersecting,
        intersection_ratio,
        bounding_client_rect: rect - viewport.origin().to_vec2(),
        target,
    }
}

impl IntersectionPlatform for HeadlessIntersection {
    type Element = HeadlessElement;
    type Observer = HeadlessObserver;

    fn identify(&mut self, element: &HeadlessElement) -> ElementId {
        ElementId(u64::from(element.0))
    }

    fn create_observer(
        &mut self,
        options: &ObserverOptions<HeadlessElement>,
        on_batch: BatchCallback<HeadlessElement>,
    ) -> Result<HeadlessObserver, PlatformError> {
        let mut state = self.inner.borrow_mut();
        if !state.supported {
            return Err(PlatformError::Unsupported {
                api: "IntersectionObserver",
            });
        }
        state.observers.push(SimObserver {
            root_margin: options.root_margin,
            on_batch: Rc::new(RefCell::new(on_batch)),
            watched: BTreeSet::new(),
            reported: BTreeMap::new(),
            connected: true,
        });
        Ok(HeadlessObserver(state.observers.len() - 1))
    }

    fn observe(&mut self, observer: &HeadlessObserver, element: &HeadlessElement) {
        if let Some(o) = self.inner.borrow_mut().observers.get_mut(observer.0) {
            o.watched.insert(*element);
        }
    }

    fn unobserve(&mut self, observer: &HeadlessObserver, element: &HeadlessElement) {
        let mut state = self.inner.borrow_mut();
        state.unobserve_calls += 1;
        if let Some(o) = state.observers.get_mut(observer.0) {
            o.watched.remove(element);
            o.reported.remove(element);
        }
    }

    fn disconnect(&mut self, observer: &HeadlessObserver) {
        if let Some(o) = self.inner.borrow_mut().observers.get_mut(observer.0) {
            o.watched.clear();
            o.reported.clear();
            o.connected = false;
        }
    }
}
