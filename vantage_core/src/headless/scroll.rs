// Copyright 2026 the Vantage Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Simulated scroll listener.

use alloc::boxed::Box;
use alloc::rc::Rc;
use core::cell::RefCell;
use core::fmt;

use crate::backend::{PlatformError, ScrollSource};

type Listener = Rc<RefCell<Box<dyn FnMut(f64)>>>;

/// [`ScrollSource`] whose events fire only from [`scroll_to`](Self::scroll_to).
#[derive(Clone, Default)]
pub struct HeadlessScroll {
    inner: Rc<RefCell<ScrollState>>,
}

#[derive(Default)]
struct ScrollState {
    listener: Option<Listener>,
    position: f64,
    attach_count: u32,
    detach_count: u32,
    refuse: bool,
}

impl HeadlessScroll {
    /// Creates a scroll source at offset zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a scroll source whose [`attach`](ScrollSource::attach) fails.
    #[must_use]
    pub fn unsupported() -> Self {
        let source = Self::default();
        source.inner.borrow_mut().refuse = true;
        source
    }

    /// Moves to `position` and fires one scroll event if a listener is
    /// attached.
    pub fn scroll_to(&self, position: f64) {
        let listener = {
            let mut state = self.inner.borrow_mut();
            state.position = position;
            state.listener.clone()
        };
        if let Some(listener) = listener
            && let Ok(mut listener) = listener.try_borrow_mut()
        {
            listener(position);
        }
    }

    /// Whether a listener is currently attached.
    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.inner.borrow().listener.is_some()
    }

    /// Times a listener has been attached.
    #[must_use]
    pub fn attach_count(&self) -> u32 {
        self.inner.borrow().attach_count
    }

    /// Times a listener has been detached.
    #[must_use]
    pub fn detach_count(&self) -> u32 {
        self.inner.borrow().detach_count
    }
}

impl fmt::Debug for HeadlessScroll {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.borrow();
        f.debug_struct("HeadlessScroll")
            .field("position", &state.position)
            .field("attached", &state.listener.is_some())
            .finish_non_exhaustive()
    }
}

impl ScrollSource for HeadlessScroll {
    fn attach(&mut self, on_scroll: Box<dyn FnMut(f64)>) -> Result<(), PlatformError> {
        let mut state = self.inner.borrow_mut();
        if state.refuse {
            return Err(PlatformError::Unsupported { api: "scroll" });
        }
        state.listener = Some(Rc::new(RefCell::new(on_scroll)));
        state.attach_count += 1;
        Ok(())
    }

    fn detach(&mut self) {
        let listener = {
            let mut state = self.inner.borrow_mut();
            if state.listener.is_some() {
                state.detach_count += 1;
            }
            state.listener.take()
        };
        drop(listener);
    }

    fn position(&self) -> f64 {
        self.inner.borrow().position
    }
}
