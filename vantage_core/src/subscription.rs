// Copyright 2026 the Vantage Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Cancellation handles.
//!
//! Every registration with a Vantage service returns a [`Subscription`].
//! Disposing it is the only way to cancel the registration. Disposal is
//! idempotent and may happen from inside the subscriber's own callback.

use alloc::boxed::Box;
use core::cell::Cell;
use core::fmt;

/// Handle that cancels a registration when disposed or dropped.
///
/// Call [`forget`](Self::forget) to keep a registration alive for the
/// lifetime of the service that issued it.
#[must_use = "dropping a `Subscription` cancels it; call `forget` to keep it alive"]
pub struct Subscription {
    dispose: Cell<Option<Box<dyn FnOnce()>>>,
}

impl Subscription {
    /// Creates a subscription that runs `dispose` exactly once.
    pub fn new(dispose: impl FnOnce() + 'static) -> Self {
        Self {
            dispose: Cell::new(Some(Box::new(dispose))),
        }
    }

    /// Creates a subscription with nothing to cancel.
    ///
    /// Returned when a service short-circuits a registration (unsupported
    /// environment, constrained device, eager mount).
    pub fn inert() -> Self {
        Self {
            dispose: Cell::new(None),
        }
    }

    /// Cancels the registration. Calling this again is a no-op.
    pub fn dispose(&self) {
        if let Some(dispose) = self.dispose.take() {
            dispose();
        }
    }

    /// Returns `true` until the subscription has been disposed.
    #[must_use]
    pub fn is_active(&self) -> bool {
        let dispose = self.dispose.take();
        let active = dispose.is_some();
        self.dispose.set(dispose);
        active
    }

    /// Drops the handle without cancelling the registration.
    pub fn forget(self) {
        drop(self.dispose.take());
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.is_active())
            .finish()
    }
}
