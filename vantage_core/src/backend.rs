// Copyright 2026 the Vantage Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Platform contract for host integrations.
//!
//! Vantage splits host-specific work into *backend* crates. Each backend
//! provides the following pieces:
//!
//! - **Intersection**: [`IntersectionPlatform`] creates viewport observers,
//!   attaches elements to them, and maps element handles to stable
//!   [`ElementId`]s without mutating the elements.
//!
//! - **Animation frames**: [`AnimationFrames`] schedules one-shot frame
//!   callbacks (e.g. `requestAnimationFrame`). Loops are built on top by
//!   re-requesting from inside the callback.
//!
//! - **Scroll**: [`ScrollSource`] owns the single platform scroll listener.
//!
//! - **Timers**: [`Timers`] reads the monotonic clock and schedules
//!   one-shot timeouts.
//!
//! - **Device**: [`DeviceCapabilities`](crate::device::DeviceCapabilities)
//!   classifies the host into a performance tier.
//!
//! # Crate boundaries
//!
//! `vantage_core` owns the services and this contract module. Backend crates
//! depend on `vantage_core` and provide platform glue. The
//! [`headless`](crate::headless) module implements every trait in-process for
//! tests and non-browser rendering.

use alloc::boxed::Box;
use alloc::string::String;
use core::fmt;

use crate::observer::{IntersectionSnapshot, ObserverOptions};
use crate::time::{Duration, HostTime};

/// Stable identity of an observed element, assigned by the platform.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct ElementId(pub u64);

impl fmt::Debug for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ElementId({})", self.0)
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "el#{}", self.0)
    }
}

/// Handle for a pending animation-frame request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FrameRequestId(pub u64);

/// Handle for a pending timeout.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimerId(pub u64);

/// Why a platform call could not be honoured.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum PlatformError {
    /// The host lacks the API entirely.
    #[error("platform API `{api}` is unavailable")]
    Unsupported {
        /// Name of the missing API.
        api: &'static str,
    },
    /// The host has the API but refused the request.
    #[error("platform rejected the request: {reason}")]
    Rejected {
        /// Host-provided explanation.
        reason: String,
    },
}

/// Receives each batch of intersection snapshots an observer produces.
pub type BatchCallback<E> = Box<dyn FnMut(&[IntersectionSnapshot<E>])>;

/// Callback for a single animation frame; receives the frame timestamp.
pub type FrameCallback = Box<dyn FnOnce(HostTime)>;

/// Viewport intersection observers.
pub trait IntersectionPlatform {
    /// Host element handle.
    type Element: Clone + 'static;
    /// Host observer handle.
    type Observer;

    /// Returns the stable identity of `element`.
    ///
    /// The same element must always map to the same id. Implementations
    /// keep their own identity map and never write to the element.
    fn identify(&mut self, element: &Self::Element) -> ElementId;

    /// Creates an observer configured with `options` that reports every
    /// batch of changes to `on_batch`.
    fn create_observer(
        &mut self,
        options: &ObserverOptions<Self::Element>,
        on_batch: BatchCallback<Self::Element>,
    ) -> Result<Self::Observer, PlatformError>;

    /// Starts watching `element` with `observer`.
    fn observe(&mut self, observer: &Self::Observer, element: &Self::Element);

    /// Stops watching `element` with `observer`.
    fn unobserve(&mut self, observer: &Self::Observer, element: &Self::Element);

    /// Stops every watch on `observer` and releases it.
    fn disconnect(&mut self, observer: &Self::Observer);
}

/// One-shot animation-frame requests.
pub trait AnimationFrames {
    /// Returns `false` when the host cannot deliver animation frames.
    fn is_supported(&self) -> bool {
        true
    }

    /// Schedules `callback` for the next frame.
    fn request(&self, callback: FrameCallback) -> FrameRequestId;

    /// Cancels a pending request. Unknown or already-fired ids are ignored.
    fn cancel(&self, id: FrameRequestId);
}

/// The host's single scroll listener.
pub trait ScrollSource {
    /// Installs the listener; `on_scroll` receives the new vertical offset.
    fn attach(&mut self, on_scroll: Box<dyn FnMut(f64)>) -> Result<(), PlatformError>;

    /// Removes the listener installed by [`attach`](Self::attach).
    fn detach(&mut self);

    /// Reads the current vertical scroll offset.
    fn position(&self) -> f64;
}

/// Monotonic clock and one-shot timeouts.
pub trait Timers {
    /// Returns the current host time.
    fn now(&self) -> HostTime;

    /// Runs `callback` once after `delay`.
    fn set_timeout(&self, delay: Duration, callback: Box<dyn FnOnce()>) -> TimerId;

    /// Cancels a pending timeout. Unknown or already-fired ids are ignored.
    fn clear_timeout(&self, id: TimerId);
}
