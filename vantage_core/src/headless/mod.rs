// Copyright 2026 the Vantage Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! In-process platform implementations.
//!
//! Every type here is a cheap clonable handle around shared state: hand one
//! clone to a service and keep another to drive it. They serve two purposes:
//!
//! - **Tests.** Frames, scroll events, timeouts and intersection changes are
//!   produced only when the test asks for them, so every dispatch is
//!   deterministic.
//! - **Non-browser rendering.** [`HeadlessIntersection::unsupported`] and
//!   [`HeadlessFrames::unsupported`] model a host without observer or
//!   animation-frame APIs, which makes the services take their degrade paths.
//!
//! None of the platform trait methods call back into the services
//! synchronously; callbacks only run from the driving methods
//! ([`HeadlessFrames::run_frame`], [`HeadlessScroll::scroll_to`],
//! [`HeadlessTimers::advance`], [`HeadlessIntersection::set_intersecting`] and
//! friends).

mod frames;
mod intersection;
mod scroll;
mod timers;

pub use frames::HeadlessFrames;
pub use intersection::{HeadlessElement, HeadlessIntersection, HeadlessObserver};
pub use scroll::HeadlessScroll;
pub use timers::HeadlessTimers;
