// Copyright 2026 the Vantage Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Shared viewport observation and frame scheduling for content-heavy pages.
//!
//! `vantage_core` coordinates the few browser resources that many independent
//! components compete for: intersection observers, the animation-frame loop
//! and the scroll listener. It is `no_std` compatible (with `alloc`) and talks
//! to the host only through the traits in [`backend`].
//!
//! # Architecture
//!
//! ```text
//!   UI component
//!       │ lazy_slot(name, element)
//!       ▼
//!   LazySlot ──► StrategyTable::resolve(name, tier) ──► LoadingStrategy
//!       │                                                   │ root_margin
//!       ▼                                                   ▼
//!   MountGate ◄── enter / exit ── ObserverRegistry ◄── one observer per key
//!
//!   animation ──► FrameScheduler ──► one requestAnimationFrame loop
//!   parallax  ──► ScrollBroadcaster ──► one scroll listener, coalesced per frame
//! ```
//!
//! **[`observer`]**: [`ObserverRegistry`](observer::ObserverRegistry) pools
//! platform observers by canonical options key and fans each batch out to
//! per-element callbacks.
//!
//! **[`scheduler`]**: [`FrameScheduler`](scheduler::FrameScheduler) runs one
//! throttled frame loop and dispatches ticks by [`Priority`](scheduler::Priority).
//!
//! **[`scroll`]**: [`ScrollBroadcaster`](scroll::ScrollBroadcaster) shares one
//! scroll listener and broadcasts at most once per frame.
//!
//! **[`strategy`]**: per-component [`LoadingStrategy`](strategy::LoadingStrategy)
//! table with tier adjustment.
//!
//! **[`gate`]**: the lazy mount state machine and its wiring.
//!
//! **[`device`]**: performance tiers and the
//! [`DeviceCapabilities`](device::DeviceCapabilities) seam.
//!
//! **[`services`]**: [`Services`](services::Services), the composition root
//! with an explicit `init`/`destroy` lifecycle.
//!
//! **[`headless`]**: in-process implementations of every backend trait.
//!
//! **[`trace`]**: [`TraceSink`](trace::TraceSink) trait and event types, with
//! a zero-overhead [`Tracer`](trace::Tracer) wrapper.
//!
//! Every registration returns a [`Subscription`](subscription::Subscription).
//! Callbacks return a [`CallbackResult`](error::CallbackResult); an `Err` is
//! logged at the dispatch boundary and never reaches other subscribers.
//!
//! # Crate features
//!
//! - `std` (disabled by default): catches subscriber panics at dispatch
//!   boundaries and enables `std` support in dependencies.
//! - `trace` (disabled by default): enables `Tracer` method bodies (one branch
//!   per call site).

#![no_std]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

#[cfg(feature = "std")]
extern crate std;

extern crate alloc;

pub mod backend;
pub mod device;
pub mod error;
pub mod gate;
pub mod headless;
pub mod observer;
pub mod scheduler;
pub mod scroll;
pub mod services;
pub mod strategy;
pub mod subscription;
pub mod time;
pub mod timing;
pub mod trace;
