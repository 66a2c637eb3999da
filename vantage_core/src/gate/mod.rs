// Copyright 2026 the Vantage Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Lazy mounting of below-the-fold content.
//!
//! A slot renders a placeholder until its element comes within the
//! strategy's margin of the viewport, then mounts the real content. The
//! decision logic is the pure [`MountGate`]; [`LazySlot`] connects a gate to
//! the [`ObserverRegistry`](crate::observer::ObserverRegistry) and to
//! [`Timers`](crate::backend::Timers) for the optional reveal delay.
//!
//! Slots mount once by default. With [`GateConfig::recycling`] on a
//! constrained device, a slot also unmounts after its element leaves a
//! wider exit margin, and mounts again when it comes back. The exit margin
//! and a minimum mounted time keep it from flapping at the boundary.

mod machine;
mod slot;

pub use machine::{GateConfig, GateStep, LazyMountState, MountGate, MountPhase, Transition};
pub use slot::{LazySlot, SlotRequest};
