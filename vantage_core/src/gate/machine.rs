// Copyright 2026 the Vantage Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use alloc::vec::Vec;

use crate::time::{Duration, HostTime};

/// Where a lazy slot is in its lifecycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum MountPhase {
    /// Showing the placeholder, observing for entry.
    #[default]
    Waiting,
    /// Entry seen; waiting out the reveal delay.
    Triggered,
    /// Real content is mounted.
    Mounted,
    /// Content was unmounted after leaving the exit margin.
    UnmountedAfterExit,
}

impl MountPhase {
    /// Snake-case name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Waiting => "waiting",
            Self::Triggered => "triggered",
            Self::Mounted => "mounted",
            Self::UnmountedAfterExit => "unmounted_after_exit",
        }
    }
}

/// Observable state of a lazy slot.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct LazyMountState {
    /// Current phase.
    pub phase: MountPhase,
    /// Whether the slot has been mounted at least once.
    pub has_ever_mounted: bool,
}

impl LazyMountState {
    /// Whether real content should be rendered right now.
    #[must_use]
    pub const fn is_mounted(&self) -> bool {
        matches!(self.phase, MountPhase::Mounted)
    }
}

/// Timing and recycling policy for a [`MountGate`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GateConfig {
    /// Delay between trigger and mount, used to fade content in.
    pub reveal_delay: Duration,
    /// Unmount content once it leaves the exit margin. Only honoured on
    /// constrained devices.
    pub unmount_on_exit: bool,
    /// Exit margin as a multiple of the entry margin. Values below 1 are
    /// treated as 1.
    pub exit_margin_factor: f64,
    /// Minimum time mounted before an exit may unmount.
    pub min_dwell: Duration,
}

impl GateConfig {
    /// Mount once, never unmount.
    #[must_use]
    pub const fn one_shot() -> Self {
        Self {
            reveal_delay: Duration::ZERO,
            unmount_on_exit: false,
            exit_margin_factor: 2.0,
            min_dwell: Duration::ZERO,
        }
    }

    /// Unmount after leaving twice the entry margin, once mounted for at
    /// least 1.5 s.
    #[must_use]
    pub const fn recycling() -> Self {
        Self {
            reveal_delay: Duration::ZERO,
            unmount_on_exit: true,
            exit_margin_factor: 2.0,
            min_dwell: Duration::from_millis(1500),
        }
    }

    /// This config with a reveal delay.
    #[must_use]
    pub const fn with_reveal_delay(mut self, delay: Duration) -> Self {
        self.reveal_delay = delay;
        self
    }

    /// The exit factor actually applied.
    #[must_use]
    pub fn effective_exit_factor(&self) -> f64 {
        if self.exit_margin_factor.is_finite() {
            self.exit_margin_factor.max(1.0)
        } else {
            1.0
        }
    }
}

impl Default for GateConfig {
    fn default() -> Self {
        Self::one_shot()
    }
}

/// One phase change.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Transition {
    /// Phase before.
    pub from: MountPhase,
    /// State after.
    pub state: LazyMountState,
    /// When the change happened.
    pub at: HostTime,
}

/// What a [`MountGate`] event produced.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GateStep {
    /// Phase changes, in order.
    pub transitions: Vec<Transition>,
    /// Set when the caller must call [`MountGate::reveal`] after this delay.
    pub reveal_after: Option<Duration>,
    /// Set when the caller must call [`MountGate::settle`] after this delay.
    pub settle_after: Option<Duration>,
}

impl GateStep {
    /// Whether the event changed nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.transitions.is_empty() && self.reveal_after.is_none() && self.settle_after.is_none()
    }
}

/// Pure mount state machine for one slot.
///
/// ```text
/// Waiting ──enter──▶ Triggered ──reveal──▶ Mounted
///                                          │    ▲
///                        exit (recycling)  ▼    │ enter
///                                UnmountedAfterExit
/// ```
///
/// With a zero reveal delay, `enter` goes through `Triggered` to `Mounted`
/// in one step. An exit during the minimum dwell is held and applied by
/// [`settle`](MountGate::settle) once the dwell is over, unless the element
/// comes back first. The gate owns no timers or observers; the caller feeds
/// it events and acts on the returned [`GateStep`].
#[derive(Clone, Debug)]
pub struct MountGate {
    config: GateConfig,
    recycles: bool,
    state: LazyMountState,
    since: HostTime,
    exit_held: bool,
}

impl MountGate {
    /// Creates a waiting gate.
    ///
    /// `allow_unmount` is the device policy; the gate recycles only when
    /// both it and [`GateConfig::unmount_on_exit`] are set.
    #[must_use]
    pub fn new(config: GateConfig, allow_unmount: bool) -> Self {
        Self {
            config,
            recycles: config.unmount_on_exit && allow_unmount,
            state: LazyMountState::default(),
            since: HostTime(0),
            exit_held: false,
        }
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> LazyMountState {
        self.state
    }

    /// The gate's config.
    #[must_use]
    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    /// Whether mounted content may be unmounted on exit.
    #[must_use]
    pub fn recycles(&self) -> bool {
        self.recycles
    }

    /// Whether entry events still matter.
    #[must_use]
    pub fn observes_entry(&self) -> bool {
        self.state.phase == MountPhase::Waiting || self.recycles
    }

    /// Whether exit events still matter.
    #[must_use]
    pub fn observes_exit(&self) -> bool {
        self.recycles
    }

    /// The element entered the entry margin.
    pub fn enter(&mut self, now: HostTime) -> GateStep {
        let mut step = GateStep::default();
        match self.state.phase {
            MountPhase::Waiting => {
                self.go(MountPhase::Triggered, now, &mut step);
                if self.config.reveal_delay == Duration::ZERO {
                    self.go(MountPhase::Mounted, now, &mut step);
                } else {
                    step.reveal_after = Some(self.config.reveal_delay);
                }
            }
            MountPhase::UnmountedAfterExit => self.go(MountPhase::Mounted, now, &mut step),
            MountPhase::Mounted => self.exit_held = false,
            MountPhase::Triggered => {}
        }
        step
    }

    /// The element left the exit margin.
    ///
    /// Before the minimum dwell is over the exit is held, and the step asks
    /// for a [`settle`](Self::settle) when it ends.
    pub fn exit(&mut self, now: HostTime) -> GateStep {
        let mut step = GateStep::default();
        if !self.recycles || self.state.phase != MountPhase::Mounted {
            return step;
        }
        let dwelt = now.saturating_duration_since(self.since);
        if dwelt >= self.config.min_dwell {
            self.go(MountPhase::UnmountedAfterExit, now, &mut step);
        } else {
            self.exit_held = true;
            step.settle_after = Some(self.config.min_dwell.saturating_sub(dwelt));
        }
        step
    }

    /// The element is back inside the exit margin; drops a held exit.
    pub fn within_exit(&mut self) {
        self.exit_held = false;
    }

    /// Whether an exit is waiting for the minimum dwell to end.
    #[must_use]
    pub fn is_exit_held(&self) -> bool {
        self.exit_held
    }

    /// The delay requested by [`exit`](Self::exit) elapsed; applies a held
    /// exit.
    pub fn settle(&mut self, now: HostTime) -> GateStep {
        if self.exit_held {
            self.exit_held = false;
            return self.exit(now);
        }
        GateStep::default()
    }

    /// The reveal delay requested by [`enter`](Self::enter) elapsed.
    pub fn reveal(&mut self, now: HostTime) -> GateStep {
        let mut step = GateStep::default();
        if self.state.phase == MountPhase::Triggered {
            self.go(MountPhase::Mounted, now, &mut step);
        }
        step
    }

    /// Mounts without waiting for the viewport.
    pub fn mount_now(&mut self, now: HostTime) -> GateStep {
        let mut step = GateStep::default();
        if self.state.phase == MountPhase::Waiting {
            self.go(MountPhase::Triggered, now, &mut step);
        }
        if self.state.phase != MountPhase::Mounted {
            self.go(MountPhase::Mounted, now, &mut step);
        }
        step
    }

    fn go(&mut self, to: MountPhase, at: HostTime, step: &mut GateStep) {
        let from = self.state.phase;
        self.state.phase = to;
        if to == MountPhase::Mounted {
            self.state.has_ever_mounted = true;
        }
        self.since = at;
        self.exit_held = false;
        step.transitions.push(Transition {
            from,
            state: self.state,
            at,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn phases(step: &GateStep) -> Vec<MountPhase> {
        step.transitions.iter().map(|t| t.state.phase).collect()
    }

    #[test]
    fn entry_mounts_immediately_without_delay() {
        let mut gate = MountGate::new(GateConfig::one_shot(), false);
        assert!(gate.observes_entry());
        let step = gate.enter(HostTime(10));
        assert_eq!(phases(&step), [MountPhase::Triggered, MountPhase::Mounted]);
        assert!(gate.state().has_ever_mounted);
        assert!(!gate.observes_entry());
        assert!(gate.enter(HostTime(20)).is_empty());
    }

    #[test]
    fn reveal_delay_defers_mount() {
        let config = GateConfig::one_shot().with_reveal_delay(Duration::from_millis(300));
        let mut gate = MountGate::new(config, false);
        let step = gate.enter(HostTime(0));
        assert_eq!(phases(&step), [MountPhase::Triggered]);
        assert_eq!(step.reveal_after, Some(Duration::from_millis(300)));
        assert!(!gate.state().is_mounted());

        let step = gate.reveal(HostTime(300_000));
        assert_eq!(phases(&step), [MountPhase::Mounted]);
        assert!(gate.reveal(HostTime(400_000)).is_empty());
    }

    #[test]
    fn recycling_requires_device_permission() {
        let mut gate = MountGate::new(GateConfig::recycling(), false);
        assert!(!gate.recycles());
        gate.enter(HostTime(0));
        assert!(gate.exit(HostTime(10_000_000)).is_empty());
        assert_eq!(gate.state().phase, MountPhase::Mounted);
    }

    #[test]
    fn exit_respects_min_dwell() {
        let mut gate = MountGate::new(GateConfig::recycling(), true);
        gate.enter(HostTime(0));
        assert!(gate.exit(HostTime(1_000_000)).transitions.is_empty());

        let step = gate.exit(HostTime(2_000_000));
        assert_eq!(phases(&step), [MountPhase::UnmountedAfterExit]);
        assert!(gate.state().has_ever_mounted);

        let step = gate.enter(HostTime(3_000_000));
        assert_eq!(phases(&step), [MountPhase::Mounted]);
    }

    #[test]
    fn early_exit_is_held_until_the_dwell_ends() {
        let mut gate = MountGate::new(GateConfig::recycling(), true);
        gate.enter(HostTime(0));
        let step = gate.exit(HostTime(500_000));
        assert!(step.transitions.is_empty());
        assert_eq!(step.settle_after, Some(Duration::from_millis(1000)));
        assert!(gate.is_exit_held());

        let step = gate.settle(HostTime(1_500_000));
        assert_eq!(phases(&step), [MountPhase::UnmountedAfterExit]);
        assert!(gate.settle(HostTime(1_600_000)).is_empty());
    }

    #[test]
    fn returning_cancels_a_held_exit() {
        let mut gate = MountGate::new(GateConfig::recycling(), true);
        gate.enter(HostTime(0));
        gate.exit(HostTime(100_000));
        gate.within_exit();
        assert!(gate.settle(HostTime(2_000_000)).is_empty());
        assert!(gate.state().is_mounted());

        gate.exit(HostTime(200_000));
        assert!(gate.enter(HostTime(300_000)).is_empty());
        assert!(!gate.is_exit_held());
    }

    #[test]
    fn exit_before_mount_is_ignored() {
        let mut gate = MountGate::new(GateConfig::recycling(), true);
        assert!(gate.exit(HostTime(0)).is_empty());
        assert_eq!(gate.state(), LazyMountState::default());
    }

    #[test]
    fn mount_now_walks_through_triggered() {
        let mut gate = MountGate::new(GateConfig::one_shot(), false);
        let step = gate.mount_now(HostTime(5));
        assert_eq!(phases(&step), [MountPhase::Triggered, MountPhase::Mounted]);
        assert!(gate.mount_now(HostTime(6)).is_empty());
    }

    #[test]
    fn exit_factor_is_at_least_one() {
        let config = GateConfig {
            exit_margin_factor: 0.5,
            ..GateConfig::recycling()
        };
        assert_eq!(config.effective_exit_factor(), 1.0);
        assert_eq!(GateConfig::recycling().effective_exit_factor(), 2.0);
    }
}
