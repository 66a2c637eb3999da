// Copyright 2026 the Vantage Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Device capability classification.
//!
//! The services never query the host for hardware details themselves. They
//! consume a [`DeviceCapabilities`] implementation injected at construction,
//! which answers two questions cheaply and without side effects: which
//! [`PerformanceTier`] the device falls into, and whether it should be
//! treated as constrained.
//!
//! [`DeviceProfile`] plus [`classify`] is the shared rule set. Backends read
//! a profile from the host once and cache the result; [`StaticDevice`] is a
//! fixed answer for tests and server rendering.

use core::fmt;

/// Coarse device capability, ordered from least to most capable.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PerformanceTier {
    /// Very weak hardware or the user asked to save data.
    Minimal,
    /// Entry-level phones and small viewports.
    Low,
    /// Typical hardware. Used when nothing is known.
    #[default]
    Medium,
    /// Desktop-class hardware.
    High,
}

impl PerformanceTier {
    /// All tiers, weakest first.
    pub const ALL: [Self; 4] = [Self::Minimal, Self::Low, Self::Medium, Self::High];

    /// Lowercase name, as used in logs and configuration.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Minimal => "minimal",
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl fmt::Display for PerformanceTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Synchronous, side-effect-free view of the host's capabilities.
///
/// Implementations may cache; the services call these methods often.
pub trait DeviceCapabilities {
    /// The device's performance tier.
    fn performance_tier(&self) -> PerformanceTier;

    /// Whether scroll-linked effects and frame rate should be cut back.
    ///
    /// Defaults to `tier <= Low`.
    fn is_constrained(&self) -> bool {
        self.performance_tier() <= PerformanceTier::Low
    }

    /// Whether the user asked the host to reduce motion.
    fn prefers_reduced_motion(&self) -> bool {
        false
    }
}

/// Raw host facts a tier is derived from.
///
/// Every field is optional or has a neutral default because browsers expose
/// them unevenly.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct DeviceProfile {
    /// `navigator.hardwareConcurrency`.
    pub logical_cores: Option<u32>,
    /// `navigator.deviceMemory`, in gigabytes.
    pub memory_gb: Option<f64>,
    /// Layout viewport width in CSS pixels.
    pub viewport_width: Option<f64>,
    /// The user enabled a data saver.
    pub save_data: bool,
    /// `prefers-reduced-motion: reduce` matched.
    pub reduced_motion: bool,
}

/// Viewports narrower than this are treated as phones.
pub const MOBILE_MAX_WIDTH: f64 = 768.0;

/// Derives a tier from a profile.
///
/// Unknown facts do not pull the tier down; a profile with nothing filled in
/// classifies as [`PerformanceTier::Medium`].
#[must_use]
pub fn classify(profile: &DeviceProfile) -> PerformanceTier {
    let cores = profile.logical_cores;
    let memory = profile.memory_gb;

    if profile.save_data {
        return PerformanceTier::Minimal;
    }
    if cores.is_some_and(|c| c <= 2) && memory.is_none_or(|m| m <= 2.0) {
        return PerformanceTier::Minimal;
    }
    if memory.is_some_and(|m| m <= 1.0) {
        return PerformanceTier::Minimal;
    }

    let mobile = profile.viewport_width.is_some_and(|w| w < MOBILE_MAX_WIDTH);
    if mobile || cores.is_some_and(|c| c <= 4) || memory.is_some_and(|m| m <= 4.0) {
        return PerformanceTier::Low;
    }

    match (cores, memory) {
        (Some(c), Some(m)) if c >= 8 && m >= 8.0 => PerformanceTier::High,
        (Some(c), None) if c >= 12 => PerformanceTier::High,
        _ => PerformanceTier::Medium,
    }
}

/// A device with a fixed answer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StaticDevice {
    /// Reported tier.
    pub tier: PerformanceTier,
    /// Reported reduced-motion preference.
    pub reduced_motion: bool,
}

impl StaticDevice {
    /// A device of the given tier without a reduced-motion preference.
    #[must_use]
    pub const fn new(tier: PerformanceTier) -> Self {
        Self {
            tier,
            reduced_motion: false,
        }
    }

    /// Classifies `profile` once and keeps the answer.
    #[must_use]
    pub fn from_profile(profile: &DeviceProfile) -> Self {
        Self {
            tier: classify(profile),
            reduced_motion: profile.reduced_motion,
        }
    }
}

impl DeviceCapabilities for StaticDevice {
    fn performance_tier(&self) -> PerformanceTier {
        self.tier
    }

    fn prefers_reduced_motion(&self) -> bool {
        self.reduced_motion
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(cores: u32, memory: f64, width: f64) -> DeviceProfile {
        DeviceProfile {
            logical_cores: Some(cores),
            memory_gb: Some(memory),
            viewport_width: Some(width),
            ..DeviceProfile::default()
        }
    }

    #[test]
    fn tiers_are_ordered_weakest_first() {
        assert!(PerformanceTier::Minimal < PerformanceTier::Low);
        assert!(PerformanceTier::Low < PerformanceTier::Medium);
        assert!(PerformanceTier::Medium < PerformanceTier::High);
        assert_eq!(PerformanceTier::ALL.len(), 4);
    }

    #[test]
    fn empty_profile_is_medium() {
        assert_eq!(classify(&DeviceProfile::default()), PerformanceTier::Medium);
    }

    #[test]
    fn classification_examples() {
        assert_eq!(classify(&profile(2, 2.0, 360.0)), PerformanceTier::Minimal);
        assert_eq!(classify(&profile(8, 4.0, 390.0)), PerformanceTier::Low);
        assert_eq!(classify(&profile(8, 8.0, 390.0)), PerformanceTier::Low);
        assert_eq!(classify(&profile(6, 8.0, 1440.0)), PerformanceTier::Medium);
        assert_eq!(classify(&profile(16, 8.0, 1920.0)), PerformanceTier::High);
    }

    #[test]
    fn save_data_forces_minimal() {
        let p = DeviceProfile {
            save_data: true,
            ..profile(16, 32.0, 1920.0)
        };
        assert_eq!(classify(&p), PerformanceTier::Minimal);
    }

    #[test]
    fn constrained_default_covers_minimal_and_low() {
        for (tier, constrained) in [
            (PerformanceTier::Minimal, true),
            (PerformanceTier::Low, true),
            (PerformanceTier::Medium, false),
            (PerformanceTier::High, false),
        ] {
            assert_eq!(StaticDevice::new(tier).is_constrained(), constrained, "{tier}");
        }
    }

    #[test]
    fn static_device_keeps_reduced_motion() {
        let device = StaticDevice::from_profile(&DeviceProfile {
            reduced_motion: true,
            ..DeviceProfile::default()
        });
        assert!(device.prefers_reduced_motion());
        assert_eq!(device.performance_tier(), PerformanceTier::Medium);
    }
}
