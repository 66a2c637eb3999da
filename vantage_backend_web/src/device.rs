// Copyright 2026 the Vantage Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Device detection from `navigator` and `window`.

use js_sys::Reflect;
use wasm_bindgen::prelude::*;

use vantage_core::device::{DeviceCapabilities, DeviceProfile, PerformanceTier, classify};

/// Media query for the reduced-motion preference.
const REDUCED_MOTION_QUERY: &str = "(prefers-reduced-motion: reduce)";

/// A device profile read once from the browser.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BrowserDevice {
    profile: DeviceProfile,
    tier: PerformanceTier,
}

impl BrowserDevice {
    /// Reads the profile from the current page. Facts the browser does not
    /// expose are left unknown.
    #[must_use]
    pub fn detect() -> Self {
        let profile = web_sys::window().map_or_else(DeviceProfile::default, |window| {
            let navigator = window.navigator();
            let navigator: &JsValue = navigator.as_ref();
            DeviceProfile {
                logical_cores: logical_cores(number_field(navigator, "hardwareConcurrency")),
                memory_gb: positive(number_field(navigator, "deviceMemory")),
                viewport_width: window
                    .inner_width()
                    .ok()
                    .and_then(|width| positive(width.as_f64())),
                save_data: Reflect::get(navigator, &JsValue::from_str("connection"))
                    .ok()
                    .filter(|connection| connection.is_object())
                    .and_then(|connection| {
                        Reflect::get(&connection, &JsValue::from_str("saveData")).ok()
                    })
                    .and_then(|flag| flag.as_bool())
                    .unwrap_or(false),
                reduced_motion: window
                    .match_media(REDUCED_MOTION_QUERY)
                    .ok()
                    .flatten()
                    .is_some_and(|query| query.matches()),
            }
        });
        let device = Self::from_profile(profile);
        log::debug!(
            "vantage: detected {} tier device ({:?})",
            device.tier,
            device.profile
        );
        device
    }

    /// Classifies an already-known profile.
    #[must_use]
    pub fn from_profile(profile: DeviceProfile) -> Self {
        Self {
            profile,
            tier: classify(&profile),
        }
    }

    /// The profile the tier was derived from.
    #[must_use]
    pub fn profile(&self) -> &DeviceProfile {
        &self.profile
    }
}

impl DeviceCapabilities for BrowserDevice {
    fn performance_tier(&self) -> PerformanceTier {
        self.tier
    }

    fn prefers_reduced_motion(&self) -> bool {
        self.profile.reduced_motion
    }
}

fn number_field(target: &JsValue, name: &str) -> Option<f64> {
    Reflect::get(target, &JsValue::from_str(name))
        .ok()
        .and_then(|value| value.as_f64())
}

/// Positive finite numbers; browsers report missing facts as `0`,
/// `undefined` or nothing at all.
pub(crate) fn positive(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite() && *v > 0.0)
}

/// `navigator.hardwareConcurrency` as a core count.
pub(crate) fn logical_cores(value: Option<f64>) -> Option<u32> {
    let value = positive(value)?;
    if value >= f64::from(u32::MAX) {
        return Some(u32::MAX);
    }
    #[expect(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        reason = "positive and below u32::MAX"
    )]
    let cores = value as u32;
    (cores > 0).then_some(cores)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_facts_stay_unknown() {
        assert_eq!(positive(None), None);
        assert_eq!(positive(Some(0.0)), None);
        assert_eq!(positive(Some(f64::NAN)), None);
        assert_eq!(positive(Some(-3.0)), None);
        assert_eq!(positive(Some(4.0)), Some(4.0));
    }

    #[test]
    fn core_counts_are_whole() {
        assert_eq!(logical_cores(Some(8.0)), Some(8));
        assert_eq!(logical_cores(Some(0.5)), None);
        assert_eq!(logical_cores(Some(1e12)), Some(u32::MAX));
        assert_eq!(logical_cores(None), None);
    }

    #[test]
    fn profile_drives_the_tier() {
        let phone = BrowserDevice::from_profile(DeviceProfile {
            logical_cores: Some(8),
            memory_gb: Some(4.0),
            viewport_width: Some(390.0),
            save_data: false,
            reduced_motion: true,
        });
        assert_eq!(phone.performance_tier(), PerformanceTier::Low);
        assert!(phone.is_constrained());
        assert!(phone.prefers_reduced_motion());

        let desktop = BrowserDevice::from_profile(DeviceProfile {
            logical_cores: Some(16),
            memory_gb: Some(16.0),
            viewport_width: Some(1920.0),
            ..DeviceProfile::default()
        });
        assert_eq!(desktop.performance_tier(), PerformanceTier::High);
        assert!(!desktop.is_constrained());
    }
}
