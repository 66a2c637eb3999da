// Copyright 2026 the Vantage Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-component loading strategies.
//!
//! A [`StrategyTable`] maps logical component names to a base
//! [`LoadingStrategy`]. [`StrategyTable::resolve`] applies a
//! [`PerformanceTier`] adjustment to the base `root_margin`: weaker devices
//! load closer to the viewport, stronger ones prefetch earlier. Eager
//! strategies (`lazy: false`) are never adjusted.
//!
//! Resolution is pure. An unknown name resolves to
//! [`LoadingStrategy::DEFAULT`] and logs a warning; it never fails.

use alloc::collections::BTreeMap;
use alloc::string::String;

use crate::device::PerformanceTier;
use crate::observer::RootMargin;

/// How urgently a component's content is needed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LoadingPriority {
    /// Needed for first paint.
    Critical,
    /// Visible soon after first paint.
    High,
    /// Typical below-the-fold content.
    #[default]
    Medium,
    /// Far down the page.
    Low,
}

/// Rough weight of a component's content once mounted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum SizeHint {
    /// Markup and small images.
    Small,
    /// Several images or a small script chunk.
    #[default]
    Medium,
    /// 3D scenes and other heavy chunks.
    Large,
}

/// When and how eagerly to load one component.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LoadingStrategy {
    /// Margin the mount observer uses; its bottom side is the trigger
    /// distance below the viewport.
    pub root_margin: RootMargin,
    /// Loading priority.
    pub priority: LoadingPriority,
    /// Whether mounting waits for the viewport at all.
    pub lazy: bool,
    /// Expected content weight.
    pub expected_size: SizeHint,
}

impl LoadingStrategy {
    /// Strategy for components without a table entry.
    pub const DEFAULT: Self = Self::lazy(400.0, LoadingPriority::Medium, SizeHint::Medium);

    /// A lazy strategy triggering `margin_px` before the viewport.
    #[must_use]
    pub const fn lazy(margin_px: f64, priority: LoadingPriority, expected_size: SizeHint) -> Self {
        Self {
            root_margin: RootMargin::px(margin_px),
            priority,
            lazy: true,
            expected_size,
        }
    }

    /// A strategy that mounts immediately.
    #[must_use]
    pub const fn eager(priority: LoadingPriority, expected_size: SizeHint) -> Self {
        Self {
            root_margin: RootMargin::ZERO,
            priority,
            lazy: false,
            expected_size,
        }
    }

    /// This strategy adjusted for `tier`.
    ///
    /// Lazy strategies have their margin scaled by
    /// [`tier_margin_factor`]; eager ones are returned unchanged.
    #[must_use]
    pub fn for_tier(self, tier: PerformanceTier) -> Self {
        if !self.lazy {
            return self;
        }
        Self {
            root_margin: self.root_margin.scale(tier_margin_factor(tier)),
            ..self
        }
    }
}

impl Default for LoadingStrategy {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Root-margin multiplier per tier. Non-decreasing in tier.
#[must_use]
pub const fn tier_margin_factor(tier: PerformanceTier) -> f64 {
    match tier {
        PerformanceTier::Minimal => 0.25,
        PerformanceTier::Low => 0.5,
        PerformanceTier::Medium => 1.0,
        PerformanceTier::High => 1.5,
    }
}

/// Named base strategies.
#[derive(Clone, Debug, Default)]
pub struct StrategyTable {
    entries: BTreeMap<String, LoadingStrategy>,
}

impl StrategyTable {
    /// An empty table; every name resolves to the default.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// The site's built-in table.
    #[must_use]
    pub fn builtin() -> Self {
        use LoadingPriority::{Critical, High, Low, Medium};

        Self::empty()
            .with("HeroSection", LoadingStrategy::eager(Critical, SizeHint::Large))
            .with("Navigation", LoadingStrategy::eager(Critical, SizeHint::Small))
            .with("PlanetScene", LoadingStrategy::lazy(200.0, High, SizeHint::Large))
            .with("MoonScene", LoadingStrategy::lazy(300.0, Medium, SizeHint::Large))
            .with("GlobeScene", LoadingStrategy::lazy(300.0, Medium, SizeHint::Large))
            .with("ServicesGrid", LoadingStrategy::lazy(400.0, Medium, SizeHint::Medium))
            .with("ProjectShowcase", LoadingStrategy::lazy(500.0, Medium, SizeHint::Large))
            .with("Testimonials", LoadingStrategy::lazy(600.0, Low, SizeHint::Small))
            .with("ContactForm", LoadingStrategy::lazy(800.0, Low, SizeHint::Small))
            .with("Footer", LoadingStrategy::lazy(1000.0, Low, SizeHint::Small))
    }

    /// Adds or replaces the entry for `name`.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, strategy: LoadingStrategy) -> Self {
        self.entries.insert(name.into(), strategy);
        self
    }

    /// The unadjusted entry for `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&LoadingStrategy> {
        self.entries.get(name)
    }

    /// Registered component names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Resolves `name` for a device of `tier`.
    ///
    /// Unknown names fall back to [`LoadingStrategy::DEFAULT`] (adjusted for
    /// `tier`) and log a warning.
    #[must_use]
    pub fn resolve(&self, name: &str, tier: PerformanceTier) -> LoadingStrategy {
        let base = match self.entries.get(name) {
            Some(strategy) => *strategy,
            None => {
                log::warn!("vantage: no loading strategy registered for `{name}`; using default");
                LoadingStrategy::DEFAULT
            }
        };
        base.for_tier(tier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;

    #[test]
    fn unknown_component_gets_default_on_medium() {
        let resolved = StrategyTable::builtin().resolve("Foo", PerformanceTier::Medium);
        assert_eq!(resolved, LoadingStrategy::DEFAULT);
        assert_eq!(resolved.root_margin.to_string(), "400px 400px 400px 400px");
        assert_eq!(resolved.priority, LoadingPriority::Medium);
        assert!(resolved.lazy);
    }

    #[test]
    fn trigger_distance_is_monotonic_in_tier() {
        let table = StrategyTable::builtin();
        for name in table.names() {
            let distances: alloc::vec::Vec<f64> = PerformanceTier::ALL
                .iter()
                .map(|tier| table.resolve(name, *tier).root_margin.trigger_distance(800.0))
                .collect();
            assert!(distances.is_sorted(), "{name}: {distances:?}");
        }
    }

    #[test]
    fn inset_margins_stay_monotonic_in_tier() {
        let inset = LoadingStrategy::lazy(-100.0, LoadingPriority::Low, SizeHint::Small);
        let table = StrategyTable::empty().with("Ticker", inset);
        let distances: alloc::vec::Vec<f64> = PerformanceTier::ALL
            .iter()
            .map(|tier| table.resolve("Ticker", *tier).root_margin.trigger_distance(800.0))
            .collect();
        assert!(distances.is_sorted(), "{distances:?}");
        assert_eq!(distances, [-400.0, -200.0, -100.0, -100.0 / 1.5]);
    }

    #[test]
    fn eager_strategies_ignore_tier() {
        let table = StrategyTable::builtin();
        let base = *table.get("HeroSection").unwrap();
        for tier in PerformanceTier::ALL {
            assert_eq!(table.resolve("HeroSection", tier), base);
        }
    }

    #[test]
    fn constrained_tiers_shrink_and_generous_tiers_grow() {
        let table = StrategyTable::builtin();
        let planet = |tier| {
            table
                .resolve("PlanetScene", tier)
                .root_margin
                .trigger_distance(800.0)
        };
        assert_eq!(planet(PerformanceTier::Minimal), 50.0);
        assert_eq!(planet(PerformanceTier::Medium), 200.0);
        assert_eq!(planet(PerformanceTier::High), 300.0);
    }

    #[test]
    fn application_entries_override_builtin() {
        let custom = LoadingStrategy::lazy(50.0, LoadingPriority::High, SizeHint::Small);
        let table = StrategyTable::builtin().with("Footer", custom);
        assert_eq!(table.resolve("Footer", PerformanceTier::Medium), custom);
        assert!(!StrategyTable::empty().with("X", custom).is_empty());
    }
}
