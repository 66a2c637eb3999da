// Copyright 2026 the Vantage Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Observer options and their canonical deduplication key.
//!
//! Two registrations share a platform observer exactly when their
//! [`ObserverKey`]s are equal. The key is built from the canonical forms of
//! the root margin, the threshold list and the root's [`ElementId`], so
//! `"50px"` and `"50px 50px 50px 50px"` (or `0.5` and `[0.5, 0.5]`) collapse
//! to the same observer.

use alloc::format;
use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;
use core::fmt;
use core::str::FromStr;

use crate::backend::ElementId;

/// Why a `rootMargin` string could not be parsed.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum MarginParseError {
    /// The string contained no values.
    #[error("root margin is empty")]
    Empty,
    /// More than four values were given.
    #[error("root margin has {0} values; at most 4 are allowed")]
    TooManyValues(usize),
    /// A value was not a number followed by `px` or `%`.
    #[error("invalid root margin value `{0}`; expected a length in px or a percentage")]
    InvalidValue(String),
}

/// Why observer options were rejected.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum OptionsError {
    /// The root margin did not parse.
    #[error(transparent)]
    Margin(#[from] MarginParseError),
    /// A threshold was outside `[0, 1]` or not finite.
    #[error("threshold {0} is outside [0, 1]")]
    ThresholdOutOfRange(String),
}

/// One side of a root margin.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum MarginValue {
    /// Absolute length in CSS pixels.
    Px(f64),
    /// Percentage of the root's size along the same axis.
    Percent(f64),
}

impl MarginValue {
    /// Resolves this value to pixels against a root extent.
    #[must_use]
    pub fn resolve(self, extent: f64) -> f64 {
        match self {
            Self::Px(v) => v,
            Self::Percent(p) => p / 100.0 * extent,
        }
    }

    /// Widens (`factor > 1`) or narrows (`factor < 1`) this side, keeping
    /// the unit.
    ///
    /// Expansions are multiplied and contractions divided, so the result
    /// never decreases as `factor` grows. Non-positive or non-finite factors
    /// leave the value unchanged.
    #[must_use]
    pub fn scale(self, factor: f64) -> Self {
        if !(factor.is_finite() && factor > 0.0) {
            return self;
        }
        let widen = |v: f64| if v < 0.0 { v / factor } else { v * factor };
        match self {
            Self::Px(v) => Self::Px(widen(v)),
            Self::Percent(p) => Self::Percent(widen(p)),
        }
    }

    fn parse_token(token: &str) -> Result<Self, MarginParseError> {
        let invalid = || MarginParseError::InvalidValue(String::from(token));
        let (number, ctor): (&str, fn(f64) -> Self) = if let Some(n) = token.strip_suffix("px")
        {
            (n, Self::Px)
        } else if let Some(n) = token.strip_suffix('%') {
            (n, Self::Percent)
        } else if token == "0" {
            (token, Self::Px)
        } else {
            return Err(invalid());
        };
        let value = f64::from_str(number).map_err(|_| invalid())?;
        if !value.is_finite() {
            return Err(invalid());
        }
        Ok(ctor(value))
    }
}

impl fmt::Display for MarginValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // `+ 0.0` folds negative zero into zero.
        match *self {
            Self::Px(v) => write!(f, "{}px", v + 0.0),
            Self::Percent(p) => write!(f, "{}%", p + 0.0),
        }
    }
}

/// A CSS-margin-like expansion of the observer root.
///
/// Parses the 1 to 4 value shorthand and always renders the canonical
/// four-value form `top right bottom left`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RootMargin {
    /// Expansion above the root.
    pub top: MarginValue,
    /// Expansion to the right of the root.
    pub right: MarginValue,
    /// Expansion below the root.
    pub bottom: MarginValue,
    /// Expansion to the left of the root.
    pub left: MarginValue,
}

impl RootMargin {
    /// No expansion.
    pub const ZERO: Self = Self::uniform(MarginValue::Px(0.0));

    /// The same value on all four sides.
    #[must_use]
    pub const fn uniform(value: MarginValue) -> Self {
        Self {
            top: value,
            right: value,
            bottom: value,
            left: value,
        }
    }

    /// Uniform expansion of `px` pixels.
    #[must_use]
    pub const fn px(px: f64) -> Self {
        Self::uniform(MarginValue::Px(px))
    }

    /// Scales every side by `factor`; see [`MarginValue::scale`].
    #[must_use]
    pub fn scale(self, factor: f64) -> Self {
        Self {
            top: self.top.scale(factor),
            right: self.right.scale(factor),
            bottom: self.bottom.scale(factor),
            left: self.left.scale(factor),
        }
    }

    /// How far below the viewport an element starts counting as visible.
    ///
    /// Percentages resolve against `viewport_height`.
    #[must_use]
    pub fn trigger_distance(&self, viewport_height: f64) -> f64 {
        self.bottom.resolve(viewport_height)
    }
}

impl Default for RootMargin {
    fn default() -> Self {
        Self::ZERO
    }
}

impl FromStr for RootMargin {
    type Err = MarginParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let values = s
            .split_whitespace()
            .map(MarginValue::parse_token)
            .collect::<Result<Vec<_>, _>>()?;
        match *values.as_slice() {
            [] => Err(MarginParseError::Empty),
            [all] => Ok(Self::uniform(all)),
            [vertical, horizontal] => Ok(Self {
                top: vertical,
                right: horizontal,
                bottom: vertical,
                left: horizontal,
            }),
            [top, horizontal, bottom] => Ok(Self {
                top,
                right: horizontal,
                bottom,
                left: horizontal,
            }),
            [top, right, bottom, left] => Ok(Self {
                top,
                right,
                bottom,
                left,
            }),
            _ => Err(MarginParseError::TooManyValues(values.len())),
        }
    }
}

impl fmt::Display for RootMargin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {} {}", self.top, self.right, self.bottom, self.left)
    }
}

/// Sorted, deduplicated intersection-ratio thresholds in `[0, 1]`.
#[derive(Clone, Debug, PartialEq)]
pub struct Thresholds(Vec<f64>);

impl Thresholds {
    /// Builds a threshold list, sorting and deduplicating it.
    ///
    /// An empty list means `[0]`, matching the platform default.
    pub fn new(values: &[f64]) -> Result<Self, OptionsError> {
        if let Some(bad) = values
            .iter()
            .find(|v| !v.is_finite() || **v < 0.0 || **v > 1.0)
        {
            return Err(OptionsError::ThresholdOutOfRange(format!("{bad}")));
        }
        let mut sorted: Vec<f64> = values.iter().map(|v| *v + 0.0).collect();
        if sorted.is_empty() {
            sorted.push(0.0);
        }
        sorted.sort_by(f64::total_cmp);
        sorted.dedup();
        Ok(Self(sorted))
    }

    /// Returns the thresholds in ascending order.
    #[must_use]
    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }
}

impl Default for Thresholds {
    fn default() -> Self {
        Self(vec![0.0])
    }
}

impl fmt::Display for Thresholds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, v) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{v}")?;
        }
        Ok(())
    }
}

/// Configuration for a viewport observation.
///
/// `root: None` observes against the viewport.
#[derive(Clone, Debug)]
pub struct ObserverOptions<E> {
    /// Expansion applied to the root before intersecting.
    pub root_margin: RootMargin,
    /// Ratios at which the observer reports a change.
    pub thresholds: Thresholds,
    /// Scroll container to intersect with, or the viewport.
    pub root: Option<E>,
}

impl<E> ObserverOptions<E> {
    /// Default options: zero margin, threshold `0`, viewport root.
    #[must_use]
    pub fn new() -> Self {
        Self {
            root_margin: RootMargin::ZERO,
            thresholds: Thresholds::default(),
            root: None,
        }
    }

    /// Sets the root margin from CSS shorthand such as `"50px"` or
    /// `"10% 0px"`.
    pub fn root_margin(mut self, margin: &str) -> Result<Self, OptionsError> {
        self.root_margin = margin.parse()?;
        Ok(self)
    }

    /// Sets an already-parsed root margin.
    #[must_use]
    pub fn with_root_margin(mut self, margin: RootMargin) -> Self {
        self.root_margin = margin;
        self
    }

    /// Sets a single threshold.
    pub fn threshold(self, threshold: f64) -> Result<Self, OptionsError> {
        self.thresholds(&[threshold])
    }

    /// Sets a list of thresholds.
    pub fn thresholds(mut self, thresholds: &[f64]) -> Result<Self, OptionsError> {
        self.thresholds = Thresholds::new(thresholds)?;
        Ok(self)
    }

    /// Observes against `root` instead of the viewport.
    #[must_use]
    pub fn root(mut self, root: E) -> Self {
        self.root = Some(root);
        self
    }

    /// Builds the deduplication key, given the identity of the root element.
    #[must_use]
    pub fn key(&self, root: Option<ElementId>) -> ObserverKey {
        let root = match root {
            Some(id) => format!("{}", id.0),
            None => String::from("viewport"),
        };
        ObserverKey(format!(
            "margin={};threshold={};root={root}",
            self.root_margin, self.thresholds
        ))
    }
}

impl<E> Default for ObserverOptions<E> {
    fn default() -> Self {
        Self::new()
    }
}

/// Canonical string identifying one pooled platform observer.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObserverKey(String);

impl ObserverKey {
    /// Returns the key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ObserverKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObserverKey({})", self.0)
    }
}

impl fmt::Display for ObserverKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
