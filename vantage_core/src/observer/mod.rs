// Copyright 2026 the Vantage Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Shared viewport observation.
//!
//! Many independent components want to know when "their" element scrolls
//! into view. Giving each one its own platform observer is what made
//! low-end devices stall, so the [`ObserverRegistry`] pools observers by
//! [`ObserverKey`] and fans each platform batch out to per-element callbacks.

mod options;
mod registry;

pub use options::{
    MarginParseError, MarginValue, ObserverKey, ObserverOptions, OptionsError, RootMargin,
    Thresholds,
};
pub use registry::ObserverRegistry;

use kurbo::Rect;

/// Immutable view of one element's intersection state.
#[derive(Clone, Debug, PartialEq)]
pub struct IntersectionSnapshot<E> {
    /// Whether the element overlaps the (margin-expanded) root.
    pub is_intersecting: bool,
    /// Fraction of the element's area that is visible, in `[0, 1]`.
    pub intersection_ratio: f64,
    /// The element's bounding box in viewport coordinates.
    pub bounding_client_rect: Rect,
    /// The element the snapshot describes.
    pub target: E,
}

impl<E> IntersectionSnapshot<E> {
    /// Snapshot delivered when the host cannot observe: the element is
    /// treated as fully visible so dependent content still renders.
    #[must_use]
    pub fn assumed_visible(target: E) -> Self {
        Self {
            is_intersecting: true,
            intersection_ratio: 1.0,
            bounding_client_rect: Rect::ZERO,
            target,
        }
    }
}
