// Copyright 2026 the Vantage Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A page of lazily mounted sections, on capable, constrained and
//! unsupported hosts.

use std::rc::Rc;

use kurbo::Rect;
use vantage_core::device::{PerformanceTier, StaticDevice};
use vantage_core::gate::{LazyMountState, LazySlot, MountPhase};
use vantage_core::headless::{
    HeadlessElement, HeadlessFrames, HeadlessIntersection, HeadlessScroll, HeadlessTimers,
};
use vantage_core::observer::RootMargin;
use vantage_core::scheduler::Priority;
use vantage_core::scroll::ScrollSample;
use vantage_core::services::{Platform, Services, ServicesConfig};
use vantage_core::timing::FrameTick;
use vantage_core::trace::Tracer;

const HERO: HeadlessElement = HeadlessElement(1);
const GRID: HeadlessElement = HeadlessElement(2);
const FOOTER: HeadlessElement = HeadlessElement(3);

fn services(
    intersection: &HeadlessIntersection,
    frames: &HeadlessFrames,
    scroll: &HeadlessScroll,
    tier: PerformanceTier,
) -> Services<HeadlessIntersection> {
    Services::init(
        Platform {
            intersection: intersection.clone(),
            frames: Rc::new(frames.clone()),
            scroll: scroll.clone(),
            timers: Rc::new(HeadlessTimers::new()),
            device: Rc::new(StaticDevice::new(tier)),
        },
        ServicesConfig::web(),
        Tracer::none(),
    )
}

fn slots(services: &Services<HeadlessIntersection>) -> [LazySlot; 3] {
    let ignore = |_: &LazyMountState| Ok(());
    [
        services.lazy_slot("HeroSection", HERO, ignore),
        services.lazy_slot("ServicesGrid", GRID, ignore),
        services.lazy_slot("Footer", FOOTER, ignore),
    ]
}

#[test]
fn sections_mount_as_the_reader_scrolls() {
    let intersection = HeadlessIntersection::new();
    let frames = HeadlessFrames::new();
    let scroll = HeadlessScroll::new();
    let services = services(&intersection, &frames, &scroll, PerformanceTier::Medium);
    let [hero, grid, footer] = slots(&services);

    assert!(hero.is_mounted(), "eager sections mount at once");
    assert!(!hero.is_observing(), "eager sections never observe");
    assert_eq!(
        intersection.root_margins(),
        [RootMargin::px(400.0), RootMargin::px(1000.0)],
        "one observer per distinct margin"
    );

    intersection.place(GRID, Rect::new(0.0, 1500.0, 1280.0, 2300.0));
    intersection.place(FOOTER, Rect::new(0.0, 4000.0, 1280.0, 4400.0));
    assert_eq!(grid.state().phase, MountPhase::Waiting, "grid is 700px below the fold");

    intersection.scroll_to(400.0);
    assert!(grid.is_mounted(), "grid mounts within 400px");
    assert!(!footer.is_mounted(), "footer is still far away");

    intersection.scroll_to(2300.0);
    assert!(footer.is_mounted(), "footer mounts within 1000px");

    intersection.scroll_to(0.0);
    assert!(grid.is_mounted(), "one-shot sections stay mounted");
    assert_eq!(services.registry().watched_count(), 0, "mounted sections stop observing");
}

#[test]
fn constrained_devices_load_closer_and_skip_scroll_work() {
    let intersection = HeadlessIntersection::new();
    let frames = HeadlessFrames::new();
    let scroll = HeadlessScroll::new();
    let services = services(&intersection, &frames, &scroll, PerformanceTier::Low);
    let [_hero, grid, _footer] = slots(&services);

    assert_eq!(
        intersection.root_margins(),
        [RootMargin::px(200.0), RootMargin::px(500.0)],
        "low tier halves every margin"
    );

    intersection.place(GRID, Rect::new(0.0, 1100.0, 1280.0, 1500.0));
    assert!(!grid.is_mounted(), "300px below the fold is outside 200px");
    intersection.scroll_to(150.0);
    assert!(grid.is_mounted(), "mounts once within 200px");

    let subscription = services.scroll_subscribe(|_: &ScrollSample| Ok(()));
    assert!(!subscription.is_active(), "scroll subscriptions are inert");
    assert!(!scroll.is_attached(), "no scroll listener on constrained devices");
    assert_eq!(services.scroll_position(), 0.0, "position stays at the top");
}

#[test]
fn hosts_without_browser_apis_render_everything() {
    let intersection = HeadlessIntersection::unsupported();
    let frames = HeadlessFrames::unsupported();
    let scroll = HeadlessScroll::unsupported();
    let services = services(&intersection, &frames, &scroll, PerformanceTier::High);
    let [hero, grid, footer] = slots(&services);

    assert!(
        hero.is_mounted() && grid.is_mounted() && footer.is_mounted(),
        "every section renders without observation"
    );
    assert_eq!(services.registry().observer_count(), 0, "nothing is pooled");

    let _frame = services.frame_subscribe("spin", |_: &FrameTick| Ok(()), Priority::High);
    assert_eq!(frames.requested_count(), 0, "no frames are requested");

    let _scroll = services.scroll_subscribe(|_: &ScrollSample| Ok(()));
    assert_eq!(services.scroll_position(), 0.0, "position stays at the top");

    services.destroy();
}
