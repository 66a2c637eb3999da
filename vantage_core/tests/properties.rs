// Copyright 2026 the Vantage Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Cross-service behavior, driven through [`Services`] over the headless
//! platform.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use kurbo::Rect;
use vantage_core::device::{PerformanceTier, StaticDevice};
use vantage_core::error::{CallbackError, CallbackResult};
use vantage_core::headless::{
    HeadlessElement, HeadlessFrames, HeadlessIntersection, HeadlessScroll, HeadlessTimers,
};
use vantage_core::observer::{IntersectionSnapshot, ObserverOptions};
use vantage_core::scheduler::Priority;
use vantage_core::scroll::ScrollSample;
use vantage_core::services::{Platform, Services, ServicesConfig};
use vantage_core::strategy::{LoadingPriority, LoadingStrategy, SizeHint};
use vantage_core::timing::FrameTick;
use vantage_core::trace::Tracer;

struct Harness {
    services: Services<HeadlessIntersection>,
    intersection: HeadlessIntersection,
    frames: HeadlessFrames,
    scroll: HeadlessScroll,
}

fn harness(tier: PerformanceTier) -> Harness {
    let intersection = HeadlessIntersection::new();
    let frames = HeadlessFrames::new();
    let scroll = HeadlessScroll::new();
    let services = Services::init(
        Platform {
            intersection: intersection.clone(),
            frames: Rc::new(frames.clone()),
            scroll: scroll.clone(),
            timers: Rc::new(HeadlessTimers::new()),
            device: Rc::new(StaticDevice::new(tier)),
        },
        ServicesConfig::web(),
        Tracer::none(),
    );
    Harness {
        services,
        intersection,
        frames,
        scroll,
    }
}

type Seen = Rc<RefCell<Vec<bool>>>;

fn recorder(seen: &Seen) -> impl FnMut(&IntersectionSnapshot<HeadlessElement>) -> CallbackResult + use<> {
    let seen = Rc::clone(seen);
    move |snapshot| {
        seen.borrow_mut().push(snapshot.is_intersecting);
        Ok(())
    }
}

#[test]
fn equal_options_share_one_platform_observer() {
    let h = harness(PerformanceTier::High);
    let explicit = ObserverOptions::new()
        .root_margin("0px 0px 0px 0px")
        .unwrap()
        .threshold(0.0)
        .unwrap();
    let defaulted = ObserverOptions::new();
    let shorthand = ObserverOptions::new().root_margin("0px").unwrap();

    let _a = h
        .services
        .observe(HeadlessElement(1), &explicit, |_: &IntersectionSnapshot<_>| Ok(()));
    let _b = h
        .services
        .observe(HeadlessElement(2), &defaulted, |_: &IntersectionSnapshot<_>| Ok(()));
    let _c = h
        .services
        .observe(HeadlessElement(3), &shorthand, |_: &IntersectionSnapshot<_>| Ok(()));

    assert_eq!(h.intersection.created_count(), 1, "default-filled options must share a key");
    assert_eq!(h.services.registry().observer_count(), 1, "one pool per key");
    assert_eq!(h.services.registry().watched_count(), 3, "every element is watched");

    let wide = ObserverOptions::new().root_margin("200px").unwrap();
    let _d = h
        .services
        .observe(HeadlessElement(4), &wide, |_: &IntersectionSnapshot<_>| Ok(()));
    assert_eq!(h.intersection.created_count(), 2, "a different margin needs its own observer");
}

#[test]
fn each_element_is_notified_once_per_batch() {
    let h = harness(PerformanceTier::High);
    let options = ObserverOptions::new();
    let first: Seen = Rc::default();
    let second: Seen = Rc::default();
    let _a = h.services.observe(HeadlessElement(1), &options, recorder(&first));
    let _b = h.services.observe(HeadlessElement(2), &options, recorder(&second));

    let snapshot = |target, is_intersecting| IntersectionSnapshot {
        is_intersecting,
        intersection_ratio: if is_intersecting { 1.0 } else { 0.0 },
        bounding_client_rect: Rect::ZERO,
        target: HeadlessElement(target),
    };
    h.intersection.deliver(&[
        snapshot(1, false),
        snapshot(2, true),
        snapshot(1, true),
        snapshot(1, true),
    ]);

    assert_eq!(*first.borrow(), [true], "repeated target delivers its latest entry once");
    assert_eq!(*second.borrow(), [true], "other elements are unaffected");
}

#[test]
fn frame_loop_is_a_singleton() {
    let h = harness(PerformanceTier::High);
    assert_eq!(h.frames.pending_count(), 0, "no loop before the first subscriber");

    let subscriptions: Vec<_> = (0..5)
        .map(|i| {
            h.services
                .frame_subscribe(format!("sub-{i}"), |_: &FrameTick| Ok(()), Priority::Normal)
        })
        .collect();
    assert_eq!(h.frames.pending_count(), 1, "five subscribers share one request");
    assert!(h.services.scheduler().is_running(), "loop runs with subscribers");

    for i in 0..10 {
        h.frames.run_frame(f64::from(i) * 16.7);
        assert_eq!(h.frames.pending_count(), 1, "loop re-requests exactly one frame");
    }

    for (i, subscription) in subscriptions.iter().enumerate() {
        subscription.dispose();
        let expected = usize::from(i + 1 < subscriptions.len());
        assert_eq!(h.frames.pending_count(), expected, "loop lives while anyone listens");
    }
    assert!(!h.services.scheduler().is_running(), "loop stops with the last subscriber");
}

#[test]
fn ticks_dispatch_in_priority_order() {
    let h = harness(PerformanceTier::High);
    let order = Rc::new(RefCell::new(Vec::new()));
    let subscribe = |id: &'static str, priority: Priority| {
        let order = Rc::clone(&order);
        h.services.frame_subscribe(
            id,
            move |_: &FrameTick| {
                order.borrow_mut().push(id);
                Ok(())
            },
            priority,
        )
    };
    let _subs = [
        subscribe("low", Priority::Low),
        subscribe("critical", Priority::Critical),
        subscribe("normal", Priority::Normal),
        subscribe("high", Priority::High),
    ];

    h.frames.run_frame(0.0);
    assert_eq!(
        *order.borrow(),
        ["critical", "high", "normal", "low"],
        "priority order, not registration order"
    );
}

#[test]
fn scroll_events_within_a_frame_coalesce() {
    let h = harness(PerformanceTier::High);
    let samples = Rc::new(RefCell::new(Vec::new()));
    let _sub = h.services.scroll_subscribe({
        let samples = Rc::clone(&samples);
        move |sample: &ScrollSample| {
            samples.borrow_mut().push(sample.position);
            Ok(())
        }
    });

    for i in 1..=50 {
        h.scroll.scroll_to(f64::from(i) * 10.0);
    }
    assert!(samples.borrow().is_empty(), "nothing broadcasts before the frame");
    h.frames.run_frame(16.0);

    assert_eq!(*samples.borrow(), [500.0], "one broadcast with the latest position");
    assert_eq!(h.services.scroll_position(), 500.0, "position is shared");
}

#[test]
fn trigger_distance_grows_with_tier() {
    let h = harness(PerformanceTier::Medium);
    for component in ["PlanetScene", "ServicesGrid", "Footer", "NotInTheTable"] {
        let distances: Vec<f64> = PerformanceTier::ALL
            .iter()
            .map(|&tier| {
                let strategy = h.services.resolve_loading_strategy(component, tier);
                assert!(strategy.lazy, "{component} is lazy");
                strategy.root_margin.trigger_distance(800.0)
            })
            .collect();
        assert!(
            distances.windows(2).all(|pair| pair[0] <= pair[1]),
            "{component}: {distances:?} must not shrink as the tier rises"
        );
    }
}

#[test]
fn disposing_twice_has_one_effect() {
    let h = harness(PerformanceTier::High);
    let subscription = h.services.observe(
        HeadlessElement(7),
        &ObserverOptions::new(),
        |_: &IntersectionSnapshot<_>| Ok(()),
    );
    subscription.dispose();
    subscription.dispose();
    assert_eq!(h.intersection.unobserve_count(), 1, "element is unobserved once");
    assert!(!subscription.is_active(), "disposed handle reports inactive");
    drop(subscription);
    assert_eq!(h.intersection.unobserve_count(), 1, "drop after dispose is a no-op");

    let frame = h
        .services
        .frame_subscribe("once", |_: &FrameTick| Ok(()), Priority::Normal);
    frame.dispose();
    frame.dispose();
    assert_eq!(h.frames.cancelled_count(), 1, "the frame request is cancelled once");
}

#[test]
fn a_failing_subscriber_does_not_starve_its_neighbors() {
    let h = harness(PerformanceTier::High);
    let options = ObserverOptions::new();
    let reached = Rc::new(Cell::new(0));

    let _bad = h.services.observe(
        HeadlessElement(1),
        &options,
        |_: &IntersectionSnapshot<_>| Err(CallbackError::msg("observer boom")),
    );
    let _good = h.services.observe(HeadlessElement(2), &options, {
        let reached = Rc::clone(&reached);
        move |_: &IntersectionSnapshot<_>| {
            reached.set(reached.get() + 1);
            Ok(())
        }
    });
    h.intersection
        .set_intersecting(&[HeadlessElement(1), HeadlessElement(2)], true);
    assert_eq!(reached.get(), 1, "observer neighbor still runs");

    let _bad_frame = h.services.frame_subscribe(
        "bad",
        |_: &FrameTick| Err(CallbackError::msg("frame boom")),
        Priority::Critical,
    );
    let _good_frame = h.services.frame_subscribe(
        "good",
        {
            let reached = Rc::clone(&reached);
            move |_: &FrameTick| {
                reached.set(reached.get() + 1);
                Ok(())
            }
        },
        Priority::Low,
    );
    h.frames.run_frame(0.0);
    assert_eq!(reached.get(), 2, "frame neighbor still runs");

    let _bad_scroll = h
        .services
        .scroll_subscribe(|_: &ScrollSample| Err(CallbackError::msg("scroll boom")));
    let _good_scroll = h.services.scroll_subscribe({
        let reached = Rc::clone(&reached);
        move |_: &ScrollSample| {
            reached.set(reached.get() + 1);
            Ok(())
        }
    });
    h.scroll.scroll_to(120.0);
    h.frames.run_frame(16.7);
    assert_eq!(reached.get(), 4, "scroll neighbor runs, and the frame loop kept going");
}

#[test]
fn element_entering_the_viewport_is_reported_until_disposed() {
    let h = harness(PerformanceTier::High);
    let element = HeadlessElement(42);
    let options = ObserverOptions::new()
        .root_margin("50px")
        .unwrap()
        .threshold(0.1)
        .unwrap();
    let seen: Seen = Rc::default();
    let subscription = h.services.observe(element, &options, recorder(&seen));

    // Below the 800px viewport and outside its 50px margin.
    h.intersection
        .place(element, Rect::new(0.0, 900.0, 400.0, 1100.0));
    h.intersection.scroll_to(300.0);
    let entered = seen.borrow().iter().filter(|&&visible| visible).count();
    assert_eq!(entered, 1, "entering is reported exactly once");
    assert_eq!(seen.borrow().last(), Some(&true), "latest state is visible");

    subscription.dispose();
    let before = seen.borrow().len();
    h.intersection.scroll_to(0.0);
    h.intersection.scroll_to(300.0);
    assert_eq!(seen.borrow().len(), before, "no reports after disposal");
}

#[test]
fn unknown_component_resolves_to_the_default() {
    let h = harness(PerformanceTier::Medium);
    let strategy = h.services.resolve_loading_strategy("Foo", PerformanceTier::Medium);
    assert_eq!(strategy, LoadingStrategy::DEFAULT, "medium tier leaves the default alone");
    assert_eq!(strategy.root_margin.to_string(), "400px 400px 400px 400px");
    assert_eq!(strategy.priority, LoadingPriority::Medium);
    assert!(strategy.lazy, "default strategy is lazy");
    assert_eq!(strategy.expected_size, SizeHint::Medium);
}
