// Copyright 2026 the Vantage Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Composition root.
//!
//! [`Services`] owns one instance of every service and is the surface UI
//! components talk to. The application builds it once at startup from a
//! [`Platform`] and tears it down with [`Services::destroy`]; tests build a
//! fresh one per case over the [`headless`](crate::headless) platform.

use alloc::rc::Rc;
use core::fmt;

use crate::backend::{AnimationFrames, IntersectionPlatform, ScrollSource, Timers};
use crate::device::{DeviceCapabilities, PerformanceTier};
use crate::error::CallbackResult;
use crate::gate::{GateConfig, LazyMountState, LazySlot, SlotRequest};
use crate::observer::{IntersectionSnapshot, ObserverOptions, ObserverRegistry};
use crate::scheduler::{FrameScheduler, Priority, SchedulerConfig};
use crate::scroll::{ScrollBroadcaster, ScrollConfig, ScrollSample};
use crate::strategy::{LoadingStrategy, StrategyTable};
use crate::subscription::Subscription;
use crate::timing::FrameTick;
use crate::trace::Tracer;

/// Host implementations the services are built over.
pub struct Platform<P, S> {
    /// Viewport observers.
    pub intersection: P,
    /// Animation frames, shared by the scheduler and the scroll broadcaster.
    pub frames: Rc<dyn AnimationFrames>,
    /// The page scroll listener.
    pub scroll: S,
    /// Clock and timeouts.
    pub timers: Rc<dyn Timers>,
    /// Device classification.
    pub device: Rc<dyn DeviceCapabilities>,
}

impl<P, S> fmt::Debug for Platform<P, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Platform")
            .field("tier", &self.device.performance_tier())
            .finish_non_exhaustive()
    }
}

/// Service configuration.
#[derive(Clone, Debug, Default)]
pub struct ServicesConfig {
    /// Frame-rate targets.
    pub scheduler: SchedulerConfig,
    /// Scroll policy.
    pub scroll: ScrollConfig,
    /// Gate policy for [`Services::lazy_slot`].
    pub gate: GateConfig,
    /// Loading strategies by component name.
    pub strategies: StrategyTable,
}

impl ServicesConfig {
    /// Browser defaults with the built-in strategy table.
    #[must_use]
    pub fn web() -> Self {
        Self {
            scheduler: SchedulerConfig::web(),
            scroll: ScrollConfig::default(),
            gate: GateConfig::one_shot(),
            strategies: StrategyTable::builtin(),
        }
    }
}

/// Every service, wired together.
pub struct Services<P: IntersectionPlatform> {
    registry: ObserverRegistry<P>,
    scheduler: FrameScheduler,
    scroll: ScrollBroadcaster,
    strategies: StrategyTable,
    gate: GateConfig,
    timers: Rc<dyn Timers>,
    device: Rc<dyn DeviceCapabilities>,
    tracer: Tracer,
}

impl<P: IntersectionPlatform + 'static> Services<P> {
    /// Builds the services. Nothing touches the host until the first
    /// subscription.
    #[must_use]
    pub fn init<S>(platform: Platform<P, S>, config: ServicesConfig, tracer: Tracer) -> Self
    where
        S: ScrollSource + 'static,
    {
        let Platform {
            intersection,
            frames,
            scroll,
            timers,
            device,
        } = platform;
        log::debug!(
            "vantage: services starting on a {} tier device",
            device.performance_tier()
        );
        Self {
            registry: ObserverRegistry::new(intersection, tracer.clone()),
            scheduler: FrameScheduler::new(
                Rc::clone(&frames),
                &*device,
                config.scheduler,
                tracer.clone(),
            ),
            scroll: ScrollBroadcaster::new(
                scroll,
                frames,
                &*device,
                config.scroll,
                tracer.clone(),
            ),
            strategies: config.strategies,
            gate: config.gate,
            timers,
            device,
            tracer,
        }
    }

    /// Watches `element`; see [`ObserverRegistry::observe`].
    pub fn observe<F>(
        &self,
        element: P::Element,
        options: &ObserverOptions<P::Element>,
        callback: F,
    ) -> Subscription
    where
        F: FnMut(&IntersectionSnapshot<P::Element>) -> CallbackResult + 'static,
    {
        self.registry.observe(element, options, callback)
    }

    /// Watches `element` until it first intersects; see
    /// [`ObserverRegistry::observe_once`].
    pub fn observe_once<F>(
        &self,
        element: P::Element,
        options: &ObserverOptions<P::Element>,
        callback: F,
    ) -> Subscription
    where
        F: FnMut(&IntersectionSnapshot<P::Element>) -> CallbackResult + 'static,
    {
        self.registry.observe_once(element, options, callback)
    }

    /// Subscribes to frame ticks; see [`FrameScheduler::subscribe`].
    pub fn frame_subscribe<F>(
        &self,
        id: impl Into<Rc<str>>,
        callback: F,
        priority: Priority,
    ) -> Subscription
    where
        F: FnMut(&FrameTick) -> CallbackResult + 'static,
    {
        self.scheduler.subscribe(id, callback, priority)
    }

    /// Subscribes to coalesced scroll samples; see
    /// [`ScrollBroadcaster::subscribe`].
    pub fn scroll_subscribe<F>(&self, callback: F) -> Subscription
    where
        F: FnMut(&ScrollSample) -> CallbackResult + 'static,
    {
        self.scroll.subscribe(callback)
    }

    /// Last broadcast scroll offset; zero before any subscriber.
    #[must_use]
    pub fn scroll_position(&self) -> f64 {
        self.scroll.position()
    }

    /// Resolves `component` for an explicit tier.
    #[must_use]
    pub fn resolve_loading_strategy(
        &self,
        component: &str,
        tier: PerformanceTier,
    ) -> LoadingStrategy {
        self.strategies.resolve(component, tier)
    }

    /// Resolves `component` for this device's tier.
    #[must_use]
    pub fn strategy_for(&self, component: &str) -> LoadingStrategy {
        self.resolve_loading_strategy(component, self.device.performance_tier())
    }

    /// Gates `element` with the strategy resolved for `component` and the
    /// configured [`GateConfig`].
    pub fn lazy_slot<F>(&self, component: &str, element: P::Element, on_change: F) -> LazySlot
    where
        F: FnMut(&LazyMountState) -> CallbackResult + 'static,
    {
        let request = SlotRequest {
            component: component.into(),
            element,
            strategy: self.strategy_for(component),
            config: self.gate,
            allow_unmount: self.device.is_constrained(),
        };
        LazySlot::attach(
            &self.registry,
            Rc::clone(&self.timers),
            self.tracer.clone(),
            request,
            on_change,
        )
    }

    /// Pauses or resumes frame dispatch; see [`FrameScheduler::set_paused`].
    pub fn set_paused(&self, paused: bool) {
        self.scheduler.set_paused(paused);
    }

    /// The observer registry.
    #[must_use]
    pub fn registry(&self) -> &ObserverRegistry<P> {
        &self.registry
    }

    /// The frame scheduler.
    #[must_use]
    pub fn scheduler(&self) -> &FrameScheduler {
        &self.scheduler
    }

    /// The scroll broadcaster.
    #[must_use]
    pub fn scroll(&self) -> &ScrollBroadcaster {
        &self.scroll
    }

    /// The injected device.
    #[must_use]
    pub fn device(&self) -> &dyn DeviceCapabilities {
        &*self.device
    }

    /// Tears every service down: observers disconnect, the frame request is
    /// cancelled, the scroll listener detaches and all callbacks are
    /// dropped. Outstanding subscriptions become no-ops.
    pub fn destroy(&self) {
        self.scheduler.destroy();
        self.scroll.destroy();
        self.registry.destroy();
        log::debug!("vantage: services destroyed");
    }
}

impl<P: IntersectionPlatform> fmt::Debug for Services<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Services")
            .field("registry", &self.registry)
            .field("scheduler", &self.scheduler)
            .field("scroll", &self.scroll)
            .finish_non_exhaustive()
    }
}
