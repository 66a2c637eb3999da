// Copyright 2026 the Vantage Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use alloc::boxed::Box;
use alloc::rc::{Rc, Weak};
use core::cell::{Cell, RefCell};
use core::fmt;

use super::machine::{GateConfig, GateStep, LazyMountState, MountGate};
use crate::backend::{IntersectionPlatform, TimerId, Timers};
use crate::error::{CallbackResult, Origin, isolate, report_fault};
use crate::observer::{IntersectionSnapshot, ObserverOptions, ObserverRegistry};
use crate::strategy::LoadingStrategy;
use crate::subscription::Subscription;
use crate::trace::{MountTransitionEvent, SubscriberFaultEvent, Tracer};

/// Everything [`LazySlot::attach`] needs to know about one slot.
#[derive(Clone, Debug)]
pub struct SlotRequest<E> {
    /// Logical component name, used in logs and traces.
    pub component: Rc<str>,
    /// Element whose visibility gates the mount.
    pub element: E,
    /// Resolved strategy; its margin is the entry margin.
    pub strategy: LoadingStrategy,
    /// Gate timing and recycling policy.
    pub config: GateConfig,
    /// Device policy: whether unmount-on-exit may be honoured at all.
    pub allow_unmount: bool,
}

type ChangeCallback = Box<dyn FnMut(&LazyMountState) -> CallbackResult>;

/// A [`MountGate`] wired to the observer registry and timers.
///
/// The slot observes its element with the strategy's margin and, when the
/// gate recycles, a second time with the margin scaled by
/// [`GateConfig::exit_margin_factor`]. When both margins are the same the
/// second observation would share the first one's observer, so a single
/// observation reports both entry and exit. Every state change is reported
/// to the callback given to [`attach`](Self::attach).
///
/// One-shot slots dispose their observation as soon as they mount. Dropping
/// the slot, or calling [`detach`](Self::detach), cancels everything.
pub struct LazySlot {
    inner: Rc<SlotInner>,
}

struct SlotInner {
    component: Rc<str>,
    timers: Rc<dyn Timers>,
    tracer: Tracer,
    gate: RefCell<MountGate>,
    on_change: RefCell<ChangeCallback>,
    entry: RefCell<Option<Subscription>>,
    exit: RefCell<Option<Subscription>>,
    reveal: Cell<Option<TimerId>>,
    settle: Cell<Option<TimerId>>,
    detached: Cell<bool>,
}

impl LazySlot {
    /// Starts gating `request.element`.
    ///
    /// Eager strategies mount synchronously, before this returns, without
    /// observing. So does every slot when the platform cannot observe.
    pub fn attach<P, F>(
        registry: &ObserverRegistry<P>,
        timers: Rc<dyn Timers>,
        tracer: Tracer,
        request: SlotRequest<P::Element>,
        on_change: F,
    ) -> Self
    where
        P: IntersectionPlatform + 'static,
        F: FnMut(&LazyMountState) -> CallbackResult + 'static,
    {
        let SlotRequest {
            component,
            element,
            strategy,
            config,
            allow_unmount,
        } = request;

        if config.unmount_on_exit && !allow_unmount {
            log::debug!("vantage: `{component}` keeps content mounted on this device");
        }

        let slot = Self {
            inner: Rc::new(SlotInner {
                component,
                timers,
                tracer,
                gate: RefCell::new(MountGate::new(config, allow_unmount)),
                on_change: RefCell::new(Box::new(on_change)),
                entry: RefCell::new(None),
                exit: RefCell::new(None),
                reveal: Cell::new(None),
                settle: Cell::new(None),
                detached: Cell::new(false),
            }),
        };

        if !strategy.lazy {
            let now = slot.inner.timers.now();
            let step = slot.inner.gate.borrow_mut().mount_now(now);
            slot.inner.apply(step);
            return slot;
        }

        let recycles = slot.inner.gate.borrow().recycles();
        let entry_options = ObserverOptions::new().with_root_margin(strategy.root_margin);
        let exit_options = ObserverOptions::new()
            .with_root_margin(strategy.root_margin.scale(config.effective_exit_factor()));
        // Equal keys pool into one observer, which holds one callback per element.
        let shared = recycles && entry_options.key(None) == exit_options.key(None);

        let weak = Rc::downgrade(&slot.inner);
        let entry = registry.observe(
            element.clone(),
            &entry_options,
            move |snapshot: &IntersectionSnapshot<P::Element>| {
                let Some(inner) = weak.upgrade() else {
                    return Ok(());
                };
                if snapshot.is_intersecting {
                    inner.on_enter();
                } else if shared {
                    inner.on_exit();
                }
                Ok(())
            },
        );
        slot.inner.keep(&slot.inner.entry, entry, MountGate::observes_entry);

        if recycles && !shared {
            let weak = Rc::downgrade(&slot.inner);
            let exit = registry.observe(
                element,
                &exit_options,
                move |snapshot: &IntersectionSnapshot<P::Element>| {
                    let Some(inner) = weak.upgrade() else {
                        return Ok(());
                    };
                    if snapshot.is_intersecting {
                        inner.on_within_exit();
                    } else {
                        inner.on_exit();
                    }
                    Ok(())
                },
            );
            slot.inner.keep(&slot.inner.exit, exit, MountGate::observes_exit);
        }

        slot
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> LazyMountState {
        self.inner.gate.borrow().state()
    }

    /// Whether real content should be rendered right now.
    #[must_use]
    pub fn is_mounted(&self) -> bool {
        self.state().is_mounted()
    }

    /// Whether the slot still holds an entry observation.
    #[must_use]
    pub fn is_observing(&self) -> bool {
        self.inner
            .entry
            .borrow()
            .as_ref()
            .is_some_and(Subscription::is_active)
    }

    /// The component this slot renders.
    #[must_use]
    pub fn component(&self) -> &str {
        &self.inner.component
    }

    /// Stops observing and cancels a pending reveal. The state is frozen.
    pub fn detach(&self) {
        self.inner.detach();
    }
}

impl Drop for LazySlot {
    fn drop(&mut self) {
        self.inner.detach();
    }
}

impl fmt::Debug for LazySlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazySlot")
            .field("component", &self.inner.component)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl SlotInner {
    /// Stores `subscription` in `cell` if the gate still wants it.
    ///
    /// The unsupported-platform fallback can mount during `observe`, before
    /// there is a subscription to store.
    fn keep(
        &self,
        cell: &RefCell<Option<Subscription>>,
        subscription: Subscription,
        wanted: fn(&MountGate) -> bool,
    ) {
        let keep = !self.detached.get() && wanted(&self.gate.borrow());
        if keep {
            let previous = cell.borrow_mut().replace(subscription);
            drop(previous);
        } else {
            subscription.dispose();
        }
    }

    fn on_enter(self: &Rc<Self>) {
        if self.detached.get() {
            return;
        }
        let now = self.timers.now();
        let step = self.gate.borrow_mut().enter(now);
        self.apply(step);
    }

    fn on_exit(self: &Rc<Self>) {
        if self.detached.get() {
            return;
        }
        let now = self.timers.now();
        let step = self.gate.borrow_mut().exit(now);
        self.apply(step);
    }

    fn on_within_exit(&self) {
        if self.detached.get() {
            return;
        }
        self.gate.borrow_mut().within_exit();
        if let Some(id) = self.settle.take() {
            self.timers.clear_timeout(id);
        }
    }

    fn on_settle(self: &Rc<Self>) {
        self.settle.set(None);
        if self.detached.get() {
            return;
        }
        let now = self.timers.now();
        let step = self.gate.borrow_mut().settle(now);
        self.apply(step);
    }

    fn on_reveal(self: &Rc<Self>) {
        self.reveal.set(None);
        if self.detached.get() {
            return;
        }
        let now = self.timers.now();
        let step = self.gate.borrow_mut().reveal(now);
        self.apply(step);
    }

    fn apply(self: &Rc<Self>, step: GateStep) {
        if let Some(delay) = step.reveal_after {
            let weak: Weak<Self> = Rc::downgrade(self);
            let id = self.timers.set_timeout(
                delay,
                Box::new(move || {
                    if let Some(inner) = weak.upgrade() {
                        inner.on_reveal();
                    }
                }),
            );
            self.reveal.set(Some(id));
        }

        if let Some(delay) = step.settle_after {
            if let Some(stale) = self.settle.take() {
                self.timers.clear_timeout(stale);
            }
            let weak: Weak<Self> = Rc::downgrade(self);
            let id = self.timers.set_timeout(
                delay,
                Box::new(move || {
                    if let Some(inner) = weak.upgrade() {
                        inner.on_settle();
                    }
                }),
            );
            self.settle.set(Some(id));
        }

        for transition in &step.transitions {
            log::debug!(
                "vantage: `{}` {} -> {}",
                self.component,
                transition.from.as_str(),
                transition.state.phase.as_str()
            );
            self.tracer.mount_transition(&MountTransitionEvent {
                component: &self.component,
                from: transition.from,
                to: transition.state.phase,
                at: transition.at,
            });
            let result = match self.on_change.try_borrow_mut() {
                Ok(mut on_change) => isolate(|| on_change(&transition.state)),
                Err(_) => Ok(()),
            };
            if let Err(error) = result {
                report_fault(Origin::Mount, &self.component, &error);
                self.tracer.subscriber_fault(&SubscriberFaultEvent {
                    origin: Origin::Mount,
                    subscriber: &self.component,
                    error: &error,
                });
            }
        }

        if !self.gate.borrow().observes_entry() {
            let entry = self.entry.borrow_mut().take();
            if let Some(entry) = entry {
                entry.dispose();
            }
        }
    }

    fn detach(&self) {
        self.detached.set(true);
        for timer in [self.reveal.take(), self.settle.take()].into_iter().flatten() {
            self.timers.clear_timeout(timer);
        }
        let entry = self.entry.borrow_mut().take();
        let exit = self.exit.borrow_mut().take();
        drop(entry);
        drop(exit);
    }
}
