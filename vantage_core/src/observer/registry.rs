// Copyright 2026 the Vantage Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Pooled intersection observers.

use alloc::boxed::Box;
use alloc::collections::BTreeMap;
use alloc::collections::btree_map::Entry;
use alloc::format;
use alloc::rc::{Rc, Weak};
use alloc::vec::Vec;
use core::cell::{Cell, RefCell};
use core::fmt;

use super::{IntersectionSnapshot, ObserverKey, ObserverOptions};
use crate::backend::{ElementId, IntersectionPlatform, PlatformError};
use crate::error::{CallbackResult, Origin, isolate, report_fault};
use crate::subscription::Subscription;
use crate::trace::{
    DegradedEvent, IntersectionBatchEvent, ObserverCreatedEvent, SubscriberFaultEvent, Tracer,
};

type SharedCallback<E> = Rc<RefCell<dyn FnMut(&IntersectionSnapshot<E>) -> CallbackResult>>;

/// Deduplicates platform observers and fans their batches out to
/// per-element callbacks.
///
/// Calls to [`observe`](Self::observe) with structurally equal
/// [`ObserverOptions`] share one platform observer. Each element has at most
/// one callback per observer; registering the same element again under the
/// same options replaces the callback.
///
/// The registry never holds element handles. Elements are tracked by the
/// [`ElementId`] the platform assigns, and the element handle needed to
/// unobserve lives in the caller's [`Subscription`].
///
/// Pooled observers are retained after their last element is disposed;
/// [`destroy`](Self::destroy) disconnects them all. Clones share the same
/// pools.
pub struct ObserverRegistry<P: IntersectionPlatform> {
    inner: Rc<RegistryInner<P>>,
}

struct RegistryInner<P: IntersectionPlatform> {
    state: RefCell<RegistryState<P>>,
    tracer: Tracer,
}

struct RegistryState<P: IntersectionPlatform> {
    platform: P,
    pools: BTreeMap<ObserverKey, Pool<P>>,
    next_token: u64,
    destroyed: bool,
}

struct Pool<P: IntersectionPlatform> {
    observer: P::Observer,
    watches: BTreeMap<ElementId, Watch<P::Element>>,
}

struct Watch<E> {
    token: u64,
    callback: SharedCallback<E>,
}

impl<P: IntersectionPlatform + 'static> ObserverRegistry<P> {
    /// Creates an empty registry over `platform`.
    #[must_use]
    pub fn new(platform: P, tracer: Tracer) -> Self {
        Self {
            inner: Rc::new(RegistryInner {
                state: RefCell::new(RegistryState {
                    platform,
                    pools: BTreeMap::new(),
                    next_token: 0,
                    destroyed: false,
                }),
                tracer,
            }),
        }
    }

    /// Watches `element` and calls `callback` with every intersection change.
    ///
    /// If the platform cannot create an observer (or the registry has been
    /// destroyed), `callback` runs once, synchronously, with an
    /// [`assumed_visible`](IntersectionSnapshot::assumed_visible) snapshot and
    /// an inert subscription is returned.
    pub fn observe<F>(
        &self,
        element: P::Element,
        options: &ObserverOptions<P::Element>,
        callback: F,
    ) -> Subscription
    where
        F: FnMut(&IntersectionSnapshot<P::Element>) -> CallbackResult + 'static,
    {
        let callback: SharedCallback<P::Element> = Rc::new(RefCell::new(callback));
        match self.register(&element, options, Rc::clone(&callback)) {
            Ok(subscription) => subscription,
            Err(error) => {
                log::info!(
                    "vantage: observation unavailable ({error}); treating element as visible"
                );
                self.inner.tracer.degraded(&DegradedEvent {
                    origin: Origin::Observer,
                    api: "IntersectionObserver",
                });
                let snapshot = IntersectionSnapshot::assumed_visible(element);
                let result = isolate(|| (callback.borrow_mut())(&snapshot));
                if let Err(error) = result {
                    report_fault(Origin::Observer, "fallback", &error);
                }
                Subscription::inert()
            }
        }
    }

    /// Like [`observe`](Self::observe), but disposes itself after the first
    /// snapshot that reports `is_intersecting`.
    ///
    /// Non-intersecting snapshots are not forwarded.
    pub fn observe_once<F>(
        &self,
        element: P::Element,
        options: &ObserverOptions<P::Element>,
        mut callback: F,
    ) -> Subscription
    where
        F: FnMut(&IntersectionSnapshot<P::Element>) -> CallbackResult + 'static,
    {
        let slot: Rc<RefCell<Option<Subscription>>> = Rc::default();
        let fired = Rc::new(Cell::new(false));
        let subscription = self.observe(element, options, {
            let slot = Rc::clone(&slot);
            let fired = Rc::clone(&fired);
            move |snapshot: &IntersectionSnapshot<P::Element>| {
                if fired.get() || !snapshot.is_intersecting {
                    return Ok(());
                }
                fired.set(true);
                let result = callback(snapshot);
                let taken = slot.borrow_mut().take();
                if let Some(subscription) = taken {
                    subscription.dispose();
                }
                result
            }
        });
        if fired.get() {
            subscription.dispose();
            return Subscription::inert();
        }
        *slot.borrow_mut() = Some(subscription);
        Subscription::new(move || {
            let taken = slot.borrow_mut().take();
            if let Some(subscription) = taken {
                subscription.dispose();
            }
        })
    }

    /// Number of pooled platform observers.
    #[must_use]
    pub fn observer_count(&self) -> usize {
        self.inner.state.borrow().pools.len()
    }

    /// Number of elements currently watched across all observers.
    #[must_use]
    pub fn watched_count(&self) -> usize {
        self.inner
            .state
            .borrow()
            .pools
            .values()
            .map(|pool| pool.watches.len())
            .sum()
    }

    /// Disconnects every pooled observer and drops every callback.
    ///
    /// Later calls to [`observe`](Self::observe) take the fallback path.
    /// Outstanding subscriptions become no-ops.
    pub fn destroy(&self) {
        let pools = {
            let mut state = self.inner.state.borrow_mut();
            state.destroyed = true;
            let pools = core::mem::take(&mut state.pools);
            for pool in pools.values() {
                state.platform.disconnect(&pool.observer);
            }
            pools
        };
        // Callbacks may own subscriptions; drop them with the state released.
        drop(pools);
    }

    fn register(
        &self,
        element: &P::Element,
        options: &ObserverOptions<P::Element>,
        callback: SharedCallback<P::Element>,
    ) -> Result<Subscription, PlatformError> {
        let (key, id, token, replaced) = {
            let mut state = self.inner.state.borrow_mut();
            let state = &mut *state;
            if state.destroyed {
                return Err(PlatformError::Unsupported {
                    api: "IntersectionObserver",
                });
            }
            let id = state.platform.identify(element);
            let root = match &options.root {
                Some(root) => Some(state.platform.identify(root)),
                None => None,
            };
            let key = options.key(root);

            let pooled = state.pools.len();
            let pool = match state.pools.entry(key.clone()) {
                Entry::Occupied(entry) => entry.into_mut(),
                Entry::Vacant(entry) => {
                    let on_batch = {
                        let weak = Rc::downgrade(&self.inner);
                        let key = key.clone();
                        Box::new(move |entries: &[IntersectionSnapshot<P::Element>]| {
                            RegistryInner::dispatch(&weak, &key, entries);
                        })
                    };
                    let observer = state.platform.create_observer(options, on_batch)?;
                    log::debug!("vantage: created observer {key}");
                    self.inner.tracer.observer_created(&ObserverCreatedEvent {
                        key: key.as_str(),
                        pooled: pooled + 1,
                    });
                    entry.insert(Pool {
                        observer,
                        watches: BTreeMap::new(),
                    })
                }
            };

            let token = state.next_token;
            state.next_token += 1;
            let replaced = pool.watches.insert(id, Watch { token, callback });
            state.platform.observe(&pool.observer, element);
            (key, id, token, replaced)
        };
        // A replaced callback may own subscriptions; drop it with the state released.
        drop(replaced);

        let weak = Rc::downgrade(&self.inner);
        let element = element.clone();
        Ok(Subscription::new(move || {
            RegistryInner::release(&weak, &key, id, token, &element);
        }))
    }
}

impl<P: IntersectionPlatform + 'static> RegistryInner<P> {
    fn dispatch(
        weak: &Weak<Self>,
        key: &ObserverKey,
        entries: &[IntersectionSnapshot<P::Element>],
    ) {
        let Some(inner) = weak.upgrade() else {
            return;
        };

        // Snapshot the callbacks so disposal from inside a callback cannot
        // disturb the iteration. A repeated target keeps its latest entry.
        let deliveries: Vec<(ElementId, SharedCallback<P::Element>, usize)> = {
            let mut state = inner.state.borrow_mut();
            let state = &mut *state;
            let Some(pool) = state.pools.get(key) else {
                return;
            };
            let mut latest: BTreeMap<ElementId, usize> = BTreeMap::new();
            for (index, entry) in entries.iter().enumerate() {
                latest.insert(state.platform.identify(&entry.target), index);
            }
            latest
                .into_iter()
                .filter_map(|(id, index)| {
                    pool.watches
                        .get(&id)
                        .map(|watch| (id, Rc::clone(&watch.callback), index))
                })
                .collect()
        };

        let mut delivered = 0;
        for (id, callback, index) in &deliveries {
            let Ok(mut callback) = callback.try_borrow_mut() else {
                continue;
            };
            delivered += 1;
            if let Err(error) = isolate(|| callback(&entries[*index])) {
                let subscriber = format!("{id}");
                report_fault(Origin::Observer, &subscriber, &error);
                inner.tracer.subscriber_fault(&SubscriberFaultEvent {
                    origin: Origin::Observer,
                    subscriber: &subscriber,
                    error: &error,
                });
            }
        }
        inner.tracer.intersection_batch(&IntersectionBatchEvent {
            key: key.as_str(),
            entries: entries.len(),
            delivered,
        });
    }

    fn release(
        weak: &Weak<Self>,
        key: &ObserverKey,
        id: ElementId,
        token: u64,
        element: &P::Element,
    ) {
        let Some(inner) = weak.upgrade() else {
            return;
        };
        let removed = {
            let mut state = inner.state.borrow_mut();
            let state = &mut *state;
            let Some(pool) = state.pools.get_mut(key) else {
                return;
            };
            if pool.watches.get(&id).map(|watch| watch.token) != Some(token) {
                return;
            }
            let removed = pool.watches.remove(&id);
            state.platform.unobserve(&pool.observer, element);
            removed
        };
        drop(removed);
    }
}

impl<P: IntersectionPlatform> Clone for ObserverRegistry<P> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<P: IntersectionPlatform> fmt::Debug for ObserverRegistry<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.try_borrow();
        let mut s = f.debug_struct("ObserverRegistry");
        if let Ok(state) = state {
            s.field("observers", &state.pools.len())
                .field("destroyed", &state.destroyed);
        }
        s.finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CallbackError;
    use crate::headless::{HeadlessElement, HeadlessIntersection};
    use alloc::vec;

    fn registry() -> (ObserverRegistry<HeadlessIntersection>, HeadlessIntersection) {
        let platform = HeadlessIntersection::new();
        (ObserverRegistry::new(platform.clone(), Tracer::none()), platform)
    }

    fn counter() -> (
        Rc<Cell<u32>>,
        impl FnMut(&IntersectionSnapshot<HeadlessElement>) -> CallbackResult + 'static,
    ) {
        let count = Rc::new(Cell::new(0));
        let c = Rc::clone(&count);
        (count, move |_: &IntersectionSnapshot<HeadlessElement>| {
            c.set(c.get() + 1);
            Ok(())
        })
    }

    #[test]
    fn equal_options_share_one_observer() {
        let (registry, platform) = registry();
        let a = ObserverOptions::new().root_margin("50px").unwrap();
        let b = ObserverOptions::new()
            .root_margin("50px 50px 50px 50px")
            .unwrap()
            .threshold(0.0)
            .unwrap();
        let (_, cb1) = counter();
        let (_, cb2) = counter();
        let _s1 = registry.observe(HeadlessElement(1), &a, cb1);
        let _s2 = registry.observe(HeadlessElement(2), &b, cb2);
        assert_eq!(platform.created_count(), 1);
        assert_eq!(registry.observer_count(), 1);
        assert_eq!(registry.watched_count(), 2);
    }

    #[test]
    fn different_options_get_separate_observers() {
        let (registry, platform) = registry();
        let (_, cb1) = counter();
        let (_, cb2) = counter();
        let _s1 = registry.observe(HeadlessElement(1), &ObserverOptions::new(), cb1);
        let _s2 = registry.observe(
            HeadlessElement(1),
            &ObserverOptions::new().threshold(0.5).unwrap(),
            cb2,
        );
        assert_eq!(platform.created_count(), 2);
    }

    #[test]
    fn batch_only_reaches_reported_elements() {
        let (registry, platform) = registry();
        let opts = ObserverOptions::new();
        let (hits_a, cb_a) = counter();
        let (hits_b, cb_b) = counter();
        let _a = registry.observe(HeadlessElement(1), &opts, cb_a);
        let _b = registry.observe(HeadlessElement(2), &opts, cb_b);

        platform.set_intersecting(&[HeadlessElement(1)], true);
        assert_eq!(hits_a.get(), 1);
        assert_eq!(hits_b.get(), 0);
    }

    #[test]
    fn repeated_target_in_a_batch_is_delivered_once() {
        let (registry, platform) = registry();
        let seen = Rc::new(RefCell::new(vec![]));
        let _sub = registry.observe(HeadlessElement(7), &ObserverOptions::new(), {
            let seen = Rc::clone(&seen);
            move |snapshot: &IntersectionSnapshot<HeadlessElement>| {
                seen.borrow_mut().push(snapshot.is_intersecting);
                Ok(())
            }
        });
        platform.deliver(&[
            IntersectionSnapshot::assumed_visible(HeadlessElement(7)),
            IntersectionSnapshot {
                is_intersecting: false,
                intersection_ratio: 0.0,
                bounding_client_rect: kurbo::Rect::ZERO,
                target: HeadlessElement(7),
            },
        ]);
        assert_eq!(*seen.borrow(), vec![false]);
    }

    #[test]
    fn disposal_is_idempotent_and_unobserves_once() {
        let (registry, platform) = registry();
        let (hits, cb) = counter();
        let sub = registry.observe(HeadlessElement(3), &ObserverOptions::new(), cb);
        sub.dispose();
        sub.dispose();
        drop(sub);
        assert_eq!(platform.unobserve_count(), 1);
        assert_eq!(registry.watched_count(), 0);
        // The pooled observer survives its last element.
        assert_eq!(registry.observer_count(), 1);

        platform.set_intersecting(&[HeadlessElement(3)], true);
        assert_eq!(hits.get(), 0);
    }

    #[test]
    fn replaced_callback_survives_the_old_handle() {
        let (registry, platform) = registry();
        let opts = ObserverOptions::new();
        let (old_hits, old_cb) = counter();
        let (new_hits, new_cb) = counter();
        let old = registry.observe(HeadlessElement(4), &opts, old_cb);
        let _new = registry.observe(HeadlessElement(4), &opts, new_cb);
        old.dispose();

        platform.set_intersecting(&[HeadlessElement(4)], true);
        assert_eq!(old_hits.get(), 0);
        assert_eq!(new_hits.get(), 1);
    }

    #[test]
    fn faulting_callback_does_not_block_the_batch() {
        let (registry, platform) = registry();
        let opts = ObserverOptions::new();
        let _bad = registry.observe(
            HeadlessElement(1),
            &opts,
            |_: &IntersectionSnapshot<HeadlessElement>| {
                Err(CallbackError::msg("globe shader failed"))
            },
        );
        let (hits, cb) = counter();
        let _good = registry.observe(HeadlessElement(2), &opts, cb);

        platform.set_intersecting(&[HeadlessElement(1), HeadlessElement(2)], true);
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn disposing_from_inside_the_callback_is_safe() {
        let (registry, platform) = registry();
        let opts = ObserverOptions::new();
        let slot: Rc<RefCell<Option<Subscription>>> = Rc::default();
        let hits = Rc::new(Cell::new(0_u32));
        let sub = registry.observe(HeadlessElement(5), &opts, {
            let slot = Rc::clone(&slot);
            let hits = Rc::clone(&hits);
            move |_: &IntersectionSnapshot<HeadlessElement>| {
                hits.set(hits.get() + 1);
                let taken = slot.borrow_mut().take();
                if let Some(sub) = taken {
                    sub.dispose();
                }
                Ok(())
            }
        });
        *slot.borrow_mut() = Some(sub);

        platform.set_intersecting(&[HeadlessElement(5)], true);
        platform.set_intersecting(&[HeadlessElement(5)], false);
        assert_eq!(hits.get(), 1);
        assert_eq!(registry.watched_count(), 0);
    }

    #[test]
    fn observe_once_fires_on_first_entry_only() {
        let (registry, platform) = registry();
        let (hits, cb) = counter();
        let _sub = registry.observe_once(HeadlessElement(8), &ObserverOptions::new(), cb);

        platform.set_intersecting(&[HeadlessElement(8)], false);
        assert_eq!(hits.get(), 0);
        platform.set_intersecting(&[HeadlessElement(8)], true);
        platform.set_intersecting(&[HeadlessElement(8)], true);
        assert_eq!(hits.get(), 1);
        assert_eq!(registry.watched_count(), 0);
    }

    #[test]
    fn unsupported_platform_reports_visible_immediately() {
        let platform = HeadlessIntersection::unsupported();
        let registry = ObserverRegistry::new(platform, Tracer::none());
        let seen = Rc::new(Cell::new(false));
        let sub = registry.observe(HeadlessElement(1), &ObserverOptions::new(), {
            let seen = Rc::clone(&seen);
            move |snapshot: &IntersectionSnapshot<HeadlessElement>| {
                seen.set(snapshot.is_intersecting);
                Ok(())
            }
        });
        assert!(seen.get());
        assert!(!sub.is_active());
        assert_eq!(registry.observer_count(), 0);
    }

    #[test]
    fn destroy_disconnects_and_falls_back() {
        let (registry, platform) = registry();
        let (hits, cb) = counter();
        let sub = registry.observe(HeadlessElement(1), &ObserverOptions::new(), cb);
        registry.destroy();
        assert_eq!(platform.live_observer_count(), 0);
        assert_eq!(registry.observer_count(), 0);
        sub.dispose();

        let (late_hits, late_cb) = counter();
        let _late = registry.observe(HeadlessElement(2), &ObserverOptions::new(), late_cb);
        assert_eq!(late_hits.get(), 1);
        assert_eq!(hits.get(), 0);
    }
}
