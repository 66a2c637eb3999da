// Copyright 2026 the Vantage Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Manual clock and timeouts.

use alloc::boxed::Box;
use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cell::RefCell;
use core::fmt;

use crate::backend::{TimerId, Timers};
use crate::time::{Duration, HostTime};

type Pending = (TimerId, HostTime, Box<dyn FnOnce()>);

/// [`Timers`] with a clock that only moves on [`advance`](Self::advance).
#[derive(Clone, Default)]
pub struct HeadlessTimers {
    inner: Rc<RefCell<TimersState>>,
}

#[derive(Default)]
struct TimersState {
    now: HostTime,
    next_id: u64,
    pending: Vec<Pending>,
}

impl HeadlessTimers {
    /// Creates a clock at time zero with nothing scheduled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Timeouts that have not fired or been cleared.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.inner.borrow().pending.len()
    }

    /// Moves the clock forward by `by`, firing due timeouts in deadline
    /// order. Each callback observes the clock at its own deadline.
    pub fn advance(&self, by: Duration) {
        let target = self.inner.borrow().now + by;
        loop {
            let next = {
                let mut state = self.inner.borrow_mut();
                let due = state
                    .pending
                    .iter()
                    .enumerate()
                    .filter(|(_, (_, at, _))| *at <= target)
                    .min_by_key(|(_, (id, at, _))| (*at, *id))
                    .map(|(index, _)| index);
                due.map(|index| {
                    let entry = state.pending.remove(index);
                    state.now = state.now.max(entry.1);
                    entry
                })
            };
            match next {
                Some((_, _, callback)) => callback(),
                None => break,
            }
        }
        let mut state = self.inner.borrow_mut();
        state.now = state.now.max(target);
    }
}

impl fmt::Debug for HeadlessTimers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.borrow();
        f.debug_struct("HeadlessTimers")
            .field("now", &state.now)
            .field("pending", &state.pending.len())
            .finish()
    }
}

impl Timers for HeadlessTimers {
    fn now(&self) -> HostTime {
        self.inner.borrow().now
    }

    fn set_timeout(&self, delay: Duration, callback: Box<dyn FnOnce()>) -> TimerId {
        let mut state = self.inner.borrow_mut();
        let id = TimerId(state.next_id);
        state.next_id += 1;
        let at = state.now + delay;
        state.pending.push((id, at, callback));
        id
    }

    fn clear_timeout(&self, id: TimerId) {
        let removed = {
            let mut state = self.inner.borrow_mut();
            let index = state.pending.iter().position(|(pending, _, _)| *pending == id);
            index.map(|index| state.pending.remove(index))
        };
        drop(removed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    #[test]
    fn timeouts_fire_in_deadline_order() {
        let timers = HeadlessTimers::new();
        let log = Rc::new(RefCell::new(vec![]));
        for (tag, ms) in [("late", 300), ("early", 100)] {
            let log = Rc::clone(&log);
            let clock = timers.clone();
            timers.set_timeout(
                Duration::from_millis(ms),
                Box::new(move || log.borrow_mut().push((tag, clock.now()))),
            );
        }
        timers.advance(Duration::from_millis(200));
        assert_eq!(*log.borrow(), vec![("early", HostTime(100_000))]);
        timers.advance(Duration::from_millis(200));
        assert_eq!(log.borrow().len(), 2);
        assert_eq!(timers.now(), HostTime(400_000));
    }

    #[test]
    fn cleared_timeouts_never_fire() {
        let timers = HeadlessTimers::new();
        let fired = Rc::new(core::cell::Cell::new(false));
        let f = Rc::clone(&fired);
        let id = timers.set_timeout(Duration::from_millis(10), Box::new(move || f.set(true)));
        timers.clear_timeout(id);
        timers.advance(Duration::from_millis(50));
        assert!(!fired.get());
        assert_eq!(timers.pending_count(), 0);
    }
}
