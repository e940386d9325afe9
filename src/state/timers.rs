//! Every timer a session owns: the status-driven intervals keyed by
//! [`TimerKind`], plus the one-shot reconnect delay.
//!
//! Starting a kind cancels whatever was running under it first, and
//! [`Timers::stop_all`] is the single teardown path, so no timer can outlive
//! its session or run twice under the same kind.

#[cfg(test)]
#[path = "timers_test.rs"]
mod timers_test;

use std::collections::BTreeMap;
use std::rc::Rc;

use crate::state::machine::TimerKind;
use crate::util::clock::{Clock, TimerHandle};

struct Running {
    period_ms: u32,
    handle: TimerHandle,
}

pub struct Timers {
    clock: Rc<dyn Clock>,
    running: BTreeMap<TimerKind, Running>,
    reconnect: Option<Running>,
}

impl Timers {
    pub fn new(clock: Rc<dyn Clock>) -> Self {
        Self { clock, running: BTreeMap::new(), reconnect: None }
    }

    /// (Re)start `kind` as a repeating timer.
    pub fn start_interval(&mut self, kind: TimerKind, period_ms: u32, tick: Box<dyn FnMut()>) {
        self.stop(kind);
        let handle = self.clock.interval(period_ms, tick);
        self.running.insert(kind, Running { period_ms, handle });
    }

    /// (Re)arm the reconnect delay.
    pub fn start_reconnect(&mut self, delay_ms: u32, fire: Box<dyn FnOnce()>) {
        self.stop_reconnect();
        let handle = self.clock.timeout(delay_ms, fire);
        self.reconnect = Some(Running { period_ms: delay_ms, handle });
    }

    /// Cancel a pending reconnect. Returns whether one was armed.
    pub fn stop_reconnect(&mut self) -> bool {
        match self.reconnect.take() {
            Some(running) => {
                running.handle.cancel();
                true
            }
            None => false,
        }
    }

    /// Delay the pending reconnect was armed with.
    #[must_use]
    pub fn reconnect_delay(&self) -> Option<u32> {
        self.reconnect.as_ref().map(|r| r.period_ms)
    }

    /// Cancel `kind`. Returns whether anything was running.
    pub fn stop(&mut self, kind: TimerKind) -> bool {
        match self.running.remove(&kind) {
            Some(running) => {
                running.handle.cancel();
                true
            }
            None => false,
        }
    }

    /// Cancel every timer.
    pub fn stop_all(&mut self) {
        for (_, running) in std::mem::take(&mut self.running) {
            running.handle.cancel();
        }
        self.stop_reconnect();
    }

    #[must_use]
    pub fn is_running(&self, kind: TimerKind) -> bool {
        self.running.contains_key(&kind)
    }

    /// Period (or delay) `kind` was started with.
    #[must_use]
    pub fn period(&self, kind: TimerKind) -> Option<u32> {
        self.running.get(&kind).map(|r| r.period_ms)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.running.len() + usize::from(self.reconnect.is_some())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
