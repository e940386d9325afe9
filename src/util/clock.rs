//! Timer and task runtime seams.
//!
//! The session never touches `setInterval` or the executor directly: it asks
//! a [`Clock`] for timers and a [`Spawn`] for background requests, so tests
//! can drive time and futures by hand.

#[cfg(test)]
#[path = "clock_test.rs"]
mod clock_test;

use futures::future::LocalBoxFuture;

/// Owned cancellation for one scheduled timer.
///
/// Cancels on [`TimerHandle::cancel`] or when dropped, whichever comes first.
pub struct TimerHandle {
    cancel: Option<Box<dyn FnOnce()>>,
}

impl TimerHandle {
    /// Wrap the runtime-specific cancellation.
    pub fn new(cancel: impl FnOnce() + 'static) -> Self {
        Self { cancel: Some(Box::new(cancel)) }
    }

    /// Stop the timer now.
    pub fn cancel(mut self) {
        self.fire_cancel();
    }

    fn fire_cancel(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for TimerHandle {
    fn drop(&mut self) {
        self.fire_cancel();
    }
}

impl std::fmt::Debug for TimerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimerHandle")
            .field("armed", &self.cancel.is_some())
            .finish()
    }
}

/// Source of repeating and one-shot timers.
pub trait Clock {
    /// Call `tick` every `period_ms` until the handle is cancelled.
    fn interval(&self, period_ms: u32, tick: Box<dyn FnMut()>) -> TimerHandle;
    /// Call `fire` once after `delay_ms` unless the handle is cancelled first.
    fn timeout(&self, delay_ms: u32, fire: Box<dyn FnOnce()>) -> TimerHandle;
}

/// Executor for single-threaded background futures.
pub trait Spawn {
    /// Run `task` to completion in the background.
    fn spawn(&self, task: LocalBoxFuture<'static, ()>);
}

/// Timers backed by `setInterval`/`setTimeout` via `gloo-timers`.
#[cfg(feature = "browser")]
#[derive(Clone, Copy, Debug, Default)]
pub struct BrowserClock;

#[cfg(feature = "browser")]
impl Clock for BrowserClock {
    fn interval(&self, period_ms: u32, mut tick: Box<dyn FnMut()>) -> TimerHandle {
        let interval = gloo_timers::callback::Interval::new(period_ms, move || tick());
        TimerHandle::new(move || drop(interval))
    }

    // A fired timeout is usually cancelled from inside its own callback, so it
    // runs as an abortable task rather than a JS closure that would be freed
    // mid-call.
    fn timeout(&self, delay_ms: u32, fire: Box<dyn FnOnce()>) -> TimerHandle {
        let (delay, abort) = futures::future::abortable(gloo_timers::future::TimeoutFuture::new(delay_ms));
        wasm_bindgen_futures::spawn_local(async move {
            if delay.await.is_ok() {
                fire();
            }
        });
        TimerHandle::new(move || abort.abort())
    }
}

/// Spawns onto the browser microtask queue.
#[cfg(feature = "browser")]
#[derive(Clone, Copy, Debug, Default)]
pub struct BrowserSpawner;

#[cfg(feature = "browser")]
impl Spawn for BrowserSpawner {
    fn spawn(&self, task: LocalBoxFuture<'static, ()>) {
        wasm_bindgen_futures::spawn_local(task);
    }
}
