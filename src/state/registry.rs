//! Status listeners and custom channel-event handlers.
//!
//! Listeners are kept in registration order and matched by `Rc` identity, so
//! the same callback may be registered twice and removing it drops every
//! registration of that reference. A failing callback is logged and never
//! stops the ones after it.

#[cfg(test)]
#[path = "registry_test.rs"]
mod registry_test;

use std::collections::BTreeMap;
use std::rc::Rc;

use serde_json::Value;

use crate::net::types::QueueStatus;
use crate::state::session::Utilities;

/// Outcome of one callback invocation.
pub type CallbackResult = Result<(), String>;

/// Receives every applied status.
pub type Listener = Rc<dyn Fn(&QueueStatus) -> CallbackResult>;

/// Receives one named channel event plus the popup/navigation utilities.
pub type EventHandler = Rc<dyn Fn(&Value, &Utilities) -> CallbackResult>;

/// Observer lists for one session.
#[derive(Default)]
pub struct EventRegistry {
    listeners: Vec<Listener>,
    handlers: BTreeMap<String, EventHandler>,
}

impl EventRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `listener`; duplicates are kept.
    pub fn add_listener(&mut self, listener: Listener) {
        self.listeners.push(listener);
    }

    /// Remove every registration of exactly this `listener`. Returns how many were removed.
    pub fn remove_listener(&mut self, listener: &Listener) -> usize {
        let before = self.listeners.len();
        self.listeners.retain(|l| !Rc::ptr_eq(l, listener));
        before - self.listeners.len()
    }

    /// Whether exactly this `listener` is registered.
    #[must_use]
    pub fn contains(&self, listener: &Listener) -> bool {
        self.listeners.iter().any(|l| Rc::ptr_eq(l, listener))
    }

    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Clone of the current listener list, so callbacks may (un)register
    /// while a notification is running.
    #[must_use]
    pub fn listeners(&self) -> Vec<Listener> {
        self.listeners.clone()
    }

    /// Bind `handler` to channel event `event`, replacing any previous binding.
    pub fn set_handler(&mut self, event: impl Into<String>, handler: EventHandler) {
        self.handlers.insert(event.into(), handler);
    }

    #[must_use]
    pub fn handler(&self, event: &str) -> Option<EventHandler> {
        self.handlers.get(event).cloned()
    }

    /// Drop all listeners and handlers.
    pub fn clear(&mut self) {
        self.listeners.clear();
        self.handlers.clear();
    }
}

/// Invoke each listener in order with `status`. Returns the number that failed.
pub fn notify_all(listeners: &[Listener], status: &QueueStatus) -> usize {
    let mut failed = 0;
    for listener in listeners {
        if let Err(err) = listener(status) {
            failed += 1;
            log::warn!("waitroom: status listener failed: {err}");
        }
    }
    failed
}
