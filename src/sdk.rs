//! Public entry point: one live queue session per page.
//!
//! `Waitroom` enforces the single-session policy and forwards listener
//! registration. Listeners added while no session is live are held and
//! attached to the next session that starts.

#[cfg(test)]
#[path = "sdk_test.rs"]
mod sdk_test;

use std::rc::Rc;

use crate::config::{ConfigError, QueueConfig};
use crate::state::registry::Listener;
use crate::state::session::{Env, QueueSession};

/// Why `init` refused to start a session.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum InitError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// The host lacks a capability the session needs.
    #[error("unsupported environment: {0}")]
    Unsupported(String),
    #[error("a queue session is already active")]
    AlreadyActive,
}

/// Caller-side handle to a started session.
#[derive(Clone)]
pub struct QueueHandle {
    session: Rc<QueueSession>,
}

impl QueueHandle {
    /// Tear the session down. Safe to call repeatedly.
    pub fn disconnect(&self) {
        self.session.disconnect();
    }

    #[must_use]
    pub fn session(&self) -> &Rc<QueueSession> {
        &self.session
    }
}

#[derive(Default)]
pub struct Waitroom {
    active: Option<Rc<QueueSession>>,
    pending: Vec<Listener>,
}

impl Waitroom {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a session unless one is already live.
    ///
    /// # Errors
    ///
    /// [`InitError::AlreadyActive`] while a previous session has not been
    /// disconnected, or [`InitError::Config`] when validation fails.
    pub fn init(&mut self, config: QueueConfig, env: Env) -> Result<QueueHandle, InitError> {
        if self.live().is_some() {
            log::warn!("waitroom: init ignored, a session is already active");
            return Err(InitError::AlreadyActive);
        }
        let session = QueueSession::start(config, env)?;
        for listener in self.pending.drain(..) {
            session.add_listener(listener);
        }
        self.active = Some(Rc::clone(&session));
        log::info!("waitroom: session started");
        Ok(QueueHandle { session })
    }

    /// The live session, if any.
    #[must_use]
    pub fn live(&self) -> Option<&Rc<QueueSession>> {
        self.active.as_ref().filter(|s| !s.is_closed())
    }

    pub fn add_listener(&mut self, listener: Listener) {
        if let Some(session) = self.live() {
            session.add_listener(listener);
        } else {
            self.pending.push(listener);
        }
    }

    /// Whether `listener` will still be called: held for the next session
    /// or registered with the live one. A session's registrations end with it.
    #[must_use]
    pub fn holds(&self, listener: &Listener) -> bool {
        self.pending.iter().any(|l| Rc::ptr_eq(l, listener)) || self.live().is_some_and(|s| s.has_listener(listener))
    }

    /// Remove every registration of `listener`. Returns how many were removed.
    pub fn remove_listener(&mut self, listener: &Listener) -> usize {
        let before = self.pending.len();
        self.pending.retain(|l| !Rc::ptr_eq(l, listener));
        let removed = before - self.pending.len();
        match self.live() {
            Some(session) => removed + session.remove_listener(listener),
            None => removed,
        }
    }
}
