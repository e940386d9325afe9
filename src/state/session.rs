//! Connection lifecycle for one queue session.
//!
//! SYSTEM CONTEXT
//! ==============
//! `QueueSession` owns everything a live session touches: the status machine,
//! its timers, the realtime channel, the overlay, the navigation guard, and
//! the observer registry. All inbound statuses (join response, poll
//! responses, channel pushes) go through [`QueueSession::apply`], which asks
//! the machine for a plan and then executes its effects in order.
//!
//! DESIGN
//! ======
//! Single-threaded and re-entrant: listeners, custom handlers and host
//! callbacks may call back into the session (most commonly `disconnect`).
//! No `RefCell` borrow is held across such a call, and effect execution
//! stops as soon as the session is closed.
//!
//! Every background task and timer captures a `Weak` reference, so a
//! dropped session never gets resurrected by a late response.
//!
//! Page exit tears down like `disconnect` but keeps the stored identity, so
//! the reload that follows can rejoin under it. Terminal statuses drop the
//! identity either way.
//!
//! Reconnect: a channel the session did not close itself is reopened with
//! exponential backoff. Each opened channel gets a generation number; signals
//! from an older generation are ignored, which is how voluntary closes are
//! told apart from drops.

#[cfg(test)]
#[path = "session_test.rs"]
mod session_test;

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::{Rc, Weak};

use futures::FutureExt;
use serde_json::{Value, json};

use crate::config::{ConfigError, QueueConfig};
use crate::net::api::{ApiError, Backend};
use crate::net::channel::{Channel, ChannelSignal, SignalHandler, Transport};
use crate::net::types::{HEARTBEAT_EVENT, JoinRequest, LeaveNotice, QueueStatus, STATUS_EVENT};
use crate::state::machine::{ApplyOutcome, Effect, Notice, QueueStatusMachine, TimerKind};
use crate::state::registry::{EventRegistry, Listener, notify_all};
use crate::state::timers::Timers;
use crate::util::clock::{Clock, Spawn};
use crate::util::guard::{NavigationGuard, Page, UnloadPrompt};
use crate::util::interval::{MAX_RECONNECT_ATTEMPTS, reconnect_delay};
use crate::util::overlay::{BlockingUi, Surface};
use crate::util::storage::Storage;

/// Host collaborators a session runs against.
#[derive(Clone)]
pub struct Env {
    pub storage: Rc<dyn Storage>,
    pub backend: Rc<dyn Backend>,
    pub transport: Rc<dyn Transport>,
    pub surface: Rc<dyn Surface>,
    pub page: Rc<dyn Page>,
    pub clock: Rc<dyn Clock>,
    pub spawner: Rc<dyn Spawn>,
}

/// Coarse lifecycle position.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    /// `join` is in flight.
    Joining,
    /// Join settled; statuses are being applied.
    Running,
    /// Torn down by `disconnect`.
    Closed,
}

/// What triggered a teardown.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Teardown {
    /// `disconnect()` from the caller, or a fatal channel error.
    Caller,
    /// The page is being left or reloaded.
    PageExit,
}

/// Popup and navigation controls handed to custom event handlers.
#[derive(Clone)]
pub struct Utilities {
    ui: Rc<RefCell<BlockingUi>>,
    guard: Rc<RefCell<NavigationGuard>>,
}

impl Utilities {
    /// Replace the overlay with `html`.
    pub fn create_popup(&self, html: &str) {
        self.ui.borrow_mut().render(html, None);
    }

    pub fn remove_popup(&self) {
        self.ui.borrow_mut().clear();
    }

    pub fn prevent_navigation(&self) {
        self.guard.borrow_mut().engage();
    }

    pub fn allow_navigation(&self) {
        self.guard.borrow_mut().release();
    }
}

struct SessionState {
    phase: Phase,
    machine: QueueStatusMachine,
    timers: Timers,
    channel: Option<Box<dyn Channel>>,
    channel_generation: u64,
    reconnect_attempts: u32,
    issued_seq: u64,
}

impl SessionState {
    fn next_seq(&mut self) -> u64 {
        self.issued_seq += 1;
        self.issued_seq
    }

    fn uuid(&self) -> Option<String> {
        self.machine.current().map(|s| s.uuid.clone())
    }
}

pub struct QueueSession {
    config: QueueConfig,
    env: Env,
    state: RefCell<SessionState>,
    ui: Rc<RefCell<BlockingUi>>,
    guard: Rc<RefCell<NavigationGuard>>,
    registry: RefCell<EventRegistry>,
    me: Weak<QueueSession>,
}

impl QueueSession {
    /// Validate `config`, install the exit handler and send `join`.
    ///
    /// Nothing is touched when validation fails. A failed `join` is logged
    /// and leaves the session inert until `disconnect`.
    ///
    /// # Errors
    ///
    /// Returns the [`ConfigError`] from [`QueueConfig::validate`].
    pub fn start(config: QueueConfig, env: Env) -> Result<Rc<Self>, ConfigError> {
        config.validate()?;

        let session = Rc::new_cyclic(|me: &Weak<Self>| {
            let ui = BlockingUi::new(
                Rc::clone(&env.surface),
                config.content.clone(),
                config.style.clone(),
                config.locale,
            );
            let guard = NavigationGuard::new(Rc::clone(&env.page), leave_prompt(me.clone()));
            let mut registry = EventRegistry::new();
            for (event, handler) in &config.handlers {
                registry.set_handler(event.clone(), Rc::clone(handler));
            }
            Self {
                state: RefCell::new(SessionState {
                    phase: Phase::Joining,
                    machine: QueueStatusMachine::new(config.cadence()),
                    timers: Timers::new(Rc::clone(&env.clock)),
                    channel: None,
                    channel_generation: 0,
                    reconnect_attempts: 0,
                    issued_seq: 0,
                }),
                ui: Rc::new(RefCell::new(ui)),
                guard: Rc::new(RefCell::new(guard)),
                registry: RefCell::new(registry),
                me: me.clone(),
                config,
                env,
            }
        });

        let me = Weak::clone(&session.me);
        session.env.page.set_exit_handler(Some(Rc::new(move || {
            if let Some(session) = me.upgrade() {
                session.teardown(Teardown::PageExit);
            }
        })));
        session.send_join();
        Ok(session)
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        self.state.borrow().phase
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.phase() == Phase::Closed
    }

    /// The status most recently applied.
    #[must_use]
    pub fn current_status(&self) -> Option<QueueStatus> {
        self.state.borrow().machine.current().cloned()
    }

    /// Whether a realtime channel is currently held.
    #[must_use]
    pub fn has_channel(&self) -> bool {
        self.state.borrow().channel.is_some()
    }

    /// Popup/navigation controls bound to this session.
    #[must_use]
    pub fn utilities(&self) -> Utilities {
        Utilities { ui: Rc::clone(&self.ui), guard: Rc::clone(&self.guard) }
    }

    pub fn add_listener(&self, listener: Listener) {
        self.registry.borrow_mut().add_listener(listener);
    }

    #[must_use]
    pub fn has_listener(&self, listener: &Listener) -> bool {
        self.registry.borrow().contains(listener)
    }

    /// Returns how many registrations were removed.
    pub fn remove_listener(&self, listener: &Listener) -> usize {
        self.registry.borrow_mut().remove_listener(listener)
    }

    /// Apply a status received outside the session's own requests.
    pub fn apply(&self, value: &Value) -> ApplyOutcome {
        let seq = self.state.borrow_mut().next_seq();
        self.apply_sequenced(seq, value)
    }

    /// Tear everything down. Safe to call any number of times.
    pub fn disconnect(&self) {
        self.teardown(Teardown::Caller);
    }

    fn teardown(&self, trigger: Teardown) {
        let was_open = !self.is_closed();
        self.send_leave();

        let channel = {
            let mut state = self.state.borrow_mut();
            state.channel_generation += 1;
            state.channel.take()
        };
        if let Some(channel) = channel {
            channel.close();
        }
        self.state.borrow_mut().timers.stop_all();

        self.ui.borrow_mut().clear();
        self.guard.borrow_mut().release();
        let keep_identity = trigger == Teardown::PageExit && !self.state.borrow().machine.is_terminal();
        if let Some(key) = &self.config.storage_key
            && !keep_identity
        {
            self.env.storage.remove(key);
        }

        {
            let mut state = self.state.borrow_mut();
            state.machine.reset();
            state.reconnect_attempts = 0;
            state.phase = Phase::Closed;
        }
        self.registry.borrow_mut().clear();
        self.env.page.set_exit_handler(None);
        if was_open {
            log::info!("waitroom: disconnected ({trigger:?})");
        }
    }

    /// Best-effort leave notification for the assigned identity.
    ///
    /// Returns whether the notice was handed to the host. Nothing is sent
    /// without a leave URL, before an identity is assigned, or once the
    /// backend has ended the session with EMPTY or EXPIRED.
    pub fn send_leave(&self) -> bool {
        let Some(url) = &self.config.leave_url else {
            return false;
        };
        let uuid = {
            let state = self.state.borrow();
            if state.machine.is_terminal() {
                return false;
            }
            state.uuid()
        };
        let Some(uuid) = uuid else {
            return false;
        };
        let notice = LeaveNotice { uuid, params: self.config.params.clone() };
        let queued = self.env.backend.leave(url, &notice);
        if !queued {
            log::debug!("waitroom: leave notice was not queued");
        }
        queued
    }

    fn send_join(&self) {
        let request = JoinRequest {
            uuid: self
                .config
                .storage_key
                .as_deref()
                .and_then(|key| self.env.storage.get(key))
                .filter(|uuid| !uuid.is_empty()),
            params: self.config.params.clone(),
        };
        if let Some(uuid) = &request.uuid {
            log::info!("waitroom: rejoining as {uuid}");
        }
        let seq = self.state.borrow_mut().next_seq();
        let response = self.env.backend.join(&request);
        let me = Weak::clone(&self.me);
        self.env.spawner.spawn(
            async move {
                let result = response.await;
                if let Some(session) = me.upgrade() {
                    session.on_joined(seq, result);
                }
            }
            .boxed_local(),
        );
    }

    fn on_joined(&self, seq: u64, result: Result<Value, ApiError>) {
        {
            let mut state = self.state.borrow_mut();
            if state.phase == Phase::Closed {
                log::debug!("waitroom: join settled after disconnect; ignored");
                return;
            }
            state.phase = Phase::Running;
        }
        match result {
            Ok(value) => {
                self.apply_sequenced(seq, &value);
            }
            Err(err) => log::warn!("waitroom: join failed, queue inactive: {err}"),
        }
    }

    fn apply_sequenced(&self, seq: u64, value: &Value) -> ApplyOutcome {
        let plan = {
            let mut state = self.state.borrow_mut();
            if state.phase == Phase::Closed {
                log::debug!("waitroom: status after disconnect ignored");
                return ApplyOutcome::Closed;
            }
            state.machine.apply(seq, value)
        };

        match &plan.outcome {
            ApplyOutcome::Applied(state) => log::debug!("waitroom: status applied: {}", state.as_wire()),
            ApplyOutcome::Rejected(err) => log::warn!("waitroom: invalid status received: {err}"),
            ApplyOutcome::Stale => log::debug!("waitroom: stale status dropped"),
            ApplyOutcome::Terminal => log::debug!("waitroom: status after terminal state ignored"),
            ApplyOutcome::Unchanged | ApplyOutcome::Closed => {}
        }

        for effect in plan.effects {
            if self.is_closed() {
                break;
            }
            self.run(effect);
        }
        plan.outcome
    }

    fn run(&self, effect: Effect) {
        match effect {
            Effect::PersistIdentity(uuid) => {
                if let Some(key) = &self.config.storage_key {
                    self.env.storage.set(key, &uuid);
                }
            }
            Effect::Notify(status) => {
                let listeners = self.registry.borrow().listeners();
                notify_all(&listeners, &status);
            }
            Effect::StopTimer(kind) => {
                self.state.borrow_mut().timers.stop(kind);
            }
            Effect::StartTimer(kind, period_ms) => self.start_timer(kind, period_ms),
            Effect::ClearOverlay => self.ui.borrow_mut().clear(),
            Effect::RenderOverlay(position) => self.ui.borrow_mut().render_position(position),
            Effect::EngageGuard => self.guard.borrow_mut().engage(),
            Effect::ReleaseGuard => self.guard.borrow_mut().release(),
            Effect::OpenChannel => self.open_channel(),
            Effect::CloseChannel => self.close_channel(),
            Effect::ShowNotice(notice) => {
                let messages = self.config.locale.messages();
                let text = match notice {
                    Notice::Empty => messages.empty_notice,
                    Notice::Expired => messages.expired_notice,
                };
                self.env.page.alert(text);
            }
            Effect::Reload => self.env.page.reload(),
        }
    }

    fn start_timer(&self, kind: TimerKind, period_ms: u32) {
        let me = Weak::clone(&self.me);
        let tick: Box<dyn FnMut()> = match kind {
            TimerKind::Reannounce => Box::new(move || {
                if let Some(session) = me.upgrade() {
                    session.reannounce();
                }
            }),
            TimerKind::Heartbeat => Box::new(move || {
                if let Some(session) = me.upgrade() {
                    session.heartbeat();
                }
            }),
        };
        self.state.borrow_mut().timers.start_interval(kind, period_ms, tick);
    }

    /// WAITING tick: ask the backend for a fresh status.
    fn reannounce(&self) {
        let (uuid, seq) = {
            let mut state = self.state.borrow_mut();
            if state.phase == Phase::Closed {
                return;
            }
            let Some(uuid) = state.uuid() else {
                return;
            };
            (uuid, state.next_seq())
        };
        let response = self.env.backend.status(&uuid, &self.config.params);
        let me = Weak::clone(&self.me);
        self.env.spawner.spawn(
            async move {
                let result = response.await;
                let Some(session) = me.upgrade() else {
                    return;
                };
                match result {
                    Ok(value) => {
                        session.apply_sequenced(seq, &value);
                    }
                    Err(err) => log::warn!("waitroom: status check failed, retrying next tick: {err}"),
                }
            }
            .boxed_local(),
        );
    }

    /// ACTIVE tick: tell the backend the tab is still here.
    fn heartbeat(&self) {
        let state = self.state.borrow();
        let Some(uuid) = state.uuid() else {
            return;
        };
        match &state.channel {
            Some(channel) => {
                if !channel.send(HEARTBEAT_EVENT, &json!({ "uuid": uuid })) {
                    log::warn!("waitroom: heartbeat not sent, channel unavailable");
                }
            }
            None => log::debug!("waitroom: heartbeat skipped while channel reconnects"),
        }
    }

    fn open_channel(&self) {
        let (generation, uuid) = {
            let mut state = self.state.borrow_mut();
            if state.channel.is_some() || state.phase == Phase::Closed {
                return;
            }
            state.channel_generation += 1;
            (state.channel_generation, state.uuid())
        };

        let mut params: BTreeMap<String, String> = self.config.params.clone();
        if let Some(uuid) = uuid {
            params.insert("uuid".to_owned(), uuid);
        }
        let me = Weak::clone(&self.me);
        let on_signal: SignalHandler = Rc::new(move |signal| {
            if let Some(session) = me.upgrade() {
                session.on_signal(generation, signal);
            }
        });

        let url = self.config.channel_target();
        match self.env.transport.connect(&url, &params, on_signal) {
            Ok(channel) => {
                let mut state = self.state.borrow_mut();
                if state.channel_generation == generation && state.phase != Phase::Closed {
                    state.channel = Some(channel);
                    log::info!("waitroom: channel connecting to {url}");
                } else {
                    drop(state);
                    channel.close();
                }
            }
            Err(err) => {
                log::warn!("waitroom: {err}");
                self.schedule_reconnect();
            }
        }
    }

    fn close_channel(&self) {
        let channel = {
            let mut state = self.state.borrow_mut();
            state.channel_generation += 1;
            state.reconnect_attempts = 0;
            state.timers.stop_reconnect();
            state.channel.take()
        };
        if let Some(channel) = channel {
            channel.close();
            log::info!("waitroom: channel closed");
        }
    }

    fn on_signal(&self, generation: u64, signal: ChannelSignal) {
        {
            let state = self.state.borrow();
            if state.phase == Phase::Closed || state.channel_generation != generation {
                log::debug!("waitroom: signal from a retired channel ignored");
                return;
            }
        }

        match signal {
            ChannelSignal::Open => {
                self.state.borrow_mut().reconnect_attempts = 0;
                log::info!("waitroom: channel open");
            }
            ChannelSignal::Message { event, data } => {
                if event == STATUS_EVENT {
                    let seq = self.state.borrow_mut().next_seq();
                    self.apply_sequenced(seq, &data);
                } else {
                    self.dispatch(&event, &data);
                }
            }
            ChannelSignal::Error(message) => log::warn!("waitroom: channel error: {message}"),
            ChannelSignal::Closed { reason } => {
                let (channel, wanted) = {
                    let mut state = self.state.borrow_mut();
                    (state.channel.take(), state.machine.channel_wanted())
                };
                drop(channel);
                log::info!("waitroom: channel dropped: {reason}");
                if wanted {
                    self.schedule_reconnect();
                }
            }
        }
    }

    fn dispatch(&self, event: &str, data: &Value) {
        let handler = self.registry.borrow().handler(event);
        match handler {
            Some(handler) => {
                if let Err(err) = handler(data, &self.utilities()) {
                    log::warn!("waitroom: handler for {event} failed: {err}");
                }
            }
            None => log::debug!("waitroom: no handler for channel event {event}"),
        }
    }

    fn schedule_reconnect(&self) {
        let attempt = {
            let mut state = self.state.borrow_mut();
            if state.phase == Phase::Closed {
                return;
            }
            state.reconnect_attempts += 1;
            state.reconnect_attempts
        };
        if attempt > MAX_RECONNECT_ATTEMPTS {
            log::warn!("waitroom: channel lost after {MAX_RECONNECT_ATTEMPTS} reconnect attempts");
            self.disconnect();
            return;
        }

        let delay = reconnect_delay(attempt);
        log::info!("waitroom: reconnecting in {delay}ms (attempt {attempt})");
        let me = Weak::clone(&self.me);
        self.state.borrow_mut().timers.start_reconnect(
            delay,
            Box::new(move || {
                if let Some(session) = me.upgrade() {
                    session.reconnect();
                }
            }),
        );
    }

    fn reconnect(&self) {
        let wanted = {
            let mut state = self.state.borrow_mut();
            state.timers.stop_reconnect();
            state.phase != Phase::Closed && state.machine.channel_wanted()
        };
        if wanted {
            self.open_channel();
        }
    }
}

/// Unload interception: fire the leave notice, then hand back the prompt text.
fn leave_prompt(me: Weak<QueueSession>) -> UnloadPrompt {
    Rc::new(move || match me.upgrade() {
        Some(session) => {
            session.send_leave();
            session.config.locale.messages().leave_prompt.to_owned()
        }
        None => String::new(),
    })
}
