//! Queue status state machine.
//!
//! DESIGN
//! ======
//! `QueueStatusMachine` is pure: it validates an inbound payload, decides
//! whether it supersedes the current status, and returns the ordered list of
//! [`Effect`]s the session must perform. It never touches the DOM, timers or
//! the network itself, which keeps every transition unit-testable and keeps
//! side-effect ordering in one place.
//!
//! Ordering guarantees encoded here:
//! - leaving WAITING clears the overlay, releases navigation and stops the
//!   re-announce timer before any ACTIVE timer starts;
//! - entering WAITING (re)arms the re-announce timer only when the
//!   position-derived interval changed;
//! - EMPTY/EXPIRED stop everything and are never left again.

#[cfg(test)]
#[path = "machine_test.rs"]
mod machine_test;

use serde_json::Value;

use crate::net::types::{QueueState, QueueStatus, StatusError};
use crate::util::interval::reannounce_interval;

/// Timers owned by a session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TimerKind {
    /// WAITING status poll; cadence depends on position.
    Reannounce,
    /// ACTIVE liveness signal over the channel; fixed cadence.
    Heartbeat,
}

/// One-time user-visible notices.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Notice {
    Empty,
    Expired,
}

/// A side effect requested by a transition, in execution order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Effect {
    /// Store the identity under the configured key.
    PersistIdentity(String),
    /// Hand the new status to every registered listener.
    Notify(QueueStatus),
    StopTimer(TimerKind),
    /// Start (or restart) a repeating timer at the given period in ms.
    StartTimer(TimerKind, u32),
    ClearOverlay,
    /// Render the overlay for the given position.
    RenderOverlay(u64),
    EngageGuard,
    ReleaseGuard,
    OpenChannel,
    CloseChannel,
    ShowNotice(Notice),
    Reload,
}

/// What `apply` made of one input.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// The status replaced the current one and effects were planned.
    Applied(QueueState),
    /// Identical to the current status; nothing to do.
    Unchanged,
    /// The payload failed validation; current status untouched.
    Rejected(StatusError),
    /// Superseded by an input issued later; dropped.
    Stale,
    /// A terminal status was already reached; input ignored.
    Terminal,
    /// The owning session is disconnected; input ignored.
    Closed,
}

/// Timer cadences, in milliseconds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Cadence {
    /// Re-announce interval below position 100.
    pub base_ms: u32,
    /// Optional upper bound for the re-announce interval.
    pub cap_ms: Option<u32>,
    /// Heartbeat interval while ACTIVE.
    pub heartbeat_ms: u32,
}

/// Result of one `apply` call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Plan {
    pub outcome: ApplyOutcome,
    pub effects: Vec<Effect>,
}

impl Plan {
    fn skip(outcome: ApplyOutcome) -> Self {
        Self { outcome, effects: Vec::new() }
    }
}

/// Authoritative current status plus mirrors of what the effects set up.
#[derive(Clone, Debug)]
pub struct QueueStatusMachine {
    cadence: Cadence,
    current: Option<QueueStatus>,
    last_seq: u64,
    reannounce_ms: Option<u32>,
    heartbeat_ms: Option<u32>,
    channel_wanted: bool,
}

impl QueueStatusMachine {
    #[must_use]
    pub fn new(cadence: Cadence) -> Self {
        Self {
            cadence,
            current: None,
            last_seq: 0,
            reannounce_ms: None,
            heartbeat_ms: None,
            channel_wanted: false,
        }
    }

    /// The status most recently applied.
    #[must_use]
    pub fn current(&self) -> Option<&QueueStatus> {
        self.current.as_ref()
    }

    /// Interval of the running re-announce timer, if any.
    #[must_use]
    pub fn reannounce_ms(&self) -> Option<u32> {
        self.reannounce_ms
    }

    /// Interval of the running heartbeat timer, if any.
    #[must_use]
    pub fn heartbeat_ms(&self) -> Option<u32> {
        self.heartbeat_ms
    }

    /// Whether the current state wants the realtime channel open.
    #[must_use]
    pub fn channel_wanted(&self) -> bool {
        self.channel_wanted
    }

    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.current.as_ref().is_some_and(|s| s.state.is_terminal())
    }

    /// Validate `value` and plan the transition it implies.
    ///
    /// `seq` orders inputs by issue time: a response to an older request
    /// never overwrites the result of a newer one.
    pub fn apply(&mut self, seq: u64, value: &Value) -> Plan {
        if self.is_terminal() {
            return Plan::skip(ApplyOutcome::Terminal);
        }
        if seq <= self.last_seq {
            return Plan::skip(ApplyOutcome::Stale);
        }

        let status = match QueueStatus::from_value(value) {
            Ok(status) => status,
            Err(err) => return Plan::skip(ApplyOutcome::Rejected(err)),
        };
        if let Some(current) = &self.current {
            if current.uuid != status.uuid {
                return Plan::skip(ApplyOutcome::Rejected(StatusError::IdentityMismatch {
                    assigned: current.uuid.clone(),
                    received: status.uuid,
                }));
            }
        }

        self.last_seq = seq;
        if self.current.as_ref() == Some(&status) {
            return Plan::skip(ApplyOutcome::Unchanged);
        }

        let state = status.state;
        let effects = self.transition(status);
        Plan { outcome: ApplyOutcome::Applied(state), effects }
    }

    /// Forget everything; used on disconnect.
    pub fn reset(&mut self) {
        *self = Self::new(self.cadence);
    }

    fn transition(&mut self, status: QueueStatus) -> Vec<Effect> {
        let mut effects = Vec::new();
        if self.current.is_none() {
            effects.push(Effect::PersistIdentity(status.uuid.clone()));
        }
        effects.push(Effect::Notify(status.clone()));

        match status.state {
            QueueState::Active => {
                effects.push(Effect::ClearOverlay);
                effects.push(Effect::ReleaseGuard);
                self.stop(TimerKind::Reannounce, &mut effects);
                if self.heartbeat_ms.is_none() {
                    self.heartbeat_ms = Some(self.cadence.heartbeat_ms);
                    effects.push(Effect::StartTimer(TimerKind::Heartbeat, self.cadence.heartbeat_ms));
                }
                if !self.channel_wanted {
                    self.channel_wanted = true;
                    effects.push(Effect::OpenChannel);
                }
            }
            QueueState::Waiting => {
                self.stop(TimerKind::Heartbeat, &mut effects);
                self.close_channel(&mut effects);
                let interval = reannounce_interval(self.cadence.base_ms, status.position, self.cadence.cap_ms);
                if self.reannounce_ms != Some(interval) {
                    self.reannounce_ms = Some(interval);
                    effects.push(Effect::StartTimer(TimerKind::Reannounce, interval));
                }
                effects.push(Effect::RenderOverlay(status.position));
                effects.push(Effect::EngageGuard);
            }
            QueueState::Empty | QueueState::Expired => {
                self.stop(TimerKind::Reannounce, &mut effects);
                self.stop(TimerKind::Heartbeat, &mut effects);
                self.close_channel(&mut effects);
                effects.push(Effect::ClearOverlay);
                effects.push(Effect::ReleaseGuard);
                if status.state == QueueState::Empty {
                    effects.push(Effect::ShowNotice(Notice::Empty));
                } else {
                    effects.push(Effect::ShowNotice(Notice::Expired));
                    effects.push(Effect::Reload);
                }
            }
        }

        self.current = Some(status);
        effects
    }

    fn stop(&mut self, kind: TimerKind, effects: &mut Vec<Effect>) {
        let running = match kind {
            TimerKind::Reannounce => self.reannounce_ms.take(),
            TimerKind::Heartbeat => self.heartbeat_ms.take(),
        };
        if running.is_some() {
            effects.push(Effect::StopTimer(kind));
        }
    }

    fn close_channel(&mut self, effects: &mut Vec<Effect>) {
        if self.channel_wanted {
            self.channel_wanted = false;
            effects.push(Effect::CloseChannel);
        }
    }
}
