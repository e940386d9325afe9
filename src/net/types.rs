//! Wire-protocol DTOs for the queue backend boundary.
//!
//! DESIGN
//! ======
//! Inbound status payloads arrive as loose JSON (REST bodies and channel
//! events alike). They are validated here, once, into [`QueueStatus`] so the
//! state machine never sees a partially-formed status.

#[cfg(test)]
#[path = "types_test.rs"]
mod types_test;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Channel event carrying a fresh [`QueueStatus`].
pub const STATUS_EVENT: &str = "status";
/// Channel event sent periodically while admitted.
pub const HEARTBEAT_EVENT: &str = "heartbeat";

/// Queue state discriminant as encoded on the wire (`"WAITING"`, ...).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QueueState {
    /// Still queued; the page stays blocked and keeps re-announcing.
    Waiting,
    /// Admitted; the page is released and only a heartbeat remains.
    Active,
    /// The queue or session key is invalid. Terminal.
    Empty,
    /// The wait exceeded the server-side bound. Terminal.
    Expired,
}

impl QueueState {
    /// Parse the wire discriminant.
    #[must_use]
    pub fn from_wire(raw: &str) -> Option<Self> {
        match raw {
            "WAITING" => Some(Self::Waiting),
            "ACTIVE" => Some(Self::Active),
            "EMPTY" => Some(Self::Empty),
            "EXPIRED" => Some(Self::Expired),
            _ => None,
        }
    }

    /// Wire discriminant for this state.
    #[must_use]
    pub fn as_wire(self) -> &'static str {
        match self {
            Self::Waiting => "WAITING",
            Self::Active => "ACTIVE",
            Self::Empty => "EMPTY",
            Self::Expired => "EXPIRED",
        }
    }

    /// Whether no further network activity may follow this state.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Empty | Self::Expired)
    }
}

/// One validated status snapshot. Replaced wholesale on every update.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStatus {
    /// Backend-assigned identity of this browser session's slot.
    pub uuid: String,
    /// Rank in the queue; `0` when not meaningfully ranked.
    pub position: u64,
    /// Current queue state.
    #[serde(rename = "status")]
    pub state: QueueState,
}

/// Reasons a status payload is rejected at the boundary.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum StatusError {
    /// No payload at all.
    #[error("status payload is null")]
    Null,
    /// The payload is not a JSON object.
    #[error("status payload is not an object")]
    NotObject,
    /// A required field is absent.
    #[error("missing field `{0}`")]
    Missing(&'static str),
    /// A field is present but unusable.
    #[error("invalid field `{field}`: {reason}")]
    Invalid {
        /// Offending field name.
        field: &'static str,
        /// Human-readable cause.
        reason: String,
    },
    /// The payload names a different identity than the one already assigned.
    #[error("identity mismatch: assigned {assigned}, received {received}")]
    IdentityMismatch {
        /// Identity held by the session.
        assigned: String,
        /// Identity carried by the payload.
        received: String,
    },
}

impl QueueStatus {
    /// Validate a raw payload into a status.
    ///
    /// `uuid` and `status` are required; a missing `position` reads as `0`.
    /// Integral floats are accepted for `position` since JSON producers do
    /// not always distinguish integers.
    ///
    /// # Errors
    ///
    /// Returns a [`StatusError`] describing the first defect found.
    pub fn from_value(value: &Value) -> Result<Self, StatusError> {
        let obj = match value {
            Value::Null => return Err(StatusError::Null),
            Value::Object(obj) => obj,
            _ => return Err(StatusError::NotObject),
        };

        let uuid = match obj.get("uuid") {
            None | Some(Value::Null) => return Err(StatusError::Missing("uuid")),
            Some(Value::String(s)) if !s.trim().is_empty() => s.clone(),
            Some(Value::String(_)) => {
                return Err(StatusError::Invalid { field: "uuid", reason: "empty".to_owned() });
            }
            Some(other) => {
                return Err(StatusError::Invalid { field: "uuid", reason: format!("expected string, got {other}") });
            }
        };

        let state = match obj.get("status") {
            None | Some(Value::Null) => return Err(StatusError::Missing("status")),
            Some(Value::String(s)) => QueueState::from_wire(s)
                .ok_or_else(|| StatusError::Invalid { field: "status", reason: format!("unknown state {s}") })?,
            Some(other) => {
                return Err(StatusError::Invalid { field: "status", reason: format!("expected string, got {other}") });
            }
        };

        let position = match obj.get("position") {
            None | Some(Value::Null) => 0,
            Some(v) => position_from_value(v)?,
        };

        Ok(Self { uuid, position, state })
    }
}

fn position_from_value(value: &Value) -> Result<u64, StatusError> {
    if let Some(n) = value.as_u64() {
        return Ok(n);
    }
    if let Some(f) = value.as_f64()
        && f >= 0.0
        && f.fract() == 0.0
        && f <= 9_007_199_254_740_991.0
    {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        return Ok(f as u64);
    }
    Err(StatusError::Invalid { field: "position", reason: format!("expected non-negative integer, got {value}") })
}

/// Body of the join request.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct JoinRequest {
    /// Previously persisted identity, when restoring after a reload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
    /// Identity/session query parameters forwarded verbatim.
    #[serde(flatten)]
    pub params: BTreeMap<String, String>,
}

/// Best-effort leave payload: `{ uuid, ...params }`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LeaveNotice {
    /// Identity being released.
    pub uuid: String,
    /// Identity/session query parameters forwarded verbatim.
    #[serde(flatten)]
    pub params: BTreeMap<String, String>,
}

/// JSON text envelope exchanged over the realtime channel.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Event name, e.g. [`STATUS_EVENT`].
    pub event: String,
    /// Event payload.
    #[serde(default)]
    pub data: Value,
}

impl Envelope {
    /// Decode one text message from the channel.
    ///
    /// # Errors
    ///
    /// Returns the `serde_json` error for malformed text.
    pub fn decode(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Encode this envelope as channel text.
    ///
    /// # Errors
    ///
    /// Returns the `serde_json` error if the payload cannot be serialized.
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
