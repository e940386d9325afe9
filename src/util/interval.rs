//! Cadence math for re-announce polling and channel reconnects.
//!
//! Clients deep in the queue get a slower re-announce cadence; clients near
//! the front keep the base cadence.

#[cfg(test)]
#[path = "interval_test.rs"]
mod interval_test;

/// Positions per cadence step.
pub const POSITION_STEP: u64 = 100;
/// Milliseconds added per full [`POSITION_STEP`].
pub const STEP_PENALTY_MS: u32 = 1000;

/// First reconnect delay.
pub const RECONNECT_BASE_MS: u32 = 1000;
/// Upper bound for reconnect delay.
pub const RECONNECT_MAX_MS: u32 = 10_000;
/// Consecutive failed reconnects tolerated before the channel is declared dead.
pub const MAX_RECONNECT_ATTEMPTS: u32 = 5;

/// Re-announce interval for a WAITING client at `position`.
///
/// `base_ms` below position 100, then `base_ms + floor(position / 100) * 1000`,
/// clamped to `cap_ms` when one is configured.
#[must_use]
pub fn reannounce_interval(base_ms: u32, position: u64, cap_ms: Option<u32>) -> u32 {
    let steps = u32::try_from(position / POSITION_STEP).unwrap_or(u32::MAX);
    let interval = base_ms.saturating_add(steps.saturating_mul(STEP_PENALTY_MS));
    match cap_ms {
        Some(cap) => interval.min(cap.max(base_ms)),
        None => interval,
    }
}

/// Reconnect delay before attempt number `attempt` (1-based).
#[must_use]
pub fn reconnect_delay(attempt: u32) -> u32 {
    let shift = attempt.saturating_sub(1).min(16);
    RECONNECT_BASE_MS.saturating_mul(1 << shift).min(RECONNECT_MAX_MS)
}
