//! Dwell-time gate for block transitions.
//!
//! Implements temporal stabilization against scroll jitter:
//!
//! - **Same block**: a candidate equal to the active block is never a transition.
//! - **Minimum dwell**: a new block is accepted only once the active block has
//!   been active for at least `min_dwell_ms`.
//! - **Boundary override**: candidates produced by reaching the document edge
//!   skip the dwell window.
//!
//! Pure timestamp comparison. No timers are scheduled, so an unmounted section
//! never leaves a pending callback behind.

use chrono::{DateTime, TimeDelta, Utc};

use crate::resolver::Candidate;
use crate::types::ActivationState;

/// Result of running a candidate through the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// The candidate becomes the new active block.
    Accepted,
    /// The candidate is already active.
    Unchanged,
    /// Dwell window still open; `remaining_ms` until it closes.
    Suppressed { remaining_ms: i64 },
}

impl GateDecision {
    pub fn is_accepted(self) -> bool {
        matches!(self, Self::Accepted)
    }
}

/// Decide whether `candidate` may replace the active block at `now`.
pub fn evaluate(
    candidate: &Candidate,
    state: &ActivationState,
    now: DateTime<Utc>,
    min_dwell_ms: u64,
) -> GateDecision {
    if candidate.block == state.active_block_id {
        return GateDecision::Unchanged;
    }
    if candidate.is_boundary() {
        return GateDecision::Accepted;
    }

    let window = dwell_window(min_dwell_ms);
    let elapsed = now.signed_duration_since(state.last_transition_at);
    if elapsed >= window {
        GateDecision::Accepted
    } else {
        let remaining = window.checked_sub(&elapsed).unwrap_or(TimeDelta::MAX);
        GateDecision::Suppressed {
            remaining_ms: remaining.num_milliseconds(),
        }
    }
}

/// Boolean form of [`evaluate`].
pub fn accept(
    candidate: &Candidate,
    state: &ActivationState,
    now: DateTime<Utc>,
    min_dwell_ms: u64,
) -> bool {
    evaluate(candidate, state, now, min_dwell_ms).is_accepted()
}

fn dwell_window(min_dwell_ms: u64) -> TimeDelta {
    i64::try_from(min_dwell_ms)
        .ok()
        .and_then(TimeDelta::try_milliseconds)
        .unwrap_or(TimeDelta::MAX)
}

// ─── Tests ───────────────────────────────────────────────────────────
