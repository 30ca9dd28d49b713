//! Fling protection between the resolver and the dwell gate.
//!
//! A fast scroll can move the viewport past an intermediate block between two
//! scroll events. When the resolver then proposes a block two or more steps
//! away, the guard holds the transition to the adjacent block for as long as
//! that block is still on screen. Once it has left the viewport entirely the
//! full jump is allowed.

use crate::metrics::{BlockArena, Direction};
use crate::resolver::{Candidate, CandidateSource};
use crate::types::{ActivationState, ViewportSnapshot};

/// Correct a multi-step candidate to the adjacent block when that block is visible.
///
/// Boundary candidates are passed through untouched.
pub fn guard(
    candidate: Candidate,
    state: &ActivationState,
    snapshot: &ViewportSnapshot,
    blocks: &BlockArena,
) -> Candidate {
    if candidate.is_boundary() {
        return candidate;
    }

    let current = state.active_block_id;
    let Some(distance) = blocks.distance(current, candidate.block) else {
        return candidate;
    };
    if distance <= 1 {
        return candidate;
    }

    let direction = if candidate.block > current {
        Direction::Forward
    } else {
        Direction::Backward
    };
    let Some(adjacent) = blocks.step(current, direction) else {
        return candidate;
    };

    let adjacent_visible = snapshot
        .rect(adjacent)
        .is_some_and(|r| r.intersects_viewport(snapshot.viewport_height));

    if adjacent_visible {
        Candidate::new(adjacent, CandidateSource::SkipCorrected)
    } else {
        candidate
    }
}
