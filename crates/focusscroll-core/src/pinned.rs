//! Pinned/inline mode for the companion visual panel.
//!
//! [`compute_mode`] is stateless and recomputed from the current snapshot on
//! every cycle. The one piece of memory, the release latch that keeps the
//! panel inline after the last block was reached, lives in
//! [`ActivationState::pin_released`] and is advanced by [`release_latched`].

use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::metrics::BlockArena;
use crate::types::{ActivationState, BlockId, ViewportSnapshot};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PanelMode {
    pub pinned: bool,
}

/// Pin the panel while the section is being read through and the last block
/// has not been reached yet.
///
/// Pinned requires all of:
/// - section top above the viewport top,
/// - section bottom still below `pin_release_fraction` of the viewport,
/// - active block is not the last block.
///
/// A section that does not intersect the viewport is never pinned.
pub fn compute_mode(
    snapshot: &ViewportSnapshot,
    state: &ActivationState,
    blocks: &BlockArena,
    config: &EngineConfig,
) -> PanelMode {
    if state.active_block_id == blocks.last() || !snapshot.section_intersects_viewport() {
        return PanelMode { pinned: false };
    }

    let release_line = snapshot.viewport_height * config.pin_release_fraction;
    let pinned = snapshot.section_top < 0.0 && snapshot.section_bottom > release_line;
    PanelMode { pinned }
}

/// Next value of the release latch for a cycle ending with `active`.
///
/// Latches when the last block is active with the section on screen, and
/// only unlatches on a cycle where the section is fully out of the viewport.
pub fn release_latched(
    snapshot: &ViewportSnapshot,
    was_released: bool,
    active: BlockId,
    blocks: &BlockArena,
) -> bool {
    snapshot.section_intersects_viewport() && (was_released || active == blocks.last())
}
