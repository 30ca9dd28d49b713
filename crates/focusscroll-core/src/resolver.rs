use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::metrics::BlockArena;
use crate::types::{ActivationState, BlockId, BlockRect, ViewportSnapshot};

// ─── Candidate ───────────────────────────────────────────────────

/// Where a proposed block came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateSource {
    /// Furthest block satisfying the focus band predicate.
    FocusBand,
    /// Document top/bottom reached; bypasses skip guard and dwell gate.
    Boundary,
    /// Skip guard replaced a multi-step jump with the adjacent block.
    SkipCorrected,
    /// Nothing in focus; the current block is kept.
    Retained,
}

/// A proposed active block for this cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub block: BlockId,
    pub source: CandidateSource,
}

impl Candidate {
    pub fn new(block: BlockId, source: CandidateSource) -> Self {
        Self { block, source }
    }

    pub fn is_boundary(&self) -> bool {
        self.source == CandidateSource::Boundary
    }
}

// ─── Predicates ──────────────────────────────────────────────────

/// Focus band predicate: the block's top has reached the activation line and
/// enough of the block is still below the viewport top.
pub fn in_focus_band(rect: &BlockRect, viewport_height: f64, config: &EngineConfig) -> bool {
    rect.top <= viewport_height * config.activation_threshold
        && rect.bottom > rect.height * config.min_visible_fraction
}

/// Which document edge, if any, the viewport is resting against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentEdge {
    Top,
    Bottom,
}

/// Detect the document edges. A page that cannot scroll has no edges.
pub fn document_edge(snapshot: &ViewportSnapshot, epsilon: f64) -> Option<DocumentEdge> {
    if snapshot.max_scroll() <= epsilon {
        return None;
    }
    if snapshot.scroll_y + snapshot.viewport_height >= snapshot.document_height - epsilon {
        Some(DocumentEdge::Bottom)
    } else if snapshot.scroll_y <= epsilon {
        Some(DocumentEdge::Top)
    } else {
        None
    }
}

// ─── Resolution (main entry point) ───────────────────────────────

/// Propose the active block for one snapshot.
///
/// Pure function: no IO, no clock. The snapshot must already have passed
/// [`crate::metrics::validate_snapshot`]; blocks without a rect are ignored.
///
/// * Bottom edge → last block, unconditionally. Sub-pixel rounding can keep a
///   short last block from ever satisfying the band predicate.
/// * Top edge → first block, provided it is actually on screen.
/// * Otherwise the largest id in the focus band wins.
/// * Nothing in the band → current block retained.
pub fn resolve(
    snapshot: &ViewportSnapshot,
    state: &ActivationState,
    blocks: &BlockArena,
    config: &EngineConfig,
) -> Candidate {
    match document_edge(snapshot, config.boundary_epsilon_px) {
        Some(DocumentEdge::Bottom) => {
            return Candidate::new(blocks.last(), CandidateSource::Boundary);
        }
        Some(DocumentEdge::Top) => {
            let first = blocks.first();
            let visible = snapshot
                .rect(first)
                .is_some_and(|r| r.intersects_viewport(snapshot.viewport_height));
            if visible {
                return Candidate::new(first, CandidateSource::Boundary);
            }
        }
        None => {}
    }

    blocks
        .iter()
        .rev()
        .find(|b| {
            snapshot
                .rect(b.id)
                .is_some_and(|r| in_focus_band(r, snapshot.viewport_height, config))
        })
        .map(|b| Candidate::new(b.id, CandidateSource::FocusBand))
        .unwrap_or_else(|| Candidate::new(state.active_block_id, CandidateSource::Retained))
}
