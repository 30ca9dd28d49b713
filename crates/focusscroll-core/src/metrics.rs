//! Boundary with the rendering layer's geometry measurement.
//!
//! The engine never measures anything itself. A host implements
//! [`ViewportMetricsProvider`]; [`capture_snapshot`] turns one provider read
//! into an immutable [`ViewportSnapshot`] keyed by registered block id, and
//! [`validate_snapshot`] decides whether a cycle can run on it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{ActivationError, SnapshotError};
use crate::types::{Block, BlockId, BlockRect, GeometryRef, ViewportSnapshot};

// ─── Block arena ──────────────────────────────────────────────────

/// Direction of travel between two blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

/// The fixed, strictly ordered set of blocks for one mounted section.
///
/// Lookups go through block ids, never raw positions, so adjacency stays
/// correct even when ids are not contiguous.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockArena {
    blocks: Vec<Block>,
}

impl BlockArena {
    /// Register blocks in reading order. Ids must be strictly increasing.
    pub fn register(blocks: Vec<Block>) -> Result<Self, ActivationError> {
        if blocks.is_empty() {
            return Err(ActivationError::EmptyBlockSet);
        }
        for pair in blocks.windows(2) {
            let (prev, next) = (pair[0].id, pair[1].id);
            if next == prev {
                return Err(ActivationError::DuplicateBlockId(next));
            }
            if next < prev {
                return Err(ActivationError::NonMonotonicBlockIds { prev, next });
            }
        }
        Ok(Self { blocks })
    }

    /// Register bare ids; each block's geometry handle is its own ordinal.
    pub fn from_ids<I>(ids: I) -> Result<Self, ActivationError>
    where
        I: IntoIterator<Item = BlockId>,
    {
        Self::register(ids.into_iter().map(Block::new).collect())
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn first(&self) -> BlockId {
        self.blocks[0].id
    }

    pub fn last(&self) -> BlockId {
        self.blocks[self.blocks.len() - 1].id
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Block> {
        self.blocks.iter()
    }

    pub fn get(&self, id: BlockId) -> Option<&Block> {
        self.ordinal(id).map(|i| &self.blocks[i])
    }

    pub fn contains(&self, id: BlockId) -> bool {
        self.ordinal(id).is_some()
    }

    /// Neighbor of `id` one step in `direction`, if any.
    pub fn step(&self, id: BlockId, direction: Direction) -> Option<BlockId> {
        let i = self.ordinal(id)?;
        let j = match direction {
            Direction::Forward => i.checked_add(1)?,
            Direction::Backward => i.checked_sub(1)?,
        };
        self.blocks.get(j).map(|b| b.id)
    }

    /// Number of registered steps between two blocks.
    pub fn distance(&self, from: BlockId, to: BlockId) -> Option<usize> {
        Some(self.ordinal(from)?.abs_diff(self.ordinal(to)?))
    }

    fn ordinal(&self, id: BlockId) -> Option<usize> {
        self.blocks.binary_search_by_key(&id, |b| b.id).ok()
    }
}

// ─── Provider boundary ────────────────────────────────────────────

/// Page-level measurements. Section edges are viewport-relative.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewportMetrics {
    pub scroll_y: f64,
    pub viewport_height: f64,
    pub document_height: f64,
    pub section_top: f64,
    pub section_bottom: f64,
}

/// Geometry source owned by the rendering layer.
pub trait ViewportMetricsProvider {
    fn viewport(&self) -> ViewportMetrics;

    /// Current viewport-relative rect for a block, or `None` when the layout
    /// has no geometry for the handle (not laid out yet, removed, ...).
    fn block_rect(&self, geometry: GeometryRef) -> Option<BlockRect>;
}

/// Read the provider once and build a fresh snapshot for the registered blocks.
/// Blocks without geometry are simply absent from `block_rects`.
pub fn capture_snapshot(
    provider: &dyn ViewportMetricsProvider,
    blocks: &BlockArena,
) -> ViewportSnapshot {
    let metrics = provider.viewport();
    let block_rects: BTreeMap<BlockId, BlockRect> = blocks
        .iter()
        .filter_map(|b| provider.block_rect(b.geometry).map(|r| (b.id, r)))
        .collect();

    ViewportSnapshot {
        scroll_y: metrics.scroll_y,
        viewport_height: metrics.viewport_height,
        document_height: metrics.document_height,
        section_top: metrics.section_top,
        section_bottom: metrics.section_bottom,
        block_rects,
    }
}

/// Check that every registered block has finite geometry and the viewport is usable.
pub fn validate_snapshot(
    snapshot: &ViewportSnapshot,
    blocks: &BlockArena,
) -> Result<(), SnapshotError> {
    let scalars = [
        ("scroll_y", snapshot.scroll_y),
        ("viewport_height", snapshot.viewport_height),
        ("document_height", snapshot.document_height),
        ("section_top", snapshot.section_top),
        ("section_bottom", snapshot.section_bottom),
    ];
    for (field, value) in scalars {
        if !value.is_finite() {
            return Err(SnapshotError::NonFinite(field.to_string()));
        }
    }
    if snapshot.viewport_height <= 0.0 {
        return Err(SnapshotError::InvalidViewportHeight(snapshot.viewport_height));
    }

    for block in blocks.iter() {
        let rect = snapshot
            .rect(block.id)
            .ok_or(SnapshotError::MissingGeometry(block.id))?;
        if !rect.is_finite() {
            return Err(SnapshotError::NonFinite(format!("block_rects[{}]", block.id)));
        }
    }
    Ok(())
}
