use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::num::NonZeroU32;

// ─── Block identity ───────────────────────────────────────────────

/// Ordinal identifier of a scroll-tracked block. Ids start at 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct BlockId(NonZeroU32);

impl BlockId {
    pub fn new(ordinal: u32) -> Option<Self> {
        NonZeroU32::new(ordinal).map(Self)
    }

    pub fn get(self) -> u32 {
        self.0.get()
    }
}

impl TryFrom<u32> for BlockId {
    type Error = String;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value).ok_or_else(|| "block ids start at 1".to_string())
    }
}

impl From<BlockId> for u32 {
    fn from(id: BlockId) -> Self {
        id.get()
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque handle the metrics provider uses to locate a block's geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GeometryRef(pub u64);

/// One registered unit of scroll-tracked content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub id: BlockId,
    pub geometry: GeometryRef,
}

impl Block {
    /// Block whose geometry handle is its own ordinal.
    pub fn new(id: BlockId) -> Self {
        Self {
            id,
            geometry: GeometryRef(u64::from(id.get())),
        }
    }
}

// ─── Geometry ─────────────────────────────────────────────────────

/// Viewport-relative bounding rectangle of a block (vertical axis only).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BlockRect {
    pub top: f64,
    pub bottom: f64,
    pub height: f64,
}

impl BlockRect {
    pub fn new(top: f64, height: f64) -> Self {
        Self {
            top,
            bottom: top + height,
            height,
        }
    }

    /// Whether any part of the rect lies inside `[0, viewport_height]`.
    /// A rect that merely touches an edge does not count.
    pub fn intersects_viewport(&self, viewport_height: f64) -> bool {
        self.bottom > 0.0 && self.top < viewport_height
    }

    pub fn is_finite(&self) -> bool {
        self.top.is_finite() && self.bottom.is_finite() && self.height.is_finite()
    }
}

/// Immutable geometry capture for one scroll/resize cycle.
///
/// All positions except `scroll_y` and `document_height` are relative to the
/// viewport top. A new snapshot is built for every event; snapshots are never
/// patched in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewportSnapshot {
    pub scroll_y: f64,
    pub viewport_height: f64,
    pub document_height: f64,
    pub section_top: f64,
    pub section_bottom: f64,
    pub block_rects: BTreeMap<BlockId, BlockRect>,
}

impl ViewportSnapshot {
    pub fn rect(&self, id: BlockId) -> Option<&BlockRect> {
        self.block_rects.get(&id)
    }

    /// Largest reachable scroll offset for this document.
    pub fn max_scroll(&self) -> f64 {
        (self.document_height - self.viewport_height).max(0.0)
    }

    pub fn section_intersects_viewport(&self) -> bool {
        self.section_bottom > 0.0 && self.section_top < self.viewport_height
    }
}

// ─── Activation state ─────────────────────────────────────────────

/// The engine's single mutable record. Other components only ever see copies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivationState {
    pub active_block_id: BlockId,
    pub previous_block_id: Option<BlockId>,
    /// When `active_block_id` was last accepted (mount time initially).
    pub last_transition_at: DateTime<Utc>,
    pub pinned: bool,
    /// Set once the last block has been active while the section is on
    /// screen; holds the panel unpinned until the section leaves the viewport.
    #[serde(default)]
    pub pin_released: bool,
}

impl ActivationState {
    pub fn initial(first: BlockId, now: DateTime<Utc>) -> Self {
        Self {
            active_block_id: first,
            previous_block_id: None,
            last_transition_at: now,
            pinned: false,
            pin_released: false,
        }
    }
}

/// Why a notification was emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    /// Regular transition through resolve → guard → dwell gate.
    Transition,
    /// Transition forced by reaching the top or bottom of the document.
    BoundaryOverride,
    /// Active block unchanged; only the panel's pinned mode flipped.
    PinnedOnly,
}

impl ChangeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Transition => "transition",
            Self::BoundaryOverride => "boundary_override",
            Self::PinnedOnly => "pinned_only",
        }
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payload delivered to `on_activation_change` listeners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivationChange {
    pub kind: ChangeKind,
    pub active_block_id: BlockId,
    pub previous_block_id: Option<BlockId>,
    pub pinned: bool,
    pub at: DateTime<Utc>,
}

impl ActivationChange {
    pub fn from_state(kind: ChangeKind, state: &ActivationState, at: DateTime<Utc>) -> Self {
        Self {
            kind,
            active_block_id: state.active_block_id,
            previous_block_id: state.previous_block_id,
            pinned: state.pinned,
            at,
        }
    }
}

/// Host event kind that triggered a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trigger {
    Scroll,
    Resize,
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scroll => f.pad("scroll"),
            Self::Resize => f.pad("resize"),
        }
    }
}
