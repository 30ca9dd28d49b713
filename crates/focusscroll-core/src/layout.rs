//! Static page description used by headless hosts and tests.
//!
//! A [`PageLayout`] stores document-space positions. A [`PageView`] pins it
//! to a scroll offset and viewport height and serves viewport-relative
//! geometry through [`ViewportMetricsProvider`].

use serde::{Deserialize, Serialize};

use crate::metrics::{BlockArena, ViewportMetrics, ViewportMetricsProvider, capture_snapshot};
use crate::types::{BlockId, BlockRect, GeometryRef, ViewportSnapshot};

/// A block's position in document coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LayoutBlock {
    pub id: BlockId,
    pub top: f64,
    pub height: f64,
}

/// Document-space extent of the tracked section.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SectionSpan {
    pub top: f64,
    pub bottom: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageLayout {
    pub viewport_height: f64,
    /// Defaults to the bottom of the last block.
    #[serde(default)]
    pub document_height: Option<f64>,
    /// Defaults to the span from the first block's top to the last block's bottom.
    #[serde(default)]
    pub section: Option<SectionSpan>,
    pub blocks: Vec<LayoutBlock>,
}

impl PageLayout {
    pub fn block_ids(&self) -> Vec<BlockId> {
        self.blocks.iter().map(|b| b.id).collect()
    }

    pub fn document_height(&self) -> f64 {
        self.document_height.unwrap_or_else(|| self.blocks_bottom())
    }

    pub fn section_span(&self) -> SectionSpan {
        self.section.unwrap_or_else(|| SectionSpan {
            top: self.blocks.first().map(|b| b.top).unwrap_or(0.0),
            bottom: self.blocks_bottom(),
        })
    }

    pub fn max_scroll(&self, viewport_height: f64) -> f64 {
        (self.document_height() - viewport_height).max(0.0)
    }

    /// Clamp a requested offset into the scrollable range.
    pub fn clamp_scroll(&self, scroll_y: f64, viewport_height: f64) -> f64 {
        scroll_y.clamp(0.0, self.max_scroll(viewport_height))
    }

    pub fn view(&self, scroll_y: f64, viewport_height: f64) -> PageView<'_> {
        PageView {
            layout: self,
            scroll_y,
            viewport_height,
        }
    }

    /// Snapshot at `scroll_y` using the layout's own viewport height.
    pub fn snapshot(&self, scroll_y: f64, blocks: &BlockArena) -> ViewportSnapshot {
        capture_snapshot(&self.view(scroll_y, self.viewport_height), blocks)
    }

    fn blocks_bottom(&self) -> f64 {
        self.blocks
            .iter()
            .map(|b| b.top + b.height)
            .fold(0.0, f64::max)
    }
}

/// A layout observed at one scroll offset.
#[derive(Debug, Clone, Copy)]
pub struct PageView<'a> {
    layout: &'a PageLayout,
    scroll_y: f64,
    viewport_height: f64,
}

impl ViewportMetricsProvider for PageView<'_> {
    fn viewport(&self) -> ViewportMetrics {
        let section = self.layout.section_span();
        ViewportMetrics {
            scroll_y: self.scroll_y,
            viewport_height: self.viewport_height,
            document_height: self.layout.document_height(),
            section_top: section.top - self.scroll_y,
            section_bottom: section.bottom - self.scroll_y,
        }
    }

    fn block_rect(&self, geometry: GeometryRef) -> Option<BlockRect> {
        self.layout
            .blocks
            .iter()
            .find(|b| u64::from(b.id.get()) == geometry.0)
            .map(|b| BlockRect::new(b.top - self.scroll_y, b.height))
    }
}
