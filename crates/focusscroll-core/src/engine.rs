//! Activation engine: owns the state and runs the per-event pipeline.
//!
//! Each scroll or resize event runs one synchronous cycle:
//! snapshot → validate → resolve → skip guard → dwell gate → pinned mode
//! → notify. Nothing is queued and nothing runs in the background; a cycle
//! either completes or is skipped with the previous state retained.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, trace, warn};

use crate::config::EngineConfig;
use crate::dwell::{self, GateDecision};
use crate::error::{ActivationError, SnapshotError};
use crate::metrics::{BlockArena, ViewportMetricsProvider, capture_snapshot, validate_snapshot};
use crate::pinned;
use crate::resolver::{self, Candidate, CandidateSource};
use crate::skip_guard;
use crate::types::{
    ActivationChange, ActivationState, Block, BlockId, ChangeKind, Trigger, ViewportSnapshot,
};

type Listener = Box<dyn FnMut(&ActivationChange)>;

/// Handle returned by [`ActivationEngine::on_activation_change`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Why a cycle left the active block where it was.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnchangedReason {
    /// No block satisfied the focus band predicate.
    NoCandidate,
    /// The (guarded) candidate is already active.
    AlreadyActive,
    /// A different block was proposed inside the dwell window.
    DwellSuppressed { candidate: BlockId, remaining_ms: i64 },
}

/// What one cycle did.
#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    Transitioned(ActivationChange),
    PinnedChanged(ActivationChange),
    Unchanged(UnchangedReason),
    /// Snapshot rejected; previous state retained.
    Skipped(SnapshotError),
}

impl CycleOutcome {
    pub fn change(&self) -> Option<&ActivationChange> {
        match self {
            Self::Transitioned(change) | Self::PinnedChanged(change) => Some(change),
            Self::Unchanged(_) | Self::Skipped(_) => None,
        }
    }
}

/// Running counters, mostly for diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EngineStats {
    pub cycles: u64,
    pub transitions: u64,
    pub boundary_overrides: u64,
    pub skip_corrections: u64,
    pub dwell_suppressed: u64,
    pub pinned_changes: u64,
    pub malformed_snapshots: u64,
}

pub struct ActivationEngine {
    config: EngineConfig,
    blocks: BlockArena,
    state: ActivationState,
    listeners: Vec<(ListenerId, Listener)>,
    next_listener: u64,
    stats: EngineStats,
}

impl fmt::Debug for ActivationEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActivationEngine")
            .field("config", &self.config)
            .field("blocks", &self.blocks)
            .field("state", &self.state)
            .field("listeners", &self.listeners.len())
            .field("stats", &self.stats)
            .finish()
    }
}

impl ActivationEngine {
    /// Register the section's blocks and start on the first one.
    ///
    /// Fails on an empty, duplicated or out-of-order id set, or an invalid config.
    pub fn mount<I>(
        block_ids: I,
        config: EngineConfig,
        now: DateTime<Utc>,
    ) -> Result<Self, ActivationError>
    where
        I: IntoIterator<Item = BlockId>,
    {
        Self::mount_blocks(block_ids.into_iter().map(Block::new).collect(), config, now)
    }

    /// Like [`mount`](Self::mount) with explicit geometry handles.
    pub fn mount_blocks(
        blocks: Vec<Block>,
        config: EngineConfig,
        now: DateTime<Utc>,
    ) -> Result<Self, ActivationError> {
        config.validate()?;
        let blocks = BlockArena::register(blocks)?;
        let state = ActivationState::initial(blocks.first(), now);
        debug!(
            blocks = blocks.len(),
            first = %blocks.first(),
            last = %blocks.last(),
            "activation engine mounted"
        );
        Ok(Self {
            config,
            blocks,
            state,
            listeners: Vec::new(),
            next_listener: 0,
            stats: EngineStats::default(),
        })
    }

    /// Tear down: drops every listener and returns the final state.
    pub fn unmount(mut self) -> ActivationState {
        let listeners = self.listeners.len();
        self.listeners.clear();
        debug!(
            listeners,
            active = %self.state.active_block_id,
            "activation engine unmounted"
        );
        self.state
    }

    pub fn on_activation_change<F>(&mut self, listener: F) -> ListenerId
    where
        F: FnMut(&ActivationChange) + 'static,
    {
        let id = ListenerId(self.next_listener);
        self.next_listener += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(lid, _)| *lid != id);
        self.listeners.len() != before
    }

    pub fn current_state(&self) -> ActivationState {
        self.state
    }

    pub fn blocks(&self) -> &BlockArena {
        &self.blocks
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn stats(&self) -> EngineStats {
        self.stats
    }

    /// Capture a fresh snapshot from `provider` and run one cycle.
    pub fn handle(
        &mut self,
        trigger: Trigger,
        provider: &dyn ViewportMetricsProvider,
        now: DateTime<Utc>,
    ) -> CycleOutcome {
        let snapshot = capture_snapshot(provider, &self.blocks);
        trace!(%trigger, scroll_y = snapshot.scroll_y, "cycle");
        self.process(&snapshot, now)
    }

    /// Run one cycle on an already captured snapshot.
    pub fn process(&mut self, snapshot: &ViewportSnapshot, now: DateTime<Utc>) -> CycleOutcome {
        self.stats.cycles += 1;

        if let Err(error) = validate_snapshot(snapshot, &self.blocks) {
            self.stats.malformed_snapshots += 1;
            warn!(
                error = %error,
                active = %self.state.active_block_id,
                "malformed viewport snapshot, retaining previous state"
            );
            return CycleOutcome::Skipped(error);
        }

        let proposed = resolver::resolve(snapshot, &self.state, &self.blocks, &self.config);
        let candidate = skip_guard::guard(proposed, &self.state, snapshot, &self.blocks);
        if candidate.source == CandidateSource::SkipCorrected {
            self.stats.skip_corrections += 1;
            debug!(
                proposed = %proposed.block,
                corrected = %candidate.block,
                "skip guard held transition at adjacent block"
            );
        }

        match dwell::evaluate(&candidate, &self.state, now, self.config.min_dwell_ms) {
            GateDecision::Accepted => self.transition(candidate, snapshot, now),
            GateDecision::Unchanged => {
                let reason = if candidate.source == CandidateSource::Retained {
                    UnchangedReason::NoCandidate
                } else {
                    UnchangedReason::AlreadyActive
                };
                self.refresh_pinned(snapshot, now)
                    .unwrap_or(CycleOutcome::Unchanged(reason))
            }
            GateDecision::Suppressed { remaining_ms } => {
                self.stats.dwell_suppressed += 1;
                trace!(
                    candidate = %candidate.block,
                    remaining_ms,
                    "transition suppressed by dwell window"
                );
                self.refresh_pinned(snapshot, now).unwrap_or(CycleOutcome::Unchanged(
                    UnchangedReason::DwellSuppressed {
                        candidate: candidate.block,
                        remaining_ms,
                    },
                ))
            }
        }
    }

    fn transition(
        &mut self,
        candidate: Candidate,
        snapshot: &ViewportSnapshot,
        now: DateTime<Utc>,
    ) -> CycleOutcome {
        let mut next = ActivationState {
            active_block_id: candidate.block,
            previous_block_id: Some(self.state.active_block_id),
            last_transition_at: now,
            ..self.state
        };
        self.apply_panel_mode(snapshot, &mut next);

        let kind = if candidate.is_boundary() {
            self.stats.boundary_overrides += 1;
            ChangeKind::BoundaryOverride
        } else {
            ChangeKind::Transition
        };
        self.stats.transitions += 1;
        debug!(
            from = %self.state.active_block_id,
            to = %next.active_block_id,
            pinned = next.pinned,
            %kind,
            "block activated"
        );

        self.state = next;
        let change = ActivationChange::from_state(kind, &self.state, now);
        self.notify(&change);
        CycleOutcome::Transitioned(change)
    }

    /// Advance the release latch; the panel can only pin while it is clear.
    fn apply_panel_mode(&self, snapshot: &ViewportSnapshot, state: &mut ActivationState) {
        let released = pinned::release_latched(
            snapshot,
            state.pin_released,
            state.active_block_id,
            &self.blocks,
        );
        if released != state.pin_released {
            trace!(released, active = %state.active_block_id, "pin release latch");
        }
        state.pin_released = released;
        state.pinned =
            !released && pinned::compute_mode(snapshot, state, &self.blocks, &self.config).pinned;
    }

    /// Recompute pinned mode for the current block; notify only if it flipped.
    fn refresh_pinned(
        &mut self,
        snapshot: &ViewportSnapshot,
        now: DateTime<Utc>,
    ) -> Option<CycleOutcome> {
        let mut next = self.state;
        self.apply_panel_mode(snapshot, &mut next);
        let flipped = next.pinned != self.state.pinned;
        self.state = next;
        if !flipped {
            return None;
        }
        self.stats.pinned_changes += 1;
        debug!(
            active = %self.state.active_block_id,
            pinned = self.state.pinned,
            "panel mode changed"
        );
        let change = ActivationChange::from_state(ChangeKind::PinnedOnly, &self.state, now);
        self.notify(&change);
        Some(CycleOutcome::PinnedChanged(change))
    }

    fn notify(&mut self, change: &ActivationChange) {
        for (_, listener) in &mut self.listeners {
            listener(change);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{LayoutBlock, PageLayout, SectionSpan};
    use crate::types::BlockRect;
    use chrono::TimeDelta;
    use std::cell::RefCell;
    use std::collections::BTreeMap;
    use std::rc::Rc;

    // ─── Test Helpers ────────────────────────────────────────────

    fn id(n: u32) -> BlockId {
        BlockId::new(n).expect("non-zero id")
    }

    fn t0() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-03-01T09:00:00Z")
            .expect("valid RFC3339")
            .with_timezone(&Utc)
    }

    fn at(ms: i64) -> DateTime<Utc> {
        t0() + TimeDelta::milliseconds(ms)
    }

    /// Five 800px blocks starting at 400px, viewport 800px, 800px footer.
    fn page() -> PageLayout {
        PageLayout {
            viewport_height: 800.0,
            document_height: Some(5200.0),
            section: Some(SectionSpan {
                top: 400.0,
                bottom: 4400.0,
            }),
            blocks: (1..=5)
                .map(|n| LayoutBlock {
                    id: id(n),
                    top: 400.0 + f64::from(n - 1) * 800.0,
                    height: 800.0,
                })
                .collect(),
        }
    }

    fn mount(layout: &PageLayout) -> ActivationEngine {
        ActivationEngine::mount(layout.block_ids(), EngineConfig::default(), t0())
            .expect("valid mount")
    }

    fn recorder(engine: &mut ActivationEngine) -> Rc<RefCell<Vec<ActivationChange>>> {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        engine.on_activation_change(move |c| sink.borrow_mut().push(*c));
        seen
    }

    // ─── Mount ───────────────────────────────────────────────────

    #[test]
    fn mount_starts_on_first_block() {
        let engine = mount(&page());
        let state = engine.current_state();
        assert_eq!(state.active_block_id, id(1));
        assert_eq!(state.previous_block_id, None);
        assert!(!state.pinned);
        assert_eq!(state.last_transition_at, t0());
    }

    #[test]
    fn mount_refuses_out_of_order_ids() {
        let err = ActivationEngine::mount([id(2), id(1)], EngineConfig::default(), t0())
            .expect_err("descending ids");
        assert_eq!(
            err,
            ActivationError::NonMonotonicBlockIds {
                prev: id(2),
                next: id(1)
            }
        );
    }

    #[test]
    fn mount_refuses_invalid_config() {
        let config = EngineConfig {
            activation_threshold: -0.1,
            ..EngineConfig::default()
        };
        let err = ActivationEngine::mount([id(1)], config, t0()).expect_err("bad config");
        assert!(matches!(err, ActivationError::InvalidConfig(_)));
    }

    // ─── Pipeline ────────────────────────────────────────────────

    #[test]
    fn scrolling_into_next_band_transitions_and_notifies() {
        let layout = page();
        let mut engine = mount(&layout);
        let seen = recorder(&mut engine);

        // Block 2 top at 1200 - 1100 = 100 <= 160.
        let outcome = engine.handle(Trigger::Scroll, &layout.view(1100.0, 800.0), at(600));
        let change = outcome.change().copied().expect("transition");
        assert_eq!(change.kind, ChangeKind::Transition);
        assert_eq!(change.active_block_id, id(2));
        assert_eq!(change.previous_block_id, Some(id(1)));
        assert!(change.pinned);
        assert_eq!(seen.borrow().as_slice(), &[change]);
        assert_eq!(engine.current_state().last_transition_at, at(600));
    }

    #[test]
    fn transition_inside_dwell_window_is_suppressed() {
        let layout = page();
        let mut engine = mount(&layout);

        let outcome = engine.process(&layout.snapshot(1100.0, engine.blocks()), at(100));
        // Section top is above the viewport, so the panel pins even though
        // block 2 is held back.
        assert!(matches!(outcome, CycleOutcome::PinnedChanged(_)));
        assert_eq!(engine.current_state().active_block_id, id(1));

        let outcome = engine.process(&layout.snapshot(1110.0, engine.blocks()), at(200));
        assert_eq!(
            outcome,
            CycleOutcome::Unchanged(UnchangedReason::DwellSuppressed {
                candidate: id(2),
                remaining_ms: 300
            })
        );
        assert_eq!(engine.stats().dwell_suppressed, 2);
    }

    #[test]
    fn fling_is_held_at_adjacent_block() {
        // Short blocks so that block 5 enters the band while block 3 is still visible.
        let heights = [400.0, 400.0, 200.0, 100.0, 400.0];
        let mut top = 0.0;
        let blocks = heights
            .iter()
            .enumerate()
            .map(|(i, &height)| {
                let block = LayoutBlock {
                    id: id(i as u32 + 1),
                    top,
                    height,
                };
                top += height;
                block
            })
            .collect();
        let layout = PageLayout {
            viewport_height: 1000.0,
            document_height: Some(3000.0),
            section: None,
            blocks,
        };
        let mut engine = mount(&layout);

        // Block 2 (top 400) into band.
        let first = engine.process(&layout.snapshot(300.0, engine.blocks()), at(1000));
        assert_eq!(first.change().map(|c| c.active_block_id), Some(id(2)));

        // Fling: block 5 (top 1100) at 150, block 3 (800..1000) at -150..50.
        let outcome = engine.process(&layout.snapshot(950.0, engine.blocks()), at(2000));
        let change = outcome.change().copied().expect("transition");
        assert_eq!(change.active_block_id, id(3));
        assert_eq!(engine.stats().skip_corrections, 1);

        // Next cycle continues one step at a time.
        let outcome = engine.process(&layout.snapshot(950.0, engine.blocks()), at(3000));
        assert_eq!(outcome.change().map(|c| c.active_block_id), Some(id(4)));
    }

    #[test]
    fn bottom_boundary_overrides_dwell_and_guard() {
        let layout = page();
        let mut engine = mount(&layout);
        let snapshot = layout.snapshot(layout.max_scroll(800.0), engine.blocks());

        let outcome = engine.process(&snapshot, at(10));
        let change = outcome.change().copied().expect("boundary transition");
        assert_eq!(change.kind, ChangeKind::BoundaryOverride);
        assert_eq!(change.active_block_id, id(5));
        assert!(!change.pinned);
        assert_eq!(engine.stats().boundary_overrides, 1);
    }

    #[test]
    fn identical_snapshot_twice_is_idempotent() {
        let layout = page();
        let mut engine = mount(&layout);
        let snapshot = layout.snapshot(1100.0, engine.blocks());

        let first = engine.process(&snapshot, at(700));
        assert!(matches!(first, CycleOutcome::Transitioned(_)));
        let state = engine.current_state();

        let second = engine.process(&snapshot, at(700));
        assert_eq!(
            second,
            CycleOutcome::Unchanged(UnchangedReason::AlreadyActive)
        );
        assert_eq!(engine.current_state(), state);
    }

    #[test]
    fn out_of_band_retains_state() {
        let layout = page();
        let mut engine = mount(&layout);
        engine.process(&layout.snapshot(1100.0, engine.blocks()), at(600));

        // Block 2 band ends at bottom <= 240, block 3 band starts at top <= 160:
        // scroll 1800 puts block 2 bottom at 200 and block 3 top at 200.
        let outcome = engine.process(&layout.snapshot(1800.0, engine.blocks()), at(2000));
        assert_eq!(
            outcome,
            CycleOutcome::Unchanged(UnchangedReason::NoCandidate)
        );
        assert_eq!(engine.current_state().active_block_id, id(2));
    }

    #[test]
    fn malformed_snapshot_is_skipped() {
        let layout = page();
        let mut engine = mount(&layout);
        let seen = recorder(&mut engine);

        let mut snapshot = layout.snapshot(1100.0, engine.blocks());
        snapshot.block_rects.remove(&id(3));
        let outcome = engine.process(&snapshot, at(600));

        assert_eq!(outcome, CycleOutcome::Skipped(SnapshotError::MissingGeometry(id(3))));
        assert_eq!(engine.current_state().active_block_id, id(1));
        assert!(seen.borrow().is_empty());
        assert_eq!(engine.stats().malformed_snapshots, 1);
    }

    #[test]
    fn pinned_only_change_when_section_scrolls_away() {
        let layout = page();
        let mut engine = mount(&layout);
        let seen = recorder(&mut engine);
        engine.process(&layout.snapshot(1100.0, engine.blocks()), at(600));
        assert!(engine.current_state().pinned);

        // Scroll back above the section: section top at 400 > 0, block 1 not in band.
        let outcome = engine.process(&layout.snapshot(100.0, engine.blocks()), at(700));
        let change = outcome.change().copied().expect("pinned change");
        assert_eq!(change.kind, ChangeKind::PinnedOnly);
        assert_eq!(change.active_block_id, id(2));
        assert!(!change.pinned);
        assert_eq!(seen.borrow().len(), 2);
    }

    #[test]
    fn removed_listener_is_not_called() {
        let layout = page();
        let mut engine = mount(&layout);
        let seen = Rc::new(RefCell::new(0u32));
        let sink = Rc::clone(&seen);
        let handle = engine.on_activation_change(move |_| *sink.borrow_mut() += 1);
        assert!(engine.remove_listener(handle));
        assert!(!engine.remove_listener(handle));

        engine.process(&layout.snapshot(1100.0, engine.blocks()), at(600));
        assert_eq!(*seen.borrow(), 0);
    }

    #[test]
    fn unmount_drops_listeners_and_returns_state() {
        let layout = page();
        let mut engine = mount(&layout);
        let seen = recorder(&mut engine);
        engine.process(&layout.snapshot(1100.0, engine.blocks()), at(600));

        let final_state = engine.unmount();
        assert_eq!(final_state.active_block_id, id(2));
        // The engine owned the only other reference to the sink.
        assert_eq!(Rc::strong_count(&seen), 1);
    }

    #[test]
    fn sparse_ids_walk_in_registration_order() {
        let mut engine = ActivationEngine::mount(
            [id(10), id(20), id(30)],
            EngineConfig::default(),
            t0(),
        )
        .expect("valid mount");
        let rects: BTreeMap<BlockId, BlockRect> = [
            (id(10), BlockRect::new(-900.0, 500.0)),
            (id(20), BlockRect::new(-400.0, 500.0)),
            (id(30), BlockRect::new(100.0, 500.0)),
        ]
        .into_iter()
        .collect();
        let snapshot = ViewportSnapshot {
            scroll_y: 1300.0,
            viewport_height: 800.0,
            document_height: 4000.0,
            section_top: -900.0,
            section_bottom: 600.0,
            block_rects: rects,
        };
        // 30 is two steps from 10, and 20 is still visible: held at 20.
        let outcome = engine.process(&snapshot, at(600));
        assert_eq!(outcome.change().map(|c| c.active_block_id), Some(id(20)));
    }

    /// 1000px header, five 800px blocks, 800px footer. Scrolling to the top
    /// takes the whole section out of the viewport.
    fn tall_header_page() -> PageLayout {
        PageLayout {
            viewport_height: 800.0,
            document_height: Some(5800.0),
            section: None,
            blocks: (1..=5)
                .map(|n| LayoutBlock {
                    id: id(n),
                    top: 1000.0 + f64::from(n - 1) * 800.0,
                    height: 800.0,
                })
                .collect(),
        }
    }

    #[test]
    fn pin_stays_released_after_last_block_until_section_leaves() {
        let layout = tall_header_page();
        let mut engine = mount(&layout);

        for (ms, y, expected) in [(1000, 1700.0, 2), (2000, 2500.0, 3), (3000, 3300.0, 4)] {
            engine.process(&layout.snapshot(y, engine.blocks()), at(ms));
            assert_eq!(engine.current_state().active_block_id, id(expected));
            assert!(engine.current_state().pinned, "y={y}");
        }
        engine.process(&layout.snapshot(4100.0, engine.blocks()), at(4000));
        assert_eq!(engine.current_state().active_block_id, id(5));
        assert!(!engine.current_state().pinned);
        assert!(engine.current_state().pin_released);

        // Back up into 4 and 3 with the section still on screen: stays inline.
        let outcome = engine.process(&layout.snapshot(3900.0, engine.blocks()), at(5000));
        let change = outcome.change().copied().expect("transition");
        assert_eq!(change.active_block_id, id(4));
        assert!(!change.pinned);
        engine.process(&layout.snapshot(3100.0, engine.blocks()), at(6000));
        assert_eq!(engine.current_state().active_block_id, id(3));
        assert!(!engine.current_state().pinned);

        // Section fully below the viewport: latch clears, nothing to notify.
        let outcome = engine.process(&layout.snapshot(100.0, engine.blocks()), at(7000));
        assert_eq!(
            outcome,
            CycleOutcome::Unchanged(UnchangedReason::NoCandidate)
        );
        assert!(!engine.current_state().pin_released);

        // Re-entering with block 3 still active pins again.
        let outcome = engine.process(&layout.snapshot(2500.0, engine.blocks()), at(8000));
        let change = outcome.change().copied().expect("pinned change");
        assert_eq!(change.kind, ChangeKind::PinnedOnly);
        assert_eq!(change.active_block_id, id(3));
        assert!(change.pinned);
    }

    #[test]
    fn top_edge_jumps_straight_to_first_block() {
        // Short blocks: at the page top, blocks 1..=4 are all on screen.
        let layout = PageLayout {
            viewport_height: 800.0,
            document_height: Some(2000.0),
            section: None,
            blocks: (1..=5)
                .map(|n| LayoutBlock {
                    id: id(n),
                    top: f64::from(n - 1) * 200.0,
                    height: 200.0,
                })
                .collect(),
        };
        let mut engine = mount(&layout);
        let max = layout.max_scroll(800.0);
        engine.process(&layout.snapshot(max, engine.blocks()), at(10));
        assert_eq!(engine.current_state().active_block_id, id(5));

        // Programmatic jump to the top, 1ms later: neither the skip guard nor
        // the dwell window holds it at block 4.
        let outcome = engine.process(&layout.snapshot(0.0, engine.blocks()), at(11));
        let change = outcome.change().copied().expect("boundary transition");
        assert_eq!(change.kind, ChangeKind::BoundaryOverride);
        assert_eq!(change.active_block_id, id(1));
        assert_eq!(change.previous_block_id, Some(id(5)));
        assert_eq!(engine.stats().skip_corrections, 0);
        assert_eq!(engine.stats().boundary_overrides, 2);
    }
}
