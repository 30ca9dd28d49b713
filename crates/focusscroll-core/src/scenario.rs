//! Recorded scroll sessions: a page layout plus timed host events.
//!
//! Used by the fixture tests and by the `focusscroll` binary to drive an
//! engine without a browser.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::engine::{ActivationEngine, CycleOutcome};
use crate::error::ActivationError;
use crate::layout::PageLayout;
use crate::types::{ActivationState, BlockId, Trigger};

/// One scroll or resize event as the host observed it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostEvent {
    pub at: DateTime<Utc>,
    pub scroll_y: f64,
    /// Present on resize events.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub viewport_height: Option<f64>,
}

/// Expected engine state after a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expectation {
    pub active: BlockId,
    #[serde(default)]
    pub pinned: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioStep {
    #[serde(flatten)]
    pub event: HostEvent,
    #[serde(default)]
    pub expect: Option<Expectation>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Mount time. Defaults to the first step's timestamp.
    #[serde(default)]
    pub mounted_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub config: Option<EngineConfig>,
    pub layout: PageLayout,
    pub steps: Vec<ScenarioStep>,
}

/// Result of one replayed step.
#[derive(Debug, Clone, PartialEq)]
pub struct StepRecord {
    pub index: usize,
    pub trigger: Trigger,
    pub scroll_y: f64,
    pub outcome: CycleOutcome,
    pub state: ActivationState,
}

impl StepRecord {
    /// Human-readable mismatch against `expect`, if any.
    pub fn mismatch(&self, expect: &Expectation) -> Option<String> {
        let active_ok = self.state.active_block_id == expect.active;
        let pinned_ok = expect.pinned.is_none_or(|p| p == self.state.pinned);
        if active_ok && pinned_ok {
            return None;
        }
        Some(format!(
            "step {} (scroll_y={}): expected active={} pinned={:?}, got active={} pinned={}",
            self.index,
            self.scroll_y,
            expect.active,
            expect.pinned,
            self.state.active_block_id,
            self.state.pinned
        ))
    }
}

/// Drives an engine against a [`PageLayout`] the way a browser host would:
/// clamps scroll offsets, tracks the current viewport height, and labels
/// each event as a scroll or a resize.
pub struct LayoutHost {
    layout: PageLayout,
    viewport_height: f64,
    engine: ActivationEngine,
}

impl LayoutHost {
    pub fn mount(
        layout: PageLayout,
        config: EngineConfig,
        now: DateTime<Utc>,
    ) -> Result<Self, ActivationError> {
        let engine = ActivationEngine::mount(layout.block_ids(), config, now)?;
        Ok(Self {
            viewport_height: layout.viewport_height,
            layout,
            engine,
        })
    }

    pub fn engine(&self) -> &ActivationEngine {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut ActivationEngine {
        &mut self.engine
    }

    pub fn apply(&mut self, event: &HostEvent) -> (Trigger, f64, CycleOutcome) {
        let trigger = match event.viewport_height {
            Some(h) if h != self.viewport_height => {
                self.viewport_height = h;
                Trigger::Resize
            }
            _ => Trigger::Scroll,
        };
        let scroll_y = self.layout.clamp_scroll(event.scroll_y, self.viewport_height);
        let view = self.layout.view(scroll_y, self.viewport_height);
        let outcome = self.engine.handle(trigger, &view, event.at);
        (trigger, scroll_y, outcome)
    }

    pub fn unmount(self) -> ActivationState {
        self.engine.unmount()
    }
}

impl Scenario {
    pub fn mount_time(&self) -> Option<DateTime<Utc>> {
        self.mounted_at
            .or_else(|| self.steps.first().map(|s| s.event.at))
    }

    /// Replay every step. `config` overrides the scenario's own config.
    pub fn replay(&self, config: Option<EngineConfig>) -> Result<Vec<StepRecord>, ActivationError> {
        let config = config
            .or_else(|| self.config.clone())
            .unwrap_or_default();
        let Some(mounted_at) = self.mount_time() else {
            return Ok(Vec::new());
        };

        let mut host = LayoutHost::mount(self.layout.clone(), config, mounted_at)?;
        let records = self
            .steps
            .iter()
            .enumerate()
            .map(|(index, step)| {
                let (trigger, scroll_y, outcome) = host.apply(&step.event);
                StepRecord {
                    index,
                    trigger,
                    scroll_y,
                    outcome,
                    state: host.engine().current_state(),
                }
            })
            .collect();
        host.unmount();
        Ok(records)
    }

    /// Replay and collect every expectation mismatch.
    pub fn check(&self, config: Option<EngineConfig>) -> Result<Vec<String>, ActivationError> {
        let records = self.replay(config)?;
        Ok(self
            .steps
            .iter()
            .zip(&records)
            .filter_map(|(step, record)| step.expect.as_ref().and_then(|e| record.mismatch(e)))
            .collect())
    }
}
