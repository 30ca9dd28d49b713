//! `focusscroll replay`: drive an engine through a recorded scenario.

use std::path::Path;

use anyhow::Context;
use focusscroll_core::CycleOutcome;
use focusscroll_core::scenario::{LayoutHost, Scenario, StepRecord};

use crate::cli::{OutputFormat, ReplayOpts};
use crate::context::{format_change, resolve_config};

pub fn load_scenario(path: &Path) -> anyhow::Result<Scenario> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading scenario {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing scenario {}", path.display()))
}

/// Replay and print. Returns the process exit code.
///
/// The scenario's embedded config is used unless `--config` is given.
pub fn cmd_replay(
    opts: &ReplayOpts,
    config_path: Option<&Path>,
    min_dwell_ms: Option<u64>,
) -> anyhow::Result<i32> {
    let scenario = load_scenario(&opts.path)?;
    let config = resolve_config(config_path, min_dwell_ms, scenario.config.clone())?;
    let Some(mounted_at) = scenario.mount_time() else {
        tracing::warn!(scenario = %scenario.name, "scenario has no steps");
        return Ok(0);
    };

    let mut host = LayoutHost::mount(scenario.layout.clone(), config, mounted_at)
        .with_context(|| format!("mounting scenario {}", scenario.name))?;
    tracing::info!(
        scenario = %scenario.name,
        steps = scenario.steps.len(),
        blocks = host.engine().blocks().len(),
        "replaying"
    );

    let mut mismatches = Vec::new();
    for (index, step) in scenario.steps.iter().enumerate() {
        let (trigger, scroll_y, outcome) = host.apply(&step.event);
        let record = StepRecord {
            index,
            trigger,
            scroll_y,
            outcome,
            state: host.engine().current_state(),
        };

        match &record.outcome {
            CycleOutcome::Skipped(error) => {
                if opts.format == OutputFormat::Text {
                    println!("step {index:>3}  skipped: {error}");
                }
            }
            outcome => {
                if let Some(change) = outcome.change() {
                    println!("{}", format_change(&record, change, opts.format)?);
                }
            }
        }

        if opts.check {
            if let Some(m) = step.expect.as_ref().and_then(|e| record.mismatch(e)) {
                mismatches.push(m);
            }
        }
    }

    let stats = host.engine().stats();
    tracing::info!(
        cycles = stats.cycles,
        transitions = stats.transitions,
        boundary_overrides = stats.boundary_overrides,
        skip_corrections = stats.skip_corrections,
        dwell_suppressed = stats.dwell_suppressed,
        malformed = stats.malformed_snapshots,
        "replay finished"
    );
    host.unmount();

    if mismatches.is_empty() {
        if opts.check {
            eprintln!("{}: all expectations met", scenario.name);
        }
        Ok(0)
    } else {
        for m in &mismatches {
            eprintln!("{}: {m}", scenario.name);
        }
        Ok(1)
    }
}
