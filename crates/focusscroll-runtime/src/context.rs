//! Config resolution and output formatting shared by the subcommands.

use std::path::Path;

use anyhow::Context;
use focusscroll_core::scenario::StepRecord;
use focusscroll_core::{ActivationChange, EngineConfig};

use crate::cli::OutputFormat;

/// Effective engine config: `--config` file, else `fallback`, else defaults,
/// then `--min-dwell-ms` on top.
pub fn resolve_config(
    path: Option<&Path>,
    min_dwell_ms: Option<u64>,
    fallback: Option<EngineConfig>,
) -> anyhow::Result<EngineConfig> {
    let mut config = match path {
        Some(p) => EngineConfig::load(p)
            .with_context(|| format!("loading engine config {}", p.display()))?,
        None => fallback.unwrap_or_default(),
    };
    if let Some(ms) = min_dwell_ms {
        config.min_dwell_ms = ms;
    }
    config.validate()?;
    Ok(config)
}

/// One output line for a notification.
pub fn format_change(
    record: &StepRecord,
    change: &ActivationChange,
    format: OutputFormat,
) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string(change)?),
        OutputFormat::Text => {
            let from = change
                .previous_block_id
                .map(|id| id.to_string())
                .unwrap_or_else(|| "-".to_string());
            Ok(format!(
                "step {:>3}  {:<6} y={:<8} block {} (from {}){}  [{}]",
                record.index,
                record.trigger,
                record.scroll_y,
                change.active_block_id,
                from,
                if change.pinned { "  pinned" } else { "" },
                change.kind
            ))
        }
    }
}
