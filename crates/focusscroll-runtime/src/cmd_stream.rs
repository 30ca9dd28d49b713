//! `focusscroll stream`: live host fed by newline-delimited JSON on stdin.
//!
//! Each input line is a [`HostEvent`]. The engine is mounted on the first
//! event so the dwell clock starts at the host's own timestamps.

use std::path::Path;

use anyhow::Context;
use focusscroll_core::scenario::{HostEvent, LayoutHost};
use focusscroll_core::{EngineConfig, PageLayout};
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::cli::StreamOpts;

pub fn load_layout(path: &Path) -> anyhow::Result<PageLayout> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading layout {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing layout {}", path.display()))
}

/// Parse one input line. Blank lines yield `None`.
pub fn parse_event(line: &str) -> Option<Result<HostEvent, serde_json::Error>> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    Some(serde_json::from_str(line))
}

pub async fn cmd_stream(opts: &StreamOpts, config: EngineConfig) -> anyhow::Result<()> {
    let layout = load_layout(&opts.layout)?;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut host: Option<LayoutHost> = None;
    let mut line_num = 0usize;

    loop {
        let line = tokio::select! {
            line = lines.next_line() => line.context("reading stdin")?,
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("received ctrl-c, shutting down");
                None
            }
        };
        let Some(line) = line else { break };
        line_num += 1;

        let event = match parse_event(&line) {
            None => continue,
            Some(Ok(event)) => event,
            Some(Err(e)) => {
                tracing::warn!(line_num, error = %e, "failed to parse event line, skipping");
                continue;
            }
        };

        if host.is_none() {
            let mounted = LayoutHost::mount(layout.clone(), config.clone(), event.at)
                .context("mounting engine")?;
            tracing::info!(blocks = mounted.engine().blocks().len(), "engine mounted");
            host = Some(mounted);
        }
        let Some(active) = host.as_mut() else {
            continue;
        };

        let (_, _, outcome) = active.apply(&event);
        if let Some(change) = outcome.change() {
            println!("{}", serde_json::to_string(change)?);
        }
    }

    if let Some(host) = host {
        let stats = host.engine().stats();
        if opts.stats {
            eprintln!("{}", serde_json::to_string(&stats)?);
        }
        let state = host.unmount();
        tracing::info!(active = %state.active_block_id, cycles = stats.cycles, "stream closed");
    }
    Ok(())
}
