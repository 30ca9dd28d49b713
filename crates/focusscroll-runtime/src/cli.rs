//! CLI definition using clap derive.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "focusscroll", about = "scroll-linked section activation host")]
pub struct Cli {
    /// Engine config file (TOML)
    #[arg(long, short = 'c', global = true, env = "FOCUSSCROLL_CONFIG")]
    pub config: Option<PathBuf>,

    /// Override the minimum dwell time in milliseconds
    #[arg(long, global = true)]
    pub min_dwell_ms: Option<u64>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Replay a recorded scenario file and print every notification
    Replay(ReplayOpts),
    /// Read JSON events from stdin, one per line, and print notifications as JSON lines
    Stream(StreamOpts),
    /// Print the effective engine config as TOML
    Config,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(clap::Args)]
pub struct ReplayOpts {
    /// Scenario file (JSON)
    pub path: PathBuf,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Compare against the scenario's expectations; exit 1 on mismatch
    #[arg(long)]
    pub check: bool,
}

#[derive(clap::Args)]
pub struct StreamOpts {
    /// Page layout file (JSON)
    #[arg(long)]
    pub layout: PathBuf,

    /// Print engine counters to stderr on exit
    #[arg(long)]
    pub stats: bool,
}
