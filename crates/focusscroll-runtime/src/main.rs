//! focusscroll: headless host for the section activation engine.
//! Replays recorded scroll sessions or follows a live event stream.

use clap::Parser;

mod cli;
mod cmd_config;
mod cmd_replay;
mod cmd_stream;
mod context;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = cli::Cli::parse();

    let filter = std::env::var("FOCUSSCROLL_LOG")
        .or_else(|_| std::env::var("RUST_LOG"))
        .unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(filter))
        .with_writer(std::io::stderr)
        .init();

    match args.command {
        cli::Command::Replay(opts) => {
            let exit_code =
                cmd_replay::cmd_replay(&opts, args.config.as_deref(), args.min_dwell_ms)?;
            if exit_code != 0 {
                std::process::exit(exit_code);
            }
        }
        cli::Command::Stream(opts) => {
            let config = context::resolve_config(args.config.as_deref(), args.min_dwell_ms, None)?;
            cmd_stream::cmd_stream(&opts, config).await?;
        }
        cli::Command::Config => {
            let config = context::resolve_config(args.config.as_deref(), args.min_dwell_ms, None)?;
            cmd_config::cmd_config(&config)?;
        }
    }

    Ok(())
}
