//! `focusscroll config`: print the effective engine config.

use focusscroll_core::EngineConfig;

pub fn render_config(config: &EngineConfig) -> anyhow::Result<String> {
    Ok(toml::to_string(config)?)
}

pub fn cmd_config(config: &EngineConfig) -> anyhow::Result<()> {
    print!("{}", render_config(config)?);
    Ok(())
}
