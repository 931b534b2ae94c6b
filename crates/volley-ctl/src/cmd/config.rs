//! `volley-ctl config` — inspect or create the config file.

use anyhow::{Context, Result};
use volley_core::config::VolleyConfig;

pub fn cmd_config_init() -> Result<()> {
    let path = VolleyConfig::write_default_if_missing().context("failed to write config")?;
    println!("✓ Config at {}", path.display());
    Ok(())
}

pub fn cmd_config_show(config: &VolleyConfig) -> Result<()> {
    println!("# {}", VolleyConfig::file_path().display());
    print!("{}", config.to_toml().context("failed to encode config")?);
    Ok(())
}
