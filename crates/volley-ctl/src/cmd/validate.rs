//! `volley-ctl validate` — build an intent file offline and print the result.

use std::path::Path;

use anyhow::{Context, Result};

use super::load_intents;

pub fn cmd_validate(intent: &Path) -> Result<()> {
    let intents = load_intents(Some(intent), Default::default)?;
    let config = volley_core::build(&intents.intents()).context("intent failed validation")?;

    println!("{}", config.to_json_pretty().context("failed to encode config")?);
    eprintln!("═══════════════════════════════════════");
    eprintln!("  Valid");
    eprintln!("═══════════════════════════════════════");
    eprintln!("  Ports   : {}", config.ports.len());
    eprintln!("  Devices : {}", config.devices.len());
    eprintln!("  Peers   : {}", config.peer_names().len());
    eprintln!("  Flows   : {}", config.flows.len());
    eprintln!("  Digest  : {}", config.digest());
    Ok(())
}
