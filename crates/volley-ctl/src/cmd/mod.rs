//! CLI command modules.

pub mod bgp;
pub mod config;
pub mod metrics;
pub mod stop;
pub mod traffic;
pub mod validate;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use volley_client::HttpController;
use volley_core::config::VolleyConfig;
use volley_core::IntentSet;

/// Controller client from the resolved config.
pub fn controller(config: &VolleyConfig) -> Result<Arc<HttpController>> {
    let client = HttpController::new(&config.controller)
        .with_context(|| format!("failed to set up client for {}", config.controller.location))?;
    Ok(Arc::new(client))
}

/// Read an intent file, or fall back to a built-in preset.
pub fn load_intents(path: Option<&Path>, preset: impl FnOnce() -> IntentSet) -> Result<IntentSet> {
    let Some(path) = path else {
        return Ok(preset());
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read intent file {}", path.display()))?;
    let set = IntentSet::from_toml_str(&text)
        .with_context(|| format!("failed to parse intent file {}", path.display()))?;
    anyhow::ensure!(!set.is_empty(), "intent file {} declares nothing", path.display());
    Ok(set)
}
