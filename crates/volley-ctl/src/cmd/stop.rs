//! `volley-ctl stop` — stop traffic or protocols, whoever started them.

use anyhow::Result;
use volley_core::config::VolleyConfig;
use volley_core::Scope;
use volley_services::{SessionController, StopOutcome};

use super::controller;

pub async fn cmd_stop(config: &VolleyConfig, scope: Scope) -> Result<()> {
    let mut session = SessionController::new(controller(config)?);
    match session.stop(scope).await {
        StopOutcome::Acknowledged => {
            println!("✓ {scope} stopped");
            Ok(())
        }
        StopOutcome::RemoteFailed(e) => {
            Err(anyhow::Error::new(e).context(format!("failed to stop {scope}")))
        }
    }
}
