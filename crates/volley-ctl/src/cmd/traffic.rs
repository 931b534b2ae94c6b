//! `volley-ctl traffic` — push flows, start them, wait, report counters.

use std::collections::BTreeSet;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use volley_core::config::VolleyConfig;
use volley_core::{MetricsKind, Scope, WaitPolicy};
use volley_services::SessionController;

use super::{controller, load_intents};
use crate::output::stdout_reporter;
use crate::presets;

pub struct TrafficArgs<'a> {
    pub intent: Option<&'a Path>,
    pub reverse: bool,
    pub wait_secs: Option<u64>,
    pub stop_after: bool,
}

pub async fn cmd_traffic(config: &VolleyConfig, args: TrafficArgs<'_>) -> Result<()> {
    let intents = load_intents(args.intent, || presets::traffic(args.reverse))?;
    let session_config =
        volley_core::build(&intents.intents()).context("intent failed validation")?;
    let names: BTreeSet<String> = session_config.flow_names().into_iter().collect();
    anyhow::ensure!(!names.is_empty(), "no flows to run");

    let policy = match args.wait_secs {
        Some(secs) => WaitPolicy::fixed(Duration::from_secs(secs)),
        None => config.wait.traffic.clone(),
    };

    let mut session = SessionController::new(controller(config)?);
    session
        .configure(session_config)
        .await
        .context("failed to configure controller")?;
    session
        .start(Scope::Traffic)
        .await
        .context("failed to start traffic")?;

    let collected = session
        .wait_and_collect(&names, MetricsKind::Flow, &policy)
        .await;
    if args.stop_after {
        session.stop(Scope::Traffic).await;
    }
    let snapshot = collected.context("failed to collect flow metrics")?;

    stdout_reporter(config.output.format).report(snapshot)
}
