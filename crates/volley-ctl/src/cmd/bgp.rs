//! `volley-ctl bgp` — bring up emulated BGP peers and report their state.

use std::collections::BTreeSet;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use volley_core::config::VolleyConfig;
use volley_core::{Convergence, MetricsKind, Scope, WaitPolicy};
use volley_services::SessionController;

use super::{controller, load_intents};
use crate::output::stdout_reporter;
use crate::presets;

pub struct BgpArgs<'a> {
    pub intent: Option<&'a Path>,
    pub wait_secs: Option<u64>,
    pub timeout_secs: Option<u64>,
    pub stop_after: bool,
}

/// `--wait` forces a fixed delay; `--timeout` keeps polling but caps it.
fn wait_policy(config: &VolleyConfig, args: &BgpArgs<'_>) -> WaitPolicy {
    if let Some(secs) = args.wait_secs {
        return WaitPolicy::fixed(Duration::from_secs(secs));
    }
    match (&config.wait.protocol, args.timeout_secs) {
        (WaitPolicy::Poll { interval_ms, until, .. }, Some(timeout)) => WaitPolicy::Poll {
            interval_ms: *interval_ms,
            timeout_secs: timeout,
            until: *until,
        },
        (WaitPolicy::Fixed { .. }, Some(timeout)) => WaitPolicy::poll(
            Duration::from_secs(1),
            Duration::from_secs(timeout),
            Convergence::PeersUp,
        ),
        (configured, None) => configured.clone(),
    }
}

pub async fn cmd_bgp(config: &VolleyConfig, args: BgpArgs<'_>) -> Result<()> {
    let intents = load_intents(args.intent, presets::bgp)?;
    let session_config =
        volley_core::build(&intents.intents()).context("intent failed validation")?;
    let names: BTreeSet<String> = session_config.peer_names().into_iter().collect();
    anyhow::ensure!(!names.is_empty(), "no BGP peers to bring up");

    let policy = wait_policy(config, &args);
    policy
        .validate()
        .map_err(anyhow::Error::msg)
        .context("invalid wait settings")?;

    let mut session = SessionController::new(controller(config)?);
    session
        .configure(session_config)
        .await
        .context("failed to configure controller")?;
    session
        .start(Scope::Protocol)
        .await
        .context("failed to start protocols")?;

    let collected = session
        .wait_and_collect(&names, MetricsKind::Bgpv4, &policy)
        .await;
    if args.stop_after {
        session.stop(Scope::Protocol).await;
    }
    let snapshot = collected.context("failed to collect BGP metrics")?;

    stdout_reporter(config.output.format).report(snapshot)
}
