//! `volley-ctl metrics` — one-shot metrics query.

use std::collections::BTreeSet;
use std::sync::Arc;

use anyhow::{Context, Result};
use volley_core::config::VolleyConfig;
use volley_core::MetricsKind;
use volley_services::{MetricsCollector, TokioClock};

use super::controller;
use crate::output::stdout_reporter;

pub async fn cmd_metrics(config: &VolleyConfig, kind: MetricsKind, names: Vec<String>) -> Result<()> {
    let names: BTreeSet<String> = names.into_iter().collect();
    let collector = MetricsCollector::new(controller(config)?, Arc::new(TokioClock::new()));
    let snapshot = collector
        .collect(&names, kind)
        .await
        .with_context(|| format!("failed to collect {kind} metrics"))?;
    stdout_reporter(config.output.format).report(snapshot)
}
