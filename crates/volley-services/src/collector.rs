//! Metrics collection and the wait policies that precede it.
//!
//! `collect` is one remote query with no retry. `wait_and_collect` applies a
//! [`WaitPolicy`]: either sleep once then collect, or poll until a
//! convergence predicate holds or the timeout runs out.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use volley_core::metrics::MetricsKind;
use volley_core::otg::MetricsResponse;
use volley_core::{Controller, MetricsSnapshot, RemoteError, WaitPolicy};

use crate::clock::Clock;
use crate::error::OrchestratorError;

#[derive(Clone)]
pub struct MetricsCollector {
    controller: Arc<dyn Controller>,
    clock: Arc<dyn Clock>,
}

impl MetricsCollector {
    pub fn new(controller: Arc<dyn Controller>, clock: Arc<dyn Clock>) -> Self {
        Self { controller, clock }
    }

    /// One metrics query. An empty `names` set asks for every entity.
    ///
    /// A successful query that matches nothing yields an empty snapshot.
    pub async fn collect(
        &self,
        names: &BTreeSet<String>,
        kind: MetricsKind,
    ) -> Result<MetricsSnapshot, OrchestratorError> {
        let request = kind.request(names);
        let response = self
            .controller
            .query_metrics(&request)
            .await
            .map_err(OrchestratorError::MetricsUnavailable)?;

        let snapshot = match (kind, response) {
            (MetricsKind::Flow, MetricsResponse::FlowMetrics { flow_metrics }) => {
                MetricsSnapshot::from_flow_records(flow_metrics, names)
            }
            (MetricsKind::Bgpv4, MetricsResponse::Bgpv4Metrics { bgpv4_metrics }) => {
                MetricsSnapshot::from_peer_records(bgpv4_metrics, names)
            }
            (kind, _) => {
                return Err(OrchestratorError::MetricsUnavailable(RemoteError::Protocol(
                    format!("asked for {kind} metrics, got a different kind"),
                )))
            }
        };

        tracing::debug!(
            kind = %kind,
            requested = names.len(),
            returned = snapshot.len(),
            "metrics collected"
        );
        Ok(snapshot)
    }

    pub async fn wait_and_collect(
        &self,
        names: &BTreeSet<String>,
        kind: MetricsKind,
        policy: &WaitPolicy,
    ) -> Result<MetricsSnapshot, OrchestratorError> {
        match policy {
            WaitPolicy::Fixed { delay_secs } => {
                tracing::info!(kind = %kind, delay_secs, "waiting before collection");
                self.clock.sleep(Duration::from_secs(*delay_secs)).await;
                self.collect(names, kind).await
            }
            WaitPolicy::Poll {
                interval_ms,
                timeout_secs,
                until,
            } => {
                let until = *until;
                self.wait_and_collect_until(
                    names,
                    kind,
                    Duration::from_millis(*interval_ms),
                    Duration::from_secs(*timeout_secs),
                    |snapshot| until.is_satisfied(snapshot, names),
                )
                .await
            }
        }
    }

    /// Collect now, then every `interval` until `converged` holds or
    /// `timeout` has passed. The last snapshot is returned either way.
    ///
    /// A failed query ends the loop with `MetricsUnavailable`.
    pub async fn wait_and_collect_until<F>(
        &self,
        names: &BTreeSet<String>,
        kind: MetricsKind,
        interval: Duration,
        timeout: Duration,
        converged: F,
    ) -> Result<MetricsSnapshot, OrchestratorError>
    where
        F: Fn(&MetricsSnapshot) -> bool + Send + Sync,
    {
        let started = self.clock.elapsed();
        let mut polls = 0u32;
        loop {
            let snapshot = self.collect(names, kind).await?;
            polls += 1;

            if converged(&snapshot) {
                tracing::info!(kind = %kind, polls, "converged");
                return Ok(snapshot);
            }

            let spent = self.clock.elapsed().saturating_sub(started);
            if spent >= timeout {
                tracing::warn!(
                    kind = %kind,
                    polls,
                    timeout_secs = timeout.as_secs(),
                    "poll timed out before convergence; returning last snapshot"
                );
                return Ok(snapshot);
            }

            // Never sleep past the deadline; the last poll lands on it.
            let nap = interval.min(timeout - spent);
            self.clock.sleep(nap).await;
        }
    }
}
