//! Result reporting contract.
//!
//! Reporters take each snapshot by value once collection is done. The CLI
//! provides table and JSON renderers; `LogReporter` emits structured events.

use anyhow::Result;
use volley_core::MetricsSnapshot;

/// Consumes metrics snapshots. Implementations decide the presentation.
pub trait ResultReporter {
    fn report(&mut self, snapshot: MetricsSnapshot) -> Result<()>;
}

/// One tracing event per entity.
#[derive(Debug, Default)]
pub struct LogReporter {
    reported: usize,
}

impl LogReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshots seen so far.
    pub fn reported(&self) -> usize {
        self.reported
    }
}

impl ResultReporter for LogReporter {
    fn report(&mut self, snapshot: MetricsSnapshot) -> Result<()> {
        if snapshot.is_empty() {
            tracing::warn!(kind = %snapshot.kind(), "no matching entities in metrics");
        }
        for f in snapshot.flows() {
            tracing::info!(
                flow = %f.name,
                tx_frames = f.tx_frames,
                rx_frames = f.rx_frames,
                lost = f.tx_frames.saturating_sub(f.rx_frames),
                "flow metrics"
            );
        }
        for p in snapshot.peers() {
            tracing::info!(
                peer = %p.name,
                state = %p.session_state,
                fsm = %p.fsm_state,
                advertised = p.routes_advertised,
                received = p.routes_received,
                "peer metrics"
            );
        }
        self.reported += 1;
        Ok(())
    }
}
