//! Wait/poll policy between `start` and metrics collection.
//!
//! Protocol convergence is asynchronous, so the orchestrator never relies on
//! a hidden sleep: the caller picks a policy, usually from the config file.

use std::collections::BTreeSet;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::metrics::{MetricsSnapshot, SessionState, TransmitState};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum WaitPolicy {
    /// Sleep once, then collect once.
    Fixed { delay_secs: u64 },
    /// Collect now and every `interval_ms` until `until` holds or
    /// `timeout_secs` elapses. The last snapshot wins either way.
    Poll {
        interval_ms: u64,
        timeout_secs: u64,
        #[serde(default)]
        until: Convergence,
    },
}

impl WaitPolicy {
    /// Sub-second remainders round up to the next whole second.
    pub fn fixed(delay: Duration) -> Self {
        Self::Fixed {
            delay_secs: secs_rounded_up(delay),
        }
    }

    /// `timeout` rounds up to whole seconds; `interval` keeps millisecond
    /// precision.
    pub fn poll(interval: Duration, timeout: Duration, until: Convergence) -> Self {
        Self::Poll {
            interval_ms: u64::try_from(interval.as_millis()).unwrap_or(u64::MAX),
            timeout_secs: secs_rounded_up(timeout),
            until,
        }
    }

    /// Intervals and timeouts must be non-zero so a poll loop always ends
    /// and never spins.
    pub fn validate(&self) -> Result<(), String> {
        match self {
            Self::Fixed { .. } => Ok(()),
            Self::Poll {
                interval_ms,
                timeout_secs,
                ..
            } => {
                if *interval_ms == 0 {
                    return Err("poll interval_ms must be greater than 0".to_string());
                }
                if *timeout_secs == 0 {
                    return Err("poll timeout_secs must be greater than 0".to_string());
                }
                Ok(())
            }
        }
    }
}

fn secs_rounded_up(d: Duration) -> u64 {
    let secs = d.as_secs();
    if d.subsec_nanos() > 0 {
        secs.saturating_add(1)
    } else {
        secs
    }
}

/// Built-in convergence predicates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Convergence {
    /// Every requested entity appears in the snapshot.
    #[default]
    AllPresent,
    /// Every requested peer reports session state `up`.
    PeersUp,
    /// Every requested flow reports transmit state `stopped`.
    FlowsStopped,
}

impl Convergence {
    /// An empty `names` set means "whatever the snapshot holds", which must
    /// then be non-empty.
    pub fn is_satisfied(&self, snapshot: &MetricsSnapshot, names: &BTreeSet<String>) -> bool {
        let wanted: BTreeSet<String> = if names.is_empty() {
            snapshot.names()
        } else {
            names.clone()
        };
        if wanted.is_empty() {
            return false;
        }

        match self {
            Self::AllPresent => wanted.iter().all(|n| snapshot.names().contains(n)),
            Self::PeersUp => wanted.iter().all(|n| {
                snapshot
                    .peer(n)
                    .map(|p| p.session_state == SessionState::Up)
                    .unwrap_or(false)
            }),
            Self::FlowsStopped => wanted.iter().all(|n| {
                snapshot
                    .flow(n)
                    .map(|f| f.transmit == TransmitState::Stopped)
                    .unwrap_or(false)
            }),
        }
    }
}
