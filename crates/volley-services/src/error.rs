//! Orchestrator error taxonomy.
//!
//! One variant per failure kind so callers branch on the kind instead of
//! matching message text. Remote detail travels inside untouched.

use volley_core::{RemoteError, ValidationError};

use crate::session::SessionPhase;

/// Why a configure or control operation did not happen.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Failure {
    /// Refused locally; no remote call was made.
    #[error("cannot {action} while session is {phase}")]
    IllegalState {
        action: &'static str,
        phase: SessionPhase,
    },

    #[error(transparent)]
    Remote(#[from] RemoteError),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OrchestratorError {
    /// Bad intent, caught before any remote call.
    #[error("invalid intent: {0}")]
    Validation(#[from] ValidationError),

    #[error("remote config error: {0}")]
    RemoteConfig(Failure),

    #[error("remote control error: {0}")]
    RemoteControl(Failure),

    /// The metrics query itself failed. An empty result is not an error.
    #[error("metrics unavailable: {0}")]
    MetricsUnavailable(RemoteError),
}

impl OrchestratorError {
    /// The underlying controller error, when there was a remote call.
    pub fn remote(&self) -> Option<&RemoteError> {
        match self {
            Self::RemoteConfig(Failure::Remote(e))
            | Self::RemoteControl(Failure::Remote(e))
            | Self::MetricsUnavailable(e) => Some(e),
            _ => None,
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    pub fn is_remote_config(&self) -> bool {
        matches!(self, Self::RemoteConfig(_))
    }

    pub fn is_remote_control(&self) -> bool {
        matches!(self, Self::RemoteControl(_))
    }

    pub fn is_metrics_unavailable(&self) -> bool {
        matches!(self, Self::MetricsUnavailable(_))
    }
}
