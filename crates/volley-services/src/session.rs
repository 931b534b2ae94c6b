//! Session lifecycle against one OTG controller.
//!
//! ```text
//! Idle ──configure──▶ Configured ──start──▶ Running ──stop──▶ Stopped
//!                          │                   │
//!                          └──remote error──▶ Failed ──reset──▶ Idle
//! ```
//!
//! Every remote call is awaited before the next one is issued. Callers that
//! share a controller must serialize access; every mutating call takes
//! `&mut self`.

use std::collections::BTreeSet;
use std::sync::Arc;

use volley_core::metrics::MetricsKind;
use volley_core::{
    Controller, ControlState, MetricsSnapshot, RemoteError, Scope, SessionConfig, Transition,
    WaitPolicy,
};

use crate::clock::{Clock, TokioClock};
use crate::collector::MetricsCollector;
use crate::error::{Failure, OrchestratorError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Idle,
    Configured,
    Running,
    Stopped,
    Failed,
}

impl std::fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => f.write_str("idle"),
            Self::Configured => f.write_str("configured"),
            Self::Running => f.write_str("running"),
            Self::Stopped => f.write_str("stopped"),
            Self::Failed => f.write_str("failed"),
        }
    }
}

/// What happened to a STOP request. `stop` reports, it never fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopOutcome {
    Acknowledged,
    RemoteFailed(RemoteError),
}

impl StopOutcome {
    pub fn is_acknowledged(&self) -> bool {
        matches!(self, Self::Acknowledged)
    }
}

pub struct SessionController {
    controller: Arc<dyn Controller>,
    clock: Arc<dyn Clock>,
    phase: SessionPhase,
    config: Option<SessionConfig>,
    failure: Option<String>,
}

impl SessionController {
    pub fn new(controller: Arc<dyn Controller>) -> Self {
        Self::with_clock(controller, Arc::new(TokioClock::new()))
    }

    pub fn with_clock(controller: Arc<dyn Controller>, clock: Arc<dyn Clock>) -> Self {
        Self {
            controller,
            clock,
            phase: SessionPhase::Idle,
            config: None,
            failure: None,
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// The config last accepted by the controller.
    pub fn config(&self) -> Option<&SessionConfig> {
        self.config.as_ref()
    }

    /// Why the session entered `Failed`.
    pub fn failure(&self) -> Option<&str> {
        self.failure.as_deref()
    }

    /// A collector bound to the same controller and clock.
    pub fn collector(&self) -> MetricsCollector {
        MetricsCollector::new(self.controller.clone(), self.clock.clone())
    }

    /// Push `config`, replacing whatever the controller held.
    pub async fn configure(&mut self, config: SessionConfig) -> Result<(), OrchestratorError> {
        if matches!(self.phase, SessionPhase::Running | SessionPhase::Failed) {
            return Err(OrchestratorError::RemoteConfig(Failure::IllegalState {
                action: "configure",
                phase: self.phase,
            }));
        }

        let digest = config.digest();
        match self.controller.push_config(&config).await {
            Ok(ack) => {
                for warning in &ack.warnings {
                    tracing::warn!(digest = %digest, warning = %warning, "controller warning");
                }
                tracing::info!(
                    digest = %digest,
                    ports = config.ports.len(),
                    devices = config.devices.len(),
                    flows = config.flows.len(),
                    "configuration accepted"
                );
                self.config = Some(config);
                self.phase = SessionPhase::Configured;
                Ok(())
            }
            Err(e) => {
                tracing::error!(digest = %digest, error = %e, "configuration rejected");
                // The controller's state is unknown after a failed push.
                self.config = None;
                self.fail(e.to_string());
                Err(OrchestratorError::RemoteConfig(Failure::Remote(e)))
            }
        }
    }

    /// Issue START for `scope`. Only legal from `Configured`.
    pub async fn start(&mut self, scope: Scope) -> Result<(), OrchestratorError> {
        if self.phase != SessionPhase::Configured {
            return Err(OrchestratorError::RemoteControl(Failure::IllegalState {
                action: "start",
                phase: self.phase,
            }));
        }

        let state = ControlState::new(scope, Transition::Start);
        match self.controller.set_control_state(&state).await {
            Ok(ack) => {
                for warning in &ack.warnings {
                    tracing::warn!(scope = %scope, warning = %warning, "controller warning");
                }
                tracing::info!(scope = %scope, "started");
                self.phase = SessionPhase::Running;
                Ok(())
            }
            Err(e) => {
                tracing::error!(scope = %scope, error = %e, "start failed");
                self.fail(e.to_string());
                Err(OrchestratorError::RemoteControl(Failure::Remote(e)))
            }
        }
    }

    /// Best-effort STOP for `scope`.
    ///
    /// The remote STOP is always sent, whatever the local phase, so a
    /// session started elsewhere can still be stopped. Repeating it is
    /// harmless.
    pub async fn stop(&mut self, scope: Scope) -> StopOutcome {
        let state = ControlState::new(scope, Transition::Stop);
        let outcome = match self.controller.set_control_state(&state).await {
            Ok(_) => {
                tracing::info!(scope = %scope, "stopped");
                StopOutcome::Acknowledged
            }
            Err(e) => {
                tracing::warn!(scope = %scope, error = %e, "stop not acknowledged");
                StopOutcome::RemoteFailed(e)
            }
        };

        if self.phase != SessionPhase::Failed {
            self.phase = SessionPhase::Stopped;
        }
        outcome
    }

    /// Forget the config and any failure, back to `Idle`. No remote call.
    pub fn reset(&mut self) {
        tracing::debug!(from = %self.phase, "session reset");
        self.config = None;
        self.failure = None;
        self.phase = SessionPhase::Idle;
    }

    /// Wait per `policy`, then collect metrics for `names`.
    pub async fn wait_and_collect(
        &self,
        names: &BTreeSet<String>,
        kind: MetricsKind,
        policy: &WaitPolicy,
    ) -> Result<MetricsSnapshot, OrchestratorError> {
        self.collector().wait_and_collect(names, kind, policy).await
    }

    fn fail(&mut self, reason: String) {
        self.failure = Some(reason);
        self.phase = SessionPhase::Failed;
    }
}
