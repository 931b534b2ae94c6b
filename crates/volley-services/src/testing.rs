//! Scripted in-memory controller for unit tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use volley_core::otg::{
    Bgpv4MetricRecord, ControlState, MetricsRequest, MetricsResponse, SessionConfig, Warnings,
};
use volley_core::{Controller, RemoteError};

/// Replies from queues, falling back to success, and records every call.
#[derive(Default)]
pub struct ScriptedController {
    config_replies: Mutex<VecDeque<Result<Warnings, RemoteError>>>,
    control_replies: Mutex<VecDeque<Result<Warnings, RemoteError>>>,
    metrics_replies: Mutex<VecDeque<Result<MetricsResponse, RemoteError>>>,
    metrics_fallback: Mutex<Option<MetricsResponse>>,

    configs: Mutex<Vec<SessionConfig>>,
    controls: Mutex<Vec<ControlState>>,
    metrics: Mutex<Vec<MetricsRequest>>,
}

impl ScriptedController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_config(&self, reply: Result<Warnings, RemoteError>) {
        self.config_replies.lock().unwrap().push_back(reply);
    }

    pub fn push_control(&self, reply: Result<Warnings, RemoteError>) {
        self.control_replies.lock().unwrap().push_back(reply);
    }

    pub fn push_metrics(&self, reply: Result<MetricsResponse, RemoteError>) {
        self.metrics_replies.lock().unwrap().push_back(reply);
    }

    /// Served whenever the metrics queue is empty.
    pub fn repeat_metrics(&self, reply: MetricsResponse) {
        *self.metrics_fallback.lock().unwrap() = Some(reply);
    }

    pub fn configs(&self) -> Vec<SessionConfig> {
        self.configs.lock().unwrap().clone()
    }

    pub fn controls(&self) -> Vec<ControlState> {
        self.controls.lock().unwrap().clone()
    }

    pub fn metrics_requests(&self) -> Vec<MetricsRequest> {
        self.metrics.lock().unwrap().clone()
    }
}

#[async_trait]
impl Controller for ScriptedController {
    async fn push_config(&self, config: &SessionConfig) -> Result<Warnings, RemoteError> {
        self.configs.lock().unwrap().push(config.clone());
        self.config_replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Warnings::default()))
    }

    async fn set_control_state(&self, state: &ControlState) -> Result<Warnings, RemoteError> {
        self.controls.lock().unwrap().push(state.clone());
        self.control_replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Warnings::default()))
    }

    async fn query_metrics(&self, request: &MetricsRequest) -> Result<MetricsResponse, RemoteError> {
        self.metrics.lock().unwrap().push(request.clone());
        if let Some(reply) = self.metrics_replies.lock().unwrap().pop_front() {
            return reply;
        }
        self.metrics_fallback
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| RemoteError::Protocol("no scripted metrics reply".into()))
    }
}

pub fn peer_record(name: &str, state: &str) -> Bgpv4MetricRecord {
    Bgpv4MetricRecord {
        name: name.into(),
        session_state: Some(state.into()),
        ..Default::default()
    }
}
