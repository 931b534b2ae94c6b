//! volley-client — `Controller` over the OTG REST API.
//!
//! Three JSON POSTs against the controller's base URL:
//!   /config            full configuration replace
//!   /control/state     start/stop traffic or protocols
//!   /monitor/metrics   flow and BGP counters

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;

use volley_core::config::ControllerConfig;
use volley_core::otg::{MetricsRequest, MetricsResponse, OtgError, Warnings};
use volley_core::{ControlState, Controller, RemoteError, SessionConfig};

pub struct HttpController {
    client: reqwest::Client,
    base: String,
}

impl HttpController {
    /// Build a client from `[controller]` settings. Timeouts come from the
    /// config and are never unbounded.
    pub fn new(settings: &ControllerConfig) -> Result<Self, RemoteError> {
        let client = reqwest::Client::builder()
            .timeout(settings.request_timeout())
            .connect_timeout(settings.connect_timeout())
            .danger_accept_invalid_certs(!settings.verify_tls)
            .build()
            .map_err(|e| RemoteError::Transport(error_chain(&e)))?;
        Ok(Self {
            client,
            base: settings.location.trim_end_matches('/').to_string(),
        })
    }

    pub fn location(&self) -> &str {
        &self.base
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    async fn post<B, R>(&self, path: &str, body: &B) -> Result<R, RemoteError>
    where
        B: Serialize + Sync,
        R: DeserializeOwned,
    {
        let url = self.url(path);
        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| RemoteError::Transport(error_chain(&e)))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| RemoteError::Transport(error_chain(&e)))?;
        tracing::debug!(url = %url, status = status.as_u16(), bytes = text.len(), "controller response");

        if !status.is_success() {
            return Err(rejection(status.as_u16(), &text));
        }
        decode(path, &text)
    }
}

#[async_trait]
impl Controller for HttpController {
    async fn push_config(&self, config: &SessionConfig) -> Result<Warnings, RemoteError> {
        self.post("/config", config).await
    }

    async fn set_control_state(&self, state: &ControlState) -> Result<Warnings, RemoteError> {
        self.post("/control/state", state).await
    }

    async fn query_metrics(&self, request: &MetricsRequest) -> Result<MetricsResponse, RemoteError> {
        self.post("/monitor/metrics", request).await
    }
}

/// Decode a success body. Config and control calls may answer with nothing.
fn decode<R: DeserializeOwned>(path: &str, text: &str) -> Result<R, RemoteError> {
    let text = if text.trim().is_empty() { "{}" } else { text };
    serde_json::from_str(text).map_err(|e| RemoteError::Protocol(format!("{path}: {e}")))
}

/// Map a non-2xx body to `Rejected`, keeping the controller's strings as-is.
/// Bodies that are not the OTG error shape are carried whole.
fn rejection(status: u16, body: &str) -> RemoteError {
    match serde_json::from_str::<OtgError>(body) {
        Ok(err) if !err.errors.is_empty() => RemoteError::Rejected {
            status,
            kind: err.kind,
            errors: err.errors,
        },
        Ok(err) => RemoteError::Rejected {
            status,
            kind: err.kind,
            errors: non_empty(body),
        },
        Err(_) => RemoteError::Rejected {
            status,
            kind: None,
            errors: non_empty(body),
        },
    }
}

fn non_empty(body: &str) -> Vec<String> {
    let body = body.trim();
    if body.is_empty() {
        Vec::new()
    } else {
        vec![body.to_string()]
    }
}

/// reqwest's top-level message hides the cause (refused, TLS, timeout).
fn error_chain(err: &dyn std::error::Error) -> String {
    let mut text = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        text.push_str(": ");
        text.push_str(&cause.to_string());
        source = cause.source();
    }
    text
}
