//! Controller collaborator contract.
//!
//! Everything Volley needs from the remote OTG controller fits in three
//! calls. The HTTP client in `volley-client` is the production
//! implementation; tests plug in scripted fakes.

use async_trait::async_trait;

use crate::otg::{ControlState, MetricsRequest, MetricsResponse, SessionConfig, Warnings};

/// A failed round-trip to the controller.
///
/// Controller-supplied error strings are kept exactly as received.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RemoteError {
    /// The request never got a response: connect failure, TLS, timeout.
    #[error("transport error: {0}")]
    Transport(String),

    /// The controller answered with a non-success status.
    #[error("controller rejected request (status {status}): {}", .errors.join("; "))]
    Rejected {
        status: u16,
        kind: Option<String>,
        errors: Vec<String>,
    },

    /// A success status with a body we could not understand.
    #[error("unexpected controller response: {0}")]
    Protocol(String),
}

impl RemoteError {
    /// The controller's own words, if it sent any.
    pub fn remote_detail(&self) -> Option<String> {
        match self {
            Self::Rejected { errors, .. } if !errors.is_empty() => Some(errors.join("\n")),
            _ => None,
        }
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

/// The remote OTG controller, seen as three blocking round-trips.
#[async_trait]
pub trait Controller: Send + Sync {
    /// Replace the controller's whole configuration.
    async fn push_config(&self, config: &SessionConfig) -> Result<Warnings, RemoteError>;

    /// Start or stop traffic or protocols.
    async fn set_control_state(&self, state: &ControlState) -> Result<Warnings, RemoteError>;

    async fn query_metrics(&self, request: &MetricsRequest) -> Result<MetricsResponse, RemoteError>;
}
