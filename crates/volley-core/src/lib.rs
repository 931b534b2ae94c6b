//! volley-core — intent model, OTG wire model, config builder and shared types.
//! All other Volley crates depend on this one.

pub mod addr;
pub mod builder;
pub mod config;
pub mod controller;
pub mod intent;
pub mod metrics;
pub mod otg;
pub mod policy;

pub use addr::MacAddr;
pub use builder::{build, ConfigBuilder};
pub use controller::{Controller, RemoteError};
pub use intent::{FlowIntent, Intent, IntentSet, PeeringIntent, ValidationError};
pub use metrics::{MetricsKind, MetricsSnapshot};
pub use otg::{ControlState, Scope, SessionConfig, Transition};
pub use policy::{Convergence, WaitPolicy};
