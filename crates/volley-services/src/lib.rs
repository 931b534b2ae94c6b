//! volley-services — session orchestration on top of volley-core.
//!
//! `SessionController` owns one configuration lifecycle, `MetricsCollector`
//! turns controller records into snapshots, and `ResultReporter`
//! implementations present them.

pub mod clock;
pub mod collector;
pub mod error;
pub mod reporter;
pub mod session;

#[cfg(test)]
mod testing;

pub use clock::{Clock, TokioClock};
#[cfg(any(test, feature = "testing"))]
pub use clock::ManualClock;
pub use collector::MetricsCollector;
pub use error::{Failure, OrchestratorError};
pub use reporter::{LogReporter, ResultReporter};
pub use session::{SessionController, SessionPhase, StopOutcome};
