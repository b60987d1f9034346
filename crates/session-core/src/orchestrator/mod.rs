//! Remote session orchestration
//!
//! - `types`: collaborator traits (observer, launch request, remote session)
//! - `callbacks`: handles the transport uses to report outcomes
//! - `orchestrator`: the exclusivity state machine
//! - `state`: externally visible state and counters

mod callbacks;
mod orchestrator;
mod state;
mod types;

pub use callbacks::{LaunchResultCallback, SessionClosedNotifier};
pub use orchestrator::SessionOrchestrator;
pub use state::{OrchestratorState, OrchestratorStats};
pub use types::{LaunchRequest, RemoteSession, SessionObserver};
