use std::fmt;

use serde::{Deserialize, Serialize};

/// Externally visible orchestration state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrchestratorState {
    /// No session, nothing launching
    Idle,
    /// A `start()` is outstanding and no session exists yet
    Launching,
    /// A session is live
    Active,
    /// A session is live, a stop was issued and a relaunch is queued
    ActiveStopping,
}

impl fmt::Display for OrchestratorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OrchestratorState::Idle => "IDLE",
            OrchestratorState::Launching => "LAUNCHING",
            OrchestratorState::Active => "ACTIVE",
            OrchestratorState::ActiveStopping => "ACTIVE_STOPPING",
        };
        f.write_str(name)
    }
}

/// Counters kept by the orchestrator
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrchestratorStats {
    pub launches_started: u64,
    pub sessions_created: u64,
    pub launch_errors: u64,
    pub sessions_closed: u64,
    /// Requests discarded because a launch was in flight
    pub requests_dropped: u64,
    /// Queued requests replaced by a later one
    pub requests_superseded: u64,
}
