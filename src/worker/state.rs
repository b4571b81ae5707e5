// Worker lifecycle states
// Author: kelexine (https://github.com/kelexine)

use serde::{Deserialize, Serialize};

/// Lifecycle state of one worker instance.
///
/// Transitions only move forward: `Parsed → Installing → Installed →
/// Activating → Activated`, with `Redundant` reachable from any state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerState {
    /// Created, install event not yet dispatched
    Parsed,
    Installing,
    /// Installed and waiting for activation
    Installed,
    Activating,
    /// Controlling; fetch interception is live
    Activated,
    /// Failed to install or activate, or replaced by a newer version
    Redundant,
}

impl WorkerState {
    pub fn can_intercept_fetch(&self) -> bool {
        matches!(self, WorkerState::Activated)
    }
}

impl std::fmt::Display for WorkerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            WorkerState::Parsed => "parsed",
            WorkerState::Installing => "installing",
            WorkerState::Installed => "installed",
            WorkerState::Activating => "activating",
            WorkerState::Activated => "activated",
            WorkerState::Redundant => "redundant",
        };
        f.write_str(name)
    }
}
