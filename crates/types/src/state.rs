//! Bootstrap protocol progress.

use serde::{Deserialize, Serialize};
use std::fmt;

/// How far the bootstrap protocol has progressed for this process.
///
/// Transitions are strictly forward:
///
/// ```text
/// Uninitialized ──configuration──▶ ConfigPhaseDone ──runtime──▶ RuntimePhaseDone
/// ```
///
/// `RuntimePhaseDone` is terminal. The protocol never re-enters.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum BootstrapState {
    /// No phase has run yet.
    #[default]
    Uninitialized,
    /// Identity and configuration are established.
    ConfigPhaseDone,
    /// The controller has been created.
    RuntimePhaseDone,
}

impl BootstrapState {
    /// The state a phase requires before it may run.
    pub fn required_for(phase: Phase) -> Self {
        match phase {
            Phase::Configuration => BootstrapState::Uninitialized,
            Phase::Runtime => BootstrapState::ConfigPhaseDone,
        }
    }

    /// The state reached when a phase completes successfully.
    pub fn after(phase: Phase) -> Self {
        match phase {
            Phase::Configuration => BootstrapState::ConfigPhaseDone,
            Phase::Runtime => BootstrapState::RuntimePhaseDone,
        }
    }

    /// Whether `phase` may run from this state.
    pub fn permits(self, phase: Phase) -> bool {
        self == Self::required_for(phase)
    }

    /// Whether the protocol has finished.
    pub fn is_terminal(self) -> bool {
        self == BootstrapState::RuntimePhaseDone
    }
}

impl fmt::Display for BootstrapState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BootstrapState::Uninitialized => write!(f, "Uninitialized"),
            BootstrapState::ConfigPhaseDone => write!(f, "ConfigPhaseDone"),
            BootstrapState::RuntimePhaseDone => write!(f, "RuntimePhaseDone"),
        }
    }
}

/// One of the two ordered bootstrap phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    /// Join the group, initialize and populate configuration.
    Configuration,
    /// Finish environment setup and create the controller.
    Runtime,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Configuration => write!(f, "configuration"),
            Phase::Runtime => write!(f, "runtime"),
        }
    }
}
