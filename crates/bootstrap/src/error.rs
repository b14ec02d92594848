//! Bootstrap failures.
//!
//! Every failure is fatal for the process. The variants are kept distinct so
//! that operators can tell a misbehaving host from a broken group, a broken
//! configuration, or a local resource problem.

use simx_core::{ConfigError, ControllerError, GroupError};
use simx_types::{BootstrapState, Phase};
use std::fmt;
use thiserror::Error;
use tracing::error;

/// Errors from the bootstrap sequence.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BootstrapError {
    /// A phase was called out of order, twice, or after a fatal failure.
    ///
    /// This is a programming error in the host.
    #[error("{phase} phase called in state {state}{}", aborted_suffix(.aborted))]
    ProtocolOrderViolation {
        /// The phase that was called.
        phase: Phase,
        /// The state the process was in.
        state: BootstrapState,
        /// Whether an earlier phase had already failed.
        aborted: bool,
    },

    /// Membership in the process group could not be established or resolved.
    #[error("process group failure: {0}")]
    GroupJoin(#[source] GroupError),

    /// The store could not be initialized or defaults could not be merged.
    #[error("configuration failure: {0}")]
    Configuration(#[source] ConfigError),

    /// The controller factory failed.
    #[error("controller creation failure: {0}")]
    ControllerCreation(#[source] ControllerError),
}

fn aborted_suffix(aborted: &bool) -> &'static str {
    if *aborted {
        " after a fatal bootstrap failure"
    } else {
        ""
    }
}

impl BootstrapError {
    /// Classify this error.
    pub fn kind(&self) -> FailureKind {
        match self {
            BootstrapError::ProtocolOrderViolation { .. } => FailureKind::ProtocolOrderViolation,
            BootstrapError::GroupJoin(_) => FailureKind::GroupJoin,
            BootstrapError::Configuration(_) => FailureKind::Configuration,
            BootstrapError::ControllerCreation(_) => FailureKind::ControllerCreation,
        }
    }

    /// Process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        self.kind().exit_code()
    }

    /// Log the failure and terminate the process.
    ///
    /// Only the hosting application should call this. Library code returns
    /// the error instead.
    pub fn abort(self) -> ! {
        let kind = self.kind();
        error!(kind = %kind, exit_code = kind.exit_code(), error = %self, "Bootstrap failed, aborting process");
        std::process::exit(kind.exit_code())
    }
}

/// Failure taxonomy for bootstrap errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// Host called a phase out of order.
    ProtocolOrderViolation,
    /// Process group membership failed.
    GroupJoin,
    /// Configuration store or defaults failed.
    Configuration,
    /// Controller construction failed.
    ControllerCreation,
}

impl FailureKind {
    /// Exit code reported to the operator, following `sysexits.h`.
    pub fn exit_code(self) -> i32 {
        match self {
            // EX_SOFTWARE
            FailureKind::ProtocolOrderViolation => 70,
            // EX_UNAVAILABLE
            FailureKind::GroupJoin => 69,
            // EX_CONFIG
            FailureKind::Configuration => 78,
            // EX_OSERR
            FailureKind::ControllerCreation => 71,
        }
    }

    /// Short name used in logs.
    pub fn as_str(self) -> &'static str {
        match self {
            FailureKind::ProtocolOrderViolation => "protocol_order_violation",
            FailureKind::GroupJoin => "group_join",
            FailureKind::Configuration => "configuration",
            FailureKind::ControllerCreation => "controller_creation",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_exit_codes_are_distinct() {
        let kinds = [
            FailureKind::ProtocolOrderViolation,
            FailureKind::GroupJoin,
            FailureKind::Configuration,
            FailureKind::ControllerCreation,
        ];
        let codes: HashSet<_> = kinds.iter().map(|k| k.exit_code()).collect();

        assert_eq!(codes.len(), kinds.len());
        assert!(!codes.contains(&0));
    }

    #[test]
    fn test_violation_message() {
        let err = BootstrapError::ProtocolOrderViolation {
            phase: Phase::Runtime,
            state: BootstrapState::Uninitialized,
            aborted: false,
        };
        assert_eq!(err.to_string(), "runtime phase called in state Uninitialized");

        let err = BootstrapError::ProtocolOrderViolation {
            phase: Phase::Configuration,
            state: BootstrapState::Uninitialized,
            aborted: true,
        };
        assert_eq!(
            err.to_string(),
            "configuration phase called in state Uninitialized after a fatal bootstrap failure"
        );
    }

    #[test]
    fn test_kind_matches_variant() {
        let err = BootstrapError::GroupJoin(GroupError::NotJoined);
        assert_eq!(err.kind(), FailureKind::GroupJoin);
        assert_eq!(err.exit_code(), 69);
    }
}
