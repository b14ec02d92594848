//! Error types for bootstrap collaborators.

use simx_types::{GroupSize, Rank};
use thiserror::Error;

/// Errors from the process-group layer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GroupError {
    /// The group transport cannot be reached.
    #[error("process group unavailable: {0}")]
    Unavailable(String),

    /// Another process already holds this rank.
    #[error("{0} is already taken by another process")]
    DuplicateRank(Rank),

    /// The requested rank does not fit in the group.
    #[error("{rank} is outside a group of size {group_size}")]
    RankOutOfRange {
        /// Requested rank.
        rank: Rank,
        /// Group size.
        group_size: GroupSize,
    },

    /// Not enough peers joined in time.
    #[error("timed out waiting for peers: {joined} of {group_size} joined")]
    JoinTimeout {
        /// Members that had joined when the wait ended.
        joined: u32,
        /// Expected group size.
        group_size: GroupSize,
    },

    /// An operation that needs membership ran before joining.
    #[error("process has not joined the group")]
    NotJoined,

    /// The environment describing the group is malformed.
    #[error("invalid group environment: {0}")]
    InvalidEnvironment(String),
}

/// Errors from the controller factory.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ControllerError {
    /// Resources needed by the controller are exhausted.
    #[error("resources exhausted: {0}")]
    ResourceExhausted(String),

    /// The configuration cannot drive a controller.
    #[error("invalid controller configuration: {0}")]
    InvalidConfiguration(String),
}
