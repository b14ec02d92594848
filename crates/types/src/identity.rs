//! Identity of this process within the distributed group.

use crate::{GroupSize, Rank};
use serde::{Deserialize, Serialize};
use std::fmt;

/// This process's position in the distributed group.
///
/// Produced once by the process-group layer when the process joins, and never
/// modified afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProcessIdentity {
    rank: Rank,
    group_size: GroupSize,
    program_name: String,
}

impl ProcessIdentity {
    /// Create a new identity.
    ///
    /// Returns None if `rank` does not fall inside `group_size`.
    pub fn new(rank: Rank, group_size: GroupSize, program_name: impl Into<String>) -> Option<Self> {
        group_size.contains(rank).then(|| Self {
            rank,
            group_size,
            program_name: program_name.into(),
        })
    }

    /// Identity for a non-distributed run: rank 0 of a group of 1.
    pub fn single(program_name: impl Into<String>) -> Self {
        Self {
            rank: Rank::ROOT,
            group_size: GroupSize::SINGLE,
            program_name: program_name.into(),
        }
    }

    /// This process's rank.
    pub fn rank(&self) -> Rank {
        self.rank
    }

    /// Number of processes in the group.
    pub fn group_size(&self) -> GroupSize {
        self.group_size
    }

    /// Program name supplied at join time. May be empty.
    pub fn program_name(&self) -> &str {
        &self.program_name
    }

    /// Whether more than one process takes part in the run.
    pub fn is_distributed(&self) -> bool {
        self.group_size.get() > 1
    }
}

impl fmt::Display for ProcessIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.rank.0, self.group_size)?;
        if !self.program_name.is_empty() {
            write!(f, " ({})", self.program_name)?;
        }
        Ok(())
    }
}
