//! Process group described by environment variables.
//!
//! A launcher that starts one OS process per rank exports the rank and group
//! size. A process started without them runs alone as rank 0 of 1.

use simx_core::{GroupError, ProcessGroup};
use simx_types::{GroupSize, ProcessIdentity, Rank};
use std::collections::HashMap;
use tracing::debug;

/// Variable holding this process's rank.
pub const RANK_VAR: &str = "SIMX_RANK";

/// Variable holding the number of processes in the group.
pub const GROUP_SIZE_VAR: &str = "SIMX_GROUP_SIZE";

/// A process group whose membership is fixed by the launcher's environment.
#[derive(Debug, Clone, Default)]
pub struct EnvProcessGroup {
    vars: HashMap<String, String>,
    identity: Option<ProcessIdentity>,
}

impl EnvProcessGroup {
    /// Read the group variables from this process's environment.
    pub fn from_process_env() -> Self {
        Self::from_vars(
            std::env::vars().filter(|(key, _)| key == RANK_VAR || key == GROUP_SIZE_VAR),
        )
    }

    /// Use an explicit set of variables.
    pub fn from_vars<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: vars.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
            identity: None,
        }
    }

    fn parse_var(&self, name: &str) -> Result<Option<u32>, GroupError> {
        self.vars
            .get(name)
            .map(|raw| {
                raw.trim().parse::<u32>().map_err(|_| {
                    GroupError::InvalidEnvironment(format!("{name}={raw} is not a non-negative integer"))
                })
            })
            .transpose()
    }

    fn resolve(&self, program_name: &str) -> Result<ProcessIdentity, GroupError> {
        let rank = self.parse_var(RANK_VAR)?;
        let size = self.parse_var(GROUP_SIZE_VAR)?;

        match (rank, size) {
            (None, None) => Ok(ProcessIdentity::single(program_name)),
            (Some(rank), Some(size)) => {
                let group_size = GroupSize::new(size).ok_or_else(|| {
                    GroupError::InvalidEnvironment(format!("{GROUP_SIZE_VAR} must be at least 1"))
                })?;
                let rank = Rank(rank);
                ProcessIdentity::new(rank, group_size, program_name)
                    .ok_or(GroupError::RankOutOfRange { rank, group_size })
            }
            (Some(_), None) => Err(GroupError::InvalidEnvironment(format!(
                "{RANK_VAR} is set but {GROUP_SIZE_VAR} is not"
            ))),
            (None, Some(_)) => Err(GroupError::InvalidEnvironment(format!(
                "{GROUP_SIZE_VAR} is set but {RANK_VAR} is not"
            ))),
        }
    }
}

impl ProcessGroup for EnvProcessGroup {
    fn join_group(&mut self, program_name: &str) -> Result<ProcessIdentity, GroupError> {
        if let Some(identity) = &self.identity {
            return Err(GroupError::DuplicateRank(identity.rank()));
        }
        let identity = self.resolve(program_name)?;
        debug!(%identity, "Joined group from environment");
        self.identity = Some(identity.clone());
        Ok(identity)
    }

    fn query_environment(&mut self, identity: &ProcessIdentity) -> Result<(), GroupError> {
        match &self.identity {
            Some(own) if own == identity => Ok(()),
            Some(own) => Err(GroupError::InvalidEnvironment(format!(
                "identity {identity} does not match joined identity {own}"
            ))),
            None => Err(GroupError::NotJoined),
        }
    }
}
