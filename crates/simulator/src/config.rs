//! Launch configuration for a group of ranks.

use simx_core::GroupError;
use simx_simulation::DEFAULT_JOIN_TIMEOUT;
use simx_types::options::{LOG_LEVEL, RNG_SEED};
use simx_types::{ConfigError, ConfigurationSet, GroupSize, ProfileSet};
use std::path::PathBuf;
use std::time::Duration;

/// Most ranks one process will host, one thread each.
pub const MAX_LOCAL_RANKS: u32 = 1024;

/// Configuration for launching a group of ranks in one process.
#[derive(Clone, Debug)]
pub struct LaunchConfig {
    /// Program name passed to the configuration phase.
    pub program_name: String,

    /// Number of ranks in the group.
    pub group_size: u32,

    /// How long each rank waits for its peers to join.
    pub join_timeout: Duration,

    /// `key=value` overrides applied on top of the profile.
    pub overrides: Vec<String>,

    /// Log level recorded in the configuration.
    pub log_level: Option<String>,

    /// Profile set and the profile id to resolve from it.
    pub profile: Option<(ProfileSet, String)>,

    /// Directory under which per-rank output directories live.
    pub output_root: PathBuf,

    /// Base random seed for every rank.
    pub seed: Option<u64>,
}

impl LaunchConfig {
    /// Create a launch configuration for `group_size` ranks.
    pub fn new(program_name: impl Into<String>, group_size: u32) -> Self {
        Self {
            program_name: program_name.into(),
            group_size,
            join_timeout: DEFAULT_JOIN_TIMEOUT,
            overrides: Vec::new(),
            log_level: None,
            profile: None,
            output_root: PathBuf::from("output"),
            seed: None,
        }
    }

    /// Set the join timeout.
    pub fn with_join_timeout(mut self, timeout: Duration) -> Self {
        self.join_timeout = timeout;
        self
    }

    /// Add one `key=value` override.
    pub fn with_override(mut self, raw: impl Into<String>) -> Self {
        self.overrides.push(raw.into());
        self
    }

    /// Add several `key=value` overrides.
    pub fn with_overrides<I, S>(mut self, overrides: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.overrides.extend(overrides.into_iter().map(Into::into));
        self
    }

    /// Set the log level recorded in the configuration.
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = Some(level.into());
        self
    }

    /// Take settings from profile `id` of `set`.
    pub fn with_profile(mut self, set: ProfileSet, id: impl Into<String>) -> Self {
        self.profile = Some((set, id.into()));
        self
    }

    /// Set the output root.
    pub fn with_output_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.output_root = root.into();
        self
    }

    /// Set the base random seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// The group size, checked to be between 1 and [`MAX_LOCAL_RANKS`].
    pub fn checked_group_size(&self) -> Result<GroupSize, GroupError> {
        if self.group_size > MAX_LOCAL_RANKS {
            return Err(GroupError::InvalidEnvironment(format!(
                "{} ranks requested, at most {MAX_LOCAL_RANKS} can run in one process",
                self.group_size
            )));
        }
        GroupSize::new(self.group_size).ok_or_else(|| {
            GroupError::InvalidEnvironment("group size must be at least 1".into())
        })
    }

    /// Build the override set every rank starts from.
    ///
    /// Later layers win: profile, then `key=value` overrides, then the log
    /// level and seed.
    pub fn override_set(&self) -> Result<ConfigurationSet, ConfigError> {
        let mut set = match &self.profile {
            Some((profiles, id)) => profiles.resolve(id)?,
            None => ConfigurationSet::new(),
        };
        set.extend(ConfigurationSet::from_overrides(&self.overrides)?);
        if let Some(level) = &self.log_level {
            set.set(LOG_LEVEL, level.as_str());
        }
        if let Some(seed) = self.seed {
            let seed = i64::try_from(seed).map_err(|_| ConfigError::Rejected {
                key: RNG_SEED.to_string(),
                reason: format!("seed {seed} does not fit in a signed 64-bit integer"),
            })?;
            set.set(RNG_SEED, seed);
        }
        Ok(set)
    }
}

impl Default for LaunchConfig {
    fn default() -> Self {
        Self::new("simx", 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use simx_types::ConfigValue;

    fn profiles() -> ProfileSet {
        let mut set = ProfileSet::new("runs");
        set.insert(
            "base",
            [("sched.algorithm", ConfigValue::from("heap"))].into_iter().collect(),
        );
        set
    }

    #[test]
    fn test_layers_in_order() {
        let config = LaunchConfig::new("sim_app", 2)
            .with_profile(profiles(), "base")
            .with_override("sched.algorithm=calendar")
            .with_override("log.level=warn")
            .with_log_level("debug")
            .with_seed(7);

        let set = config.override_set().unwrap();

        assert_eq!(set.get_text("sched.algorithm").unwrap(), "calendar");
        assert_eq!(set.get_text(LOG_LEVEL).unwrap(), "debug");
        assert_eq!(set.get_int(RNG_SEED).unwrap(), 7);
    }

    #[test]
    fn test_group_size_bounds() {
        assert!(LaunchConfig::new("sim_app", 0).checked_group_size().is_err());
        assert!(LaunchConfig::new("sim_app", u32::MAX).checked_group_size().is_err());
        assert_eq!(
            LaunchConfig::new("sim_app", MAX_LOCAL_RANKS)
                .checked_group_size()
                .unwrap()
                .get(),
            MAX_LOCAL_RANKS
        );
    }

    #[test]
    fn test_unknown_profile() {
        let config = LaunchConfig::new("sim_app", 2).with_profile(profiles(), "missing");

        assert!(matches!(config.override_set(), Err(ConfigError::Profile(_))));
    }

    #[test]
    fn test_oversized_seed_rejected() {
        let config = LaunchConfig::default().with_seed(u64::MAX);

        assert!(matches!(
            config.override_set(),
            Err(ConfigError::Rejected { .. })
        ));
    }
}
