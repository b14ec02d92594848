//! In-memory configuration store with the process-wide defaults.

use simx_core::{ConfigError, ConfigStore};
use simx_types::options::{
    LOG_FILE, LOG_LEVEL, OUTPUT_DIR, PROGRAM_NAME, RNG_SEED, SCHED_ALGORITHM, SCHED_END_TIME,
    SCHED_LOOKAHEAD,
};
use simx_types::{ConfigValue, ConfigurationSet, ProcessIdentity};
use std::path::PathBuf;
use tracing::debug;

/// Name used in paths when the program name is empty.
pub const FALLBACK_PROGRAM_NAME: &str = "simx";

/// Default diagnostic verbosity.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Default scheduling strategy.
pub const DEFAULT_SCHED_ALGORITHM: &str = "calendar";

/// Default simulation end time, in seconds.
pub const DEFAULT_END_TIME: f64 = 1000.0;

/// Default lookahead between ranks, in seconds.
pub const DEFAULT_LOOKAHEAD: f64 = 1.0;

/// A configuration store held in memory.
///
/// Supplies the process-wide defaults. Failure injection lets tests and
/// rehearsal runs exercise the fatal paths of the bootstrap sequence.
#[derive(Debug, Clone)]
pub struct MemoryConfigStore {
    output_root: PathBuf,
    initialized: bool,
    init_failure: Option<String>,
    merge_fail_after: Option<usize>,
}

impl Default for MemoryConfigStore {
    fn default() -> Self {
        Self {
            output_root: PathBuf::from("output"),
            initialized: false,
            init_failure: None,
            merge_fail_after: None,
        }
    }
}

impl MemoryConfigStore {
    /// Create a store writing output under `./output`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the directory under which per-rank output directories live.
    pub fn with_output_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.output_root = root.into();
        self
    }

    /// Make `initialize_store` fail with a storage error.
    pub fn fail_initialization(mut self, reason: impl Into<String>) -> Self {
        self.init_failure = Some(reason.into());
        self
    }

    /// Make `merge_defaults` fail after writing `count` defaults.
    pub fn fail_merge_after(mut self, count: usize) -> Self {
        self.merge_fail_after = Some(count);
        self
    }

    /// Whether `initialize_store` has succeeded.
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// The defaults for one process, in merge order.
    ///
    /// Output directory and log file are distinct per rank and always stay
    /// under the output root, whatever the program name contains.
    pub fn defaults_for(
        &self,
        program_name: &str,
        identity: &ProcessIdentity,
    ) -> Vec<(&'static str, ConfigValue)> {
        let rank = identity.rank().get();
        let stem = path_stem(program_name);
        let output_dir = self.output_root.join(&stem).join(format!("rank-{rank}"));

        vec![
            (PROGRAM_NAME, ConfigValue::from(program_name)),
            (OUTPUT_DIR, ConfigValue::from(output_dir.to_string_lossy().into_owned())),
            (LOG_LEVEL, ConfigValue::from(DEFAULT_LOG_LEVEL)),
            (LOG_FILE, ConfigValue::from(format!("{stem}.{rank}.log"))),
            (SCHED_ALGORITHM, ConfigValue::from(DEFAULT_SCHED_ALGORITHM)),
            (SCHED_END_TIME, ConfigValue::from(DEFAULT_END_TIME)),
            (SCHED_LOOKAHEAD, ConfigValue::from(DEFAULT_LOOKAHEAD)),
            (RNG_SEED, ConfigValue::from(0i64)),
        ]
    }
}

/// The program name as a single path component.
fn path_stem(program_name: &str) -> String {
    let stem: String = program_name
        .chars()
        .map(|c| match c {
            '/' | '\\' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    match stem.as_str() {
        "" | "." | ".." => FALLBACK_PROGRAM_NAME.to_string(),
        _ => stem,
    }
}

impl ConfigStore for MemoryConfigStore {
    fn initialize_store(&mut self) -> Result<(), ConfigError> {
        if let Some(reason) = &self.init_failure {
            return Err(ConfigError::Storage(reason.clone()));
        }
        self.initialized = true;
        Ok(())
    }

    fn merge_defaults(
        &mut self,
        program_name: &str,
        identity: &ProcessIdentity,
        config: &mut ConfigurationSet,
    ) -> Result<(), ConfigError> {
        if !self.initialized {
            return Err(ConfigError::StoreUnavailable(
                "store must be initialized before merging defaults".into(),
            ));
        }

        let defaults = self.defaults_for(program_name, identity);
        let mut applied = 0;
        let mut overridden = 0;
        for (written, (key, value)) in defaults.into_iter().enumerate() {
            if self.merge_fail_after == Some(written) {
                return Err(ConfigError::Storage(format!(
                    "merge interrupted after {written} defaults"
                )));
            }
            if config.set_if_absent(key, value) {
                applied += 1;
            } else {
                overridden += 1;
            }
        }

        debug!(
            rank = identity.rank().get(),
            applied,
            overridden,
            "Merged configuration defaults"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use simx_types::{GroupSize, Rank};

    fn identity(rank: u32) -> ProcessIdentity {
        ProcessIdentity::new(Rank(rank), GroupSize::new(4).unwrap(), "sim_app").unwrap()
    }

    fn merged(store: &mut MemoryConfigStore, program: &str, rank: u32) -> ConfigurationSet {
        let mut config = ConfigurationSet::new();
        store.initialize_store().unwrap();
        store.merge_defaults(program, &identity(rank), &mut config).unwrap();
        config
    }

    #[test]
    fn test_defaults_are_rank_sensitive() {
        let mut store = MemoryConfigStore::new();

        let rank0 = merged(&mut store, "sim_app", 0);
        let rank3 = merged(&mut store, "sim_app", 3);

        let dir0 = PathBuf::from(rank0.get_text(OUTPUT_DIR).unwrap());
        let dir3 = PathBuf::from(rank3.get_text(OUTPUT_DIR).unwrap());
        assert_eq!(dir0, PathBuf::from("output/sim_app/rank-0"));
        assert_eq!(dir3, PathBuf::from("output/sim_app/rank-3"));
        assert_eq!(rank3.get_text(LOG_FILE).unwrap(), "sim_app.3.log");
        assert_eq!(rank0.get_text(LOG_LEVEL), rank3.get_text(LOG_LEVEL));
    }

    #[test]
    fn test_empty_program_name_falls_back() {
        let mut store = MemoryConfigStore::new().with_output_root("/tmp/runs");

        let config = merged(&mut store, "", 1);

        assert_eq!(config.get_text(PROGRAM_NAME).unwrap(), "");
        assert_eq!(config.get_text(LOG_FILE).unwrap(), "simx.1.log");
        assert_eq!(
            PathBuf::from(config.get_text(OUTPUT_DIR).unwrap()),
            PathBuf::from("/tmp/runs/simx/rank-1")
        );
    }

    #[test]
    fn test_program_name_cannot_escape_output_root() {
        let mut store = MemoryConfigStore::new().with_output_root("/tmp/runs");

        for (program, stem) in [
            ("../x", ".._x"),
            ("a/b", "a_b"),
            ("..", "simx"),
            ("c:\\d", "c:_d"),
        ] {
            let config = merged(&mut store, program, 0);
            let dir = PathBuf::from(config.get_text(OUTPUT_DIR).unwrap());

            assert_eq!(dir, PathBuf::from("/tmp/runs").join(stem).join("rank-0"));
            assert_eq!(config.get_text(LOG_FILE).unwrap(), format!("{stem}.0.log"));
            assert_eq!(config.get_text(PROGRAM_NAME).unwrap(), program);
        }
    }

    #[test]
    fn test_overrides_survive_merge() {
        let mut store = MemoryConfigStore::new();
        store.initialize_store().unwrap();
        let mut config = ConfigurationSet::from_overrides(["sched.algorithm=heap"]).unwrap();

        store.merge_defaults("sim_app", &identity(0), &mut config).unwrap();

        assert_eq!(config.get_text(SCHED_ALGORITHM).unwrap(), "heap");
        assert_eq!(config.get_float(SCHED_END_TIME).unwrap(), DEFAULT_END_TIME);
    }

    #[test]
    fn test_merge_requires_initialization() {
        let mut store = MemoryConfigStore::new();
        let mut config = ConfigurationSet::new();

        assert!(matches!(
            store.merge_defaults("sim_app", &identity(0), &mut config),
            Err(ConfigError::StoreUnavailable(_))
        ));
        assert!(config.is_empty());
    }

    #[test]
    fn test_injected_failures() {
        let mut store = MemoryConfigStore::new().fail_initialization("read-only filesystem");
        assert_eq!(
            store.initialize_store(),
            Err(ConfigError::Storage("read-only filesystem".into()))
        );
        assert!(!store.is_initialized());

        let mut store = MemoryConfigStore::new().fail_merge_after(2);
        store.initialize_store().unwrap();
        let mut config = ConfigurationSet::new();
        assert!(store
            .merge_defaults("sim_app", &identity(0), &mut config)
            .is_err());
        assert_eq!(config.len(), 2);
    }
}
