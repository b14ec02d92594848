//! Traits for the collaborators the bootstrap sequence drives.

use crate::{ControllerError, GroupError};
use simx_types::{ConfigError, ConfigurationSet, ProcessIdentity};

/// The distributed process-group layer.
///
/// Implementations own transport concerns: rank discovery, barriers, and any
/// timeout on joining. The bootstrap sequence only sees success or failure.
///
/// # Example
///
/// ```ignore
/// let identity = group.join_group("sim_app")?;
/// // ... configuration ...
/// group.query_environment(&identity)?;
/// ```
pub trait ProcessGroup {
    /// Join the group and learn this process's identity.
    ///
    /// May block until enough peers have joined. Called at most once per
    /// process.
    fn join_group(&mut self, program_name: &str) -> Result<ProcessIdentity, GroupError>;

    /// Resolve rank-local resources after joining.
    fn query_environment(&mut self, identity: &ProcessIdentity) -> Result<(), GroupError>;
}

/// The persistent configuration store.
pub trait ConfigStore {
    /// Allocate or load the backing store.
    fn initialize_store(&mut self) -> Result<(), ConfigError>;

    /// Merge process-wide defaults into `config`.
    ///
    /// Options already present in `config` are overrides and must be kept.
    /// Some defaults depend on the program name or the rank.
    fn merge_defaults(
        &mut self,
        program_name: &str,
        identity: &ProcessIdentity,
        config: &mut ConfigurationSet,
    ) -> Result<(), ConfigError>;
}

/// Builds the controller that owns event scheduling for one process.
pub trait ControllerFactory {
    /// The controller type produced.
    type Controller;

    /// Construct the controller for this process.
    ///
    /// Not assumed idempotent: callers must invoke this at most once per
    /// process and never retry a failure.
    fn create_controller(
        &self,
        identity: &ProcessIdentity,
        config: &ConfigurationSet,
    ) -> Result<Self::Controller, ControllerError>;
}
