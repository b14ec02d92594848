//! Per-process bootstrap state.

use crate::FailureKind;
use simx_types::{BootstrapState, ConfigurationSet, ProcessIdentity};

/// Everything the bootstrap sequence establishes for one process.
///
/// Each process owns exactly one context. Tests may build several in one
/// process to stand in for several ranks.
///
/// The identity and configuration are written only while the configuration
/// phase runs and are read-only afterwards.
///
/// A context is created inside a [`Bootstrapper`](crate::Bootstrapper) and can
/// be taken out once, but never copied or handed back in:
///
/// ```compile_fail
/// # use simx_bootstrap::BootstrapContext;
/// fn duplicate(context: BootstrapContext) -> (BootstrapContext, BootstrapContext) {
///     (context.clone(), context)
/// }
/// ```
#[derive(Debug)]
pub struct BootstrapContext {
    state: BootstrapState,
    identity: Option<ProcessIdentity>,
    config: ConfigurationSet,
    aborted: Option<FailureKind>,
    controllers_created: u32,
}

impl BootstrapContext {
    /// Create an uninitialized context seeded with overrides that take
    /// precedence over the defaults merged during the configuration phase.
    pub(crate) fn with_overrides(overrides: ConfigurationSet) -> Self {
        Self {
            state: BootstrapState::Uninitialized,
            identity: None,
            config: overrides,
            aborted: None,
            controllers_created: 0,
        }
    }

    /// Current protocol state.
    pub fn state(&self) -> BootstrapState {
        self.state
    }

    /// This process's identity, once the configuration phase has completed.
    pub fn identity(&self) -> Option<&ProcessIdentity> {
        self.identity.as_ref()
    }

    /// The configuration. Holds only overrides until the configuration phase
    /// completes.
    pub fn config(&self) -> &ConfigurationSet {
        &self.config
    }

    /// Whether a phase failed fatally.
    pub fn is_aborted(&self) -> bool {
        self.aborted.is_some()
    }

    /// The failure that aborted bootstrap, if any.
    pub fn abort_reason(&self) -> Option<FailureKind> {
        self.aborted
    }

    /// Number of controllers created for this process. Never more than one.
    pub fn controllers_created(&self) -> u32 {
        self.controllers_created
    }

    pub(crate) fn complete_configuration(&mut self, identity: ProcessIdentity, config: ConfigurationSet) {
        self.identity = Some(identity);
        self.config = config;
        self.state = BootstrapState::ConfigPhaseDone;
    }

    pub(crate) fn complete_runtime(&mut self) {
        self.controllers_created += 1;
        self.state = BootstrapState::RuntimePhaseDone;
    }

    pub(crate) fn mark_aborted(&mut self, kind: FailureKind) {
        self.aborted.get_or_insert(kind);
    }
}
