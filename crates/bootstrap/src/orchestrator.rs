//! The two-phase bootstrap orchestrator.

use crate::{BootstrapContext, BootstrapError, DiagnosticsReady, FailureKind};
use simx_core::{ConfigError, ConfigStore, ControllerFactory, ProcessGroup};
use simx_types::options::REQUIRED_OPTIONS;
use simx_types::{ConfigurationSet, Phase, ProcessIdentity};
use tracing::{debug, error, info};

/// Drives one process from start-up to a ready controller.
///
/// The host calls [`bootstrap_configuration`](Self::bootstrap_configuration)
/// and then [`bootstrap_runtime`](Self::bootstrap_runtime), each exactly once.
/// Any other order fails with [`BootstrapError::ProtocolOrderViolation`]
/// without touching a collaborator. Every failure, order violations included,
/// aborts the context: the state is not advanced and no later phase will run.
///
/// The context is always created fresh by the bootstrapper, so each
/// bootstrapper creates at most one controller.
#[derive(Debug)]
pub struct Bootstrapper<G, S, F> {
    group: G,
    store: S,
    factory: F,
    context: BootstrapContext,
}

impl<G, S, F> Bootstrapper<G, S, F>
where
    G: ProcessGroup,
    S: ConfigStore,
    F: ControllerFactory,
{
    /// Create a bootstrapper with a fresh context.
    pub fn new(group: G, store: S, factory: F) -> Self {
        Self::with_overrides(group, store, factory, ConfigurationSet::new())
    }

    /// Create a bootstrapper whose fresh context is seeded with overrides.
    ///
    /// Overrides take precedence over the defaults merged by the store.
    pub fn with_overrides(group: G, store: S, factory: F, overrides: ConfigurationSet) -> Self {
        Self {
            group,
            store,
            factory,
            context: BootstrapContext::with_overrides(overrides),
        }
    }

    /// Run the configuration phase.
    ///
    /// Joins the process group, initializes the configuration store and merges
    /// the process-wide defaults. On success every required option is present
    /// and the state is `ConfigPhaseDone`. On failure the configuration is
    /// left exactly as it was.
    pub fn bootstrap_configuration(&mut self, program_name: &str) -> Result<(), BootstrapError> {
        self.check_order(Phase::Configuration)?;
        debug!(program = program_name, "Starting configuration phase");

        match self.configure(program_name) {
            Ok((identity, config)) => {
                info!(
                    rank = identity.rank().get(),
                    group_size = identity.group_size().get(),
                    options = config.len(),
                    "Configuration phase complete"
                );
                self.context.complete_configuration(identity, config);
                Ok(())
            }
            Err(err) => Err(self.fail(Phase::Configuration, err)),
        }
    }

    /// Run the runtime phase and hand back the process's controller.
    ///
    /// The caller owns the returned controller. The bootstrapper keeps no
    /// reference to it and will never create another.
    ///
    /// The `DiagnosticsReady` token documents that logging was set up first.
    pub fn bootstrap_runtime(
        &mut self,
        _diagnostics: DiagnosticsReady,
    ) -> Result<F::Controller, BootstrapError> {
        self.check_order(Phase::Runtime)?;

        let result = match self.context.identity() {
            Some(identity) => {
                debug!(rank = identity.rank().get(), "Starting runtime phase");
                launch(&mut self.group, &self.factory, identity, self.context.config())
            }
            None => return Err(self.violation(Phase::Runtime)),
        };

        match result {
            Ok(controller) => {
                self.context.complete_runtime();
                info!(
                    rank = self.context.identity().map(|id| id.rank().get()),
                    "Runtime phase complete, controller created"
                );
                Ok(controller)
            }
            Err(err) => Err(self.fail(Phase::Runtime, err)),
        }
    }

    /// The bootstrap context.
    pub fn context(&self) -> &BootstrapContext {
        &self.context
    }

    /// Give up the collaborators and keep only the context.
    pub fn into_context(self) -> BootstrapContext {
        self.context
    }

    /// The process-group collaborator.
    pub fn group(&self) -> &G {
        &self.group
    }

    /// The configuration store collaborator.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// The controller factory collaborator.
    pub fn factory(&self) -> &F {
        &self.factory
    }

    fn configure(
        &mut self,
        program_name: &str,
    ) -> Result<(ProcessIdentity, ConfigurationSet), BootstrapError> {
        let identity = self
            .group
            .join_group(program_name)
            .map_err(BootstrapError::GroupJoin)?;
        debug!(rank = identity.rank().get(), "Joined process group");

        self.store
            .initialize_store()
            .map_err(BootstrapError::Configuration)?;

        // Merge into a copy so a partial merge never leaks into the context.
        let mut staged = self.context.config().clone();
        self.store
            .merge_defaults(program_name, &identity, &mut staged)
            .map_err(BootstrapError::Configuration)?;

        let missing = staged.missing(REQUIRED_OPTIONS);
        if !missing.is_empty() {
            return Err(BootstrapError::Configuration(ConfigError::MissingOptions(
                missing.into_iter().map(String::from).collect(),
            )));
        }

        Ok((identity, staged))
    }

    fn check_order(&mut self, phase: Phase) -> Result<(), BootstrapError> {
        if self.context.is_aborted() || !self.context.state().permits(phase) {
            return Err(self.violation(phase));
        }
        Ok(())
    }

    /// Report a phase called out of order. The violation itself is fatal.
    fn violation(&mut self, phase: Phase) -> BootstrapError {
        let err = BootstrapError::ProtocolOrderViolation {
            phase,
            state: self.context.state(),
            aborted: self.context.is_aborted(),
        };
        error!(phase = %phase, state = %self.context.state(), "Bootstrap phase called out of order");
        self.context.mark_aborted(FailureKind::ProtocolOrderViolation);
        err
    }

    fn fail(&mut self, phase: Phase, err: BootstrapError) -> BootstrapError {
        let kind = err.kind();
        error!(phase = %phase, kind = %kind, error = %err, "Bootstrap phase failed");
        self.context.mark_aborted(kind);
        err
    }
}

fn launch<G, F>(
    group: &mut G,
    factory: &F,
    identity: &ProcessIdentity,
    config: &ConfigurationSet,
) -> Result<F::Controller, BootstrapError>
where
    G: ProcessGroup,
    F: ControllerFactory,
{
    group
        .query_environment(identity)
        .map_err(BootstrapError::GroupJoin)?;
    factory
        .create_controller(identity, config)
        .map_err(BootstrapError::ControllerCreation)
}
