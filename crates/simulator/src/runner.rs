//! Runs the bootstrap sequence for every rank of a group.

use crate::LaunchConfig;
use serde::Serialize;
use simx_bootstrap::{BootstrapError, Bootstrapper, DiagnosticsReady};
use simx_core::ControllerError;
use simx_simulation::{LocalGroup, LocalMember, MemoryConfigStore, SimControllerFactory};
use simx_types::options::{LOG_FILE, OUTPUT_DIR};
use simx_types::{ConfigurationSet, GroupSize, Rank};
use std::io;
use std::panic;
use std::thread;
use tracing::{info, warn};

/// What one rank ended up with after bootstrap.
#[derive(Clone, Debug, Serialize)]
pub struct RankReport {
    /// The rank's position in the group.
    pub rank: Rank,
    /// Number of ranks in the group.
    pub group_size: GroupSize,
    /// The rank's output directory.
    pub output_dir: String,
    /// The rank's log file name.
    pub log_file: String,
    /// Scheduling algorithm of the rank's controller.
    pub algorithm: String,
    /// The merged configuration.
    pub config: ConfigurationSet,
}

/// Bootstrap every rank of the group on its own thread.
///
/// Each thread joins a shared [`LocalGroup`] under its own rank, runs both
/// phases and creates its controller. Reports are returned in rank order. If
/// any rank fails, the error of the first failing rank in launch order is
/// returned. A thread that cannot be started is reported as a controller
/// creation failure; ranks already started then time out waiting for it.
pub fn launch_ranks(
    config: &LaunchConfig,
    ready: DiagnosticsReady,
) -> Result<Vec<RankReport>, BootstrapError> {
    let group_size = config.checked_group_size().map_err(BootstrapError::GroupJoin)?;
    let overrides = config.override_set().map_err(BootstrapError::Configuration)?;
    let group = LocalGroup::new(group_size, config.join_timeout);

    info!(
        program = %config.program_name,
        ranks = group_size.get(),
        join_timeout = ?config.join_timeout,
        "Launching ranks"
    );

    let results: Vec<_> = thread::scope(|scope| {
        let mut handles = Vec::with_capacity(group_size.get() as usize);
        let mut spawn_error = None;
        for rank in group_size.ranks() {
            let member = group.member_with_rank(rank);
            let store = MemoryConfigStore::new().with_output_root(&config.output_root);
            let overrides = overrides.clone();
            let spawned = thread::Builder::new()
                .name(format!("rank-{}", rank.get()))
                .spawn_scoped(scope, move || {
                    run_rank(member, store, overrides, &config.program_name, ready)
                });
            match spawned {
                Ok(handle) => handles.push(handle),
                Err(err) => {
                    spawn_error = Some(spawn_failure(rank, &err));
                    break;
                }
            }
        }

        let joined = handles
            .into_iter()
            .map(|handle| handle.join().unwrap_or_else(|payload| panic::resume_unwind(payload)));
        spawn_error.map(Err).into_iter().chain(joined).collect()
    });

    let mut reports = results.into_iter().collect::<Result<Vec<_>, _>>()?;
    reports.sort_by_key(|report| report.rank);

    info!(ranks = reports.len(), "All ranks bootstrapped");
    Ok(reports)
}

fn spawn_failure(rank: Rank, err: &io::Error) -> BootstrapError {
    warn!(rank = rank.get(), error = %err, "Could not start rank thread");
    BootstrapError::ControllerCreation(ControllerError::ResourceExhausted(format!(
        "could not start thread for rank {}: {err}",
        rank.get()
    )))
}

fn run_rank(
    member: LocalMember,
    store: MemoryConfigStore,
    overrides: ConfigurationSet,
    program_name: &str,
    ready: DiagnosticsReady,
) -> Result<RankReport, BootstrapError> {
    let mut boot = Bootstrapper::with_overrides(
        member,
        store,
        SimControllerFactory::new(),
        overrides,
    );
    boot.bootstrap_configuration(program_name)?;
    let controller = boot.bootstrap_runtime(ready)?;

    let context = boot.into_context();
    let config = context.config();
    let group_size = context
        .identity()
        .map(|identity| identity.group_size())
        .unwrap_or(GroupSize::SINGLE);
    Ok(RankReport {
        rank: controller.rank(),
        group_size,
        output_dir: config.get_text(OUTPUT_DIR).map_err(BootstrapError::Configuration)?.to_string(),
        log_file: config.get_text(LOG_FILE).map_err(BootstrapError::Configuration)?.to_string(),
        algorithm: controller.algorithm().to_string(),
        config: config.clone(),
    })
}
