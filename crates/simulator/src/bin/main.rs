//! simx Simulator CLI
//!
//! Bootstraps a group of ranks inside this process and reports what each
//! rank ended up with.

use clap::Parser;
use simx_bootstrap::DiagnosticsReady;
use simx_simulator::{launch_ranks, LaunchConfig, MAX_LOCAL_RANKS};
use simx_types::ProfileSet;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "simx-sim")]
#[command(about = "Bootstrap a group of simx ranks in one process")]
#[command(version)]
struct Cli {
    /// Program name recorded in every rank's configuration
    #[arg(long, default_value = "simx")]
    program: String,

    /// Number of ranks in the group
    #[arg(
        short = 'n',
        long,
        default_value = "4",
        value_parser = clap::value_parser!(u32).range(1..=i64::from(MAX_LOCAL_RANKS))
    )]
    ranks: u32,

    /// How long each rank waits for its peers (e.g., "500ms", "30s")
    #[arg(long, default_value = "30s")]
    join_timeout: humantime::Duration,

    /// Configuration override, may be repeated
    #[arg(long = "set", value_name = "KEY=VALUE")]
    overrides: Vec<String>,

    /// Log filter for this run, also recorded as log.level (RUST_LOG wins)
    #[arg(long)]
    log_level: Option<String>,

    /// JSON file holding a profile set
    #[arg(long, requires = "profile")]
    profiles: Option<PathBuf>,

    /// Profile to resolve from the profile set
    #[arg(long, requires = "profiles")]
    profile: Option<String>,

    /// Directory under which per-rank output directories are named
    #[arg(long, default_value = "output")]
    output_root: PathBuf,

    /// Base random seed
    #[arg(long)]
    seed: Option<u64>,

    /// Print every rank's merged configuration as JSON
    #[arg(long)]
    print_config: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(cli.log_level.as_deref().unwrap_or("info")))?;
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let ready = DiagnosticsReady::from_global_dispatcher()
        .ok_or("tracing subscriber was not installed")?;

    let mut config = LaunchConfig::new(cli.program, cli.ranks)
        .with_join_timeout(cli.join_timeout.into())
        .with_overrides(cli.overrides)
        .with_output_root(cli.output_root);
    if let Some(level) = cli.log_level {
        config = config.with_log_level(level);
    }
    if let Some(seed) = cli.seed {
        config = config.with_seed(seed);
    }
    if let (Some(path), Some(id)) = (cli.profiles, cli.profile) {
        let profiles: ProfileSet = serde_json::from_str(&std::fs::read_to_string(&path)?)?;
        config = config.with_profile(profiles, id);
    }

    let reports = launch_ranks(&config, ready).unwrap_or_else(|err| err.abort());

    if cli.print_config {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    } else {
        for report in &reports {
            println!(
                "{}/{}  {}  {}  {}",
                report.rank.get(),
                report.group_size,
                report.algorithm,
                report.output_dir,
                report.log_file
            );
        }
    }

    Ok(())
}
