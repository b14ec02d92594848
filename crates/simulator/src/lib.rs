//! simx Simulator
//!
//! Hosts a whole group of simx ranks inside one process, one thread per rank,
//! for rehearsal runs and tests of the bootstrap sequence.
//!
//! # Example
//!
//! ```ignore
//! use simx_bootstrap::DiagnosticsReady;
//! use simx_simulator::{launch_ranks, LaunchConfig};
//!
//! tracing_subscriber::fmt::init();
//! let ready = DiagnosticsReady::from_global_dispatcher().unwrap();
//!
//! let config = LaunchConfig::new("sim_app", 4).with_override("sched.algorithm=heap");
//! let reports = launch_ranks(&config, ready).unwrap_or_else(|err| err.abort());
//! ```

pub mod config;
pub mod runner;

pub use config::{LaunchConfig, MAX_LOCAL_RANKS};
pub use runner::{launch_ranks, RankReport};
