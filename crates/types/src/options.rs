//! Well-known configuration option names.

/// Name the program was started under.
pub const PROGRAM_NAME: &str = "program.name";

/// Per-rank output directory.
pub const OUTPUT_DIR: &str = "output.dir";

/// Diagnostic verbosity.
pub const LOG_LEVEL: &str = "log.level";

/// Per-rank log file name.
pub const LOG_FILE: &str = "log.file";

/// Scheduling strategy used by the controller.
pub const SCHED_ALGORITHM: &str = "sched.algorithm";

/// Simulation time at which the controller stops.
pub const SCHED_END_TIME: &str = "sched.end_time";

/// Minimum delay between ranks, used by the controller for lookahead.
pub const SCHED_LOOKAHEAD: &str = "sched.lookahead";

/// Base seed for per-rank random number generators.
pub const RNG_SEED: &str = "rng.seed";

/// Options that must be present once the configuration phase completes.
pub const REQUIRED_OPTIONS: &[&str] = &[
    PROGRAM_NAME,
    OUTPUT_DIR,
    LOG_LEVEL,
    LOG_FILE,
    SCHED_ALGORITHM,
    SCHED_END_TIME,
    SCHED_LOOKAHEAD,
    RNG_SEED,
];
