//! In-process collaborators for the simx bootstrap sequence.
//!
//! This crate provides everything a bootstrap needs to run without a real
//! transport or persistent store: process groups whose members are threads
//! of one process, an in-memory configuration store that supplies the
//! process-wide defaults, and a simulation controller.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                       LocalGroup                        │
//! │     Arc<Mutex<taken ranks>> + Condvar join barrier      │
//! └───────┬──────────────┬──────────────┬──────────────┬────┘
//!         │              │              │              │
//!   LocalMember    LocalMember    LocalMember    LocalMember
//!    (thread 0)     (thread 1)     (thread 2)     (thread 3)
//!         │
//!         ▼
//!   Bootstrapper<LocalMember, MemoryConfigStore, SimControllerFactory>
//!         │
//!         ▼
//!   SimController (event queue ordered by time, sequence)
//! ```

mod controller;
mod env_group;
mod event_queue;
mod group;
mod store;

pub use controller::{
    SchedulingAlgorithm, SimController, SimControllerFactory, SimEvent, UnknownAlgorithm,
};
pub use env_group::{EnvProcessGroup, GROUP_SIZE_VAR, RANK_VAR};
pub use event_queue::EventKey;
pub use group::{LocalGroup, LocalMember, SoloGroup, DEFAULT_JOIN_TIMEOUT};
pub use store::{
    MemoryConfigStore, DEFAULT_END_TIME, DEFAULT_LOG_LEVEL, DEFAULT_LOOKAHEAD,
    DEFAULT_SCHED_ALGORITHM, FALLBACK_PROGRAM_NAME,
};
