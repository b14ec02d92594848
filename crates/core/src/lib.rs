//! Collaborator traits for the simx bootstrap sequence.
//!
//! The bootstrap orchestrator drives three collaborators it does not
//! implement itself:
//!
//! - [`ProcessGroup`]: joins the distributed group and resolves rank-local
//!   resources
//! - [`ConfigStore`]: backs the configuration and supplies defaults
//! - [`ControllerFactory`]: builds the per-process controller
//!
//! Real transports and stores implement these traits. The `simx-simulation`
//! crate provides in-process versions.

mod error;
mod traits;

pub use error::{ControllerError, GroupError};
pub use simx_types::ConfigError;
pub use traits::{ConfigStore, ControllerFactory, ProcessGroup};
