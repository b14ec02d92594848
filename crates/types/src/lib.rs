//! Core types for simx process bootstrap.
//!
//! These types describe a process's place in the distributed group, the
//! configuration it runs with, and how far its bootstrap has progressed.

mod config;
mod identifiers;
mod identity;
pub mod options;
mod profile;
mod state;

pub use config::{ConfigError, ConfigValue, ConfigurationSet};
pub use identifiers::{GroupSize, Rank, ZeroGroupSize};
pub use identity::ProcessIdentity;
pub use profile::{ProfileError, ProfileSet, PARENT_KEY};
pub use state::{BootstrapState, Phase};
