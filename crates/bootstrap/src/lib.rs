//! Two-phase bootstrap for a simx process.
//!
//! Brings one rank from "just started" to "ready to run simulation logic":
//!
//! ```text
//! ┌──────────────┐  bootstrap_configuration  ┌─────────────────┐  bootstrap_runtime  ┌──────────────────┐
//! │Uninitialized │ ─────────────────────────▶ │ ConfigPhaseDone │ ───────────────────▶ │ RuntimePhaseDone │
//! └──────┬───────┘                            └────────┬────────┘                      └──────────────────┘
//!        │ failure                                     │ failure
//!        ▼                                             ▼
//!    [aborted]                                     [aborted]
//! ```
//!
//! - **Configuration phase**: join the process group, initialize the
//!   configuration store, merge defaults (some keyed by rank).
//! - **Runtime phase**: resolve rank-local resources, create the controller.
//!
//! Each phase runs exactly once and in order. Calling a phase out of order,
//! twice, or after a failure yields [`BootstrapError::ProtocolOrderViolation`].
//! Every failure is fatal: the host should report it with
//! [`BootstrapError::abort`], which exits with a code per [`FailureKind`].
//!
//! Logging must be set up before the runtime phase. The runtime phase takes a
//! [`DiagnosticsReady`] token to make that explicit.

mod context;
mod diagnostics;
mod error;
mod orchestrator;

pub use context::BootstrapContext;
pub use diagnostics::DiagnosticsReady;
pub use error::{BootstrapError, FailureKind};
pub use orchestrator::Bootstrapper;
