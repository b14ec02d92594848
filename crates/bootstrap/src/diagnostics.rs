//! Proof that diagnostic streams are set up.

/// Token showing that logging was initialized before the runtime phase.
///
/// Controller construction may emit diagnostics, so the runtime phase takes
/// one of these by value. Prefer [`DiagnosticsReady::from_global_dispatcher`],
/// which checks that a `tracing` subscriber is installed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiagnosticsReady {
    _private: (),
}

impl DiagnosticsReady {
    /// Returns a token if a global `tracing` dispatcher has been installed.
    pub fn from_global_dispatcher() -> Option<Self> {
        tracing::dispatcher::has_been_set().then_some(Self { _private: () })
    }

    /// Assert that diagnostics are ready without checking.
    ///
    /// For hosts that route diagnostics through something other than a global
    /// `tracing` subscriber.
    pub fn assume_initialized() -> Self {
        Self { _private: () }
    }
}
