//! Errors surfaced by the core server to its caller.

use module_api::{LoaderError, ServerLifecycle};

/// Errors fatal to a core server.
///
/// Failures of individual modules while changing phase are never reported
/// here; they are isolated and collected in an
/// [`InitializationReport`](crate::InitializationReport).
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// A loader failed to construct its modules, aborting startup
    #[error("Module loader {loader} ({loader_type}) failed to create its modules: {source}")]
    Discovery {
        loader: String,
        loader_type: &'static str,
        #[source]
        source: LoaderError,
    },
    /// A loader returned a module that was not built with its own context
    #[error("Module {module} returned by loader {loader} is bound to another loader or host")]
    ForeignModule { loader: String, module: &'static str },
    /// The phase-advance routine was invoked outside core initialization
    #[error("Attempted to initialize modules outside the core initialization: expected {expected}, server is in {actual}")]
    IllegalServerState {
        expected: ServerLifecycle,
        actual: ServerLifecycle,
    },
}
