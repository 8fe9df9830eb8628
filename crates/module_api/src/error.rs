//! Error types raised by modules and module loaders.

use crate::lifecycle::ModuleLifecycle;

/// Errors that can occur while a module changes its lifecycle state.
///
/// # Error Categories
///
/// - **IllegalTransition**: the requested target is not the next state
/// - **Unauthorized**: the request did not carry the host's loading secrets
/// - **InitializationFailed**: the module's own phase work failed
/// - **Panicked**: the module's phase work panicked
#[derive(Debug, thiserror::Error)]
pub enum ModuleError {
    /// A lifecycle change skipped or regressed a state
    #[error("Illegal lifecycle transition from {current} to {target}")]
    IllegalTransition {
        current: ModuleLifecycle,
        target: ModuleLifecycle,
    },
    /// The caller is not the host that created the module
    #[error("Lifecycle change was not authorized by the module's host")]
    Unauthorized,
    /// The module failed to complete the phase
    #[error("Module initialization failed: {0}")]
    InitializationFailed(String),
    /// The module panicked while completing the phase
    #[error("Module panicked: {0}")]
    Panicked(String),
    /// Any other error raised by module code
    #[error(transparent)]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl ModuleError {
    /// Converts a panic payload into a [`ModuleError::Panicked`].
    pub fn from_panic(payload: Box<dyn std::any::Any + Send>) -> Self {
        ModuleError::Panicked(panic_message(payload.as_ref()))
    }
}

/// Errors that can occur while a loader constructs its modules.
#[derive(Debug, thiserror::Error)]
pub enum LoaderError {
    /// The loader could not construct its modules
    #[error("Module creation failed: {0}")]
    CreationFailed(String),
    /// A module refused to be constructed
    #[error("Module construction error: {0}")]
    Module(#[from] ModuleError),
    /// Any other error raised by loader code
    #[error(transparent)]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

/// Extracts a readable message from a panic payload.
pub fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
