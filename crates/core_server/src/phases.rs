//! The initialization phase table and the records produced while applying it.

use module_api::{panic_message, Module, ModuleError, ModuleLifecycle, ServerLifecycle};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

/// Server phases paired with the module state every module is moved to.
pub const INITIALIZATION_PHASES: [(ServerLifecycle, ModuleLifecycle); 3] = [
    (ServerLifecycle::ModulePreInit, ModuleLifecycle::PreInit),
    (ServerLifecycle::ModuleInit, ModuleLifecycle::Init),
    (ServerLifecycle::ModulePostInit, ModuleLifecycle::PostInit),
];

/// Failure to build the detailed diagnostic of a [`PhaseFailure`].
#[derive(Debug, thiserror::Error)]
pub enum DiagnosticError {
    /// A module accessor panicked while the message was being built
    #[error("Module accessor panicked while describing the failure: {0}")]
    Panicked(String),
    /// The loader that created the module no longer exists
    #[error("The module's loader is no longer available")]
    LoaderDropped,
}

/// Type names of a module and of its loader, for log records.
///
/// `type_name` and `loader` can be overridden by module code, so a panic in
/// either one yields a placeholder instead of escaping the isolation loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ModuleLabels {
    pub(crate) module_type: &'static str,
    pub(crate) loader_type: &'static str,
}

impl ModuleLabels {
    pub(crate) const UNKNOWN_MODULE: &'static str = "<unknown module>";
    pub(crate) const UNKNOWN_LOADER: &'static str = "<unknown loader>";
    pub(crate) const DROPPED_LOADER: &'static str = "<dropped loader>";

    pub(crate) fn of(module: &dyn Module) -> Self {
        let module_type =
            catch_unwind(AssertUnwindSafe(|| module.type_name())).unwrap_or(Self::UNKNOWN_MODULE);
        let loader_type = catch_unwind(AssertUnwindSafe(|| module.loader().map(|l| l.type_name())))
            .unwrap_or(Some(Self::UNKNOWN_LOADER))
            .unwrap_or(Self::DROPPED_LOADER);
        Self {
            module_type,
            loader_type,
        }
    }
}

/// A module that failed to reach the target state of a phase.
pub struct PhaseFailure {
    /// Position of the module in the module set
    pub module_index: usize,
    pub module: Arc<dyn Module>,
    pub module_type: &'static str,
    pub loader_type: &'static str,
    /// The state the module was asked to move to
    pub target: ModuleLifecycle,
    /// The error raised by the module
    pub error: ModuleError,
    /// Why the detailed diagnostic could not be built, if it could not
    pub suppressed: Option<DiagnosticError>,
    /// Human readable description logged for this failure
    pub diagnostic: String,
}

impl PhaseFailure {
    pub(crate) fn capture(
        module_index: usize,
        module: &Arc<dyn Module>,
        target: ModuleLifecycle,
        error: ModuleError,
    ) -> Self {
        let ModuleLabels {
            module_type,
            loader_type,
        } = ModuleLabels::of(module.as_ref());

        let detailed = catch_unwind(AssertUnwindSafe(|| describe(module.as_ref(), target)))
            .unwrap_or_else(|payload| Err(DiagnosticError::Panicked(panic_message(payload.as_ref()))));

        let (diagnostic, suppressed) = match detailed {
            Ok(message) => (message, None),
            Err(e) => (
                format!(
                    "Failed to change a module to the lifecycle {}: ({} from {})",
                    target, module_type, loader_type
                ),
                Some(e),
            ),
        };

        Self {
            module_index,
            module: module.clone(),
            module_type,
            loader_type,
            target,
            error,
            suppressed,
            diagnostic,
        }
    }
}

fn describe(module: &dyn Module, target: ModuleLifecycle) -> Result<String, DiagnosticError> {
    let loader = module.loader().ok_or(DiagnosticError::LoaderDropped)?;
    Ok(format!(
        "Failed to change a module to the lifecycle {}: ({} - {}) ({} from {}) - {:?}",
        target,
        module.name(),
        loader.name(),
        module.type_name(),
        loader.type_name(),
        module.core()
    ))
}

impl std::fmt::Debug for PhaseFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PhaseFailure")
            .field("module_index", &self.module_index)
            .field("module_type", &self.module_type)
            .field("loader_type", &self.loader_type)
            .field("target", &self.target)
            .field("error", &self.error)
            .field("suppressed", &self.suppressed)
            .finish()
    }
}

/// Outcome of one run of the phase-advance routine.
#[derive(Debug, Default)]
pub struct InitializationReport {
    /// Every isolated failure, in the order it happened
    pub failures: Vec<PhaseFailure>,
    /// Module-set indices of modules skipped after failing, under quarantine
    pub quarantined: Vec<usize>,
}

impl InitializationReport {
    /// True when every module accepted every phase.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn failures_for(&self, target: ModuleLifecycle) -> impl Iterator<Item = &PhaseFailure> {
        self.failures.iter().filter(move |f| f.target == target)
    }

    /// Module-set indices of every module that failed at least once, ascending.
    pub fn failed_modules(&self) -> Vec<usize> {
        let mut indices: Vec<usize> = self.failures.iter().map(|f| f.module_index).collect();
        indices.sort_unstable();
        indices.dedup();
        indices
    }
}
