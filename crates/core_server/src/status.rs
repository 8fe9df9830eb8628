//! Serializable snapshots of the server and its modules.

use module_api::{panic_message, LoaderInfo, Module, ModuleLifecycle, ServerId, ServerLifecycle};
use crate::phases::ModuleLabels;
use serde::{Deserialize, Serialize};
use std::panic::{catch_unwind, AssertUnwindSafe};

/// Point-in-time view of one module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleStatus {
    pub name: String,
    pub module_type: String,
    /// Name of the loader that created the module
    pub loader: Option<String>,
    pub lifecycle: ModuleLifecycle,
    pub capabilities: Vec<String>,
}

impl ModuleStatus {
    pub(crate) fn of(module: &dyn Module) -> Self {
        let name = catch_unwind(AssertUnwindSafe(|| module.name().to_string())).unwrap_or_else(|payload| {
            format!("<unnamed: {}>", panic_message(payload.as_ref()))
        });

        Self {
            name,
            module_type: ModuleLabels::of(module).module_type.to_string(),
            loader: catch_unwind(AssertUnwindSafe(|| module.loader().map(|l| l.name().to_string())))
                .unwrap_or_else(|_| Some(ModuleLabels::UNKNOWN_LOADER.to_string())),
            lifecycle: module.lifecycle(),
            capabilities: module
                .core()
                .capabilities()
                .iter()
                .map(|c| c.name().to_string())
                .collect(),
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.lifecycle == ModuleLifecycle::Initialized
    }
}

/// Point-in-time view of a whole server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerStatus {
    pub id: ServerId,
    pub lifecycle: ServerLifecycle,
    pub loaders: Vec<LoaderInfo>,
    pub modules: Vec<ModuleStatus>,
}

impl ServerStatus {
    /// Modules that have not reached `INITIALIZED`.
    pub fn lagging_modules(&self) -> impl Iterator<Item = &ModuleStatus> {
        self.modules.iter().filter(|m| !m.is_initialized())
    }
}
