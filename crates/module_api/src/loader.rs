//! Module loaders: the factories that produce modules during discovery.

use crate::error::LoaderError;
use crate::module::Module;
use crate::secrets::LoadingSecrets;
use crate::server::Server;
use crate::types::ContactInformation;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::{Arc, Weak};

/// A factory capability that constructs zero or more modules for a host.
///
/// Loaders are enumerated once by the host, in registration order, and
/// [`create_modules`](ModuleLoader::create_modules) is called exactly once on
/// each of them. An error returned from that call aborts server startup.
///
/// # Examples
///
/// ```rust,no_run
/// use module_api::*;
/// use std::collections::BTreeSet;
/// use std::sync::Arc;
///
/// struct Echo { core: ModuleCore }
///
/// impl Module for Echo {
///     fn core(&self) -> &ModuleCore { &self.core }
///     fn as_any(&self) -> &dyn std::any::Any { self }
/// }
///
/// struct EchoLoader;
///
/// #[async_trait]
/// impl ModuleLoader for EchoLoader {
///     fn name(&self) -> &str { "echo" }
///     fn version(&self) -> &str { "1.0.0" }
///     fn description(&self) -> &str { "Repeats things" }
///     fn authors(&self) -> BTreeSet<ContactInformation> { BTreeSet::new() }
///     fn source_code(&self) -> &str { "https://example.com/echo" }
///
///     async fn create_modules(
///         &self,
///         ctx: &ModuleContext<'_>,
///     ) -> Result<Vec<Arc<dyn Module>>, LoaderError> {
///         let core = ModuleCore::builder(ctx, "echo").build();
///         Ok(vec![Arc::new(Echo { core })])
///     }
/// }
/// ```
#[async_trait]
pub trait ModuleLoader: Send + Sync + 'static {
    /// Returns the loader name.
    fn name(&self) -> &str;

    /// Returns the loader version string.
    fn version(&self) -> &str;

    /// Human readable description of what the loaded modules do.
    fn description(&self) -> &str;

    /// The people responsible for this loader.
    fn authors(&self) -> BTreeSet<ContactInformation>;

    /// Locator of the source code, usually a repository URL.
    fn source_code(&self) -> &str;

    /// Concrete type name, used for diagnostics.
    fn type_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Constructs this loader's modules.
    ///
    /// Must not assume any particular server lifecycle state. Modules must be
    /// built through [`ModuleCore::builder`](crate::ModuleCore::builder) with
    /// the given context so they are bound to this loader and host.
    async fn create_modules(
        &self,
        ctx: &ModuleContext<'_>,
    ) -> Result<Vec<Arc<dyn Module>>, LoaderError>;

    /// Serializable snapshot of the loader metadata.
    fn info(&self) -> LoaderInfo {
        LoaderInfo {
            name: self.name().to_string(),
            version: self.version().to_string(),
            description: self.description().to_string(),
            authors: self.authors(),
            source_code: self.source_code().to_string(),
        }
    }
}

/// Loader metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoaderInfo {
    pub name: String,
    pub version: String,
    pub description: String,
    pub authors: BTreeSet<ContactInformation>,
    pub source_code: String,
}

/// Everything a loader needs to bind new modules to itself and to the host.
pub struct ModuleContext<'a> {
    loader: Weak<dyn ModuleLoader>,
    server: Weak<dyn Server>,
    secrets: &'a LoadingSecrets,
}

impl<'a> ModuleContext<'a> {
    pub fn new(
        loader: &Arc<dyn ModuleLoader>,
        server: Weak<dyn Server>,
        secrets: &'a LoadingSecrets,
    ) -> Self {
        Self {
            loader: Arc::downgrade(loader),
            server,
            secrets,
        }
    }

    /// The loader currently creating modules.
    pub fn loader(&self) -> Weak<dyn ModuleLoader> {
        self.loader.clone()
    }

    /// The host the modules will belong to.
    pub fn server(&self) -> Weak<dyn Server> {
        self.server.clone()
    }

    pub fn secrets(&self) -> &'a LoadingSecrets {
        self.secrets
    }
}

impl std::fmt::Debug for ModuleContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let loader = self.loader.upgrade().map(|l| l.name().to_string());
        f.debug_struct("ModuleContext")
            .field("loader", &loader)
            .field("secrets", self.secrets)
            .finish()
    }
}
