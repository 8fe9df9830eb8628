//! The core server: owner of the module set and driver of its lifecycle.

use crate::cache::CapabilityCache;
use crate::config::{CoreConfig, FailurePolicy};
use crate::error::CoreError;
use crate::phases::{InitializationReport, ModuleLabels, PhaseFailure, INITIALIZATION_PHASES};
use crate::registry::LoaderRegistry;
use crate::status::{ModuleStatus, ServerStatus};
use futures::FutureExt;
use module_api::{
    CapabilityId, LoadingSecrets, Module, ModuleContext, ModuleError, ModuleList, ModuleLoader,
    Server, ServerId, ServerLifecycle, StateStream, StateSubscription,
};
use std::collections::BTreeSet;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, OnceLock, Weak};
use tracing::{debug, error, info, trace, warn};

/// The deepest core of the server.
///
/// Discovers modules through its loaders, moves them through the
/// initialization phases and lets them find each other by capability.
pub struct CoreServer {
    /// Stable identifier of this instance
    id: ServerId,
    config: CoreConfig,
    /// Published server lifecycle
    lifecycle: StateStream<ServerLifecycle>,
    /// Token modules were built with
    secrets: LoadingSecrets,
    /// Loaders in enumeration order, kept alive for the modules' back-references
    loaders: Vec<Arc<dyn ModuleLoader>>,
    /// Module set, fixed once discovery completes
    modules: OnceLock<Vec<Arc<dyn Module>>>,
    cache: CapabilityCache,
}

impl CoreServer {
    /// Creates a server and discovers the modules of every registered loader.
    ///
    /// Loaders are asked for their modules in registration order and the
    /// module set keeps that order, then each loader's creation order.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Discovery`] as soon as one loader fails, and
    /// [`CoreError::ForeignModule`] if a loader returns a module built for
    /// another loader or host. No phase has been applied in either case.
    pub async fn new(registry: LoaderRegistry, config: CoreConfig) -> Result<Arc<Self>, CoreError> {
        let id = ServerId::new();
        debug!("Creating a new CoreServer instance with id: {}", id);

        let server = Arc::new(Self {
            id,
            config,
            lifecycle: StateStream::new(ServerLifecycle::CoreInitialization),
            secrets: LoadingSecrets::issue(),
            loaders: registry.into_loaders(),
            modules: OnceLock::new(),
            cache: CapabilityCache::new(),
        });

        server.watch_lifecycle();

        let modules = server.discover_modules().await?;
        if server.modules.set(modules).is_err() {
            warn!("Module set of server {} was already initialized", id);
        }
        Ok(server)
    }

    async fn discover_modules(self: &Arc<Self>) -> Result<Vec<Arc<dyn Module>>, CoreError> {
        let weak_self: Weak<CoreServer> = Arc::downgrade(self);
        let host: Weak<dyn Server> = weak_self;
        let mut modules = Vec::new();

        for loader in &self.loaders {
            debug!(
                "The module loader {} ({}) was found, creating modules...",
                loader.name(),
                loader.type_name()
            );
            let ctx = ModuleContext::new(loader, host.clone(), &self.secrets);
            let created = loader
                .create_modules(&ctx)
                .await
                .map_err(|source| CoreError::Discovery {
                    loader: loader.name().to_string(),
                    loader_type: loader.type_name(),
                    source,
                })?;

            for module in &created {
                if !self.is_bound(module.as_ref(), loader) {
                    return Err(CoreError::ForeignModule {
                        loader: loader.name().to_string(),
                        module: ModuleLabels::of(module.as_ref()).module_type,
                    });
                }
            }

            debug!(
                "The loader {} created {} modules with these types: {:?}",
                loader.type_name(),
                created.len(),
                created
                    .iter()
                    .map(|m| ModuleLabels::of(m.as_ref()).module_type)
                    .collect::<Vec<_>>()
            );
            modules.extend(created);
        }

        Ok(modules)
    }

    fn is_bound(&self, module: &dyn Module, loader: &Arc<dyn ModuleLoader>) -> bool {
        let same_loader = module
            .loader()
            .is_some_and(|l| Arc::as_ptr(&l) as *const () == Arc::as_ptr(loader) as *const ());
        let same_host = module
            .server()
            .is_some_and(|s| Arc::as_ptr(&s) as *const () == self as *const CoreServer as *const ());
        same_loader && same_host
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    /// Loaders in enumeration order.
    pub fn loaders(&self) -> &[Arc<dyn ModuleLoader>] {
        &self.loaders
    }

    /// The module set, empty while discovery is still running.
    pub fn modules(&self) -> &[Arc<dyn Module>] {
        self.modules.get().map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of capabilities with a cached lookup.
    pub fn cached_capabilities(&self) -> usize {
        self.cache.len()
    }

    /// Live subscriptions to the server lifecycle, the log observer included.
    pub fn lifecycle_observers(&self) -> usize {
        self.lifecycle.subscriber_count()
    }

    /// Runs the server: applies every initialization phase and, if
    /// configured, publishes `RUNNING`.
    pub async fn start(self: &Arc<Self>) -> Result<InitializationReport, CoreError> {
        info!("Welcome! Starting the core server {}", self.id);

        let report = self.initialize_modules().await?;
        if self.config.enter_running {
            self.lifecycle.publish(ServerLifecycle::Running);
        }
        Ok(report)
    }

    /// The phase-advance routine.
    ///
    /// For each entry of [`INITIALIZATION_PHASES`] the server phase is
    /// published, then every module is asked, in module-set order, to move to
    /// the paired module state. A module that fails is logged and recorded in
    /// the returned report; the remaining modules and phases still run.
    /// `RUNNING` is never published here.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::IllegalServerState`] if the server already left
    /// `CORE_INITIALIZATION`, which means this routine was invoked twice.
    pub async fn initialize_modules(&self) -> Result<InitializationReport, CoreError> {
        let mut report = InitializationReport::default();
        let mut quarantined = BTreeSet::new();
        let modules = self.modules();

        for (phase, (server_phase, target)) in INITIALIZATION_PHASES.into_iter().enumerate() {
            if phase == 0 {
                self.lifecycle
                    .advance_from(&ServerLifecycle::CoreInitialization, server_phase)
                    .map_err(|actual| CoreError::IllegalServerState {
                        expected: ServerLifecycle::CoreInitialization,
                        actual,
                    })?;
            } else {
                self.lifecycle.publish(server_phase);
            }

            for (index, module) in modules.iter().enumerate() {
                let labels = ModuleLabels::of(module.as_ref());
                if quarantined.contains(&index) {
                    trace!("Skipping quarantined module {} for {}", labels.module_type, target);
                    continue;
                }

                debug!(
                    "Applying lifecycle {} to the module {} from {}",
                    target, labels.module_type, labels.loader_type
                );

                let outcome = AssertUnwindSafe(module.change_lifecycle_state(target, &self.secrets))
                    .catch_unwind()
                    .await
                    .unwrap_or_else(|payload| Err(ModuleError::from_panic(payload)));

                match outcome {
                    Ok(()) => {
                        trace!(
                            "The module has successfully changed to the {} lifecycle ({})",
                            target,
                            labels.module_type
                        );
                    }
                    Err(e) => {
                        let failure = PhaseFailure::capture(index, module, target, e);
                        error!(
                            module = failure.module_type,
                            loader = failure.loader_type,
                            target = %failure.target,
                            suppressed = ?failure.suppressed,
                            "{}: {}",
                            failure.diagnostic,
                            failure.error
                        );
                        if self.config.failure_policy == FailurePolicy::Quarantine {
                            quarantined.insert(index);
                        }
                        report.failures.push(failure);
                    }
                }
            }
        }

        report.quarantined = quarantined.into_iter().collect();
        if report.is_clean() {
            info!("All {} modules were initialized", modules.len());
        } else {
            warn!(
                "{} of {} modules failed to initialize completely",
                report.failed_modules().len(),
                modules.len()
            );
        }
        Ok(report)
    }

    /// Spawns the diagnostic observer that logs every server lifecycle change.
    /// It ends when the server is dropped.
    fn watch_lifecycle(&self) {
        let mut states = self.lifecycle.subscribe();
        tokio::spawn(async move {
            while let Some(state) = states.recv().await {
                info!("====== Server life state changed to {} ======", state);
            }
        });
    }

    /// Snapshot of every module.
    pub fn module_statuses(&self) -> Vec<ModuleStatus> {
        self.modules()
            .iter()
            .map(|module| ModuleStatus::of(module.as_ref()))
            .collect()
    }

    /// Snapshot of the whole server.
    pub fn status(&self) -> ServerStatus {
        ServerStatus {
            id: self.id,
            lifecycle: self.lifecycle.current(),
            loaders: self.loaders.iter().map(|l| l.info()).collect(),
            modules: self.module_statuses(),
        }
    }
}

impl Server for CoreServer {
    fn id(&self) -> ServerId {
        self.id
    }

    fn lifecycle(&self) -> ServerLifecycle {
        self.lifecycle.current()
    }

    fn subscribe_lifecycle(&self) -> StateSubscription<ServerLifecycle> {
        self.lifecycle.subscribe()
    }

    fn find_modules_by(&self, capability: CapabilityId) -> ModuleList {
        match self.modules.get() {
            Some(modules) => self.cache.lookup(capability, modules),
            None => {
                // Discovery is still running, so a result now could go stale.
                trace!("Lookup of {} during discovery, not cached", capability);
                Arc::from(Vec::new())
            }
        }
    }
}

impl std::fmt::Debug for CoreServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreServer")
            .field("id", &self.id)
            .field("lifecycle", &self.lifecycle.current())
            .field("loaders", &self.loaders.len())
            .field("modules", &self.modules().len())
            .finish()
    }
}
