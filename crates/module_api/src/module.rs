//! Modules: named, versioned feature units hosted by a server.
//!
//! Every module embeds a [`ModuleCore`] holding the state the host relies on
//! (name, owning loader, host handle, declared capabilities and the observable
//! lifecycle value). Module authors implement [`Module::on_lifecycle`] to do
//! the work of each phase; recording the new state is handled by
//! [`Module::change_lifecycle_state`].

use crate::capability::CapabilityId;
use crate::error::ModuleError;
use crate::lifecycle::ModuleLifecycle;
use crate::loader::{ModuleContext, ModuleLoader};
use crate::secrets::LoadingSecrets;
use crate::server::Server;
use crate::stream::{StateStream, StateSubscription};
use async_trait::async_trait;
use std::any::Any;
use std::sync::{Arc, Weak};
use uuid::Uuid;

/// Views a shared module as `C`, stored per capability in the [`ModuleCore`].
type Caster<C> = Arc<dyn Fn(Arc<dyn Module>) -> Option<Arc<C>> + Send + Sync>;

/// Turns a shared module back into a shared [`Any`] so it can be downcast to
/// its concrete type. Implemented for every module type.
pub trait IntoAnyArc: Any + Send + Sync {
    fn into_any_arc(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

impl<T: Any + Send + Sync> IntoAnyArc for T {
    fn into_any_arc(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

/// State shared by every module implementation.
pub struct ModuleCore {
    name: String,
    loader: Weak<dyn ModuleLoader>,
    server: Weak<dyn Server>,
    capabilities: Vec<CapabilityId>,
    casters: Vec<(CapabilityId, Arc<dyn Any + Send + Sync>)>,
    lifecycle: StateStream<ModuleLifecycle>,
    issuer: Uuid,
}

impl ModuleCore {
    /// Starts building the core of a module created in `ctx`.
    pub fn builder(ctx: &ModuleContext<'_>, name: impl Into<String>) -> ModuleCoreBuilder {
        ModuleCoreBuilder {
            name: name.into(),
            loader: ctx.loader(),
            server: ctx.server(),
            capabilities: vec![CapabilityId::of::<dyn Module>()],
            casters: Vec::new(),
            issuer: ctx.secrets().fingerprint(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The loader that created the module, if it is still alive.
    pub fn loader(&self) -> Option<Arc<dyn ModuleLoader>> {
        self.loader.upgrade()
    }

    /// The host owning the module, if it is still alive.
    pub fn server(&self) -> Option<Arc<dyn Server>> {
        self.server.upgrade()
    }

    /// Capabilities declared at construction, in declaration order.
    pub fn capabilities(&self) -> &[CapabilityId] {
        &self.capabilities
    }

    pub fn satisfies(&self, capability: CapabilityId) -> bool {
        self.capabilities.contains(&capability)
    }

    pub fn lifecycle(&self) -> ModuleLifecycle {
        self.lifecycle.current()
    }

    pub fn subscribe_lifecycle(&self) -> StateSubscription<ModuleLifecycle> {
        self.lifecycle.subscribe()
    }

    fn authorize(&self, secrets: &LoadingSecrets) -> Result<(), ModuleError> {
        if secrets.fingerprint() == self.issuer {
            Ok(())
        } else {
            Err(ModuleError::Unauthorized)
        }
    }

    fn record(&self, state: ModuleLifecycle) {
        self.lifecycle.publish(state);
    }
}

impl std::fmt::Debug for ModuleCore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleCore")
            .field("name", &self.name)
            .field("capabilities", &self.capabilities)
            .field("lifecycle", &self.lifecycle.current())
            .finish()
    }
}

/// Builder returned by [`ModuleCore::builder`].
pub struct ModuleCoreBuilder {
    name: String,
    loader: Weak<dyn ModuleLoader>,
    server: Weak<dyn Server>,
    capabilities: Vec<CapabilityId>,
    casters: Vec<(CapabilityId, Arc<dyn Any + Send + Sync>)>,
    issuer: Uuid,
}

impl ModuleCoreBuilder {
    /// Declares that the module satisfies the capability `C`.
    pub fn capability<C: ?Sized + 'static>(self) -> Self {
        self.capability_id(CapabilityId::of::<C>())
    }

    /// Declares the capability `C` together with the view of the module as `C`.
    ///
    /// Only capabilities declared this way are returned by
    /// [`ServerExt::find_services`](crate::ServerExt::find_services).
    ///
    /// ```rust,ignore
    /// ModuleCore::builder(ctx, "greeter")
    ///     .capability_as(|greeter: Arc<GreeterModule>| greeter as Arc<dyn Greeter>)
    ///     .build()
    /// ```
    pub fn capability_as<C, T>(mut self, cast: impl Fn(Arc<T>) -> Arc<C> + Send + Sync + 'static) -> Self
    where
        C: ?Sized + 'static,
        T: Module,
    {
        let caster: Caster<C> = Arc::new(move |module: Arc<dyn Module>| {
            IntoAnyArc::into_any_arc(module).downcast::<T>().ok().map(&cast)
        });
        let capability = CapabilityId::of::<C>();
        self.casters.retain(|(id, _)| *id != capability);
        self.casters.push((capability, Arc::new(caster)));
        self.capability_id(capability)
    }

    pub fn capability_id(mut self, capability: CapabilityId) -> Self {
        if !self.capabilities.contains(&capability) {
            self.capabilities.push(capability);
        }
        self
    }

    pub fn build(self) -> ModuleCore {
        ModuleCore {
            name: self.name,
            loader: self.loader,
            server: self.server,
            capabilities: self.capabilities,
            casters: self.casters,
            lifecycle: StateStream::new(ModuleLifecycle::Construction),
            issuer: self.issuer,
        }
    }
}

/// A discoverable feature unit with its own lifecycle.
///
/// # Lifecycle
///
/// The host requests `PRE_INIT`, `INIT` and `POST_INIT` in that order, once
/// per phase. Each request runs [`on_lifecycle`](Module::on_lifecycle) and,
/// when it succeeds, records the new state. Completing `POST_INIT` also
/// records the terminal `INITIALIZED` state.
///
/// Every module satisfies the capability `dyn Module`.
#[async_trait]
pub trait Module: IntoAnyArc {
    /// The embedded core state.
    fn core(&self) -> &ModuleCore;

    /// Access to the concrete type, see [`downcast_module`].
    fn as_any(&self) -> &dyn Any;

    /// Human readable name.
    fn name(&self) -> &str {
        self.core().name()
    }

    /// Concrete type name, used for diagnostics.
    fn type_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    fn loader(&self) -> Option<Arc<dyn ModuleLoader>> {
        self.core().loader()
    }

    fn server(&self) -> Option<Arc<dyn Server>> {
        self.core().server()
    }

    /// Current lifecycle state.
    fn lifecycle(&self) -> ModuleLifecycle {
        self.core().lifecycle()
    }

    /// Stream of lifecycle states, starting with the current one.
    fn subscribe_lifecycle(&self) -> StateSubscription<ModuleLifecycle> {
        self.core().subscribe_lifecycle()
    }

    fn satisfies(&self, capability: CapabilityId) -> bool {
        self.core().satisfies(capability)
    }

    /// Work performed when moving to `target`.
    ///
    /// Runs before the state is recorded, so [`lifecycle`](Module::lifecycle)
    /// still reports the previous state while this is executing.
    async fn on_lifecycle(&self, _target: ModuleLifecycle) -> Result<(), ModuleError> {
        Ok(())
    }

    /// Moves the module one step forward to `target`.
    ///
    /// # Errors
    ///
    /// - [`ModuleError::Unauthorized`] if `secrets` were not issued by the host
    ///   that built the module
    /// - [`ModuleError::IllegalTransition`] if `target` is not the next state
    /// - whatever [`on_lifecycle`](Module::on_lifecycle) returns; the state
    ///   is left unchanged in that case
    async fn change_lifecycle_state(
        &self,
        target: ModuleLifecycle,
        secrets: &LoadingSecrets,
    ) -> Result<(), ModuleError> {
        let core = self.core();
        core.authorize(secrets)?;

        let current = core.lifecycle();
        if current.next() != Some(target) {
            return Err(ModuleError::IllegalTransition { current, target });
        }

        self.on_lifecycle(target).await?;
        core.record(target);

        if target == ModuleLifecycle::PostInit {
            core.record(ModuleLifecycle::Initialized);
        }
        Ok(())
    }
}

/// Borrows a module as its concrete type.
///
/// ```rust,ignore
/// let greeter = downcast_module::<GreeterModule>(module.as_ref());
/// ```
/// Views a module as the capability `C`.
///
/// Returns `None` unless the module declared `C` through
/// [`ModuleCoreBuilder::capability_as`]. The concrete type of the module does
/// not need to be known.
pub fn cast_module<C: ?Sized + 'static>(module: &Arc<dyn Module>) -> Option<Arc<C>> {
    let capability = CapabilityId::of::<C>();
    let (_, caster) = module.core().casters.iter().find(|(id, _)| *id == capability)?;
    let caster = caster.downcast_ref::<Caster<C>>()?;
    caster(Arc::clone(module))
}

pub fn downcast_module<T: Module>(module: &dyn Module) -> Option<&T> {
    module.as_any().downcast_ref::<T>()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LoaderError;
    use crate::types::ContactInformation;
    use std::collections::BTreeSet;
    use std::sync::atomic::{AtomicUsize, Ordering};

    trait Chat {}

    trait Counter: Send + Sync {
        fn count(&self) -> usize;
    }

    impl Counter for CountingModule {
        fn count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    struct CountingModule {
        core: ModuleCore,
        calls: AtomicUsize,
        fail_on: Option<ModuleLifecycle>,
    }

    #[async_trait]
    impl Module for CountingModule {
        fn core(&self) -> &ModuleCore {
            &self.core
        }

        fn as_any(&self) -> &dyn Any {
            self
        }

        async fn on_lifecycle(&self, target: ModuleLifecycle) -> Result<(), ModuleError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_on == Some(target) {
                return Err(ModuleError::InitializationFailed(format!("refusing {}", target)));
            }
            Ok(())
        }
    }

    struct NullLoader;

    #[async_trait]
    impl ModuleLoader for NullLoader {
        fn name(&self) -> &str {
            "null"
        }
        fn version(&self) -> &str {
            "0.0.1"
        }
        fn description(&self) -> &str {
            "creates nothing"
        }
        fn authors(&self) -> BTreeSet<ContactInformation> {
            BTreeSet::from([ContactInformation::new("tester")])
        }
        fn source_code(&self) -> &str {
            "https://example.com/null"
        }
        async fn create_modules(
            &self,
            _ctx: &ModuleContext<'_>,
        ) -> Result<Vec<Arc<dyn Module>>, LoaderError> {
            Ok(Vec::new())
        }
    }

    fn orphan_server() -> Weak<dyn Server> {
        Weak::<crate::server::tests::DetachedServer>::new()
    }

    fn module(
        loader: &Arc<dyn ModuleLoader>,
        secrets: &LoadingSecrets,
        fail_on: Option<ModuleLifecycle>,
    ) -> CountingModule {
        let ctx = ModuleContext::new(loader, orphan_server(), secrets);
        CountingModule {
            core: ModuleCore::builder(&ctx, "counter").capability::<dyn Chat>().build(),
            calls: AtomicUsize::new(0),
            fail_on,
        }
    }

    #[tokio::test]
    async fn test_walks_to_initialized() {
        let loader: Arc<dyn ModuleLoader> = Arc::new(NullLoader);
        let secrets = LoadingSecrets::issue();
        let module = module(&loader, &secrets, None);
        let mut states = module.subscribe_lifecycle();

        for target in [ModuleLifecycle::PreInit, ModuleLifecycle::Init, ModuleLifecycle::PostInit] {
            module.change_lifecycle_state(target, &secrets).await.unwrap();
        }

        assert_eq!(module.lifecycle(), ModuleLifecycle::Initialized);
        assert_eq!(module.calls.load(Ordering::SeqCst), 3);

        let mut seen = Vec::new();
        while let Some(state) = states.try_recv() {
            seen.push(state);
        }
        assert_eq!(seen, ModuleLifecycle::ALL.to_vec());
    }

    #[tokio::test]
    async fn test_rejects_skipped_state() {
        let loader: Arc<dyn ModuleLoader> = Arc::new(NullLoader);
        let secrets = LoadingSecrets::issue();
        let module = module(&loader, &secrets, None);

        let err = module
            .change_lifecycle_state(ModuleLifecycle::Init, &secrets)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ModuleError::IllegalTransition {
                current: ModuleLifecycle::Construction,
                target: ModuleLifecycle::Init
            }
        ));
        assert_eq!(module.lifecycle(), ModuleLifecycle::Construction);
        assert_eq!(module.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_rejects_foreign_secrets() {
        let loader: Arc<dyn ModuleLoader> = Arc::new(NullLoader);
        let secrets = LoadingSecrets::issue();
        let module = module(&loader, &secrets, None);

        let err = module
            .change_lifecycle_state(ModuleLifecycle::PreInit, &LoadingSecrets::issue())
            .await
            .unwrap_err();
        assert!(matches!(err, ModuleError::Unauthorized));
        assert_eq!(module.lifecycle(), ModuleLifecycle::Construction);
    }

    #[tokio::test]
    async fn test_failed_phase_keeps_previous_state() {
        let loader: Arc<dyn ModuleLoader> = Arc::new(NullLoader);
        let secrets = LoadingSecrets::issue();
        let module = module(&loader, &secrets, Some(ModuleLifecycle::Init));

        module
            .change_lifecycle_state(ModuleLifecycle::PreInit, &secrets)
            .await
            .unwrap();
        assert!(module
            .change_lifecycle_state(ModuleLifecycle::Init, &secrets)
            .await
            .is_err());
        assert_eq!(module.lifecycle(), ModuleLifecycle::PreInit);
    }

    #[test]
    fn test_core_metadata() {
        let loader: Arc<dyn ModuleLoader> = Arc::new(NullLoader);
        let secrets = LoadingSecrets::issue();
        let module = module(&loader, &secrets, None);

        assert_eq!(module.name(), "counter");
        assert!(module.type_name().ends_with("CountingModule"));
        assert!(module.satisfies(CapabilityId::of::<dyn Module>()));
        assert!(module.satisfies(CapabilityId::of::<dyn Chat>()));
        assert!(!module.satisfies(CapabilityId::of::<u8>()));
        assert_eq!(module.loader().map(|l| l.name().to_string()), Some("null".into()));
        assert!(module.server().is_none());
        assert!(downcast_module::<CountingModule>(&module).is_some());
    }

    #[test]
    fn test_loader_ref_is_not_owning() {
        let loader: Arc<dyn ModuleLoader> = Arc::new(NullLoader);
        let secrets = LoadingSecrets::issue();
        let module = module(&loader, &secrets, None);
        drop(loader);
        assert!(module.loader().is_none());
    }

    #[tokio::test]
    async fn test_cast_to_declared_capability() {
        let loader: Arc<dyn ModuleLoader> = Arc::new(NullLoader);
        let secrets = LoadingSecrets::issue();
        let ctx = ModuleContext::new(&loader, orphan_server(), &secrets);
        let module: Arc<dyn Module> = Arc::new(CountingModule {
            core: ModuleCore::builder(&ctx, "counter")
                .capability_as(|m: Arc<CountingModule>| m as Arc<dyn Counter>)
                .build(),
            calls: AtomicUsize::new(0),
            fail_on: None,
        });

        module
            .change_lifecycle_state(ModuleLifecycle::PreInit, &secrets)
            .await
            .unwrap();

        assert!(module.satisfies(CapabilityId::of::<dyn Counter>()));
        let counter = cast_module::<dyn Counter>(&module).unwrap();
        assert_eq!(counter.count(), 1);
        assert!(cast_module::<dyn Chat>(&module).is_none());
    }

    #[test]
    fn test_marker_capability_has_no_view() {
        let loader: Arc<dyn ModuleLoader> = Arc::new(NullLoader);
        let secrets = LoadingSecrets::issue();
        let module: Arc<dyn Module> = Arc::new(module(&loader, &secrets, None));

        assert!(module.satisfies(CapabilityId::of::<dyn Chat>()));
        assert!(cast_module::<dyn Chat>(&module).is_none());
        assert!(cast_module::<dyn Counter>(&module).is_none());
    }
}
