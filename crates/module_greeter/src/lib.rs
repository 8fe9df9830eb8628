//! Sample modules showing how features are contributed to a core server.
//!
//! [`GreeterLoader`] creates two modules:
//!
//! * [`GreeterModule`] - declares the [`Greeter`] capability
//! * [`MotdModule`] - finds every greeter once the server reaches
//!   `MODULE_POST_INIT` and builds a message of the day from them

use async_trait::async_trait;
use module_api::{
    ContactInformation, LoaderError, Module, ModuleContext, ModuleCore,
    ModuleError, ModuleLifecycle, ModuleLoader, ServerExt,
};
use parking_lot::Mutex;
use std::any::Any;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Capability of modules able to welcome someone.
pub trait Greeter: Send + Sync {
    fn greet(&self, who: &str) -> String;
}

/// Welcomes people with a configurable greeting.
pub struct GreeterModule {
    core: ModuleCore,
    greeting: String,
    welcome_count: AtomicU32,
}

impl GreeterModule {
    pub fn new(ctx: &ModuleContext<'_>, greeting: impl Into<String>) -> Self {
        Self {
            core: ModuleCore::builder(ctx, "greeter")
                .capability_as(|greeter: Arc<GreeterModule>| greeter as Arc<dyn Greeter>)
                .build(),
            greeting: greeting.into(),
            welcome_count: AtomicU32::new(0),
        }
    }

    /// How many times [`Greeter::greet`] was called.
    pub fn welcome_count(&self) -> u32 {
        self.welcome_count.load(Ordering::Relaxed)
    }
}

impl Greeter for GreeterModule {
    fn greet(&self, who: &str) -> String {
        self.welcome_count.fetch_add(1, Ordering::Relaxed);
        format!("{}, {}!", self.greeting, who)
    }
}

#[async_trait]
impl Module for GreeterModule {
    fn core(&self) -> &ModuleCore {
        &self.core
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    async fn on_lifecycle(&self, target: ModuleLifecycle) -> Result<(), ModuleError> {
        if target == ModuleLifecycle::Init {
            if self.greeting.trim().is_empty() {
                return Err(ModuleError::InitializationFailed(
                    "greeting must not be empty".to_string(),
                ));
            }
            info!("👋 Greeter: Ready to welcome players with '{}'", self.greeting);
        }
        Ok(())
    }
}

/// Message of the day assembled from every greeter on the server.
pub struct MotdModule {
    core: ModuleCore,
    audience: String,
    message: Mutex<Option<String>>,
}

impl MotdModule {
    pub fn new(ctx: &ModuleContext<'_>, audience: impl Into<String>) -> Self {
        Self {
            core: ModuleCore::builder(ctx, "motd").build(),
            audience: audience.into(),
            message: Mutex::new(None),
        }
    }

    /// The message, available once the module completed `POST_INIT`.
    pub fn message(&self) -> Option<String> {
        self.message.lock().clone()
    }
}

#[async_trait]
impl Module for MotdModule {
    fn core(&self) -> &ModuleCore {
        &self.core
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    async fn on_lifecycle(&self, target: ModuleLifecycle) -> Result<(), ModuleError> {
        // Other modules may not exist before every loader ran, so wait for POST_INIT.
        if target != ModuleLifecycle::PostInit {
            return Ok(());
        }

        let server = self.server().ok_or_else(|| {
            ModuleError::InitializationFailed("server is no longer available".to_string())
        })?;

        let greeters = server.find_services::<dyn Greeter>();
        debug!("Building the message of the day from {} greeters", greeters.len());

        let lines: Vec<String> = greeters
            .iter()
            .map(|greeter| greeter.greet(&self.audience))
            .collect();
        if lines.is_empty() {
            warn!("No greeter found, the message of the day stays empty");
        }

        *self.message.lock() = Some(lines.join("\n"));
        Ok(())
    }
}

/// Loader contributing a [`GreeterModule`] and a [`MotdModule`].
pub struct GreeterLoader {
    greeting: String,
    audience: String,
}

impl GreeterLoader {
    pub fn new() -> Self {
        Self {
            greeting: "Hello".to_string(),
            audience: "world".to_string(),
        }
    }

    pub fn with_greeting(mut self, greeting: impl Into<String>) -> Self {
        self.greeting = greeting.into();
        self
    }

    pub fn with_audience(mut self, audience: impl Into<String>) -> Self {
        self.audience = audience.into();
        self
    }
}

impl Default for GreeterLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ModuleLoader for GreeterLoader {
    fn name(&self) -> &str {
        "greeter"
    }

    fn version(&self) -> &str {
        env!("CARGO_PKG_VERSION")
    }

    fn description(&self) -> &str {
        "Greets everyone and publishes a message of the day"
    }

    fn authors(&self) -> BTreeSet<ContactInformation> {
        BTreeSet::from([ContactInformation::new("Module Host Team")])
    }

    fn source_code(&self) -> &str {
        "https://example.com/module_greeter"
    }

    async fn create_modules(
        &self,
        ctx: &ModuleContext<'_>,
    ) -> Result<Vec<Arc<dyn Module>>, LoaderError> {
        Ok(vec![
            Arc::new(GreeterModule::new(ctx, self.greeting.clone())) as Arc<dyn Module>,
            Arc::new(MotdModule::new(ctx, self.audience.clone())) as Arc<dyn Module>,
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_server::{CoreConfig, CoreServer, LoaderRegistry};
    use module_api::downcast_module;

    /// A greeter living in another loader, unknown to this crate's modules.
    struct Shouter {
        core: ModuleCore,
    }

    impl Greeter for Shouter {
        fn greet(&self, who: &str) -> String {
            format!("HEY {}!", who.to_uppercase())
        }
    }

    impl Module for Shouter {
        fn core(&self) -> &ModuleCore {
            &self.core
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    struct ShoutLoader;

    #[async_trait]
    impl ModuleLoader for ShoutLoader {
        fn name(&self) -> &str {
            "shout"
        }

        fn version(&self) -> &str {
            "0.1.0"
        }

        fn description(&self) -> &str {
            "Greets loudly"
        }

        fn authors(&self) -> BTreeSet<ContactInformation> {
            BTreeSet::new()
        }

        fn source_code(&self) -> &str {
            "https://example.com/shout"
        }

        async fn create_modules(
            &self,
            ctx: &ModuleContext<'_>,
        ) -> Result<Vec<Arc<dyn Module>>, LoaderError> {
            let core = ModuleCore::builder(ctx, "shouter")
                .capability_as(|shouter: Arc<Shouter>| shouter as Arc<dyn Greeter>)
                .build();
            Ok(vec![Arc::new(Shouter { core }) as Arc<dyn Module>])
        }
    }

    fn motd(server: &CoreServer) -> Option<String> {
        server
            .modules()
            .iter()
            .find_map(|m| downcast_module::<MotdModule>(m.as_ref()))
            .and_then(MotdModule::message)
    }

    #[tokio::test]
    async fn test_motd_collects_every_greeter() {
        let registry = LoaderRegistry::new()
            .with(GreeterLoader::new())
            .with(GreeterLoader::new().with_greeting("Bonjour").with_audience("monde"));
        let server = CoreServer::new(registry, CoreConfig::default()).await.unwrap();

        let report = server.start().await.unwrap();

        assert!(report.is_clean());
        assert_eq!(server.find_modules::<dyn Greeter>().len(), 2);
        // Each motd greets its own audience with both greeters.
        assert_eq!(motd(&server).as_deref(), Some("Hello, world!\nBonjour, world!"));
    }

    #[tokio::test]
    async fn test_motd_uses_greeters_of_other_loaders() {
        let registry = LoaderRegistry::new().with(GreeterLoader::new()).with(ShoutLoader);
        let server = CoreServer::new(registry, CoreConfig::default()).await.unwrap();

        let report = server.start().await.unwrap();

        assert!(report.is_clean());
        let greeters = server.find_services::<dyn Greeter>();
        assert_eq!(greeters.len(), 2);
        assert_eq!(greeters[1].greet("ada"), "HEY ADA!");
        assert_eq!(motd(&server).as_deref(), Some("Hello, world!\nHEY WORLD!"));
    }

    #[tokio::test]
    async fn test_empty_greeting_fails_only_the_greeter() {
        let registry = LoaderRegistry::new().with(GreeterLoader::new().with_greeting("  "));
        let server = CoreServer::new(registry, CoreConfig::default()).await.unwrap();

        let report = server.start().await.unwrap();

        assert_eq!(report.failed_modules(), vec![0]);
        assert_eq!(server.modules()[0].lifecycle(), ModuleLifecycle::PreInit);
        assert_eq!(server.modules()[1].lifecycle(), ModuleLifecycle::Initialized);
        assert_eq!(motd(&server).as_deref(), Some("  , world!"));
    }

    #[tokio::test]
    async fn test_greeter_counts_welcomes() {
        let registry = LoaderRegistry::new().with(GreeterLoader::new());
        let server = CoreServer::new(registry, CoreConfig::default()).await.unwrap();
        server.start().await.unwrap();

        let greeter = downcast_module::<GreeterModule>(server.modules()[0].as_ref()).unwrap();
        assert_eq!(greeter.welcome_count(), 1);
        assert_eq!(greeter.greet("Ada"), "Hello, Ada!");
        assert_eq!(greeter.welcome_count(), 2);
        assert!(server.modules()[1].lifecycle() == ModuleLifecycle::Initialized);
    }
}
